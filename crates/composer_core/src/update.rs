use crate::{ControlState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// A run is `Activated -> (GenerationSucceeded -> WriteBack*) | GenerationFailed`
/// followed by `Settled`, which the runtime sends unconditionally once the run
/// ends. `Settled` is the only way back to `Idle`.
pub fn update(state: ControlState, msg: Msg) -> (ControlState, Vec<Effect>) {
    match (state, msg) {
        (ControlState::Idle, Msg::Activated) => {
            let next = ControlState::Generating;
            (next, vec![Effect::Render(next.view()), Effect::RequestReply])
        }
        (ControlState::Generating, Msg::GenerationSucceeded { reply }) => {
            (ControlState::Done, vec![Effect::WriteBack { reply }])
        }
        (ControlState::Generating, msg @ Msg::GenerationFailed { .. }) => {
            (ControlState::Failed, notify(&msg))
        }
        (ControlState::Done, Msg::WriteBackCompleted) => (ControlState::Done, Vec::new()),
        (ControlState::Done, msg @ Msg::WriteBackFailed) => (ControlState::Done, notify(&msg)),
        (ControlState::Idle, Msg::Settled) => (ControlState::Idle, Vec::new()),
        (_, Msg::Settled) => {
            let next = ControlState::Idle;
            (next, vec![Effect::Render(next.view())])
        }
        // Activation while busy is swallowed (the control is disabled), and
        // late results for a run that already settled are ignored.
        (state, _) => (state, Vec::new()),
    }
}

fn notify(msg: &Msg) -> Vec<Effect> {
    msg.failure_notice().map(Effect::Notify).into_iter().collect()
}
