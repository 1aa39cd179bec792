use crate::view_model::{ControlView, GENERATING_LABEL, IDLE_LABEL};

/// Lifecycle of one injected control.
///
/// `Idle` is both the initial state and the state every run settles back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlState {
    #[default]
    Idle,
    Generating,
    Done,
    Failed,
}

impl ControlState {
    pub fn view(&self) -> ControlView {
        match self {
            ControlState::Idle => ControlView {
                label: IDLE_LABEL,
                enabled: true,
            },
            // Done and Failed are transient; they keep the busy look until reset.
            ControlState::Generating | ControlState::Done | ControlState::Failed => ControlView {
                label: GENERATING_LABEL,
                enabled: false,
            },
        }
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self, ControlState::Idle)
    }
}
