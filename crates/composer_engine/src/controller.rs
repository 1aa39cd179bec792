//! Runtime side of the action control: runs the core state machine's effects
//! against the live document and the generation service.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use composer_core::{update, ControlState, ControlView, Effect, GenerationRequest, Msg};
use composer_logging::{composer_debug, composer_error, composer_info, composer_warn};
use ego_tree::NodeId;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::page::PageContext;

pub struct ActionController {
    node: NodeId,
    ctx: PageContext,
    state: watch::Sender<ControlState>,
    in_flight: RefCell<Option<JoinHandle<()>>>,
}

impl ActionController {
    pub(crate) fn new(node: NodeId, ctx: PageContext) -> Self {
        let (state, _) = watch::channel(ControlState::Idle);
        Self {
            node,
            ctx,
            state,
            in_flight: RefCell::new(None),
        }
    }

    /// The control element this controller drives.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn state(&self) -> ControlState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ControlState> {
        self.state.subscribe()
    }

    /// Handles a click on the control. Must run inside a `LocalSet`.
    pub fn activate(self: &Rc<Self>) {
        self.dispatch(Msg::Activated);
    }

    /// Aborts the in-flight request, if any. The run still settles to idle.
    pub fn cancel(&self) {
        let task = self.in_flight.borrow_mut().take();
        if let Some(task) = task {
            composer_info!("Cancelling in-flight request for superseded control");
            task.abort();
        }
    }

    fn dispatch(self: &Rc<Self>, msg: Msg) {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            let current = self.state();
            let (next, effects) = update(current, msg);
            if next != current {
                composer_debug!("control {:?}: {:?} -> {:?}", self.node, current, next);
                self.state.send_replace(next);
            }
            for effect in effects {
                if let Some(follow_up) = self.run_effect(effect) {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    fn run_effect(self: &Rc<Self>, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::Render(view) => {
                self.render(view);
                None
            }
            Effect::RequestReply => {
                self.spawn_request();
                None
            }
            Effect::WriteBack { reply } => Some(if self.write_back(&reply) {
                Msg::WriteBackCompleted
            } else {
                Msg::WriteBackFailed
            }),
            Effect::Notify(notice) => {
                self.ctx.notices.notify(&notice);
                None
            }
        }
    }

    fn render(&self, view: ControlView) {
        let mut doc = self.ctx.document.borrow_mut();
        // A superseded control may still be finishing its run.
        if !doc.contains(self.node) {
            return;
        }
        doc.set_text(self.node, view.label);
        let disabled = if view.enabled { "false" } else { "true" };
        doc.set_attribute(self.node, "aria-disabled", Some(disabled));
    }

    fn spawn_request(self: &Rc<Self>) {
        let request = {
            let doc = self.ctx.document.borrow();
            let content = self.ctx.host.message.extract(&doc, doc.root());
            if content.is_empty() {
                composer_info!("No message body found; requesting a reply without context");
            }
            GenerationRequest::new(content, Some(self.ctx.tone))
        };

        let guard = SettleGuard(self.clone());
        let generator = self.ctx.generator.clone();
        let task = tokio::task::spawn_local(async move {
            composer_info!(
                "Requesting reply (content_len={})",
                request.email_content().len()
            );
            let msg = match generator.generate(&request).await {
                Ok(reply) => {
                    composer_info!("Reply received (len={})", reply.len());
                    Msg::GenerationSucceeded { reply }
                }
                Err(err) => {
                    composer_warn!("Reply generation failed: {err}");
                    Msg::GenerationFailed {
                        reason: err.to_string(),
                    }
                }
            };
            guard.0.dispatch(msg);
        });
        *self.in_flight.borrow_mut() = Some(task);
    }

    /// Looks the editable field up fresh, focuses it and inserts at its caret.
    fn write_back(&self, reply: &str) -> bool {
        let mut doc = self.ctx.document.borrow_mut();
        let root = doc.root();
        let Some(editable) = self.ctx.host.editable.resolve(&doc, root) else {
            composer_error!("Compose box was not found");
            return false;
        };
        doc.focus(editable.node) && doc.insert_text(reply)
    }
}

/// Sends `Settled` when the request task ends, however it ends (completion,
/// abort, or the runtime dropping it).
struct SettleGuard(Rc<ActionController>);

impl Drop for SettleGuard {
    fn drop(&mut self) {
        self.0.in_flight.borrow_mut().take();
        self.0.dispatch(Msg::Settled);
    }
}
