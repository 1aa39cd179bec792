use crate::Notice;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User activated the control.
    Activated,
    /// The remote service answered with a reply.
    GenerationSucceeded { reply: String },
    /// The remote call failed (status, transport or timeout).
    GenerationFailed { reason: String },
    /// The reply was written into the editable field.
    WriteBackCompleted,
    /// No editable field was live at write-back time.
    WriteBackFailed,
    /// Cleanup after a run, whatever happened to it. Always lands in Idle.
    Settled,
}

impl Msg {
    pub fn failure_notice(&self) -> Option<Notice> {
        match self {
            Msg::GenerationFailed { reason } => Some(Notice::RequestFailed {
                reason: reason.clone(),
            }),
            Msg::WriteBackFailed => Some(Notice::EditableMissing),
            _ => None,
        }
    }
}
