use std::fmt;

use crate::ControlView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Push the control's label and enabled flag into the document.
    Render(ControlView),
    /// Extract the viewed message and send it to the generation service.
    RequestReply,
    /// Focus the live editable field and insert the reply at the caret.
    WriteBack { reply: String },
    /// Show a user-visible notice.
    Notify(Notice),
}

/// User-visible failures. None of them are fatal to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    RequestFailed { reason: String },
    EditableMissing,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::RequestFailed { .. } => write!(f, "Failed to generate reply"),
            Notice::EditableMissing => {
                write!(f, "Compose box was not found; the generated reply was discarded")
            }
        }
    }
}
