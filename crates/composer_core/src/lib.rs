//! Composer core: the action control's pure state machine and request types.
mod effect;
mod msg;
mod request;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, Notice};
pub use msg::Msg;
pub use request::{GenerationRequest, Tone, UnknownTone};
pub use state::ControlState;
pub use update::update;
pub use view_model::{ControlView, GENERATING_LABEL, IDLE_LABEL, TOOLTIP};
