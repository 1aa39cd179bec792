pub const IDLE_LABEL: &str = "AI Reply";
pub const GENERATING_LABEL: &str = "Generating…";
pub const TOOLTIP: &str = "Generate AI Reply";

/// What the control looks like in the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlView {
    pub label: &'static str,
    pub enabled: bool,
}
