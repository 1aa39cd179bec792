use std::time::Duration;

use composer_core::Tone;
use serde::{Deserialize, Serialize};

use crate::generate::{GeneratorSettings, DEFAULT_ENDPOINT};

pub const DEFAULT_MESSAGE_BODY: [&str; 4] = [
    ".h7",
    ".a3s.aiL",
    ".gmail_quote",
    "[role=\"presentation\"]",
];
pub const DEFAULT_TOOLBAR: [&str; 4] = [".btC", ".aDh", "[role=\"toolbar\"]", ".gU.Up"];
pub const DEFAULT_SURFACE_MARKERS: [&str; 3] = [".aDh", ".btC", "[role=\"dialog\"]"];
pub const DEFAULT_EDITABLE: [&str; 1] = ["[role=\"textbox\"][g_editable=\"true\"]"];

/// What re-injection does to a superseded control whose request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StaleRequestPolicy {
    /// Detach the old control and let its request finish; the reply goes to
    /// whichever editable field is live when it lands.
    #[default]
    Detach,
    /// Abort the old control's request; it still settles back to idle.
    Cancel,
}

/// Host-page locator lists, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub message_body: Vec<String>,
    pub toolbar: Vec<String>,
    pub surface_markers: Vec<String>,
    pub editable: Vec<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        fn owned(patterns: &[&str]) -> Vec<String> {
            patterns.iter().map(|p| p.to_string()).collect()
        }
        Self {
            message_body: owned(&DEFAULT_MESSAGE_BODY),
            toolbar: owned(&DEFAULT_TOOLBAR),
            surface_markers: owned(&DEFAULT_SURFACE_MARKERS),
            editable: owned(&DEFAULT_EDITABLE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub endpoint: String,
    /// Tone the injected control always asks for.
    pub tone: Tone,
    /// Wait between spotting a compose surface and measuring its toolbar.
    pub injection_delay_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub stale_requests: StaleRequestPolicy,
    pub locators: LocatorConfig,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            tone: Tone::Professional,
            injection_delay_ms: 500,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            stale_requests: StaleRequestPolicy::Detach,
            locators: LocatorConfig::default(),
        }
    }
}

impl PageConfig {
    pub fn injection_delay(&self) -> Duration {
        Duration::from_millis(self.injection_delay_ms)
    }

    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            endpoint: self.endpoint.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}
