use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Friendly,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Friendly => "friendly",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTone(pub String);

impl fmt::Display for UnknownTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown tone {:?} (expected professional, casual or friendly)",
            self.0
        )
    }
}

impl std::error::Error for UnknownTone {}

impl FromStr for Tone {
    type Err = UnknownTone;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "casual" => Ok(Tone::Casual),
            "friendly" => Ok(Tone::Friendly),
            _ => Err(UnknownTone(raw.to_string())),
        }
    }
}

/// Body of the generation call: `{"emailContent": ..., "tone": ...}`.
///
/// `tone` is left out of the JSON entirely when there is no preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    email_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tone: Option<Tone>,
}

impl GenerationRequest {
    pub fn new(email_content: impl Into<String>, tone: Option<Tone>) -> Self {
        Self {
            email_content: email_content.into(),
            tone,
        }
    }

    pub fn email_content(&self) -> &str {
        &self.email_content
    }

    pub fn tone(&self) -> Option<Tone> {
        self.tone
    }
}
