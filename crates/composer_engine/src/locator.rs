//! Ordered locator chains and the resolver that walks them.

use composer_logging::composer_trace;
use ego_tree::NodeId;
use scraper::Selector;
use thiserror::Error;

use crate::config::LocatorConfig;
use crate::document::Document;
use crate::extract::MessageExtractor;
use crate::toolbar::ToolbarLocator;

/// Class carried by the injected control; never part of the host contract.
pub const CONTROL_MARKER: &str = ".ai-reply-button";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("locator list for {purpose} is empty")]
    Empty { purpose: &'static str },
    #[error("invalid locator {pattern:?} for {purpose}: {message}")]
    InvalidPattern {
        purpose: &'static str,
        pattern: String,
        message: String,
    },
}

#[derive(Debug, Clone)]
struct Locator {
    pattern: String,
    selector: Selector,
}

/// A hit from a [`LocatorList`]: which locator matched, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorMatch {
    pub rank: usize,
    pub node: NodeId,
}

/// Non-empty, priority-ordered list of compiled selectors.
#[derive(Debug, Clone)]
pub struct LocatorList {
    purpose: &'static str,
    locators: Vec<Locator>,
}

impl LocatorList {
    pub fn compile<S: AsRef<str>>(
        purpose: &'static str,
        patterns: &[S],
    ) -> Result<Self, LocatorError> {
        if patterns.is_empty() {
            return Err(LocatorError::Empty { purpose });
        }
        let locators = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref().trim();
                Selector::parse(pattern)
                    .map(|selector| Locator {
                        pattern: pattern.to_string(),
                        selector,
                    })
                    .map_err(|err| LocatorError::InvalidPattern {
                        purpose,
                        pattern: pattern.to_string(),
                        message: err.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { purpose, locators })
    }

    /// Tries each locator in priority order against `scope` and returns the
    /// first hit. A miss moves on to the next locator; only a hit or an
    /// exhausted list ends the walk.
    pub fn resolve(&self, document: &Document, scope: NodeId) -> Option<LocatorMatch> {
        for (rank, locator) in self.locators.iter().enumerate() {
            match document.select_first(scope, &locator.selector) {
                Some(node) => {
                    composer_trace!(
                        "{}: matched {:?} (rank {})",
                        self.purpose,
                        locator.pattern,
                        rank
                    );
                    return Some(LocatorMatch { rank, node });
                }
                None => {
                    composer_trace!("{}: no match for {:?}", self.purpose, locator.pattern);
                }
            }
        }
        None
    }

    /// Every element under `scope` matching any locator, without duplicates.
    pub fn resolve_all(&self, document: &Document, scope: NodeId) -> Vec<NodeId> {
        let mut found: Vec<NodeId> = Vec::new();
        for locator in &self.locators {
            for node in document.select_all(scope, &locator.selector) {
                if !found.contains(&node) {
                    found.push(node);
                }
            }
        }
        found
    }

    pub fn pattern(&self, rank: usize) -> Option<&str> {
        self.locators.get(rank).map(|l| l.pattern.as_str())
    }
}

/// Every host-page locator the controller depends on, compiled once at start.
#[derive(Debug, Clone)]
pub struct HostLocators {
    pub message: MessageExtractor,
    pub toolbar: ToolbarLocator,
    pub surfaces: LocatorList,
    pub editable: LocatorList,
    pub control: LocatorList,
}

impl HostLocators {
    pub fn from_config(config: &LocatorConfig) -> Result<Self, LocatorError> {
        let message = LocatorList::compile("message body", config.message_body.as_slice())?;
        let toolbar = LocatorList::compile("toolbar", config.toolbar.as_slice())?;
        Ok(Self {
            message: MessageExtractor::new(message),
            toolbar: ToolbarLocator::new(toolbar),
            surfaces: LocatorList::compile("compose surface", config.surface_markers.as_slice())?,
            editable: LocatorList::compile("editable field", config.editable.as_slice())?,
            control: LocatorList::compile("control marker", &[CONTROL_MARKER])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{LocatorError, LocatorList};

    #[test]
    fn empty_list_is_rejected() {
        let err = LocatorList::compile::<&str>("toolbar", &[]).unwrap_err();
        assert_eq!(err, LocatorError::Empty { purpose: "toolbar" });
    }

    #[test]
    fn invalid_pattern_is_reported_with_its_text() {
        let err = LocatorList::compile("toolbar", &[".btC", "[[nope"]).unwrap_err();
        match err {
            LocatorError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "[[nope"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
