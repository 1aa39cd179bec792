use ego_tree::NodeId;

use crate::document::Document;
use crate::locator::LocatorList;

/// Finds the viewed message's text through a prioritized list of body locators.
#[derive(Debug, Clone)]
pub struct MessageExtractor {
    locators: LocatorList,
}

impl MessageExtractor {
    pub fn new(locators: LocatorList) -> Self {
        Self { locators }
    }

    /// Rendered, trimmed text of the best-ranked match. Empty when nothing
    /// matches, which callers treat as "no context" rather than an error.
    pub fn extract(&self, document: &Document, scope: NodeId) -> String {
        self.locators
            .resolve(document, scope)
            .map(|hit| document.rendered_text(hit.node))
            .unwrap_or_default()
    }
}
