use ego_tree::NodeId;

use crate::document::Document;
use crate::locator::LocatorList;

#[derive(Debug, Clone)]
pub struct ToolbarLocator {
    locators: LocatorList,
}

impl ToolbarLocator {
    pub fn new(locators: LocatorList) -> Self {
        Self { locators }
    }

    pub fn locate(&self, document: &Document, scope: NodeId) -> Option<NodeId> {
        self.locators.resolve(document, scope).map(|hit| hit.node)
    }
}
