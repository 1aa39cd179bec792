use composer_logging::composer_trace;

use crate::document::{Document, MutationRecord};
use crate::locator::{LocatorList, LocatorMatch};

/// Decides whether a batch of structural mutations brought a compose surface in.
#[derive(Debug, Clone)]
pub struct SurfaceObserver {
    markers: LocatorList,
}

impl SurfaceObserver {
    pub fn new(markers: LocatorList) -> Self {
        Self { markers }
    }

    /// First added element that is, or contains, a compose-surface marker.
    pub fn detect(&self, document: &Document, batch: &[MutationRecord]) -> Option<LocatorMatch> {
        batch
            .iter()
            .flat_map(|record| record.added.iter().copied())
            .filter(|node| document.element(*node).is_some())
            .find_map(|node| {
                let hit = self.markers.resolve(document, node);
                if hit.is_none() {
                    composer_trace!("added node {node:?} is not a compose surface");
                }
                hit
            })
    }

    pub fn marker_pattern(&self, hit: &LocatorMatch) -> &str {
        self.markers.pattern(hit.rank).unwrap_or("?")
    }
}
