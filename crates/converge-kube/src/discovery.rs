//! Shared discovery cache
//!
//! Holds the last fetched [`DiscoverySnapshot`]. Readers get a cheap `Arc` clone; a refresh
//! swaps the whole snapshot. Two tasks missing at the same time may both fetch, the last
//! store wins.

use std::sync::{Arc, PoisonError, RwLock};

use converge_core::DiscoverySnapshot;

#[derive(Debug, Default)]
pub struct DiscoveryCache {
    snapshot: RwLock<Option<Arc<DiscoverySnapshot>>>,
}

impl DiscoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, `None` until the first store
    pub fn get(&self) -> Option<Arc<DiscoverySnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the cached snapshot, returning the stored handle
    pub fn store(&self, snapshot: DiscoverySnapshot) -> Arc<DiscoverySnapshot> {
        let snapshot = Arc::new(snapshot);
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Drop the cached snapshot; the next resolution fetches again
    pub fn invalidate(&self) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_populated(&self) -> bool {
        self.get().is_some()
    }
}
