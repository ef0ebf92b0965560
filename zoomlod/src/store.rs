//! Shared feature store fed by completed reads.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::view::Feature;

/// Destination for the features of a completed read.
///
/// Completions may arrive on a transport thread, so implementations must be
/// shareable.
pub trait FeatureSink: Send + Sync {
    /// Replace all displayed features with `features`.
    fn replace(&self, features: Vec<Feature>);

    /// Remove all displayed features.
    fn clear(&self);
}

/// Cheaply cloneable in-memory feature set.
///
/// Clones share the same underlying storage, so one handle can be given to
/// the fetch layer while the map view reads through another.
#[derive(Debug, Clone, Default)]
pub struct FeatureStore {
    features: Arc<RwLock<Vec<Feature>>>,
}

impl FeatureStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `features`.
    pub fn with_features(features: Vec<Feature>) -> Self {
        Self {
            features: Arc::new(RwLock::new(features)),
        }
    }

    /// Copy of the current features.
    pub fn snapshot(&self) -> Vec<Feature> {
        self.features.read().clone()
    }

    /// Number of stored features.
    pub fn len(&self) -> usize {
        self.features.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.features.read().is_empty()
    }
}

impl FeatureSink for FeatureStore {
    fn replace(&self, features: Vec<Feature>) {
        *self.features.write() = features;
    }

    fn clear(&self) {
        self.features.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::point;

    #[test]
    fn test_clones_share_storage() {
        let store = FeatureStore::new();
        let handle = store.clone();

        handle.replace(vec![Feature::new(point!(x: 1.0, y: 2.0))]);
        assert_eq!(store.len(), 1);

        handle.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_discards_previous_features() {
        let store = FeatureStore::with_features(vec![
            Feature::with_id("a", point!(x: 0.0, y: 0.0)),
            Feature::with_id("b", point!(x: 1.0, y: 1.0)),
        ]);
        store.replace(vec![Feature::with_id("c", point!(x: 2.0, y: 2.0))]);

        let ids: Vec<_> = store.snapshot().into_iter().filter_map(|f| f.id).collect();
        assert_eq!(ids, vec!["c".to_string()]);
    }
}
