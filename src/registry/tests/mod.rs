//! Shared test utilities and fixtures for standard registry tests

use crate::error::CropwatchError;
use crate::models::{ProfilePatch, StandardProfile};
use crate::registry::{InMemoryStandardStore, StandardRegistry, StandardStore};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};


/// Create a test profile with the same value for every threshold
pub fn create_test_profile(id: i64, period_key: &str, value: f64) -> StandardProfile {
    StandardProfile {
        id,
        ndvi: value,
        ndwi: value,
        gli: value,
        precipitation: value,
        soil_moisture: value,
        standard_zone: period_key.to_string(),
        standard_default_zone: None,
        standard_range: None,
    }
}

/// Create a default profile keyed by `StandardDefaultZone`
pub fn create_default_profile(id: i64, period_key: &str, value: f64) -> StandardProfile {
    StandardProfile {
        standard_default_zone: Some(period_key.to_string()),
        ..create_test_profile(id, period_key, value)
    }
}

/// Active profiles for every period plus matching defaults with other values
pub fn create_test_store() -> InMemoryStandardStore {
    let active = vec![
        create_test_profile(1, "Emergence", 0.1),
        create_test_profile(2, "Tillering", 0.2),
        create_test_profile(3, "StemElongation", 0.3),
        create_test_profile(4, "Maturity", 0.4),
    ];
    let defaults = vec![
        create_default_profile(1, "Emergence", 0.5),
        create_default_profile(2, "Tillering", 0.6),
        create_default_profile(3, "StemElongation", 0.7),
        create_default_profile(4, "Maturity", 0.8),
    ];
    InMemoryStandardStore::new(active, defaults)
}

/// Registry over `store` with active profiles already fetched
pub async fn create_loaded_registry(store: InMemoryStandardStore) -> StandardRegistry {
    let mut registry = StandardRegistry::new(Arc::new(store));
    registry
        .fetch_active()
        .await
        .expect("in-memory fetch cannot fail");
    registry
}

/// In-memory store whose patches start failing once `allowed` have succeeded
pub struct FailingPatchStore {
    inner: InMemoryStandardStore,
    remaining: AtomicUsize,
}

impl FailingPatchStore {
    pub fn new(inner: InMemoryStandardStore, allowed: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(allowed),
        }
    }
}

#[async_trait]
impl StandardStore for FailingPatchStore {
    async fn list_active(&self) -> crate::error::Result<Vec<StandardProfile>> {
        self.inner.list_active().await
    }

    async fn list_defaults(&self) -> crate::error::Result<Vec<StandardProfile>> {
        self.inner.list_defaults().await
    }

    async fn patch(&self, id: i64, patch: &ProfilePatch) -> crate::error::Result<()> {
        let granted = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !granted {
            return Err(CropwatchError::upstream("failing_patch", "write rejected"));
        }
        self.inner.patch(id, patch).await
    }

    fn name(&self) -> &str {
        "failing_patch"
    }
}
