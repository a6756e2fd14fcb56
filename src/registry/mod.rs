//! Standard profile registry
//!
//! Keeps the most recently fetched standard profiles and resolves the one
//! that applies to a growth period. Every write goes to the upstream store
//! and is followed by a re-fetch, so classification always runs against
//! what the store holds rather than a locally patched copy.

use crate::error::{CropwatchError, Result};
use crate::models::{GrowthPeriod, ProfilePatch, ProfileSource, StandardProfile};
use crate::pipeline::normalize::normalize_label;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[cfg(feature = "http")]
pub mod http;
pub mod store;
pub mod wire;

#[cfg(test)]
pub mod tests;

#[cfg(feature = "http")]
pub use http::HttpStandardStore;
pub use store::{InMemoryStandardStore, JsonFileStandardStore, StandardStore};

/// First profile whose period key matches `period` after normalization
pub fn find_profile(
    profiles: &[StandardProfile],
    period: GrowthPeriod,
    source: ProfileSource,
) -> Option<&StandardProfile> {
    let wanted = normalize_label(period.name());
    profiles
        .iter()
        .find(|profile| normalize_label(profile.period_key(source)) == wanted)
}

/// Registry of standard profiles backed by a [`StandardStore`]
pub struct StandardRegistry {
    store: Arc<dyn StandardStore>,
    active: Vec<StandardProfile>,
    defaults: Vec<StandardProfile>,
    showing_defaults: bool,
    last_refresh: Option<Instant>,
}

impl StandardRegistry {
    /// Create an empty registry; nothing is fetched until [`Self::fetch_active`]
    pub fn new(store: Arc<dyn StandardStore>) -> Self {
        Self {
            store,
            active: Vec::new(),
            defaults: Vec::new(),
            showing_defaults: false,
            last_refresh: None,
        }
    }

    /// Re-read the active profiles and switch the view back to them
    pub async fn fetch_active(&mut self) -> Result<&[StandardProfile]> {
        let profiles = self.store.list_active().await.map_err(|e| {
            warn!("Failed to fetch standard data from {}: {}", self.store.name(), e);
            e
        })?;
        debug!("Fetched {} active standard profiles", profiles.len());
        self.active = profiles;
        self.showing_defaults = false;
        self.last_refresh = Some(Instant::now());
        Ok(&self.active)
    }

    /// Re-read the default profiles without changing the view
    pub async fn fetch_defaults(&mut self) -> Result<&[StandardProfile]> {
        let profiles = self.store.list_defaults().await?;
        debug!("Fetched {} default standard profiles", profiles.len());
        self.defaults = profiles;
        Ok(&self.defaults)
    }

    /// Fetch the defaults and resolve periods against them until the next active fetch
    pub async fn show_defaults(&mut self) -> Result<()> {
        self.fetch_defaults().await?;
        self.showing_defaults = true;
        self.last_refresh = Some(Instant::now());
        Ok(())
    }

    /// Write a profile's thresholds and key, then re-fetch.
    ///
    /// Returns the profile as the store holds it after the re-fetch.
    pub async fn update(&mut self, profile: &StandardProfile) -> Result<StandardProfile> {
        let patch = ProfilePatch::from_profile(profile, ProfileSource::Active);
        self.store.patch(profile.id, &patch).await?;
        info!("Standard {} updated for {}", profile.id, patch.standard_zone);

        self.fetch_active().await?;
        self.active
            .iter()
            .find(|p| p.id == profile.id)
            .cloned()
            .ok_or(CropwatchError::ProfileNotFound { id: profile.id })
    }

    /// Copy every default profile onto the active profile with the same id.
    ///
    /// Writes go one at a time. If one fails, the earlier writes stay in place,
    /// the registry still re-fetches, and [`CropwatchError::PartialReset`]
    /// reports how many were applied. Nothing is retried.
    pub async fn reset_all_to_default(&mut self) -> Result<usize> {
        let defaults = self.fetch_defaults().await?.to_vec();
        let total = defaults.len();

        for (applied, default) in defaults.iter().enumerate() {
            let patch = ProfilePatch::from_profile(default, ProfileSource::Default);
            if let Err(e) = self.store.patch(default.id, &patch).await {
                warn!(
                    "Reset to default stopped at profile {} ({} of {} applied): {}",
                    default.id, applied, total, e
                );
                if let Err(refresh_err) = self.fetch_active().await {
                    warn!("Refresh after partial reset failed: {}", refresh_err);
                }
                return Err(CropwatchError::PartialReset {
                    applied,
                    total,
                    source: Box::new(e),
                });
            }
        }

        self.fetch_active().await?;
        info!("Standard has been reset to default values ({} profiles)", total);
        Ok(total)
    }

    /// Profile for a period in the current view
    pub fn resolve(&self, period: GrowthPeriod) -> Option<&StandardProfile> {
        if self.showing_defaults {
            find_profile(&self.defaults, period, ProfileSource::Default)
        } else {
            find_profile(&self.active, period, ProfileSource::Active)
        }
    }

    /// Profile for a period among the active profiles, regardless of view
    pub fn resolve_active(&self, period: GrowthPeriod) -> Option<&StandardProfile> {
        find_profile(&self.active, period, ProfileSource::Active)
    }

    /// Profiles of the current view
    pub fn profiles(&self) -> &[StandardProfile] {
        if self.showing_defaults {
            &self.defaults
        } else {
            &self.active
        }
    }

    pub fn showing_defaults(&self) -> bool {
        self.showing_defaults
    }

    pub fn is_loaded(&self) -> bool {
        self.last_refresh.is_some()
    }

    /// Fail until at least one fetch has succeeded
    pub fn ensure_loaded(&self) -> Result<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(CropwatchError::not_ready("standard profiles have not been fetched"))
        }
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}

impl std::fmt::Debug for StandardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardRegistry")
            .field("store", &self.store.name())
            .field("active", &self.active.len())
            .field("defaults", &self.defaults.len())
            .field("showing_defaults", &self.showing_defaults)
            .finish()
    }
}
