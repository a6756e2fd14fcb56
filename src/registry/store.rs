//! Standard profile stores
//!
//! The registry talks to its upstream through [`StandardStore`]. Two
//! backends live here: an in-memory store for tests and embedding, and a
//! JSON-file store that keeps the two upstream payloads on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::constants::{STANDARD_DEFAULT_FILE_NAME, STANDARD_FILE_NAME};
use crate::error::{CropwatchError, Result};
use crate::models::{ProfilePatch, ProfileSource, StandardProfile};

use super::wire::{decode_profiles, encode_profiles};

/// Upstream holding the active and default standard profiles.
///
/// Writes are last-write-wins; callers re-read after writing rather than
/// patching their own copies.
#[async_trait]
pub trait StandardStore: Send + Sync {
    /// All active profiles
    async fn list_active(&self) -> Result<Vec<StandardProfile>>;

    /// All default profiles
    async fn list_defaults(&self) -> Result<Vec<StandardProfile>>;

    /// Overwrite the thresholds and key of the active profile `id`.
    ///
    /// Success only means the write was accepted; read the profile back
    /// with [`StandardStore::list_active`].
    async fn patch(&self, id: i64, patch: &ProfilePatch) -> Result<()>;

    /// Short backend name for logs
    fn name(&self) -> &str;
}

#[derive(Debug, Default)]
struct Collections {
    active: Vec<StandardProfile>,
    defaults: Vec<StandardProfile>,
}

fn apply_patch(profiles: &mut [StandardProfile], id: i64, patch: &ProfilePatch) -> Result<()> {
    let profile = profiles
        .iter_mut()
        .find(|profile| profile.id == id)
        .ok_or(CropwatchError::ProfileNotFound { id })?;
    patch.apply_to(profile);
    Ok(())
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStandardStore {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryStandardStore {
    pub fn new(active: Vec<StandardProfile>, defaults: Vec<StandardProfile>) -> Self {
        Self {
            collections: Arc::new(RwLock::new(Collections { active, defaults })),
        }
    }

    pub async fn active_snapshot(&self) -> Vec<StandardProfile> {
        self.collections.read().await.active.clone()
    }
}

#[async_trait]
impl StandardStore for InMemoryStandardStore {
    async fn list_active(&self) -> Result<Vec<StandardProfile>> {
        Ok(self.collections.read().await.active.clone())
    }

    async fn list_defaults(&self) -> Result<Vec<StandardProfile>> {
        Ok(self.collections.read().await.defaults.clone())
    }

    #[instrument(skip(self, patch))]
    async fn patch(&self, id: i64, patch: &ProfilePatch) -> Result<()> {
        let mut collections = self.collections.write().await;
        apply_patch(&mut collections.active, id, patch)
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

/// Store backed by `standard.json` and `standarddefault.json` in one directory
#[derive(Debug, Clone)]
pub struct JsonFileStandardStore {
    dir: PathBuf,
    write_lock: Arc<RwLock<()>>,
}

impl JsonFileStandardStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, source: ProfileSource) -> PathBuf {
        match source {
            ProfileSource::Active => self.dir.join(STANDARD_FILE_NAME),
            ProfileSource::Default => self.dir.join(STANDARD_DEFAULT_FILE_NAME),
        }
    }

    async fn read(&self, source: ProfileSource) -> Result<Vec<StandardProfile>> {
        let path = self.path_for(source);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| CropwatchError::upstream(path.display().to_string(), e.to_string()))?;
        let payload: serde_json::Value = serde_json::from_str(&contents)?;
        let profiles = decode_profiles(source, &payload);
        debug!("Read {} profiles from {}", profiles.len(), path.display());
        Ok(profiles)
    }

    async fn write(&self, source: ProfileSource, profiles: &[StandardProfile]) -> Result<()> {
        let path = self.path_for(source);
        let payload = encode_profiles(source, profiles);
        tokio::fs::write(&path, serde_json::to_string_pretty(&payload)?).await?;
        Ok(())
    }
}

#[async_trait]
impl StandardStore for JsonFileStandardStore {
    async fn list_active(&self) -> Result<Vec<StandardProfile>> {
        let _guard = self.write_lock.read().await;
        self.read(ProfileSource::Active).await
    }

    async fn list_defaults(&self) -> Result<Vec<StandardProfile>> {
        let _guard = self.write_lock.read().await;
        self.read(ProfileSource::Default).await
    }

    #[instrument(skip(self, patch), fields(dir = %self.dir.display()))]
    async fn patch(&self, id: i64, patch: &ProfilePatch) -> Result<()> {
        let _guard = self.write_lock.write().await;
        let mut active = self.read(ProfileSource::Active).await?;
        apply_patch(&mut active, id, patch)?;
        self.write(ProfileSource::Active, &active).await
    }

    fn name(&self) -> &str {
        "json_file"
    }
}
