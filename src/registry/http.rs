//! REST-backed standard store
//!
//! `GET {base}/standard/`, `GET {base}/standarddefault/` and
//! `PATCH {base}/standard/{id}` with the five thresholds and the period key
//! as a JSON body.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::constants::{STANDARD_DEFAULT_PATH, STANDARD_PATH};
use crate::error::{CropwatchError, Result};
use crate::models::{ProfilePatch, ProfileSource, StandardProfile};

use super::store::StandardStore;
use super::wire::decode_profiles;

#[derive(Debug, Clone)]
pub struct HttpStandardStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStandardStore {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn collection_url(&self, source: ProfileSource) -> String {
        let path = match source {
            ProfileSource::Active => STANDARD_PATH,
            ProfileSource::Default => STANDARD_DEFAULT_PATH,
        };
        format!("{}/{}/", self.base_url, path)
    }

    async fn get_collection(&self, source: ProfileSource) -> Result<Vec<StandardProfile>> {
        let url = self.collection_url(source);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CropwatchError::upstream(url, format!("HTTP {status}")));
        }
        let payload: Value = response.json().await?;
        Ok(decode_profiles(source, &payload))
    }
}

#[async_trait]
impl StandardStore for HttpStandardStore {
    async fn list_active(&self) -> Result<Vec<StandardProfile>> {
        self.get_collection(ProfileSource::Active).await
    }

    async fn list_defaults(&self) -> Result<Vec<StandardProfile>> {
        self.get_collection(ProfileSource::Default).await
    }

    #[instrument(skip(self, patch), fields(base_url = %self.base_url))]
    async fn patch(&self, id: i64, patch: &ProfilePatch) -> Result<()> {
        let url = format!("{}/{}/{}", self.base_url, STANDARD_PATH, id);
        let response = self.client.patch(&url).json(patch).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CropwatchError::upstream(url, format!("HTTP {status}")));
        }
        // The reply body is an acknowledgement, not a profile; callers re-fetch.
        debug!("Patched standard profile {} ({})", id, status);
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
