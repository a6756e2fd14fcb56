//! Zone record cache
//!
//! Holds the already-fetched record collection of every zone together with
//! the load state of the upstream fetch. The pipeline reads from the cache
//! but never runs ahead of it: until the cache is [`CacheState::Ready`],
//! record lookups fail with a not-ready error.

use crate::constants::ALL_ZONES;
use crate::error::{CropwatchError, Result};
use crate::models::{Record, Zone};
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Load state of the upstream record fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    Loading,
    Ready,
    Failed(String),
}

/// Per-zone record collections
#[derive(Debug, Clone)]
pub struct ZoneCache {
    state: CacheState,
    zones: HashMap<Zone, Vec<Record>>,
}

impl ZoneCache {
    /// Cache whose fetch has not completed yet
    pub fn loading() -> Self {
        Self {
            state: CacheState::Loading,
            zones: HashMap::new(),
        }
    }

    /// Cache whose fetch failed
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: CacheState::Failed(reason.into()),
            zones: HashMap::new(),
        }
    }

    /// Ready cache built from decoded records
    pub fn from_records(zones: HashMap<Zone, Vec<Record>>) -> Self {
        Self {
            state: CacheState::Ready,
            zones,
        }
    }

    /// Ready cache built from raw zone payloads
    pub fn from_payloads<I>(payloads: I) -> Self
    where
        I: IntoIterator<Item = (Zone, Value)>,
    {
        let zones = payloads
            .into_iter()
            .map(|(zone, payload)| (zone, decode_zone_payload(zone, &payload)))
            .collect();
        Self::from_records(zones)
    }

    /// Read `<zone>.json` for every zone in `dir`.
    ///
    /// Any unreadable or non-JSON file fails the whole cache.
    pub async fn load_dir(dir: &Path) -> Self {
        info!("Loading zone payloads from {}", dir.display());

        let reads = ALL_ZONES.iter().map(|zone| {
            let path = dir.join(format!("{}.json", zone.key()));
            async move { read_payload(*zone, path).await }
        });

        match try_join_all(reads).await {
            Ok(payloads) => {
                let cache = Self::from_payloads(payloads);
                info!(
                    "Loaded {} records across {} zones",
                    cache.total_records(),
                    cache.zones.len()
                );
                cache
            }
            Err(e) => {
                warn!("Zone payload load failed: {}", e);
                Self::failed(e.to_string())
            }
        }
    }

    /// Fetch every zone from `{base_url}/<zone>/` concurrently.
    ///
    /// The first failed request fails the whole cache.
    #[cfg(feature = "http")]
    pub async fn fetch_all(client: &reqwest::Client, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        info!("Fetching zone payloads from {}", base);

        let requests = ALL_ZONES.iter().map(|zone| {
            let url = format!("{}/{}/", base, zone.key());
            async move {
                let response = client.get(&url).send().await?;
                if !response.status().is_success() {
                    return Err(CropwatchError::upstream(
                        url.clone(),
                        format!("HTTP {}", response.status()),
                    ));
                }
                let payload: Value = response.json().await?;
                Ok::<_, CropwatchError>((*zone, payload))
            }
        });

        match try_join_all(requests).await {
            Ok(payloads) => Self::from_payloads(payloads),
            Err(e) => {
                warn!("Zone fetch failed: {}", e);
                Self::failed(e.to_string())
            }
        }
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == CacheState::Ready
    }

    /// Check the cache can be read from
    pub fn ensure_ready(&self) -> Result<()> {
        match &self.state {
            CacheState::Ready => Ok(()),
            CacheState::Loading => {
                Err(CropwatchError::not_ready("zone records are still loading"))
            }
            CacheState::Failed(reason) => {
                Err(CropwatchError::upstream("zone cache", reason.clone()))
            }
        }
    }

    /// Records of a zone; a ready cache without the zone yields an empty slice
    pub fn records(&self, zone: Zone) -> Result<&[Record]> {
        self.ensure_ready()?;
        Ok(self.zones.get(&zone).map(Vec::as_slice).unwrap_or(&[]))
    }

    pub fn record_count(&self, zone: Zone) -> usize {
        self.zones.get(&zone).map_or(0, Vec::len)
    }

    pub fn total_records(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }
}

async fn read_payload(zone: Zone, path: PathBuf) -> Result<(Zone, Value)> {
    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| CropwatchError::PayloadFile {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    let payload = serde_json::from_str(&contents).map_err(|e| CropwatchError::PayloadFile {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    debug!("Read payload for zone {} from {}", zone, path.display());
    Ok((zone, payload))
}

/// Decode the records of one zone payload (`{"<zone>_entities": [...]}`).
///
/// A payload without the expected array is logged and treated as empty;
/// individual records that fail to decode are skipped.
pub fn decode_zone_payload(zone: Zone, payload: &Value) -> Vec<Record> {
    let field = zone.entities_field();
    let Some(entries) = payload.get(field).and_then(Value::as_array) else {
        warn!("Unexpected payload format for zone {}: missing '{}' array", zone, field);
        return Vec::new();
    };

    let mut skipped = 0usize;
    let records: Vec<Record> = entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<Record>(entry.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                skipped += 1;
                debug!("Skipping malformed record in zone {}: {}", zone, e);
                None
            }
        })
        .collect();

    if skipped > 0 {
        warn!("Skipped {} malformed records in zone {} payload", skipped, zone);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_payload(zone: Zone, ids: &[i64]) -> Value {
        let entries: Vec<Value> = ids
            .iter()
            .map(|id| {
                json!({
                    "ID": id, "NDVI": 0.5, "NDWI": 0.1, "GLI": 0.05,
                    "Precipitation": 2.0, "Soilmoiture": 0.3,
                    "Lat": 13.7, "Lon": 100.5, "Date": "2023-03-15",
                    "StandardZone": zone.key()
                })
            })
            .collect();
        json!({ zone.entities_field(): entries })
    }

    #[test]
    fn test_decode_zone_payload() {
        let records = decode_zone_payload(Zone::Mac, &sample_payload(Zone::Mac, &[1, 2, 3]));
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].id, 3);
    }

    #[test]
    fn test_decode_missing_array_is_empty() {
        let records = decode_zone_payload(Zone::Sb, &json!({ "mac_entities": [] }));
        assert!(records.is_empty());
    }

    #[test]
    fn test_decode_skips_malformed_records() {
        let payload = json!({ "sb_entities": [
            { "ID": 1, "Date": "2023-03-15" },
            { "ID": "not-a-number", "Date": "2023-03-15" },
            { "NDVI": 0.4 }
        ]});
        let records = decode_zone_payload(Zone::Sb, &payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
    }

    #[test]
    fn test_not_ready_states() {
        let loading = ZoneCache::loading();
        assert!(matches!(
            loading.records(Zone::Sb),
            Err(CropwatchError::NotReady { .. })
        ));

        let failed = ZoneCache::failed("HTTP 503");
        assert!(matches!(
            failed.records(Zone::Sb),
            Err(CropwatchError::UpstreamUnavailable { .. })
        ));
    }

    #[test]
    fn test_ready_cache_missing_zone_is_empty() {
        let cache = ZoneCache::from_payloads([(Zone::Sb, sample_payload(Zone::Sb, &[1]))]);
        assert_eq!(cache.records(Zone::Sb).unwrap().len(), 1);
        assert!(cache.records(Zone::Mpk).unwrap().is_empty());
        assert_eq!(cache.total_records(), 1);
    }

    #[tokio::test]
    async fn test_load_dir_reads_every_zone() {
        let temp_dir = TempDir::new().unwrap();
        for (i, zone) in ALL_ZONES.iter().enumerate() {
            let ids: Vec<i64> = (0..=i as i64).collect();
            std::fs::write(
                temp_dir.path().join(format!("{}.json", zone.key())),
                sample_payload(*zone, &ids).to_string(),
            )
            .unwrap();
        }

        let cache = ZoneCache::load_dir(temp_dir.path()).await;
        assert!(cache.is_ready());
        assert_eq!(cache.record_count(Zone::Sb), 1);
        assert_eq!(cache.record_count(Zone::Mpk), 7);
    }

    #[tokio::test]
    async fn test_load_dir_missing_file_fails_cache() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("sb.json"),
            sample_payload(Zone::Sb, &[1]).to_string(),
        )
        .unwrap();

        let cache = ZoneCache::load_dir(temp_dir.path()).await;
        assert!(matches!(cache.state(), CacheState::Failed(_)));
        assert!(cache.records(Zone::Sb).is_err());
    }

    #[cfg(feature = "http")]
    mod fetch {
        use super::*;
        use crate::test_support::StubServer;

        fn zone_for_path(path: &str) -> Option<Zone> {
            let key = path.trim_matches('/');
            ALL_ZONES.iter().copied().find(|zone| zone.key() == key)
        }

        #[tokio::test]
        async fn test_fetch_all_requests_every_zone_path() {
            let server = StubServer::start(|request| match zone_for_path(&request.path) {
                Some(zone) => (200, sample_payload(zone, &[1, 2]).to_string()),
                None => (404, "{}".to_string()),
            })
            .await;

            let cache = ZoneCache::fetch_all(&reqwest::Client::new(), server.base_url()).await;
            assert!(cache.is_ready());
            assert_eq!(cache.total_records(), 14);

            let mut paths = server.paths();
            paths.sort();
            let mut expected: Vec<String> =
                ALL_ZONES.iter().map(|zone| format!("/{}/", zone.key())).collect();
            expected.sort();
            assert_eq!(paths, expected);
            assert!(server.requests().iter().all(|r| r.method == "GET"));
        }

        #[tokio::test]
        async fn test_fetch_all_error_status_fails_cache() {
            let server = StubServer::start(|request| match zone_for_path(&request.path) {
                Some(Zone::Mpv) => (503, "{}".to_string()),
                Some(zone) => (200, sample_payload(zone, &[1]).to_string()),
                None => (404, "{}".to_string()),
            })
            .await;

            let cache = ZoneCache::fetch_all(&reqwest::Client::new(), server.base_url()).await;
            assert!(matches!(cache.state(), CacheState::Failed(_)));
            assert!(matches!(
                cache.records(Zone::Sb),
                Err(CropwatchError::UpstreamUnavailable { .. })
            ));
        }

        #[tokio::test]
        async fn test_fetch_all_missing_array_reads_as_empty_zone() {
            let server = StubServer::start(|request| match zone_for_path(&request.path) {
                Some(Zone::Mks) => (200, json!({ "unexpected": [] }).to_string()),
                Some(zone) => (200, sample_payload(zone, &[1]).to_string()),
                None => (404, "{}".to_string()),
            })
            .await;

            let cache = ZoneCache::fetch_all(&reqwest::Client::new(), server.base_url()).await;
            assert!(cache.is_ready());
            assert!(cache.records(Zone::Mks).unwrap().is_empty());
            assert_eq!(cache.record_count(Zone::Sb), 1);
        }
    }
}
