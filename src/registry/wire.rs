//! Decoding of standard profile payloads
//!
//! Active profiles arrive as `{"standard_entities": [...]}` and defaults as
//! `{"standarddefault_entities": [...]}`. A payload without its array is a
//! malformed response: it is logged and read as an empty collection.

use crate::constants::{STANDARD_DEFAULT_ENTITIES_FIELD, STANDARD_ENTITIES_FIELD};
use crate::models::{ProfileSource, StandardProfile};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Array field name for a profile collection
pub fn entities_field(source: ProfileSource) -> &'static str {
    match source {
        ProfileSource::Active => STANDARD_ENTITIES_FIELD,
        ProfileSource::Default => STANDARD_DEFAULT_ENTITIES_FIELD,
    }
}

/// Decode a profile collection payload
pub fn decode_profiles(source: ProfileSource, payload: &Value) -> Vec<StandardProfile> {
    let field = entities_field(source);
    let Some(entries) = payload.get(field).and_then(Value::as_array) else {
        warn!("Unexpected data format: missing '{}' array", field);
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match serde_json::from_value::<StandardProfile>(entry.clone()) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Skipping malformed standard profile in '{}': {}", field, e);
                None
            }
        })
        .inspect(|profile| {
            debug!("Decoded standard profile {} ({})", profile.id, profile.standard_zone)
        })
        .collect()
}

/// Encode a profile collection in the upstream payload shape
pub fn encode_profiles(source: ProfileSource, profiles: &[StandardProfile]) -> Value {
    json!({ entities_field(source): profiles })
}
