//! Application constants for the cropwatch pipeline
//!
//! Static lookup tables for zones and growth periods, pipeline defaults,
//! and the upstream endpoint layout.

use crate::models::{Attribute, GrowthPeriod, Zone};

// =============================================================================
// Zones and Growth Periods
// =============================================================================

/// Every tracked zone, in sidebar order
pub const ALL_ZONES: [Zone; 7] = [
    Zone::Sb,
    Zone::Mac,
    Zone::Mks,
    Zone::Mpdc,
    Zone::Mpl,
    Zone::Mpv,
    Zone::Mpk,
];

/// Every growth period, in calendar order
pub const ALL_PERIODS: [GrowthPeriod; 4] = [
    GrowthPeriod::Emergence,
    GrowthPeriod::Tillering,
    GrowthPeriod::StemElongation,
    GrowthPeriod::Maturity,
];

/// Every comparable attribute, in display order
pub const ALL_ATTRIBUTES: [Attribute; 5] = [
    Attribute::Ndvi,
    Attribute::Ndwi,
    Attribute::Gli,
    Attribute::Precipitation,
    Attribute::SoilMoisture,
];

// =============================================================================
// Pipeline Defaults
// =============================================================================

/// Records classified per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 80_000;

/// Pause between chunks in milliseconds
pub const DEFAULT_CHUNK_PAUSE_MS: u64 = 50;

/// Zone selected when nothing else is configured
pub const DEFAULT_ZONE: Zone = Zone::Sb;

/// Growth period selected when nothing else is configured
pub const DEFAULT_PERIOD: GrowthPeriod = GrowthPeriod::Tillering;

/// Year selected when nothing else is configured
pub const DEFAULT_YEAR: i32 = 2023;

/// Value that marks a precipitation or soil moisture reading as missing
pub const SENTINEL_ZERO: f64 = 0.0;

// =============================================================================
// Upstream Layout
// =============================================================================

/// Path of the active standard profile collection
pub const STANDARD_PATH: &str = "standard";

/// Path of the default standard profile collection
pub const STANDARD_DEFAULT_PATH: &str = "standarddefault";

/// Array field carrying active profiles
pub const STANDARD_ENTITIES_FIELD: &str = "standard_entities";

/// Array field carrying default profiles
pub const STANDARD_DEFAULT_ENTITIES_FIELD: &str = "standarddefault_entities";

/// File name of the active profile payload in a JSON-file store
pub const STANDARD_FILE_NAME: &str = "standard.json";

/// File name of the default profile payload in a JSON-file store
pub const STANDARD_DEFAULT_FILE_NAME: &str = "standarddefault.json";

// =============================================================================
// Configuration
// =============================================================================

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "cropwatch";

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable overriding the upstream base URL
pub const ENV_BASE_URL: &str = "CROPWATCH_BASE_URL";

/// Environment variable overriding the zone payload directory
pub const ENV_DATA_DIR: &str = "CROPWATCH_DATA_DIR";

/// Environment variable overriding the chunk size
pub const ENV_CHUNK_SIZE: &str = "CROPWATCH_CHUNK_SIZE";
