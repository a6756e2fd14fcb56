//! Core data structures and types for zone classification.
//!
//! Defines zones, growth periods, attributes, observation records, standard
//! profiles, outcomes and tallies used throughout the library. Wire field
//! names follow the upstream JSON payloads.

use crate::constants::ALL_ATTRIBUTES;
use crate::error::CropwatchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Farm zones tracked by the upstream cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Sb,
    Mac,
    Mks,
    Mpdc,
    Mpl,
    Mpv,
    Mpk,
}

impl Zone {
    /// Lowercase key used for endpoints and payload files
    pub fn key(&self) -> &'static str {
        match self {
            Zone::Sb => "sb",
            Zone::Mac => "mac",
            Zone::Mks => "mks",
            Zone::Mpdc => "mpdc",
            Zone::Mpl => "mpl",
            Zone::Mpv => "mpv",
            Zone::Mpk => "mpk",
        }
    }

    /// Name of the array field carrying this zone's records in a payload
    pub fn entities_field(&self) -> &'static str {
        match self {
            Zone::Sb => "sb_entities",
            Zone::Mac => "mac_entities",
            Zone::Mks => "mks_entities",
            Zone::Mpdc => "mpdc_entities",
            Zone::Mpl => "mpl_entities",
            Zone::Mpv => "mpv_entities",
            Zone::Mpk => "mpk_entities",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Zone::Sb => "SB",
            Zone::Mac => "MAC",
            Zone::Mks => "MKS",
            Zone::Mpdc => "MPDC",
            Zone::Mpl => "MPL",
            Zone::Mpv => "MPV",
            Zone::Mpk => "MPK",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Zone {
    type Err = CropwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = crate::pipeline::normalize::normalize_label(s);
        crate::constants::ALL_ZONES
            .into_iter()
            .find(|zone| zone.key() == key)
            .ok_or_else(|| CropwatchError::invalid_selection(format!("unknown zone '{s}'")))
    }
}

/// Crop growth stages, each bound to a fixed calendar window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GrowthPeriod {
    Emergence,
    Tillering,
    StemElongation,
    Maturity,
}

impl GrowthPeriod {
    /// Name used as the standard profile lookup key
    pub fn name(&self) -> &'static str {
        match self {
            GrowthPeriod::Emergence => "Emergence",
            GrowthPeriod::Tillering => "Tillering",
            GrowthPeriod::StemElongation => "StemElongation",
            GrowthPeriod::Maturity => "Maturity",
        }
    }

    /// Inclusive (start_month, end_month) window. No period covers May.
    pub fn window(&self) -> (u32, u32) {
        match self {
            GrowthPeriod::Emergence => (1, 2),
            GrowthPeriod::Tillering => (3, 4),
            GrowthPeriod::StemElongation => (6, 9),
            GrowthPeriod::Maturity => (10, 12),
        }
    }

    pub fn contains_month(&self, month: u32) -> bool {
        let (start, end) = self.window();
        (start..=end).contains(&month)
    }

    /// Human readable label with the month range
    pub fn describe(&self) -> &'static str {
        match self {
            GrowthPeriod::Emergence => "Emergence (Jan-Feb)",
            GrowthPeriod::Tillering => "Tillering (Mar-Apr)",
            GrowthPeriod::StemElongation => "Stem Elongation (Jun-Sep)",
            GrowthPeriod::Maturity => "Maturity (Oct-Dec)",
        }
    }
}

impl fmt::Display for GrowthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GrowthPeriod {
    type Err = CropwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = crate::pipeline::normalize::normalize_label(s);
        crate::constants::ALL_PERIODS
            .into_iter()
            .find(|period| crate::pipeline::normalize::normalize_label(period.name()) == key)
            .ok_or_else(|| {
                CropwatchError::invalid_selection(format!("unknown growth period '{s}'"))
            })
    }
}

/// Measured attributes that can be compared against a standard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    #[serde(rename = "NDVI")]
    Ndvi,
    #[serde(rename = "NDWI")]
    Ndwi,
    #[serde(rename = "GLI")]
    Gli,
    #[serde(rename = "Precipitation")]
    Precipitation,
    #[serde(rename = "Soilmoiture")]
    SoilMoisture,
}

impl Attribute {
    /// Field name used in the upstream payloads
    pub fn wire_name(&self) -> &'static str {
        match self {
            Attribute::Ndvi => "NDVI",
            Attribute::Ndwi => "NDWI",
            Attribute::Gli => "GLI",
            Attribute::Precipitation => "Precipitation",
            Attribute::SoilMoisture => "Soilmoiture",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Attribute::SoilMoisture => "Soil Moisture",
            other => other.wire_name(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Attribute {
    type Err = CropwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match crate::pipeline::normalize::normalize_label(s).as_str() {
            "ndvi" => Ok(Attribute::Ndvi),
            "ndwi" => Ok(Attribute::Ndwi),
            "gli" => Ok(Attribute::Gli),
            "precipitation" => Ok(Attribute::Precipitation),
            "soilmoiture" | "soilmoisture" => Ok(Attribute::SoilMoisture),
            _ => Err(CropwatchError::invalid_selection(format!(
                "unknown attribute '{s}'"
            ))),
        }
    }
}

/// Set of attributes a comparison is evaluated over
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSelection(BTreeSet<Attribute>);

impl AttributeSelection {
    /// All five attributes
    pub fn all() -> Self {
        Self(ALL_ATTRIBUTES.into_iter().collect())
    }

    /// No attributes; every comparison becomes indeterminate
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, attribute: Attribute) -> bool {
        self.0.contains(&attribute)
    }

    pub fn insert(&mut self, attribute: Attribute) -> bool {
        self.0.insert(attribute)
    }

    pub fn remove(&mut self, attribute: Attribute) -> bool {
        self.0.remove(&attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_all(&self) -> bool {
        self.0.len() == ALL_ATTRIBUTES.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Attribute> for AttributeSelection {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for AttributeSelection {
    type Err = CropwatchError;

    /// Parse a comma separated list; `all` and `none` are accepted as shorthands
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::none());
        }
        trimmed
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse::<Attribute>)
            .collect()
    }
}

impl fmt::Display for AttributeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(|attr| attr.wire_name()).collect();
        f.write_str(&names.join(","))
    }
}

/// Geographic coordinate of an observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// One observation from the zone cache (`GeneralEntity` upstream)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "NDVI", default)]
    pub ndvi: Option<f64>,
    #[serde(rename = "NDWI", default)]
    pub ndwi: Option<f64>,
    #[serde(rename = "GLI", default)]
    pub gli: Option<f64>,
    #[serde(rename = "Precipitation", default)]
    pub precipitation: Option<f64>,
    #[serde(rename = "Soilmoiture", alias = "SoilMoisture", default)]
    pub soil_moisture: Option<f64>,
    #[serde(rename = "Lat", default)]
    pub lat: f64,
    #[serde(rename = "Lon", default)]
    pub lon: f64,
    #[serde(rename = "GeoWGS84", default, skip_serializing_if = "Option::is_none")]
    pub geo_wgs84: Option<String>,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "StandardZone", default)]
    pub zone_tag: String,
}

impl Record {
    /// Value of an attribute, `None` when the payload did not carry it
    pub fn value(&self, attribute: Attribute) -> Option<f64> {
        match attribute {
            Attribute::Ndvi => self.ndvi,
            Attribute::Ndwi => self.ndwi,
            Attribute::Gli => self.gli,
            Attribute::Precipitation => self.precipitation,
            Attribute::SoilMoisture => self.soil_moisture,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Per-period threshold values (`StandardEntity` upstream)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardProfile {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "NDVI")]
    pub ndvi: f64,
    #[serde(rename = "NDWI")]
    pub ndwi: f64,
    #[serde(rename = "GLI")]
    pub gli: f64,
    #[serde(rename = "Precipitation")]
    pub precipitation: f64,
    #[serde(rename = "Soilmoiture", alias = "SoilMoisture")]
    pub soil_moisture: f64,
    /// Period key of an active profile
    #[serde(rename = "StandardZone", default)]
    pub standard_zone: String,
    /// Period key of a default profile
    #[serde(
        rename = "StandardDefaultZone",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub standard_default_zone: Option<String>,
    #[serde(
        rename = "StandardRange",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub standard_range: Option<String>,
}

impl StandardProfile {
    pub fn threshold(&self, attribute: Attribute) -> f64 {
        match attribute {
            Attribute::Ndvi => self.ndvi,
            Attribute::Ndwi => self.ndwi,
            Attribute::Gli => self.gli,
            Attribute::Precipitation => self.precipitation,
            Attribute::SoilMoisture => self.soil_moisture,
        }
    }

    pub fn set_threshold(&mut self, attribute: Attribute, value: f64) {
        match attribute {
            Attribute::Ndvi => self.ndvi = value,
            Attribute::Ndwi => self.ndwi = value,
            Attribute::Gli => self.gli = value,
            Attribute::Precipitation => self.precipitation = value,
            Attribute::SoilMoisture => self.soil_moisture = value,
        }
    }

    /// Period key to match against, depending on which collection the profile came from
    pub fn period_key(&self, source: ProfileSource) -> &str {
        match source {
            ProfileSource::Active => &self.standard_zone,
            ProfileSource::Default => self
                .standard_default_zone
                .as_deref()
                .unwrap_or(&self.standard_zone),
        }
    }
}

/// Which profile collection a profile was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    Active,
    Default,
}

/// Body of a profile write: five thresholds plus the period key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(rename = "NDVI")]
    pub ndvi: f64,
    #[serde(rename = "NDWI")]
    pub ndwi: f64,
    #[serde(rename = "GLI")]
    pub gli: f64,
    #[serde(rename = "Precipitation")]
    pub precipitation: f64,
    #[serde(rename = "Soilmoiture")]
    pub soil_moisture: f64,
    #[serde(rename = "StandardZone")]
    pub standard_zone: String,
}

impl ProfilePatch {
    /// Patch carrying a profile's own values and key
    pub fn from_profile(profile: &StandardProfile, source: ProfileSource) -> Self {
        Self {
            ndvi: profile.ndvi,
            ndwi: profile.ndwi,
            gli: profile.gli,
            precipitation: profile.precipitation,
            soil_moisture: profile.soil_moisture,
            standard_zone: profile.period_key(source).to_string(),
        }
    }

    /// Apply this patch onto a stored profile
    pub fn apply_to(&self, profile: &mut StandardProfile) {
        profile.ndvi = self.ndvi;
        profile.ndwi = self.ndwi;
        profile.gli = self.gli;
        profile.precipitation = self.precipitation;
        profile.soil_moisture = self.soil_moisture;
        profile.standard_zone = self.standard_zone.clone();
    }
}

/// Result of comparing a record against a standard profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Exceeds,
    Below,
    Matches,
    Indeterminate,
}

impl Outcome {
    pub fn marker_color(&self) -> MarkerColor {
        match self {
            Outcome::Below => MarkerColor::Red,
            Outcome::Exceeds => MarkerColor::Green,
            Outcome::Matches => MarkerColor::Yellow,
            Outcome::Indeterminate => MarkerColor::Grey,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::Exceeds => "exceeds",
            Outcome::Below => "below",
            Outcome::Matches => "matches",
            Outcome::Indeterminate => "indeterminate",
        };
        f.write_str(name)
    }
}

/// Marker colour a consumer uses for an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Red,
    Green,
    Yellow,
    Grey,
}

impl fmt::Display for MarkerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarkerColor::Red => "red",
            MarkerColor::Green => "green",
            MarkerColor::Yellow => "yellow",
            MarkerColor::Grey => "grey",
        };
        f.write_str(name)
    }
}

/// A record paired with its classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub record: Record,
    pub outcome: Outcome,
}

impl ClassifiedRecord {
    pub fn marker_color(&self) -> MarkerColor {
        self.outcome.marker_color()
    }
}

/// Outcome counts over a classified record set
///
/// Indeterminate is not counted directly; it is whatever part of `total`
/// the other three counters do not account for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub exceeds: usize,
    pub below: usize,
    pub matches: usize,
    pub total: usize,
}

impl OutcomeTally {
    /// Tally with no classified outcomes over `total` records
    pub fn unclassified(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Exceeds => self.exceeds += 1,
            Outcome::Below => self.below += 1,
            Outcome::Matches => self.matches += 1,
            Outcome::Indeterminate => {}
        }
        self.total += 1;
    }

    pub fn indeterminate(&self) -> usize {
        self.total
            .saturating_sub(self.exceeds + self.below + self.matches)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Exceeds => self.exceeds,
            Outcome::Below => self.below,
            Outcome::Matches => self.matches,
            Outcome::Indeterminate => self.indeterminate(),
        }
    }

    /// Share of an outcome among the classified (non-indeterminate) records.
    ///
    /// Returns `None` when nothing was classified.
    pub fn percentage(&self, outcome: Outcome) -> Option<f64> {
        let classified = self.exceeds + self.below + self.matches;
        if classified == 0 {
            None
        } else {
            Some(self.count(outcome) as f64 / classified as f64 * 100.0)
        }
    }

    pub fn summary(&self) -> String {
        let pct = |outcome| {
            self.percentage(outcome)
                .map(|p| format!("{p:.2}%"))
                .unwrap_or_else(|| "undefined".to_string())
        };
        format!(
            "{} records | exceeds {} ({}) | below {} ({}) | matches {} ({}) | indeterminate {}",
            self.total,
            self.exceeds,
            pct(Outcome::Exceeds),
            self.below,
            pct(Outcome::Below),
            self.matches,
            pct(Outcome::Matches),
            self.indeterminate()
        )
    }
}
