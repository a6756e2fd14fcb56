//! Cropwatch Library
//!
//! A Rust library for classifying farm zone observations against per-growth-period
//! standard thresholds.
//!
//! This library provides tools for:
//! - Holding per-zone observation records fetched from the upstream cache
//! - Filtering records to a growth period window of one year
//! - Averaging the measured attributes of a filtered record set
//! - Classifying records as exceeding, below or matching a standard profile
//! - Running classification in cooperative chunks that newer runs can supersede
//! - Fetching, editing and resetting the standard profiles

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod registry;

#[cfg(all(test, feature = "http"))]
pub(crate) mod test_support;

// Re-export commonly used types
pub use cache::{CacheState, ZoneCache};
pub use config::MonitorConfig;
pub use error::{CropwatchError, Result};
pub use models::{
    Attribute, AttributeSelection, ClassifiedRecord, GrowthPeriod, Outcome, OutcomeTally, Record,
    StandardProfile, Zone,
};
pub use pipeline::{
    BatchRun, BatchSummary, ChunkResult, IncrementalBatcher, PipelineRun, ProfileStatus,
    ZoneMonitor,
};
pub use registry::{StandardRegistry, StandardStore};
