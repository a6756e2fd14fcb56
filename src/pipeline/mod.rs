//! Zone classification pipeline
//!
//! One pipeline cycle takes the records of the selected zone, keeps those of
//! the selected growth period and year, computes attribute averages, resolves
//! the standard profile for the period and starts a chunked classification
//! run. [`ZoneMonitor`] owns the selection and the run generation, so every
//! selection change makes in-flight runs stale.

pub mod aggregate;
pub mod batcher;
pub mod classify;
pub mod filter;
pub mod normalize;

#[cfg(test)]
pub mod tests;

pub use aggregate::{AttributeAverages, average};
pub use batcher::{
    BatchRun, BatchSummary, ChunkResult, IncrementalBatcher, RunGeneration, RunTicket,
};
pub use classify::{classify, classify_all};
pub use filter::{PeriodFilterStats, filter_by_period, filter_with_stats, get_period_filter_stats};
pub use normalize::normalize_label;

use crate::cache::ZoneCache;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::models::{Attribute, AttributeSelection, GrowthPeriod, StandardProfile, Zone};
use crate::registry::StandardRegistry;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Current zone, period, year and attribute selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub zone: Zone,
    pub period: GrowthPeriod,
    pub year: i32,
    pub attributes: AttributeSelection,
}

impl Selection {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            zone: config.zone,
            period: config.period,
            year: config.year,
            attributes: config.attributes.clone(),
        }
    }
}

/// Whether a standard profile exists for the selected period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Resolved,
    /// No profile for the period; every record is indeterminate
    Missing,
}

/// Everything one pipeline cycle produced up front, plus the running batch
#[derive(Debug)]
pub struct PipelineRun {
    pub selection: Selection,
    pub filter_stats: PeriodFilterStats,
    pub averages: AttributeAverages,
    pub profile: Option<StandardProfile>,
    pub status: ProfileStatus,
    pub batch: BatchRun,
}

impl PipelineRun {
    /// Number of records that passed the period filter
    pub fn filtered_count(&self) -> usize {
        self.filter_stats.retained
    }
}

/// Orchestrates pipeline cycles for one consumer
#[derive(Debug)]
pub struct ZoneMonitor {
    selection: Selection,
    batcher: IncrementalBatcher,
    generation: RunGeneration,
}

impl ZoneMonitor {
    pub fn new(selection: Selection, batcher: IncrementalBatcher) -> Self {
        Self {
            selection,
            batcher,
            generation: RunGeneration::new(),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        Ok(Self::new(
            Selection::from_config(config),
            IncrementalBatcher::from_config(config)?,
        ))
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn generation(&self) -> &RunGeneration {
        &self.generation
    }

    pub fn select_zone(&mut self, zone: Zone) {
        if self.selection.zone != zone {
            self.selection.zone = zone;
            self.generation.invalidate();
        }
    }

    pub fn select_period(&mut self, period: GrowthPeriod) {
        if self.selection.period != period {
            self.selection.period = period;
            self.generation.invalidate();
        }
    }

    pub fn select_year(&mut self, year: i32) {
        if self.selection.year != year {
            self.selection.year = year;
            self.generation.invalidate();
        }
    }

    pub fn set_attributes(&mut self, attributes: AttributeSelection) {
        if self.selection.attributes != attributes {
            self.selection.attributes = attributes;
            self.generation.invalidate();
        }
    }

    /// Add or remove one attribute from the selection
    pub fn toggle_attribute(&mut self, attribute: Attribute) {
        if !self.selection.attributes.remove(attribute) {
            self.selection.attributes.insert(attribute);
        }
        self.generation.invalidate();
    }

    /// Averages of the selected attributes over the selected zone, period and year
    pub fn averages(&self, cache: &ZoneCache) -> Result<AttributeAverages> {
        let records = cache.records(self.selection.zone)?;
        let filtered = filter::filter_refs(records, self.selection.period, self.selection.year);
        let values = aggregate::average_iter(filtered, &self.selection.attributes);
        Ok(AttributeAverages::from_values(values))
    }

    /// Start one pipeline cycle for the current selection.
    ///
    /// Fails without filtering anything if the zone cache is not ready or
    /// no standard profiles have been fetched. A period without a profile is
    /// not an error: the run reports [`ProfileStatus::Missing`] and delivers
    /// no chunks.
    pub fn run(&self, cache: &ZoneCache, registry: &StandardRegistry) -> Result<PipelineRun> {
        let records = cache.records(self.selection.zone)?;
        registry.ensure_loaded()?;

        let Selection {
            zone,
            period,
            year,
            ..
        } = self.selection;
        let ticket = self.generation.advance();

        let (filtered, filter_stats) = filter::filter_with_stats(records, period, year);
        let averages = AttributeAverages::compute(&filtered, &self.selection.attributes);

        let profile = registry.resolve(period).cloned();
        let status = match profile {
            Some(_) => ProfileStatus::Resolved,
            None => {
                warn!("No standard profile for {} (zone {}, {})", period, zone, year);
                ProfileStatus::Missing
            }
        };

        info!(
            "Pipeline run {} for {} {} {}: {}",
            ticket.id(),
            zone,
            period,
            year,
            filter_stats.summary()
        );
        debug!("Attributes: {}", self.selection.attributes);

        let batch = self.batcher.run(
            filtered,
            profile.clone(),
            self.selection.attributes.clone(),
            ticket,
        );

        Ok(PipelineRun {
            selection: self.selection.clone(),
            filter_stats,
            averages,
            profile,
            status,
            batch,
        })
    }
}
