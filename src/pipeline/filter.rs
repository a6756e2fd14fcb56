//! Growth period filtering for zone records
//!
//! Restricts a zone's records to one growth period of one year and drops
//! records whose precipitation or soil moisture carries the sentinel zero
//! that upstream uses for a missing reading.

use crate::constants::SENTINEL_ZERO;
use crate::models::{GrowthPeriod, Record};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use tracing::{debug, trace};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Why a record was left out of a period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    UnparseableDate,
    WrongYear,
    OutsideWindow,
    SentinelReading,
}

/// Parse the calendar date of an observation
///
/// Accepts plain dates, naive date-times and RFC 3339 timestamps. For
/// timestamps carrying an offset the date is taken as written.
pub fn parse_observation_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|timestamp| timestamp.date())
        })
}

fn is_sentinel(value: Option<f64>) -> bool {
    value == Some(SENTINEL_ZERO)
}

/// Check a record against a period and year, returning the first reason it fails
pub fn check_record(record: &Record, period: GrowthPeriod, year: i32) -> Result<(), Exclusion> {
    let date = parse_observation_date(&record.date).ok_or(Exclusion::UnparseableDate)?;

    if date.year() != year {
        return Err(Exclusion::WrongYear);
    }

    if !period.contains_month(date.month()) {
        return Err(Exclusion::OutsideWindow);
    }

    if is_sentinel(record.precipitation) || is_sentinel(record.soil_moisture) {
        return Err(Exclusion::SentinelReading);
    }

    Ok(())
}

/// True if a record belongs to the period of the given year
pub fn passes_period_filter(record: &Record, period: GrowthPeriod, year: i32) -> bool {
    match check_record(record, period, year) {
        Ok(()) => true,
        Err(reason) => {
            trace!("Record {} excluded from {period} {year}: {reason:?}", record.id);
            false
        }
    }
}

/// Records of `period` in `year`, in source order
pub fn filter_by_period(records: &[Record], period: GrowthPeriod, year: i32) -> Vec<Record> {
    let filtered: Vec<Record> = records
        .iter()
        .filter(|record| passes_period_filter(record, period, year))
        .cloned()
        .collect();

    debug!(
        "Filtered data count for {} in {}: {} of {}",
        period,
        year,
        filtered.len(),
        records.len()
    );

    filtered
}

/// Borrowing variant of [`filter_by_period`]
pub fn filter_refs(records: &[Record], period: GrowthPeriod, year: i32) -> Vec<&Record> {
    records
        .iter()
        .filter(|record| passes_period_filter(record, period, year))
        .collect()
}

/// Breakdown of why records were kept or dropped for a period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodFilterStats {
    pub total: usize,
    pub retained: usize,
    pub unparseable_date: usize,
    pub wrong_year: usize,
    pub outside_window: usize,
    pub sentinel: usize,
}

impl PeriodFilterStats {
    pub fn excluded(&self) -> usize {
        self.total - self.retained
    }

    fn tally(&mut self, check: Result<(), Exclusion>) {
        match check {
            Ok(()) => self.retained += 1,
            Err(Exclusion::UnparseableDate) => self.unparseable_date += 1,
            Err(Exclusion::WrongYear) => self.wrong_year += 1,
            Err(Exclusion::OutsideWindow) => self.outside_window += 1,
            Err(Exclusion::SentinelReading) => self.sentinel += 1,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} -> {} records | wrong year: {} | outside window: {} | sentinel: {} | bad date: {}",
            self.total,
            self.retained,
            self.wrong_year,
            self.outside_window,
            self.sentinel,
            self.unparseable_date
        )
    }
}

/// Count retained and excluded records without materializing the filtered set
pub fn get_period_filter_stats(
    records: &[Record],
    period: GrowthPeriod,
    year: i32,
) -> PeriodFilterStats {
    let mut stats = PeriodFilterStats {
        total: records.len(),
        ..Default::default()
    };
    for record in records {
        stats.tally(check_record(record, period, year));
    }
    stats
}

/// Filter and count in one pass over `records`, checking each record once
pub fn filter_with_stats(
    records: &[Record],
    period: GrowthPeriod,
    year: i32,
) -> (Vec<Record>, PeriodFilterStats) {
    let mut stats = PeriodFilterStats {
        total: records.len(),
        ..Default::default()
    };

    let filtered: Vec<Record> = records
        .iter()
        .filter(|record| {
            let check = check_record(record, period, year);
            stats.tally(check);
            check.is_ok()
        })
        .cloned()
        .collect();

    debug!("Filtered {} {}: {}", period, year, stats.summary());
    (filtered, stats)
}
