//! Tests for the zone monitor pipeline cycle

use super::*;
use crate::cache::ZoneCache;
use crate::config::MonitorConfig;
use crate::error::CropwatchError;
use crate::models::{Attribute, AttributeSelection, GrowthPeriod, Outcome, Zone};
use crate::pipeline::{ProfileStatus, ZoneMonitor};
use crate::registry::{InMemoryStandardStore, StandardRegistry};
use std::collections::HashMap;
use std::sync::Arc;

fn create_test_cache() -> ZoneCache {
    let mut sb = create_march_records(9);
    sb.push(create_test_record(100, "2023-05-05", 0.9));
    sb.push(create_test_record(101, "2023-10-05", 0.9));
    let mac = vec![create_test_record(200, "2023-03-10", 0.1)];
    ZoneCache::from_records(HashMap::from([(Zone::Sb, sb), (Zone::Mac, mac)]))
}

async fn create_test_registry() -> StandardRegistry {
    let store = InMemoryStandardStore::new(
        vec![create_test_profile("Tillering", 0.4)],
        Vec::new(),
    );
    let mut registry = StandardRegistry::new(Arc::new(store));
    registry.fetch_active().await.unwrap();
    registry
}

fn create_test_monitor() -> ZoneMonitor {
    let config = MonitorConfig::default()
        .with_chunk_size(4)
        .with_chunk_pause_ms(0)
        .with_zone(Zone::Sb)
        .with_period(GrowthPeriod::Tillering)
        .with_year(2023)
        .with_attributes([Attribute::Ndvi].into_iter().collect());
    ZoneMonitor::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_run_filters_resolves_and_classifies() {
    let monitor = create_test_monitor();
    let registry = create_test_registry().await;
    let run = monitor.run(&create_test_cache(), &registry).unwrap();

    assert_eq!(run.status, ProfileStatus::Resolved);
    assert_eq!(run.filtered_count(), 9);
    assert_eq!(run.filter_stats.total, 11);
    assert!((run.averages.get(Attribute::Ndvi).unwrap() - 0.4).abs() < 1e-9);

    let summary = run.batch.drain().await;
    assert_eq!(summary.chunks_delivered, 3);
    assert_eq!(summary.tally.total, 9);
    assert_eq!(summary.tally.count(Outcome::Below), 3);
    assert_eq!(summary.tally.count(Outcome::Matches), 3);
    assert_eq!(summary.tally.count(Outcome::Exceeds), 3);
}

#[tokio::test]
async fn test_missing_profile_leaves_everything_indeterminate() {
    let mut monitor = create_test_monitor();
    monitor.select_period(GrowthPeriod::Maturity);
    let registry = create_test_registry().await;

    let run = monitor.run(&create_test_cache(), &registry).unwrap();
    assert_eq!(run.status, ProfileStatus::Missing);
    assert!(run.profile.is_none());

    let summary = run.batch.drain().await;
    assert_eq!(summary.chunks_delivered, 0);
    assert_eq!((summary.tally.exceeds, summary.tally.below, summary.tally.matches), (0, 0, 0));
    assert_eq!(summary.tally.indeterminate(), 1);
}

#[tokio::test]
async fn test_run_refuses_unready_upstream() {
    let monitor = create_test_monitor();
    let registry = create_test_registry().await;

    let loading = monitor.run(&ZoneCache::loading(), &registry).unwrap_err();
    assert!(matches!(loading, CropwatchError::NotReady { .. }));

    let failed = monitor.run(&ZoneCache::failed("HTTP 500"), &registry).unwrap_err();
    assert!(matches!(failed, CropwatchError::UpstreamUnavailable { .. }));

    let unfetched = StandardRegistry::new(Arc::new(InMemoryStandardStore::default()));
    let err = monitor.run(&create_test_cache(), &unfetched).unwrap_err();
    assert!(err.is_upstream_failure());
}

#[tokio::test]
async fn test_selection_change_supersedes_running_batch() {
    let mut monitor = create_test_monitor();
    let registry = create_test_registry().await;
    let cache = create_test_cache();

    let run = monitor.run(&cache, &registry).unwrap();
    assert!(run.batch.is_current());

    monitor.select_zone(Zone::Mac);
    assert!(!run.batch.is_current());
    let summary = run.batch.drain().await;
    assert_eq!(summary.chunks_delivered, 0);
    assert!(summary.superseded);

    let mac_run = monitor.run(&cache, &registry).unwrap();
    assert_eq!(mac_run.selection.zone, Zone::Mac);
    let summary = mac_run.batch.drain().await;
    assert_eq!(summary.tally.count(Outcome::Below), 1);
}

#[tokio::test]
async fn test_new_run_supersedes_previous_run() {
    let monitor = create_test_monitor();
    let registry = create_test_registry().await;
    let cache = create_test_cache();

    let first = monitor.run(&cache, &registry).unwrap();
    let second = monitor.run(&cache, &registry).unwrap();
    assert!(!first.batch.is_current());
    assert!(second.batch.is_current());
    assert!(second.batch.generation() > first.batch.generation());
}

#[test]
fn test_unchanged_selection_keeps_generation() {
    let mut monitor = create_test_monitor();
    let before = monitor.generation().current();
    monitor.select_zone(Zone::Sb);
    monitor.select_year(2023);
    monitor.set_attributes([Attribute::Ndvi].into_iter().collect());
    assert_eq!(monitor.generation().current(), before);

    monitor.toggle_attribute(Attribute::Gli);
    assert!(monitor.selection().attributes.contains(Attribute::Gli));
    assert!(monitor.generation().current() > before);
}

#[test]
fn test_averages_cover_only_selected_attributes() {
    let mut monitor = create_test_monitor();
    let averages = monitor.averages(&create_test_cache()).unwrap();
    let attrs: Vec<Attribute> = averages.attributes().collect();
    assert_eq!(attrs, vec![Attribute::Ndvi]);
    assert_eq!(averages.get(Attribute::Precipitation), None);

    monitor.set_attributes([Attribute::Precipitation, Attribute::Ndvi].into_iter().collect());
    let averages = monitor.averages(&create_test_cache()).unwrap();
    let attrs: Vec<Attribute> = averages.attributes().collect();
    assert_eq!(attrs, vec![Attribute::Ndvi, Attribute::Precipitation]);
    assert_eq!(averages.get(Attribute::Precipitation), Some(2.0));

    monitor.set_attributes(AttributeSelection::none());
    assert!(monitor.averages(&create_test_cache()).unwrap().is_empty());
}

#[tokio::test]
async fn test_run_averages_follow_attribute_selection() {
    let monitor = create_test_monitor();
    let registry = create_test_registry().await;
    let run = monitor.run(&create_test_cache(), &registry).unwrap();
    let attrs: Vec<Attribute> = run.averages.attributes().collect();
    assert_eq!(attrs, vec![Attribute::Ndvi]);
}
