//! Shared test utilities and fixtures for pipeline tests

use crate::models::{Record, StandardProfile};

pub mod monitor_tests;

/// Create a test record with every attribute set
pub fn create_test_record(id: i64, date: &str, ndvi: f64) -> Record {
    Record {
        id,
        ndvi: Some(ndvi),
        ndwi: Some(0.1),
        gli: Some(0.05),
        precipitation: Some(2.0),
        soil_moisture: Some(0.3),
        lat: 13.7,
        lon: 100.5,
        geo_wgs84: None,
        date: date.to_string(),
        zone_tag: "sb".to_string(),
    }
}

/// Create a profile whose thresholds equal the defaults of [`create_test_record`]
pub fn create_test_profile(period_key: &str, ndvi: f64) -> StandardProfile {
    StandardProfile {
        id: 1,
        ndvi,
        ndwi: 0.1,
        gli: 0.05,
        precipitation: 2.0,
        soil_moisture: 0.3,
        standard_zone: period_key.to_string(),
        standard_default_zone: None,
        standard_range: None,
    }
}

/// `count` records dated in March 2023 with NDVI cycling 0.3, 0.4, 0.5
pub fn create_march_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let ndvi = [0.3, 0.4, 0.5][i % 3];
            create_test_record(i as i64, &format!("2023-03-{:02}", i % 28 + 1), ndvi)
        })
        .collect()
}
