//! Threshold classification of records against a standard profile

use crate::models::{AttributeSelection, ClassifiedRecord, Outcome, Record, StandardProfile};

/// Classify one record against a profile over the selected attributes.
///
/// A missing profile or an empty selection is indeterminate. Any attribute
/// below its threshold makes the record `Below`, even when others exceed
/// theirs. Values the record does not carry compare as neither greater nor
/// less.
pub fn classify(
    record: &Record,
    profile: Option<&StandardProfile>,
    attributes: &AttributeSelection,
) -> Outcome {
    let Some(profile) = profile else {
        return Outcome::Indeterminate;
    };
    if attributes.is_empty() {
        return Outcome::Indeterminate;
    }

    let mut has_greater = false;
    let mut has_less = false;

    for attr in attributes.iter() {
        let Some(value) = record.value(attr) else {
            continue;
        };
        let threshold = profile.threshold(attr);
        if value > threshold {
            has_greater = true;
        } else if value < threshold {
            has_less = true;
        }
    }

    if has_less {
        Outcome::Below
    } else if has_greater {
        Outcome::Exceeds
    } else {
        Outcome::Matches
    }
}

/// Classify a slice, preserving input order
pub fn classify_all(
    records: &[Record],
    profile: Option<&StandardProfile>,
    attributes: &AttributeSelection,
) -> Vec<ClassifiedRecord> {
    records
        .iter()
        .map(|record| ClassifiedRecord {
            outcome: classify(record, profile, attributes),
            record: record.clone(),
        })
        .collect()
}
