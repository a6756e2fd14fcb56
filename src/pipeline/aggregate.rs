//! Per-attribute averages over a filtered record set

use crate::models::{Attribute, AttributeSelection, Record};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Arithmetic mean of each requested attribute.
///
/// Records that do not carry an attribute do not count towards its mean.
/// An empty input, or an attribute absent on every record, yields NaN for
/// that attribute; use [`AttributeAverages::get`] to read it as undefined.
pub fn average(records: &[Record], attributes: &AttributeSelection) -> BTreeMap<Attribute, f64> {
    average_iter(records.iter(), attributes)
}

/// [`average`] over any iterator of borrowed records
pub fn average_iter<'a, I>(records: I, attributes: &AttributeSelection) -> BTreeMap<Attribute, f64>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut sums: BTreeMap<Attribute, (f64, usize)> =
        attributes.iter().map(|attr| (attr, (0.0, 0))).collect();

    for record in records {
        for (attr, (sum, count)) in sums.iter_mut() {
            if let Some(value) = record.value(*attr) {
                *sum += value;
                *count += 1;
            }
        }
    }

    sums.into_iter()
        .map(|(attr, (sum, count))| (attr, sum / count as f64))
        .collect()
}

/// Averages with NaN surfaced as undefined
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributeAverages {
    values: BTreeMap<Attribute, f64>,
}

impl AttributeAverages {
    pub fn compute(records: &[Record], attributes: &AttributeSelection) -> Self {
        Self::from_values(average(records, attributes))
    }

    pub fn from_values(values: BTreeMap<Attribute, f64>) -> Self {
        debug!("Averages: {:?}", values);
        Self { values }
    }

    /// Mean of an attribute, `None` if it was not requested or is undefined
    pub fn get(&self, attribute: Attribute) -> Option<f64> {
        self.values
            .get(&attribute)
            .copied()
            .filter(|value| !value.is_nan())
    }

    /// Raw value including NaN, `None` only if the attribute was not requested
    pub fn raw(&self, attribute: Attribute) -> Option<f64> {
        self.values.get(&attribute).copied()
    }

    pub fn attributes(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.values.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for AttributeAverages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .attributes()
            .map(|attr| match self.get(attr) {
                Some(value) => format!("{}={:.4}", attr.wire_name(), value),
                None => format!("{}=undefined", attr.wire_name()),
            })
            .collect();
        f.write_str(&parts.join(" "))
    }
}
