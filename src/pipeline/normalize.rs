//! Label normalization for period and zone keys.
//!
//! Upstream profile keys arrive with stray whitespace and mixed case
//! ("Stem Elongation", "tillering "), so every key comparison goes through
//! [`normalize_label`].

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Strip all whitespace and case-fold a label
pub fn normalize_label(label: &str) -> String {
    WHITESPACE.replace_all(label, "").to_lowercase()
}

/// Normalize an optional label; a missing label normalizes to the empty string
pub fn normalize_optional(label: Option<&str>) -> String {
    label.map(normalize_label).unwrap_or_default()
}

/// Compare two labels after normalization
pub fn labels_match(left: &str, right: &str) -> bool {
    normalize_label(left) == normalize_label(right)
}
