//! Accent and case insensitive text comparison.
//!
//! Names typed by users ("Pérez", "perez ", "PEREZ") must find the same
//! ledger rows. Every fuzzy name filter in the engine goes through
//! [`normalize`]; there is no similarity scoring, only containment after
//! normalization.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Lowercase, canonically decompose, drop combining marks, trim.
pub fn normalize(value: &str) -> String {
    let folded: String = value
        .to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect();
    folded.trim().to_string()
}

/// `true` when both values normalize to the same text.
pub fn matches(left: &str, right: &str) -> bool {
    normalize(left) == normalize(right)
}

/// `true` when `needle` is contained in `haystack` after normalization.
///
/// An empty needle matches everything; an empty haystack only matches an
/// empty needle.
pub fn includes(haystack: &str, needle: &str) -> bool {
    Needle::new(needle).found_in(haystack)
}

/// A search term normalized once and matched against many values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Needle(String);

impl Needle {
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn found_in(&self, haystack: &str) -> bool {
        if self.0.is_empty() {
            return true;
        }
        normalize(haystack).contains(self.0.as_str())
    }

    /// Same as [`Needle::found_in`], treating a missing value as empty.
    pub fn found_in_opt(&self, haystack: Option<&str>) -> bool {
        self.found_in(haystack.unwrap_or_default())
    }
}
