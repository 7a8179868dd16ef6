//! Represents the destination key of a single upload.

use std::{fmt, ops::Range};

/// Range the random disambiguator is drawn from (upper bound exclusive).
pub const RANDOM_ID_RANGE: Range<u32> = 100_000_000..999_999_999;

/// A fully composed object key.
///
/// Computed fresh for every upload and never reused. Uniqueness within a time
/// partition relies on `random_id` alone, so two uploads may collide with a
/// small probability.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    /// The complete key, e.g. `logs/year=2024/.../otel-trace_123456789.json.gz`.
    key: String,

    /// Random component embedded after the metadata.
    random_id: u32,
}

impl ObjectKey {
    pub(crate) fn new(key: String, random_id: u32) -> Self {
        Self { key, random_id }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn random_id(&self) -> u32 {
        self.random_id
    }

    pub fn into_string(self) -> String {
        self.key
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
