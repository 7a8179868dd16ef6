//! Partitioning and compression settings that shape object keys.

use serde::{Deserialize, Deserializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Time resolution used to group objects into `year=/month=/day=/hour=[/minute=]` folders.
///
/// Only `hour` is recognised explicitly. Every other value, including typos,
/// falls back to minute granularity rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partition {
    Hour,
    #[default]
    Minute,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Hour => "hour",
            Partition::Minute => "minute",
        }
    }
}

impl From<&str> for Partition {
    fn from(value: &str) -> Self {
        if value == "hour" {
            Partition::Hour
        } else {
            Partition::Minute
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Partition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Partition::from(raw.as_str()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported compression `{0}` (expected `none` or `gzip`)")]
pub struct UnknownCompression(pub String);

/// Payload compression applied before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
        }
    }

    /// Value stored as the object's `Content-Encoding`; empty when uncompressed.
    pub fn content_encoding(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => "gzip",
        }
    }

    /// Filename suffix appended after the format extension.
    pub fn key_suffix(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
        }
    }
}

impl FromStr for Compression {
    type Err = UnknownCompression;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            other => Err(UnknownCompression(other.to_string())),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Compression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_partition_falls_back_to_minute() {
        assert_eq!(Partition::from("hour"), Partition::Hour);
        assert_eq!(Partition::from("minute"), Partition::Minute);
        assert_eq!(Partition::from("day"), Partition::Minute);
        assert_eq!(Partition::from("HOUR"), Partition::Minute);
        assert_eq!(Partition::from(""), Partition::Minute);
    }

    #[test]
    fn partition_names() {
        assert_eq!(Partition::Hour.to_string(), "hour");
        assert_eq!(Partition::Minute.to_string(), "minute");
        assert_eq!(Partition::from(Partition::Hour.as_str()), Partition::Hour);
    }

    #[test]
    fn compression_parsing() {
        assert_eq!("gzip".parse::<Compression>(), Ok(Compression::Gzip));
        assert_eq!("none".parse::<Compression>(), Ok(Compression::None));
        assert_eq!("".parse::<Compression>(), Ok(Compression::None));
        assert_eq!(
            "zstd".parse::<Compression>(),
            Err(UnknownCompression("zstd".into()))
        );
    }

    #[test]
    fn content_encoding_marker() {
        assert_eq!(Compression::Gzip.content_encoding(), "gzip");
        assert_eq!(Compression::None.content_encoding(), "");
    }
}
