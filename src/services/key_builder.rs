//! Object key derivation.
//!
//! Keys have the layout
//! `<prefix>/year=YYYY/month=MM/day=DD/hour=HH[/minute=mm]/<file_prefix><metadata>_<random>[.<format>][.gz]`
//! and must stay byte-compatible with objects already written by other
//! exporters sharing the bucket.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use rand::Rng;

use crate::{
    config::S3UploaderConfig,
    models::{
        layout::{Compression, Partition},
        object_key::{ObjectKey, RANDOM_ID_RANGE},
    },
};

/// The configuration-derived half of a key: everything except time, metadata and format.
#[derive(Debug, Clone, Copy)]
pub struct KeyLayout<'a> {
    pub key_prefix: &'a str,
    pub partition: Partition,
    pub file_prefix: &'a str,
    pub compression: Compression,
}

impl<'a> KeyLayout<'a> {
    pub fn from_config(config: &'a S3UploaderConfig) -> Self {
        Self {
            key_prefix: &config.s3_prefix,
            partition: config.s3_partition,
            file_prefix: &config.file_prefix,
            compression: config.compression,
        }
    }

    /// Compose a key for `timestamp`, drawing the disambiguator from `rng`.
    pub fn build_key_with_rng<Tz, R>(
        &self,
        timestamp: &DateTime<Tz>,
        metadata: &str,
        file_format: &str,
        rng: &mut R,
    ) -> ObjectKey
    where
        Tz: TimeZone,
        R: Rng,
    {
        let time_key = time_partition(timestamp, self.partition);
        let random_id = rng.random_range(RANDOM_ID_RANGE);

        let mut key = format!(
            "{}/{}/{}{}_{}",
            self.key_prefix, time_key, self.file_prefix, metadata, random_id
        );
        if !file_format.is_empty() {
            key.push('.');
            key.push_str(file_format);
        }
        key.push_str(self.compression.key_suffix());

        ObjectKey::new(key, random_id)
    }
}

/// Compose a key using the thread-local generator.
pub fn build_key<Tz: TimeZone>(
    timestamp: &DateTime<Tz>,
    key_prefix: &str,
    partition: Partition,
    file_prefix: &str,
    metadata: &str,
    file_format: &str,
    compression: Compression,
) -> ObjectKey {
    KeyLayout {
        key_prefix,
        partition,
        file_prefix,
        compression,
    }
    .build_key_with_rng(timestamp, metadata, file_format, &mut rand::rng())
}

/// `year=YYYY/month=MM/day=DD/hour=HH`, plus `/minute=mm` unless partitioned by hour.
///
/// Fields are read in the timestamp's own offset. The year is not padded.
pub fn time_partition<Tz: TimeZone>(timestamp: &DateTime<Tz>, partition: Partition) -> String {
    let hourly = format!(
        "year={}/month={:02}/day={:02}/hour={:02}",
        timestamp.year(),
        timestamp.month(),
        timestamp.day(),
        timestamp.hour()
    );
    match partition {
        Partition::Hour => hourly,
        Partition::Minute => format!("{}/minute={:02}", hourly, timestamp.minute()),
    }
}
