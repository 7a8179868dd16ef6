use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;

use crate::{
    errors::ConfigError,
    models::layout::{Compression, Partition},
};

/// Uploader settings, read-only to the writer.
///
/// Field names match the `s3uploader` block of the collector configuration so
/// the struct can be deserialized from it directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct S3UploaderConfig {
    pub region: String,
    pub s3_bucket: String,
    pub s3_prefix: String,
    pub s3_partition: Partition,
    pub file_prefix: String,
    /// Role assumed through STS on top of the base credential chain.
    pub role_arn: String,
    /// Custom endpoint; the service default is used when empty.
    pub endpoint: String,
    pub s3_force_path_style: bool,
    pub disable_ssl: bool,
    pub compression: Compression,
}

impl Default for S3UploaderConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".into(),
            s3_bucket: String::new(),
            s3_prefix: String::new(),
            s3_partition: Partition::Minute,
            file_prefix: String::new(),
            role_arn: String::new(),
            endpoint: String::new(),
            s3_force_path_style: false,
            disable_ssl: false,
            compression: Compression::None,
        }
    }
}

impl S3UploaderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.s3_bucket.is_empty() {
            return Err(ConfigError::MissingBucket);
        }
        Ok(())
    }

    pub fn role_arn(&self) -> Option<&str> {
        (!self.role_arn.is_empty()).then_some(self.role_arn.as_str())
    }

    pub fn endpoint(&self) -> Option<&str> {
        (!self.endpoint.is_empty()).then_some(self.endpoint.as_str())
    }
}

/// Command-line + environment configuration for the `s3-writer` binary.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Upload a telemetry batch to an S3 bucket")]
pub struct Args {
    /// Payload file to upload, `-` reads stdin
    pub input: String,

    /// Target bucket (overrides S3_WRITER_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Bucket region (overrides S3_WRITER_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Key prefix (overrides S3_WRITER_PREFIX)
    #[arg(long)]
    pub prefix: Option<String>,

    /// File name prefix (overrides S3_WRITER_FILE_PREFIX)
    #[arg(long)]
    pub file_prefix: Option<String>,

    /// `hour` or `minute` (overrides S3_WRITER_PARTITION)
    #[arg(long)]
    pub partition: Option<String>,

    /// `none` or `gzip` (overrides S3_WRITER_COMPRESSION)
    #[arg(long)]
    pub compression: Option<String>,

    /// Custom endpoint (overrides S3_WRITER_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Role to assume (overrides S3_WRITER_ROLE_ARN)
    #[arg(long)]
    pub role_arn: Option<String>,

    /// Use path-style addressing
    #[arg(long)]
    pub force_path_style: bool,

    /// Talk plain HTTP to the endpoint
    #[arg(long)]
    pub disable_ssl: bool,

    /// Metadata embedded in the object name
    #[arg(long, default_value = "")]
    pub metadata: String,

    /// File extension, e.g. `json`
    #[arg(long, default_value = "")]
    pub format: String,
}

/// Everything the binary needs for one upload.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub uploader: S3UploaderConfig,
    pub input: String,
    pub metadata: String,
    pub format: String,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_parts(Args::parse(), |name| env::var(name).ok())
    }

    /// Merge parsed args over values returned by `lookup`, then defaults.
    pub fn from_parts(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = S3UploaderConfig::default();

        let compression = match args
            .compression
            .or_else(|| lookup("S3_WRITER_COMPRESSION"))
        {
            Some(value) => value
                .parse::<Compression>()
                .map_err(ConfigError::from)
                .with_context(|| format!("parsing compression value `{}`", value))?,
            None => defaults.compression,
        };
        let s3_partition = args
            .partition
            .or_else(|| lookup("S3_WRITER_PARTITION"))
            .map(|value| Partition::from(value.as_str()))
            .unwrap_or(defaults.s3_partition);

        let flag = |cli: bool, name: &str| -> bool {
            cli || lookup(name)
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        };

        let uploader = S3UploaderConfig {
            region: args
                .region
                .or_else(|| lookup("S3_WRITER_REGION"))
                .unwrap_or(defaults.region),
            s3_bucket: args
                .bucket
                .or_else(|| lookup("S3_WRITER_BUCKET"))
                .unwrap_or_default(),
            s3_prefix: args
                .prefix
                .or_else(|| lookup("S3_WRITER_PREFIX"))
                .unwrap_or_default(),
            s3_partition,
            file_prefix: args
                .file_prefix
                .or_else(|| lookup("S3_WRITER_FILE_PREFIX"))
                .unwrap_or_default(),
            role_arn: args
                .role_arn
                .or_else(|| lookup("S3_WRITER_ROLE_ARN"))
                .unwrap_or_default(),
            endpoint: args
                .endpoint
                .or_else(|| lookup("S3_WRITER_ENDPOINT"))
                .unwrap_or_default(),
            s3_force_path_style: flag(args.force_path_style, "S3_WRITER_FORCE_PATH_STYLE"),
            disable_ssl: flag(args.disable_ssl, "S3_WRITER_DISABLE_SSL"),
            compression,
        };
        uploader.validate().context("validating uploader config")?;

        Ok(Self {
            uploader,
            input: args.input,
            metadata: args.metadata,
            format: args.format,
        })
    }
}
