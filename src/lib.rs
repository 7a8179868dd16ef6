//! Persist telemetry batches as objects in an S3-compatible bucket.
//!
//! A batch is written under
//! `<prefix>/year=YYYY/month=MM/day=DD/hour=HH[/minute=mm]/<file_prefix><metadata>_<random>[.<format>][.gz]`,
//! optionally gzip-compressed, with exactly one put per call.
//!
//! ```no_run
//! use s3_writer::{AwsSessionFactory, S3UploaderConfig, S3Writer};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), s3_writer::WriteError> {
//! let config = S3UploaderConfig {
//!     s3_bucket: "telemetry".into(),
//!     s3_prefix: "logs".into(),
//!     ..Default::default()
//! };
//! let key = S3Writer::new(AwsSessionFactory::new())
//!     .write(&CancellationToken::new(), b"{}", &config, "trace", "json")
//!     .await?;
//! println!("stored {key}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod models;
pub mod services;

pub use config::S3UploaderConfig;
pub use errors::{ConfigError, SessionError, UploadError, WriteError, WriteResult};
pub use models::{
    layout::{Compression, Partition},
    object_key::ObjectKey,
};
pub use services::{
    key_builder::{KeyLayout, build_key},
    session_factory::{
        AwsSession, AwsSessionFactory, CredentialSource, ObjectSession, PutObjectRequest,
        SessionFactory,
    },
    writer::S3Writer,
};
