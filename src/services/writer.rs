//! src/services/writer.rs
//!
//! S3Writer: turns one finished telemetry batch into one stored object:
//! key derivation, optional gzip, session acquisition and a single put.
//! Any failure is returned as-is; nothing is retried or cleaned up.

use bytes::Bytes;
use chrono::Utc;
use flate2::{Compression as GzLevel, write::GzEncoder};
use std::io::{self, Write};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    config::S3UploaderConfig,
    errors::{UploadError, WriteError, WriteResult},
    models::{layout::Compression, object_key::ObjectKey},
    services::{
        key_builder::KeyLayout,
        session_factory::{AwsSessionFactory, PutObjectRequest, SessionFactory},
    },
};

/// Uploads buffers to the bucket named in the config passed to each call.
///
/// Holds no per-call state, so one writer can be shared between tasks.
#[derive(Debug, Clone)]
pub struct S3Writer<F = AwsSessionFactory> {
    sessions: F,
}

impl<F: SessionFactory> S3Writer<F> {
    pub fn new(sessions: F) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &F {
        &self.sessions
    }

    /// Write `buf` under a key built from the current time and a random id.
    ///
    /// `cancel` only interrupts the put itself; compression and session
    /// construction run to completion regardless.
    pub async fn write(
        &self,
        cancel: &CancellationToken,
        buf: &[u8],
        config: &S3UploaderConfig,
        metadata: &str,
        format: &str,
    ) -> WriteResult<ObjectKey> {
        let key = KeyLayout::from_config(config).build_key_with_rng(
            &Utc::now(),
            metadata,
            format,
            &mut rand::rng(),
        );
        self.write_object(cancel, key, buf, config).await
    }

    /// Write `buf` under an already computed key.
    pub async fn write_object(
        &self,
        cancel: &CancellationToken,
        key: ObjectKey,
        buf: &[u8],
        config: &S3UploaderConfig,
    ) -> WriteResult<ObjectKey> {
        let body = match config.compression {
            Compression::Gzip => Bytes::from(gzip(buf).map_err(WriteError::Compression)?),
            Compression::None => Bytes::copy_from_slice(buf),
        };
        debug!(
            key = %key,
            input_bytes = buf.len(),
            body_bytes = body.len(),
            partition = %config.s3_partition,
            compression = %config.compression,
            "prepared object body"
        );

        let session = self.sessions.create_session(config).await?;

        let request = PutObjectRequest {
            bucket: config.s3_bucket.clone(),
            key: key.as_str().to_string(),
            body,
            content_encoding: config.compression.content_encoding().to_string(),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(UploadError::Cancelled {
                    bucket: config.s3_bucket.clone(),
                    key: key.into_string(),
                }
                .into());
            }
            result = session.put_object(request) => result?,
        }

        Ok(key)
    }
}

/// Gzip `buf` in memory and finish the stream so the trailer is written.
pub fn gzip(buf: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(buf.len() / 2), GzLevel::default());
    encoder.write_all(buf)?;
    encoder.finish()
}
