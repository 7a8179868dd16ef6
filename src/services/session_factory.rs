//! Authenticated access to the object store.
//!
//! `SessionFactory` turns an uploader config into an `ObjectSession` able to
//! issue a single put. The AWS implementation layers an STS assume-role
//! provider over the base credential chain when a role ARN is configured.
//! Role assumption is resolved lazily by the SDK, so a bad role only shows up
//! as an upload error.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig, retry::RetryConfig, sts::AssumeRoleProvider};
use aws_sdk_s3::{
    Client,
    config::Region,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::put_object::PutObjectError,
    primitives::ByteStream,
};
use aws_smithy_async::time::SharedTimeSource;
use bytes::Bytes;
use tracing::{debug, instrument};
use url::Url;

use crate::{
    config::S3UploaderConfig,
    errors::{SessionError, UploadError},
};

const ROLE_SESSION_NAME: &str = "s3-writer";

/// One put of a complete object.
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    /// `Content-Encoding` of the stored object; not sent when empty.
    pub content_encoding: String,
}

#[async_trait]
pub trait ObjectSession: Send + Sync {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), UploadError>;
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create_session(
        &self,
        config: &S3UploaderConfig,
    ) -> Result<Box<dyn ObjectSession>, SessionError>;
}

/// Where a session's effective credentials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// The base provider chain, used as-is.
    Base,
    /// Temporary STS credentials for `role_arn`, obtained with the base chain.
    AssumedRole { role_arn: String },
}

/// S3 client bound to one uploader config.
#[derive(Debug, Clone)]
pub struct AwsSession {
    client: Client,
    credentials: CredentialSource,
}

impl AwsSession {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn credential_source(&self) -> &CredentialSource {
        &self.credentials
    }
}

#[async_trait]
impl ObjectSession for AwsSession {
    #[instrument(
        skip(self, request),
        fields(bucket = %request.bucket, key = %request.key, bytes = request.body.len())
    )]
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), UploadError> {
        let PutObjectRequest {
            bucket,
            key,
            body,
            content_encoding,
        } = request;

        let mut put = self
            .client
            .put_object()
            .bucket(&bucket)
            .key(&key)
            .body(ByteStream::from(body));
        if !content_encoding.is_empty() {
            put = put.content_encoding(content_encoding);
        }

        match put.send().await {
            Ok(_) => {
                debug!("object stored");
                Ok(())
            }
            Err(err) => Err(upload_error(bucket, key, err)),
        }
    }
}

/// Builds `AwsSession`s from either an explicit base `SdkConfig` or the
/// default provider chain, loaded per session.
#[derive(Debug, Clone, Default)]
pub struct AwsSessionFactory {
    base: Option<SdkConfig>,
}

impl AwsSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `base` for credentials, retry and HTTP settings instead of the environment.
    pub fn with_base_config(base: SdkConfig) -> Self {
        Self { base: Some(base) }
    }

    pub async fn build_session(
        &self,
        config: &S3UploaderConfig,
    ) -> Result<AwsSession, SessionError> {
        ensure_region_valid(&config.region)?;
        let region = Region::new(config.region.clone());
        let endpoint = resolve_endpoint(config)?;

        let mut base = match &self.base {
            Some(base) => base.clone(),
            None => {
                aws_config::defaults(BehaviorVersion::latest())
                    .region(region.clone())
                    .load()
                    .await
            }
        };
        // STS credential expiry needs a clock; hand-built configs may lack one.
        if base.time_source().is_none() {
            base = base
                .into_builder()
                .time_source(SharedTimeSource::default())
                .build();
        }

        // One attempt per write; the caller owns retry policy.
        let mut builder = aws_sdk_s3::config::Builder::from(&base)
            .region(region.clone())
            .force_path_style(config.s3_force_path_style)
            .retry_config(RetryConfig::disabled());
        if let Some(endpoint) = &endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let credentials = match config.role_arn() {
            Some(role_arn) => {
                let provider = AssumeRoleProvider::builder(role_arn)
                    .session_name(ROLE_SESSION_NAME)
                    .region(region)
                    .configure(&base)
                    .build()
                    .await;
                builder = builder.credentials_provider(provider);
                CredentialSource::AssumedRole {
                    role_arn: role_arn.to_string(),
                }
            }
            None => CredentialSource::Base,
        };

        debug!(
            region = %config.region,
            endpoint = endpoint.as_deref().unwrap_or("default"),
            path_style = config.s3_force_path_style,
            credentials = ?credentials,
            "built s3 session"
        );

        Ok(AwsSession {
            client: Client::from_conf(builder.build()),
            credentials,
        })
    }
}

#[async_trait]
impl SessionFactory for AwsSessionFactory {
    async fn create_session(
        &self,
        config: &S3UploaderConfig,
    ) -> Result<Box<dyn ObjectSession>, SessionError> {
        Ok(Box::new(self.build_session(config).await?))
    }
}

/// Region names are lowercase letters, digits and inner hyphens.
fn ensure_region_valid(region: &str) -> Result<(), SessionError> {
    let well_formed = !region.is_empty()
        && !region.starts_with('-')
        && !region.ends_with('-')
        && region
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-'));
    if well_formed {
        Ok(())
    } else {
        Err(SessionError::InvalidRegion(region.to_string()))
    }
}

/// Resolve the endpoint override, applying `disable_ssl`.
///
/// Returns `None` when the service default applies. `disable_ssl` only picks
/// the scheme for endpoints written without one; an explicit scheme is kept.
/// With TLS disabled and no override, the regional endpoint is used over plain HTTP.
fn resolve_endpoint(config: &S3UploaderConfig) -> Result<Option<String>, SessionError> {
    let raw = match config.endpoint() {
        Some(endpoint) => endpoint.to_string(),
        None if config.disable_ssl => format!("s3.{}.amazonaws.com", config.region),
        None => return Ok(None),
    };

    let invalid = |reason: String| SessionError::InvalidEndpoint {
        endpoint: raw.clone(),
        reason,
    };

    let with_scheme = if raw.contains("://") {
        raw.clone()
    } else if config.disable_ssl {
        format!("http://{}", raw)
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&with_scheme).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".into()));
    }

    Ok(Some(url.as_str().trim_end_matches('/').to_string()))
}

fn upload_error(bucket: String, key: String, err: SdkError<PutObjectError>) -> UploadError {
    match &err {
        SdkError::ServiceError(service) => {
            let code = service.err().code().map(str::to_owned);
            let message = service
                .err()
                .message()
                .map(str::to_owned)
                .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
            UploadError::Rejected {
                bucket,
                key,
                code,
                message,
            }
        }
        _ => UploadError::Transport {
            bucket,
            key,
            message: DisplayErrorContext(&err).to_string(),
        },
    }
}
