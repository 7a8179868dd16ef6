use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use rand::{SeedableRng, rngs::StdRng};
use s3_writer::{
    Compression, KeyLayout, ObjectSession, Partition, PutObjectRequest, S3UploaderConfig,
    S3Writer, SessionError, SessionFactory, UploadError, WriteError,
};
use std::{
    io::Read,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Accept,
    DenyAccess,
    BadSession,
    Hang,
}

/// Session factory double that records every put it receives.
#[derive(Clone)]
struct RecordingFactory {
    behavior: Behavior,
    sessions: Arc<AtomicUsize>,
    puts: Arc<Mutex<Vec<PutObjectRequest>>>,
}

impl RecordingFactory {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            sessions: Arc::default(),
            puts: Arc::default(),
        }
    }

    fn puts(&self) -> Vec<PutObjectRequest> {
        self.puts.lock().unwrap().clone()
    }
}

struct RecordingSession {
    behavior: Behavior,
    puts: Arc<Mutex<Vec<PutObjectRequest>>>,
}

#[async_trait]
impl SessionFactory for RecordingFactory {
    async fn create_session(
        &self,
        config: &S3UploaderConfig,
    ) -> Result<Box<dyn ObjectSession>, SessionError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        if let Behavior::BadSession = self.behavior {
            return Err(SessionError::InvalidRegion(config.region.clone()));
        }
        Ok(Box::new(RecordingSession {
            behavior: self.behavior,
            puts: self.puts.clone(),
        }))
    }
}

#[async_trait]
impl ObjectSession for RecordingSession {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), UploadError> {
        self.puts.lock().unwrap().push(request.clone());
        match self.behavior {
            Behavior::DenyAccess => Err(UploadError::Rejected {
                bucket: request.bucket,
                key: request.key,
                code: Some("AccessDenied".into()),
                message: "Access Denied".into(),
            }),
            Behavior::Hang => futures::future::pending::<Result<(), UploadError>>().await,
            _ => Ok(()),
        }
    }
}

fn config(partition: Partition, compression: Compression) -> S3UploaderConfig {
    S3UploaderConfig {
        s3_bucket: "telemetry".into(),
        s3_prefix: "logs".into(),
        s3_partition: partition,
        file_prefix: "otel-".into(),
        compression,
        ..Default::default()
    }
}

fn ts() -> DateTime<Utc> {
    "2024-03-05T09:07:00Z".parse().unwrap()
}

fn payload() -> Vec<u8> {
    br#"{"resourceSpans":[{"resource":{},"scopeSpans":[]}]}"#.repeat(32)
}

fn gunzip(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    GzDecoder::new(bytes).read_to_end(&mut out).unwrap();
    out
}

#[tokio::test]
async fn hourly_uncompressed_upload() {
    let factory = RecordingFactory::new(Behavior::Accept);
    let writer = S3Writer::new(factory.clone());
    let cfg = config(Partition::Hour, Compression::None);
    let key = KeyLayout::from_config(&cfg).build_key_with_rng(
        &ts(),
        "trace",
        "json",
        &mut StdRng::seed_from_u64(11),
    );

    let written = writer
        .write_object(&CancellationToken::new(), key.clone(), &payload(), &cfg)
        .await
        .unwrap();
    assert_eq!(written, key);
    assert_eq!(
        key.as_str(),
        format!(
            "logs/year=2024/month=03/day=05/hour=09/otel-trace_{}.json",
            key.random_id()
        )
    );

    let puts = factory.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].bucket, "telemetry");
    assert_eq!(puts[0].key, key.as_str());
    assert_eq!(puts[0].body.as_ref(), payload().as_slice());
    assert_eq!(puts[0].content_encoding, "");
}

#[tokio::test]
async fn minute_partitioned_upload() {
    let factory = RecordingFactory::new(Behavior::Accept);
    let writer = S3Writer::new(factory.clone());
    let cfg = config(Partition::Minute, Compression::None);
    let key = KeyLayout::from_config(&cfg).build_key_with_rng(
        &ts(),
        "trace",
        "json",
        &mut StdRng::seed_from_u64(12),
    );

    writer
        .write_object(&CancellationToken::new(), key.clone(), &payload(), &cfg)
        .await
        .unwrap();

    assert_eq!(
        factory.puts()[0].key,
        format!(
            "logs/year=2024/month=03/day=05/hour=09/minute=07/otel-trace_{}.json",
            key.random_id()
        )
    );
}

#[tokio::test]
async fn gzip_upload_round_trips() {
    let factory = RecordingFactory::new(Behavior::Accept);
    let writer = S3Writer::new(factory.clone());
    let cfg = config(Partition::Hour, Compression::Gzip);
    let key = KeyLayout::from_config(&cfg).build_key_with_rng(
        &ts(),
        "trace",
        "json",
        &mut StdRng::seed_from_u64(13),
    );

    writer
        .write_object(&CancellationToken::new(), key, &payload(), &cfg)
        .await
        .unwrap();

    let puts = factory.puts();
    let put = &puts[0];
    assert!(put.key.ends_with(".json.gz"));
    assert_eq!(put.content_encoding, "gzip");
    assert_eq!(&put.body[..2], &[0x1f, 0x8b]);
    assert_eq!(gunzip(&put.body), payload());
}

#[tokio::test]
async fn write_uses_current_time_and_random_id() {
    let factory = RecordingFactory::new(Behavior::Accept);
    let writer = S3Writer::new(factory.clone());
    let cfg = config(Partition::Minute, Compression::Gzip);

    let before = Utc::now();
    let key = writer
        .write(&CancellationToken::new(), b"", &cfg, "metrics", "")
        .await
        .unwrap();

    assert!(key.as_str().starts_with(&format!("logs/year={}/", before.format("%Y"))));
    assert!(key.as_str().ends_with(&format!("otel-metrics_{}.gz", key.random_id())));
    assert!((100_000_000..999_999_999).contains(&key.random_id()));
    assert_eq!(gunzip(&factory.puts()[0].body), b"");
}

#[tokio::test]
async fn authorization_failure_is_returned_without_retry() {
    let factory = RecordingFactory::new(Behavior::DenyAccess);
    let writer = S3Writer::new(factory.clone());
    let cfg = config(Partition::Hour, Compression::None);

    let err = writer
        .write(&CancellationToken::new(), &payload(), &cfg, "trace", "json")
        .await
        .unwrap_err();

    match err {
        WriteError::Upload(upload) => assert_eq!(upload.code(), Some("AccessDenied")),
        other => panic!("expected upload error, got {other:?}"),
    }
    assert_eq!(factory.puts().len(), 1);
    assert_eq!(factory.sessions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn session_error_is_propagated_and_nothing_is_put() {
    let factory = RecordingFactory::new(Behavior::BadSession);
    let writer = S3Writer::new(factory.clone());
    let cfg = config(Partition::Hour, Compression::Gzip);

    let err = writer
        .write(&CancellationToken::new(), &payload(), &cfg, "trace", "json")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WriteError::Session(SessionError::InvalidRegion(ref region)) if region == "us-east-1"
    ));
    assert!(factory.puts().is_empty());
}

#[tokio::test]
async fn cancellation_interrupts_the_put_only() {
    let factory = RecordingFactory::new(Behavior::Hang);
    let writer = S3Writer::new(factory.clone());
    let cfg = config(Partition::Hour, Compression::Gzip);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = writer
        .write(&cancel, &payload(), &cfg, "trace", "json")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WriteError::Upload(UploadError::Cancelled { ref bucket, .. }) if bucket == "telemetry"
    ));
    // Session construction still ran before the token was observed.
    assert_eq!(factory.sessions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_writes_produce_independent_objects() {
    let factory = RecordingFactory::new(Behavior::Accept);
    let writer = Arc::new(S3Writer::new(factory.clone()));
    let cfg = config(Partition::Minute, Compression::None);
    let cancel = CancellationToken::new();

    let writes = (0..16).map(|i| {
        let writer = writer.clone();
        let cfg = cfg.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let body = format!("batch-{i}");
            writer
                .write(&cancel, body.as_bytes(), &cfg, "logs", "txt")
                .await
        })
    });
    let keys: Vec<_> = futures::future::join_all(writes)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(keys.len(), 16);
    let puts = factory.puts();
    assert_eq!(puts.len(), 16);
    for put in &puts {
        let body = std::str::from_utf8(&put.body).unwrap();
        assert!(body.starts_with("batch-"));
        assert!(keys.iter().any(|k| k.as_str() == put.key));
    }
}
