use anyhow::{Context, Result};
use s3_writer::{AwsSessionFactory, S3Writer, config::AppConfig};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;
    tracing::info!("Starting s3-writer with config: {:?}", cfg.uploader);

    // --- Read payload ---
    let payload = if cfg.input == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .context("reading payload from stdin")?;
        buf
    } else {
        tokio::fs::read(&cfg.input)
            .await
            .with_context(|| format!("reading payload file {}", cfg.input))?
    };
    tracing::debug!("Read {} payload bytes from {}", payload.len(), cfg.input);

    // --- Cancel the pending upload on Ctrl-C ---
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling upload");
            on_signal.cancel();
        }
    });

    // --- Upload ---
    let key = S3Writer::new(AwsSessionFactory::new())
        .write(&cancel, &payload, &cfg.uploader, &cfg.metadata, &cfg.format)
        .await
        .with_context(|| format!("writing to bucket {}", cfg.uploader.s3_bucket))?;

    tracing::info!("Stored s3://{}/{}", cfg.uploader.s3_bucket, key);
    println!("{}", key);

    Ok(())
}
