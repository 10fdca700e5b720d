use super::task::MediaSource;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Failure of a single transfer. The queue does not act on the variant,
/// only logs it; a failed transfer still frees its concurrency slot.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One transfer of a single clip, run to completion by the queue.
///
/// Returning from `run` is the "finished" signal and happens at most once;
/// aborting the spawned runner is the destruction path. Implementations are
/// expected to be cancel-safe at any await point.
#[async_trait]
pub trait Transfer: Send + Sync + 'static {
    async fn run(&self, destination: &Path) -> Result<(), TransferError>;
}

/// Creates one transfer per media source; lets the queue stay independent
/// of the networking stack.
pub trait TransferFactory: Send + Sync + 'static {
    fn create(&self, source: &MediaSource) -> Arc<dyn Transfer>;
}

/// Streaming HTTP GET writing through a buffered file writer.
pub struct HttpTransfer {
    client: reqwest::Client,
    url: url::Url,
}

#[async_trait]
impl Transfer for HttpTransfer {
    async fn run(&self, destination: &Path) -> Result<(), TransferError> {
        tracing::debug!("Starting transfer: {} -> {}", self.url, destination.display());

        let response = self.client.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(TransferError::Status(response.status()));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| TransferError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let io_err = |source| TransferError::Io {
            path: destination.to_path_buf(),
            source,
        };

        let file = File::create(destination).await.map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();

        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(io_err)?;

        tracing::debug!("Transfer complete: {} ({} bytes)", destination.display(), written);
        Ok(())
    }
}

/// Factory for `HttpTransfer`s sharing one connection pool.
pub struct HttpTransferFactory {
    client: reqwest::Client,
}

impl HttpTransferFactory {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self { client })
    }
}

impl TransferFactory for HttpTransferFactory {
    fn create(&self, source: &MediaSource) -> Arc<dyn Transfer> {
        Arc::new(HttpTransfer {
            client: self.client.clone(),
            url: source.request_url.clone(),
        })
    }
}
