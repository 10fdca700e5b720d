use async_trait::async_trait;
use dvrclip::app::save_location::SaveLocationTracker;
use dvrclip::app::settings::MemorySettings;
use dvrclip::download::queue::{DownloadQueue, TaskHandle};
use dvrclip::download::task::{MediaSource, TaskState};
use dvrclip::download::transfer::{Transfer, TransferError, TransferFactory};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Create a media source against a throwaway server URL.
pub fn test_source(media_id: u64) -> MediaSource {
    let server = Url::parse("http://dvr.test/").unwrap();
    MediaSource::new(&server, media_id, format!("clip-{}", media_id)).unwrap()
}

/// Create a queue backed by an in-memory settings store.
pub fn test_queue(factory: Arc<dyn TransferFactory>, max_concurrent: usize) -> DownloadQueue {
    let tracker = SaveLocationTracker::load(Arc::new(MemorySettings::new()));
    DownloadQueue::with_max_concurrent(factory, tracker, max_concurrent)
}

/// Transfer that completes only once its gate is released.
pub struct GatedTransfer {
    gate: Arc<Notify>,
}

#[async_trait]
impl Transfer for GatedTransfer {
    async fn run(&self, _destination: &Path) -> Result<(), TransferError> {
        self.gate.notified().await;
        Ok(())
    }
}

/// Factory handing out gate-controlled transfers, keyed by media id.
#[derive(Default)]
pub struct GatedFactory {
    gates: Mutex<HashMap<u64, Arc<Notify>>>,
}

impl GatedFactory {
    fn gate(&self, media_id: u64) -> Arc<Notify> {
        self.gates
            .lock()
            .unwrap()
            .entry(media_id)
            .or_default()
            .clone()
    }

    /// Let the transfer for `media_id` complete.
    pub fn release(&self, media_id: u64) {
        self.gate(media_id).notify_one();
    }
}

impl TransferFactory for GatedFactory {
    fn create(&self, source: &MediaSource) -> Arc<dyn Transfer> {
        Arc::new(GatedTransfer {
            gate: self.gate(source.media_id),
        })
    }
}

/// Helper to wait for a task to reach a specific state.
pub async fn wait_for_state(queue: &DownloadQueue, id: TaskHandle, state: TaskState) {
    use tokio::time::{Duration, timeout};

    timeout(Duration::from_secs(5), async {
        loop {
            if queue.get(id).await.map(|t| t.state) == Some(state) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for task {} to reach {:?}", id, state));
}

/// Generate test file content of a specific size.
#[allow(dead_code)]
pub fn generate_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Mock a DVR media endpoint serving `content` for `media_id`.
#[allow(dead_code)]
pub async fn setup_mock_media_server(media_id: u64, content: Vec<u8>) -> (MockServer, Url) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/media/request.php"))
        .and(query_param("id", media_id.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.clone())
                .append_header("Content-Length", content.len().to_string())
                .append_header("Content-Type", "video/x-matroska"),
        )
        .mount(&server)
        .await;

    let url = Url::parse(&server.uri()).unwrap();
    (server, url)
}

/// Mock a DVR media endpoint that only returns the given error status.
#[allow(dead_code)]
pub async fn setup_error_media_server(status_code: u16) -> (MockServer, Url) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status_code))
        .mount(&server)
        .await;

    let url = Url::parse(&server.uri()).unwrap();
    (server, url)
}
