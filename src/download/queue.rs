use super::events::{self, QueueEvent};
use super::task::{DownloadTask, MediaSource, TaskState};
use super::transfer::TransferFactory;
use crate::app::save_location::SaveLocationTracker;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Opaque reference to a submitted download; used to cancel or dispose it.
pub type TaskHandle = Uuid;

/// Default cap on simultaneously active transfers.
pub const DEFAULT_MAX_CONCURRENT: usize = 30;

/// Interval of the admission scheduler. Polling once a second bounds the
/// rate of transfer-start attempts and coalesces bursts from batch saves.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Mutable queue state. Every mutation goes through one `RwLock` writer,
/// serializing `enqueue`, `tick`, completion and removal against each other.
struct QueueState {
    /// FIFO admission order, by task id.
    pending: VecDeque<TaskHandle>,
    /// Currently running transfers; never larger than the concurrency cap.
    active: HashSet<TaskHandle>,
    /// Authoritative registry of every task not yet removed, in insertion
    /// order. Backs external enumeration (e.g. a download panel).
    all: Vec<DownloadTask>,
    /// Join handles of spawned transfer runners, aborted on cancel.
    runners: HashMap<TaskHandle, JoinHandle<()>>,
    save_location: SaveLocationTracker,
}

impl QueueState {
    fn task_mut(&mut self, id: TaskHandle) -> Option<&mut DownloadTask> {
        self.all.iter_mut().find(|t| t.id == id)
    }
}

/// Bounded-concurrency download queue for recorded event clips.
///
/// Tasks are admitted from the pending queue strictly in submission order,
/// at most `max_concurrent` at a time, by the periodic [`tick`] step.
/// Completion only frees the slot; a finished task stays listed until the
/// caller disposes it.
///
/// [`tick`]: DownloadQueue::tick
#[derive(Clone)]
pub struct DownloadQueue {
    state: Arc<RwLock<QueueState>>,
    factory: Arc<dyn TransferFactory>,
    max_concurrent: usize,
    events: broadcast::Sender<QueueEvent>,
}

impl DownloadQueue {
    pub fn new(factory: Arc<dyn TransferFactory>, save_location: SaveLocationTracker) -> Self {
        Self::with_max_concurrent(factory, save_location, DEFAULT_MAX_CONCURRENT)
    }

    pub fn with_max_concurrent(
        factory: Arc<dyn TransferFactory>,
        save_location: SaveLocationTracker,
        max_concurrent: usize,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(QueueState {
                pending: VecDeque::new(),
                active: HashSet::new(),
                all: Vec::new(),
                runners: HashMap::new(),
                save_location,
            })),
            factory,
            max_concurrent,
            events: events::channel(),
        }
    }

    /// Subscribe to task added/removed notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Submit one save request. An empty destination is treated as a
    /// cancelled picker: no task is created and no event is emitted.
    ///
    /// Relative destinations resolve against the last save directory, which
    /// is updated (and persisted) from the resolved path before the task is
    /// created.
    pub async fn enqueue(
        &self,
        source: MediaSource,
        destination: &Path,
    ) -> Option<TaskHandle> {
        if destination.as_os_str().is_empty() {
            tracing::debug!("Ignoring save request for media {} with empty destination", source.media_id);
            return None;
        }

        let mut state = self.state.write().await;
        let resolved = state.save_location.absolute_path(destination);
        state.save_location.record_save(&resolved);

        let task = DownloadTask::new(source, resolved);
        let id = task.id;
        state.pending.push_back(id);
        state.all.push(task.clone());
        tracing::info!(
            "Queued media {} -> {}",
            task.source.media_id,
            task.destination.display()
        );

        let _ = self.events.send(QueueEvent::TaskAdded(task));
        Some(id)
    }

    /// Submit a batch of save requests into `target_dir`, deriving each
    /// file name from the source. An empty directory abandons the whole
    /// batch; no task is created.
    pub async fn enqueue_batch(
        &self,
        sources: impl IntoIterator<Item = MediaSource>,
        target_dir: &Path,
    ) -> Vec<TaskHandle> {
        if target_dir.as_os_str().is_empty() {
            tracing::debug!("Ignoring batch save request with empty target directory");
            return Vec::new();
        }

        let mut handles = Vec::new();
        for source in sources {
            let destination = target_dir.join(source.default_file_name());
            if let Some(handle) = self.enqueue(source, &destination).await {
                handles.push(handle);
            }
        }
        handles
    }

    /// Admission step: moves pending tasks into the active set until the
    /// concurrency cap is reached, starting their transfers. Sole place a
    /// task becomes `Active`; normally driven by [`spawn_scheduler`], but
    /// callable directly by an event-driven caller or a test.
    ///
    /// [`spawn_scheduler`]: DownloadQueue::spawn_scheduler
    pub async fn tick(&self) {
        let mut state = self.state.write().await;
        while state.active.len() < self.max_concurrent {
            let Some(id) = state.pending.pop_front() else {
                break;
            };
            // Disposal removes ids from pending synchronously, so a missing
            // task here would mean registry corruption; skip defensively.
            let Some(task) = state.task_mut(id) else {
                continue;
            };
            task.state = TaskState::Active;
            let source = task.source.clone();
            let destination = task.destination.clone();
            state.active.insert(id);

            let transfer = self.factory.create(&source);
            let queue = self.clone();
            let runner = tokio::spawn(async move {
                if let Err(e) = transfer.run(&destination).await {
                    tracing::warn!("Transfer for media {} failed: {}", source.media_id, e);
                }
                queue.transfer_finished(id).await;
            });
            state.runners.insert(id, runner);
            tracing::debug!(
                "Admitted task {} ({}/{} active)",
                id,
                state.active.len(),
                self.max_concurrent
            );
        }
    }

    /// Completion handler invoked by the transfer runner (success or
    /// failure alike). Frees the task's concurrency slot; the task stays
    /// registered as `Finished` until disposed. Idempotent.
    async fn transfer_finished(&self, id: TaskHandle) {
        let mut state = self.state.write().await;
        if state.active.remove(&id) {
            if let Some(task) = state.task_mut(id) {
                task.state = TaskState::Finished;
            }
            state.runners.remove(&id);
            tracing::debug!("Transfer finished for task {}", id);
        }
    }

    /// Cancel a submitted download, aborting its transfer if it is already
    /// running. Equivalent to [`dispose`] for tasks that never started.
    ///
    /// [`dispose`]: DownloadQueue::dispose
    pub async fn cancel(&self, handle: TaskHandle) -> bool {
        self.remove_task(handle).await
    }

    /// Release a task handle, removing the task from every registry and
    /// emitting a removal notification. Finished tasks stay listed until
    /// this is called; the presentation layer owns disposal once it has
    /// shown completion. Returns `false` (and emits nothing) if the handle
    /// was already released.
    pub async fn dispose(&self, handle: TaskHandle) -> bool {
        self.remove_task(handle).await
    }

    async fn remove_task(&self, id: TaskHandle) -> bool {
        let mut removed = {
            let mut state = self.state.write().await;
            let Some(pos) = state.all.iter().position(|t| t.id == id) else {
                return false;
            };
            state.pending.retain(|p| *p != id);
            state.active.remove(&id);
            if let Some(runner) = state.runners.remove(&id) {
                runner.abort();
            }
            state.all.remove(pos)
        };
        removed.state = TaskState::Removed;
        tracing::info!("Removed task {} (media {})", id, removed.source.media_id);

        let _ = self.events.send(QueueEvent::TaskRemoved(removed));
        true
    }

    /// Snapshot of every registered task, in submission order.
    pub async fn tasks(&self) -> Vec<DownloadTask> {
        self.state.read().await.all.clone()
    }

    pub async fn get(&self, handle: TaskHandle) -> Option<DownloadTask> {
        self.state
            .read()
            .await
            .all
            .iter()
            .find(|t| t.id == handle)
            .cloned()
    }

    pub async fn pending_ids(&self) -> Vec<TaskHandle> {
        self.state.read().await.pending.iter().copied().collect()
    }

    pub async fn active_ids(&self) -> Vec<TaskHandle> {
        self.state.read().await.active.iter().copied().collect()
    }

    pub async fn pending_count(&self) -> usize {
        self.state.read().await.pending.len()
    }

    pub async fn active_count(&self) -> usize {
        self.state.read().await.active.len()
    }

    pub async fn last_save_directory(&self) -> PathBuf {
        self.state.read().await.save_location.last_directory().to_path_buf()
    }

    /// Spawn the periodic admission scheduler (one tick per second).
    pub fn spawn_scheduler(&self) -> JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                queue.tick().await;
            }
        })
    }
}
