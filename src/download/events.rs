use super::task::DownloadTask;
use tokio::sync::broadcast;

/// Capacity of the queue event channel. Slow subscribers that fall further
/// behind than this lose the oldest events (broadcast semantics).
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notification sent to presentation-layer observers. Each variant carries a
/// snapshot of the task at the time of the event.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    TaskAdded(DownloadTask),
    TaskRemoved(DownloadTask),
}

pub(crate) fn channel() -> broadcast::Sender<QueueEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}
