pub mod app;
pub mod download;
pub mod file;
pub mod util;

pub use app::config::Config;
pub use download::queue::DownloadQueue;
pub use download::task::{DownloadTask, MediaSource, TaskState};
