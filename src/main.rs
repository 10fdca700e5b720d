use anyhow::{Context, Result};
use clap::Parser;
use dvrclip::app::save_location::SaveLocationTracker;
use dvrclip::app::settings::{FileSettings, SettingsStore};
use dvrclip::download::events::QueueEvent;
use dvrclip::download::queue::DownloadQueue;
use dvrclip::download::transfer::HttpTransferFactory;
use dvrclip::{Config, MediaSource, TaskState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Save recorded event clips from a DVR server.
#[derive(Debug, Parser)]
#[command(name = "dvrclip", version, about)]
struct Cli {
    /// Media ids of the events to save
    #[arg(required = true)]
    ids: Vec<u64>,

    /// Base URL of the DVR server (defaults to the configured server)
    #[arg(long)]
    server: Option<Url>,

    /// Target directory (defaults to the last save directory)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Maximum simultaneously active transfers
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Falling back to default config: {}", e);
        Config::default()
    });

    let server = match cli.server {
        Some(url) => url,
        None => Url::parse(&config.server.url)
            .context("No --server given and no valid server URL configured")?,
    };
    let max_concurrent = cli.max_concurrent.unwrap_or(config.download.max_concurrent);

    let settings: Arc<dyn SettingsStore> =
        Arc::new(FileSettings::open(dvrclip::util::paths::get_state_path()?));
    let save_location = SaveLocationTracker::load(settings);

    let factory = Arc::new(HttpTransferFactory::new()?);
    let queue = DownloadQueue::with_max_concurrent(factory, save_location, max_concurrent);

    let mut events = queue.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                QueueEvent::TaskAdded(task) => {
                    tracing::info!("Added media {} -> {}", task.source.media_id, task.destination.display())
                }
                QueueEvent::TaskRemoved(task) => {
                    tracing::info!("Removed media {}", task.source.media_id)
                }
            }
        }
    });

    let sources = cli
        .ids
        .iter()
        .map(|&id| MediaSource::new(&server, id, format!("event-{}", id)))
        .collect::<Result<Vec<_>>>()?;

    let target_dir = match cli.dir {
        Some(dir) => dir,
        None => {
            let last = queue.last_save_directory().await;
            if last.as_os_str().is_empty() {
                std::env::current_dir()?
            } else {
                last
            }
        }
    };

    let handles = queue.enqueue_batch(sources, &target_dir).await;
    if handles.is_empty() {
        anyhow::bail!("Nothing to download");
    }

    let scheduler = queue.spawn_scheduler();

    // Wait until every submitted task has finished, then release the handles.
    loop {
        let tasks = queue.tasks().await;
        if tasks.iter().all(|t| t.state == TaskState::Finished) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    scheduler.abort();

    for handle in handles {
        queue.dispose(handle).await;
    }

    tracing::info!("All downloads finished, saved to {}", target_dir.display());
    Ok(())
}
