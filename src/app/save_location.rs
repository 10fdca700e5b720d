use super::settings::SettingsStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings key for the persisted last save directory.
pub const LAST_SAVE_DIRECTORY_KEY: &str = "download/last_save_directory";

/// Tracks the directory of the most recent save and persists it across runs.
///
/// The tracked directory seeds relative destination paths and the CLI's
/// default target directory, so a user saving several clips in a row lands
/// in the same place without re-picking it.
pub struct SaveLocationTracker {
    store: Arc<dyn SettingsStore>,
    last_directory: PathBuf,
}

impl SaveLocationTracker {
    /// Load the tracked directory from the settings store. An absent entry
    /// starts empty, which makes relative paths resolve against it as-is.
    pub fn load(store: Arc<dyn SettingsStore>) -> Self {
        let last_directory = store
            .load(LAST_SAVE_DIRECTORY_KEY)
            .map(PathBuf::from)
            .unwrap_or_default();

        Self {
            store,
            last_directory,
        }
    }

    /// Resolve `candidate` to an absolute path: absolute paths pass through
    /// unchanged, relative ones are joined onto the tracked directory.
    pub fn absolute_path(&self, candidate: &Path) -> PathBuf {
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.last_directory.join(candidate)
        }
    }

    /// Record a completed save at `resolved_path`. Persists the containing
    /// directory only when it differs from the tracked one, so repeated
    /// saves into the same directory cost no persistence writes.
    pub fn record_save(&mut self, resolved_path: &Path) {
        let Some(new_directory) = resolved_path.parent() else {
            return;
        };

        if new_directory != self.last_directory {
            self.last_directory = new_directory.to_path_buf();
            self.store.store(
                LAST_SAVE_DIRECTORY_KEY,
                &self.last_directory.to_string_lossy(),
            );
            tracing::debug!("Last save directory is now {}", self.last_directory.display());
        }
    }

    pub fn last_directory(&self) -> &Path {
        &self.last_directory
    }
}
