use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Key/value persistence collaborator.
///
/// Writes are fire-and-forget: implementations log failures instead of
/// propagating them, so callers never block on persistence errors.
pub trait SettingsStore: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn store(&self, key: &str, value: &str);
}

/// TOML-file-backed settings store (one flat key/value table).
pub struct FileSettings {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileSettings {
    /// Open a settings file, loading any existing entries. A missing or
    /// unreadable file starts empty.
    pub fn open(path: PathBuf) -> Self {
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<HashMap<String, String>>(&content) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!("Ignoring malformed settings file {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn write_out(&self, values: &HashMap<String, String>) {
        let toml = match toml::to_string_pretty(values) {
            Ok(toml) => toml,
            Err(e) => {
                tracing::warn!("Failed to serialize settings: {}", e);
                return;
            }
        };

        // Atomic write: temp file + rename
        let temp_path = self.path.with_extension("toml.tmp");
        let result = std::fs::write(&temp_path, toml)
            .and_then(|_| std::fs::rename(&temp_path, &self.path));
        if let Err(e) = result {
            tracing::warn!("Failed to write settings file {}: {}", self.path.display(), e);
        }
    }
}

impl SettingsStore for FileSettings {
    fn load(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) {
        let mut values = self.values.lock().unwrap();
        values.insert(key.to_string(), value.to_string());
        self.write_out(&values);
    }
}

/// In-memory settings store. Counts writes so tests can assert that
/// unchanged values are not persisted again.
#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        store
    }

    /// Number of `store` calls seen so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_settings_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("state.toml");

        let settings = FileSettings::open(path.clone());
        settings.store("download/last_save_directory", "/srv/clips");

        let reopened = FileSettings::open(path);
        assert_eq!(
            reopened.load("download/last_save_directory").as_deref(),
            Some("/srv/clips")
        );
    }

    #[test]
    fn test_file_settings_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let settings = FileSettings::open(temp_dir.path().join("absent.toml"));
        assert_eq!(settings.load("anything"), None);
    }

    #[test]
    fn test_file_settings_overwrites_value() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("state.toml");

        let settings = FileSettings::open(path.clone());
        settings.store("key", "first");
        settings.store("key", "second");

        let reopened = FileSettings::open(path);
        assert_eq!(reopened.load("key").as_deref(), Some("second"));
    }

    #[test]
    fn test_memory_settings_counts_writes() {
        let settings = MemorySettings::new();
        assert_eq!(settings.write_count(), 0);

        settings.store("key", "value");
        assert_eq!(settings.write_count(), 1);
        assert_eq!(settings.load("key").as_deref(), Some("value"));
    }
}
