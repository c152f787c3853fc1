use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persists the "show identifier with separators" flag.
pub trait PreferenceStore: Send {
    fn load(&self) -> Result<bool>;
    fn save(&mut self, dashes: bool) -> Result<()>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PreferenceFile {
    #[serde(default)]
    dashes: bool,
    #[serde(default)]
    upgraded: bool,
}

/// JSON-backed preference store.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
    contents: PreferenceFile,
}

impl FilePreferenceStore {
    /// Open the store, consuming the one-time upgrade marker on first use.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents: PreferenceFile = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Unable to read preferences at {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Malformed preferences at {}", path.display()))?
        } else {
            PreferenceFile::default()
        };

        let mut store = Self { path, contents };
        if !store.contents.upgraded {
            let upgraded = PreferenceFile {
                upgraded: true,
                ..store.contents.clone()
            };
            store.write(&upgraded)?;
            store.contents = upgraded;
            debug!(path = %store.path.display(), "initialised preference file");
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, contents: &PreferenceFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create preference directory {}", parent.display())
            })?;
        }
        let serialised = serde_json::to_string_pretty(contents)?;
        fs::write(&self.path, serialised)
            .with_context(|| format!("Failed to persist preferences to {}", self.path.display()))
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<bool> {
        Ok(self.contents.dashes)
    }

    fn save(&mut self, dashes: bool) -> Result<()> {
        let next = PreferenceFile {
            dashes,
            ..self.contents.clone()
        };
        self.write(&next)?;
        self.contents = next;
        debug!(dashes, path = %self.path.display(), "saved display preference");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    /// In-memory store that records every write.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingStore {
        pub(crate) initial: bool,
        pub(crate) writes: Arc<Mutex<Vec<bool>>>,
    }

    impl PreferenceStore for RecordingStore {
        fn load(&self) -> Result<bool> {
            Ok(self.writes.lock().unwrap().last().copied().unwrap_or(self.initial))
        }

        fn save(&mut self, dashes: bool) -> Result<()> {
            self.writes.lock().unwrap().push(dashes);
            Ok(())
        }
    }

    fn read_file(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn first_open_writes_upgrade_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs").join("preferences.json");

        let store = FilePreferenceStore::open(&path).unwrap();
        assert!(!store.load().unwrap());
        let stored = read_file(&path);
        assert_eq!(stored["upgraded"], true);
        assert_eq!(stored["dashes"], false);
    }

    #[test]
    fn upgrade_carries_existing_value_forward() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, r#"{"dashes": true}"#).unwrap();

        let store = FilePreferenceStore::open(&path).unwrap();
        assert!(store.load().unwrap());
        assert_eq!(read_file(&path)["upgraded"], true);
    }

    #[test]
    fn upgraded_file_is_not_rewritten_on_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        let original = r#"{"dashes":true,"upgraded":true}"#;
        fs::write(&path, original).unwrap();

        FilePreferenceStore::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn saved_value_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");

        let mut store = FilePreferenceStore::open(&path).unwrap();
        store.save(true).unwrap();
        drop(store);

        let reopened = FilePreferenceStore::open(&path).unwrap();
        assert!(reopened.load().unwrap());
    }

    #[test]
    fn failed_save_keeps_previous_value() {
        let dir = tempdir().unwrap();
        let prefs_dir = dir.path().join("prefs");
        let path = prefs_dir.join("preferences.json");

        let mut store = FilePreferenceStore::open(&path).unwrap();
        fs::remove_dir_all(&prefs_dir).unwrap();
        fs::write(&prefs_dir, "not a directory").unwrap();

        assert!(store.save(true).is_err());
        assert!(!store.load().unwrap());
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        fs::write(&path, "[1, 2").unwrap();

        let err = FilePreferenceStore::open(&path).unwrap_err();
        assert!(err.to_string().contains("Malformed preferences"));
    }
}
