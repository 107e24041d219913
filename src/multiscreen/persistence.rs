//! Topology persistence
//!
//! Records are keyed by the secondary panel's serial hash and remember which
//! main panel it was paired with, in which mode, at which positions.

use anyhow::Context;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::position::PairPositions;
use super::MultiScreenMode;
use crate::error::{Result, ScreenError};

/// Persisted topology of one screen pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyRecord {
    /// Serial hash of the main panel
    pub main_serial_hash: String,
    /// Mode of the pair
    pub mode: MultiScreenMode,
    /// Start positions (origin for mirror)
    pub positions: PairPositions,
}

/// Key-value settings store for topology records
pub trait SettingsStore: Send + Sync {
    /// Record stored for a panel hash
    fn get(&self, serial_hash: &str) -> Result<Option<TopologyRecord>>;

    /// Store a record for a panel hash
    fn set(&self, serial_hash: &str, record: TopologyRecord) -> Result<()>;
}

/// Store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    records: Mutex<BTreeMap<String, TopologyRecord>>,
}

impl MemorySettingsStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, serial_hash: &str) -> Result<Option<TopologyRecord>> {
        Ok(self.records.lock().get(serial_hash).cloned())
    }

    fn set(&self, serial_hash: &str, record: TopologyRecord) -> Result<()> {
        self.records.lock().insert(serial_hash.to_string(), record);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    topology: BTreeMap<String, TopologyRecord>,
}

/// Store backed by a TOML file, rewritten on every change
#[derive(Debug)]
pub struct TomlSettingsStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, TopologyRecord>>,
}

impl TomlSettingsStore {
    /// Open a store, loading existing records if the file exists
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read topology store {}", path.display()))?;
            let file: StoreFile = toml::from_str(&content)
                .with_context(|| format!("Failed to parse topology store {}", path.display()))?;
            info!("Loaded {} topology records from {}", file.topology.len(), path.display());
            file.topology
        } else {
            debug!("Topology store {} does not exist yet", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// File backing this store
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, records: &BTreeMap<String, TopologyRecord>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let file = StoreFile {
            topology: records.clone(),
        };
        let content = toml::to_string_pretty(&file).context("Failed to serialize topology store")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write topology store {}", self.path.display()))
    }
}

impl SettingsStore for TomlSettingsStore {
    fn get(&self, serial_hash: &str) -> Result<Option<TopologyRecord>> {
        Ok(self.records.lock().get(serial_hash).cloned())
    }

    fn set(&self, serial_hash: &str, record: TopologyRecord) -> Result<()> {
        let mut records = self.records.lock();
        records.insert(serial_hash.to_string(), record);
        self.write(&records)
            .map_err(|e| ScreenError::Settings(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::Point;
    use tempfile::TempDir;

    fn record() -> TopologyRecord {
        TopologyRecord {
            main_serial_hash: "a1b2".to_string(),
            mode: MultiScreenMode::Extend,
            positions: PairPositions {
                main: Point::ORIGIN,
                secondary: Point::new(2560, 0),
            },
        }
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySettingsStore::new();
        assert_eq!(store.get("ffff").unwrap(), None);
        store.set("ffff", record()).unwrap();
        assert_eq!(store.get("ffff").unwrap(), Some(record()));
    }

    #[test]
    fn test_toml_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("topology.toml");

        let store = TomlSettingsStore::open(&path).unwrap();
        store.set("c3d4", record()).unwrap();
        assert!(path.exists());

        let reopened = TomlSettingsStore::open(&path).unwrap();
        assert_eq!(reopened.get("c3d4").unwrap(), Some(record()));
        assert_eq!(reopened.get("missing").unwrap(), None);
    }

    #[test]
    fn test_toml_store_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("topology.toml");
        fs::write(&path, "topology = 3").unwrap();

        assert!(TomlSettingsStore::open(&path).is_err());
    }
}
