//! Persistence boundary for the widget config and the quest list.
//!
//! The core never touches files directly; it goes through [`Storage`].
//! Loading upgrades legacy records in place (missing tag, stale cursor,
//! out-of-range character fields) instead of rejecting them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::GlobalConfig;
use crate::quest::Quest;

pub const CONFIG_FILE: &str = "quest_config_v18.json";
pub const QUESTS_FILE: &str = "quests_v18.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read/write file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("file {path} has invalid contents: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub trait Storage {
    fn load_config(&self) -> Result<GlobalConfig, StorageError>;
    fn save_config(&mut self, config: &GlobalConfig) -> Result<(), StorageError>;
    fn load_quests(&self) -> Result<Vec<Quest>, StorageError>;
    fn save_quests(&mut self, quests: &[Quest]) -> Result<(), StorageError>;
}

/// Upgrade loaded quests so the step-cursor invariant holds
pub fn migrate_quests(quests: &mut [Quest]) {
    for quest in quests.iter_mut() {
        let expected = quest.first_incomplete();
        if quest.current_step != expected {
            debug!(
                "Quest {} cursor {} does not match steps, using {}",
                quest.id, quest.current_step, expected
            );
            quest.current_step = expected;
        }
        for step in &mut quest.steps {
            step.exp_reward = step.exp_reward.max(0);
        }
    }
}

/// JSON files in a data directory
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn quests_path(&self) -> PathBuf {
        self.dir.join(QUESTS_FILE)
    }

    fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(value).map_err(|source| StorageError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        write_text_atomic(path, &json).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Storage for JsonStore {
    fn load_config(&self) -> Result<GlobalConfig, StorageError> {
        let path = self.config_path();
        let Some(content) = Self::read_optional(&path)? else {
            info!("No config at {:?}, using defaults", path);
            return Ok(GlobalConfig::default());
        };
        let mut config: GlobalConfig =
            serde_json::from_str(&content).map_err(|source| StorageError::Parse {
                path: path.clone(),
                source,
            })?;
        config.repair();
        Ok(config)
    }

    fn save_config(&mut self, config: &GlobalConfig) -> Result<(), StorageError> {
        Self::write_json(&self.config_path(), config)
    }

    fn load_quests(&self) -> Result<Vec<Quest>, StorageError> {
        let path = self.quests_path();
        let Some(content) = Self::read_optional(&path)? else {
            return Ok(Vec::new());
        };
        let mut quests: Vec<Quest> =
            serde_json::from_str(&content).map_err(|source| StorageError::Parse {
                path: path.clone(),
                source,
            })?;
        migrate_quests(&mut quests);
        info!("Loaded {} quests from {:?}", quests.len(), path);
        Ok(quests)
    }

    fn save_quests(&mut self, quests: &[Quest]) -> Result<(), StorageError> {
        Self::write_json(&self.quests_path(), quests)
    }
}

/// In-memory storage for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub config: Option<GlobalConfig>,
    pub quests: Vec<Quest>,
    pub saves: usize,
}

impl Storage for MemoryStore {
    fn load_config(&self) -> Result<GlobalConfig, StorageError> {
        let mut config = self.config.clone().unwrap_or_default();
        config.repair();
        Ok(config)
    }

    fn save_config(&mut self, config: &GlobalConfig) -> Result<(), StorageError> {
        self.config = Some(config.clone());
        self.saves += 1;
        Ok(())
    }

    fn load_quests(&self) -> Result<Vec<Quest>, StorageError> {
        let mut quests = self.quests.clone();
        migrate_quests(&mut quests);
        Ok(quests)
    }

    fn save_quests(&mut self, quests: &[Quest]) -> Result<(), StorageError> {
        self.quests = quests.to_vec();
        self.saves += 1;
        Ok(())
    }
}

/// Write through a sibling temp file so a crash never leaves a torn file
fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("questmap.json");
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp_path, text)?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        warn!("Failed to move {:?} into place: {}", tmp_path, error);
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::MapPosition;
    use crate::quest::QuestTag;
    use tempfile::TempDir;

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        assert_eq!(store.load_config().unwrap(), GlobalConfig::default());
        assert!(store.load_quests().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonStore::new(&dir.path().join("nested"));

        let mut config = GlobalConfig::default();
        config.theme_color = "#3b82f6".to_string();
        let mut quest = Quest::new("Read a book", MapPosition::new(10.0, 20.0));
        quest.tag = QuestTag::SelfDev;

        store.save_config(&config).unwrap();
        store.save_quests(&[quest.clone()]).unwrap();

        assert_eq!(store.load_config().unwrap(), config);
        assert_eq!(store.load_quests().unwrap(), vec![quest]);
        assert!(!store.quests_path().with_file_name("quests_v18.json.tmp").exists());
    }

    #[test]
    fn test_legacy_quests_are_upgraded() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        let legacy = r#"[{"id":"q1","title":"Legacy","isActive":true,"currentStep":3,
            "steps":[{"id":"s1","text":"a","isCompleted":true,"expReward":20,"mapPosition":[0,0]},
                     {"id":"s2","text":"b","isCompleted":false,"expReward":20,"mapPosition":[0,100]}]}]"#;
        fs::write(store.quests_path(), legacy).unwrap();

        let quests = store.load_quests().unwrap();
        assert_eq!(quests[0].tag, QuestTag::Etc);
        assert_eq!(quests[0].current_step, 1);
    }

    #[test]
    fn test_record_without_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path());
        fs::write(store.quests_path(), r#"[{"title":"No id"}]"#).unwrap();
        assert!(matches!(store.load_quests(), Err(StorageError::Parse { .. })));
    }

    #[test]
    fn test_unencodable_value_is_an_encode_error() {
        use std::collections::BTreeMap;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        // JSON object keys must be strings
        let mut value = BTreeMap::new();
        value.insert((1, 2), "pair");

        let err = JsonStore::write_json(&path, &value).unwrap_err();
        assert!(matches!(err, StorageError::Encode { .. }));
        assert!(err.to_string().starts_with("failed to encode"));
        assert!(!path.exists());
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::default();
        let quest = Quest::new("Walk", MapPosition::ORIGIN);
        store.save_quests(&[quest.clone()]).unwrap();
        store.save_config(&GlobalConfig::default()).unwrap();
        assert_eq!(store.saves, 2);
        assert_eq!(store.load_quests().unwrap(), vec![quest]);
    }
}
