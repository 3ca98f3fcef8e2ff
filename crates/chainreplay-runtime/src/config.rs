use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use chainreplay_store::{MemoryTimelineStore, SqliteTimelineStore, TimelineStore};

use crate::alerts::AlertDispatcherConfig;
use crate::error::{Error, Result};
use crate::policy::ReplayPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    Memory,
    Sqlite,
}

impl StoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreType::Memory => "memory",
            StoreType::Sqlite => "sqlite",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub store_type: StoreType,
    /// Database path; required for the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::Memory,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    pub page_size: usize,
    #[serde(default)]
    pub max_lag_slots: Option<u64>,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            page_size: 256,
            max_lag_slots: None,
        }
    }
}

/// Top-level runtime configuration, persisted as TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
    #[serde(default)]
    pub alerts: AlertDispatcherConfig,
    #[serde(default)]
    pub policy: ReplayPolicy,
}

impl ReplayConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ReplayConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Open the configured store backend.
    pub fn open_store(&self) -> Result<Box<dyn TimelineStore>> {
        match self.store.store_type {
            StoreType::Memory => Ok(Box::new(MemoryTimelineStore::new())),
            StoreType::Sqlite => {
                let path = self.store.path.as_ref().ok_or_else(|| {
                    Error::Config("sqlite store requires store.path".to_string())
                })?;
                Ok(Box::new(SqliteTimelineStore::open(path)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = ReplayConfig::default();
        config.store.store_type = StoreType::Sqlite;
        config.store.path = Some(dir.path().join("timeline.db"));
        config.backfill.page_size = 64;
        config.policy.denylist.push("backfill".to_string());

        config.save_to(&path).unwrap();
        let loaded = ReplayConfig::load_from(&path).unwrap();
        assert_eq!(loaded.store.store_type, StoreType::Sqlite);
        assert_eq!(loaded.backfill.page_size, 64);
        assert_eq!(loaded.policy.denylist, vec!["backfill".to_string()]);
    }

    #[test]
    fn test_missing_file_yields_default() {
        let config = ReplayConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.store.store_type, StoreType::Memory);
    }

    #[test]
    fn test_sqlite_requires_path() {
        let config = ReplayConfig {
            store: StoreConfig {
                store_type: StoreType::Sqlite,
                path: None,
            },
            ..Default::default()
        };
        assert!(matches!(config.open_store(), Err(Error::Config(_))));
    }
}
