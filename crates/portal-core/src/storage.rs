// ============================================================================
// Flag Storage - Browser-local style boolean flags (redb / in-memory)
// ============================================================================
// Persists one-shot UI flags such as "payment verified notice shown".
// Default path: ~/.portal/flags.redb (override via PORTAL_STATE_PATH env var)
// ============================================================================

use anyhow::{anyhow, Result};
use redb::{Database, TableDefinition};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

// Key -> unix timestamp the flag was set
const FLAGS: TableDefinition<&str, i64> = TableDefinition::new("flags");

/// Injected get/set/clear capability for persisted flags
pub trait FlagStore: Send + Sync {
    fn get(&self, key: &str) -> Result<bool>;
    fn set(&self, key: &str) -> Result<()>;
    fn clear(&self, key: &str) -> Result<()>;
}

/// Process-local flags, lost on exit
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: Mutex<HashMap<String, i64>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str) -> Result<bool> {
        let flags = self.flags.lock().map_err(|_| anyhow!("Flag store lock poisoned"))?;
        Ok(flags.contains_key(key))
    }

    fn set(&self, key: &str) -> Result<()> {
        let mut flags = self.flags.lock().map_err(|_| anyhow!("Flag store lock poisoned"))?;
        flags.insert(key.to_string(), chrono::Utc::now().timestamp());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let mut flags = self.flags.lock().map_err(|_| anyhow!("Flag store lock poisoned"))?;
        flags.remove(key);
        Ok(())
    }
}

/// Flags persisted in an embedded redb database
pub struct RedbFlagStore {
    db: Database,
    path: PathBuf,
}

impl RedbFlagStore {
    /// Open (or create) the flag database at the given path.
    /// If `path` is None, uses PORTAL_STATE_PATH env var or ~/.portal/flags.redb
    pub fn open(path: Option<&str>) -> Result<Self> {
        let db_path = if let Some(p) = path {
            PathBuf::from(p)
        } else if let Ok(env_path) = std::env::var("PORTAL_STATE_PATH") {
            PathBuf::from(env_path)
        } else {
            let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
            let portal_dir = home.join(".portal");
            std::fs::create_dir_all(&portal_dir)
                .map_err(|e| anyhow!("Failed to create .portal directory: {}", e))?;
            portal_dir.join("flags.redb")
        };

        info!("Opening flag store at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| anyhow!("Failed to open flag store: {}", e))?;

        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let _ = write_txn
                .open_table(FLAGS)
                .map_err(|e| anyhow!("Failed to create flags table: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        Ok(Self { db, path: db_path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the flag was set, if it is set
    pub fn set_at(&self, key: &str) -> Result<Option<i64>> {
        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(FLAGS)
            .map_err(|e| anyhow!("Failed to open flags table: {}", e))?;

        let value = table
            .get(key)
            .map_err(|e| anyhow!("Failed to get flag: {}", e))?
            .map(|v| v.value());
        Ok(value)
    }
}

impl FlagStore for RedbFlagStore {
    fn get(&self, key: &str) -> Result<bool> {
        Ok(self.set_at(key)?.is_some())
    }

    fn set(&self, key: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn.open_table(FLAGS)
                .map_err(|e| anyhow!("Failed to open flags table: {}", e))?;
            table.insert(key, now)
                .map_err(|e| anyhow!("Failed to insert flag: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Set flag: {}", key);
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn.open_table(FLAGS)
                .map_err(|e| anyhow!("Failed to open flags table: {}", e))?;
            table.remove(key)
                .map_err(|e| anyhow!("Failed to remove flag: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Cleared flag: {}", key);
        Ok(())
    }
}
