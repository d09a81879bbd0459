//! Order store configuration.

use serde::{Deserialize, Serialize};

/// Which order store adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local store; state is lost on exit.
    #[default]
    Memory,
    /// Turso (SQLite) database file.
    Sqlite,
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Store backend.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database file path for the sqlite backend.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "./data/orders.db".to_string()
}
