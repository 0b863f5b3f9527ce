//! Server configuration
//!
//! Loaded from a TOML file passed via `--config`. The listener address,
//! server domain (used in generated Message-IDs and Path headers), and the
//! attachment upload directory all live here.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, YansError};

/// Which storage backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// SQLite file database
    Sqlite,
}

/// SQLite backend settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqliteConfig {
    /// Database file path
    #[serde(default)]
    pub path: String,
}

/// Top-level server configuration.
///
/// ```toml
/// address = "127.0.0.1"
/// port = 1119
/// ws_port = 1120
/// backend_type = "sqlite"
/// domain = "news.example.org"
/// upload_path = "/var/lib/yans/uploads"
///
/// [sqlite]
/// path = "/var/lib/yans/yans.db"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Interface to bind
    pub address: String,
    /// NNTP TCP port
    pub port: u16,
    /// Optional WebSocket tunnel port
    #[serde(default)]
    pub ws_port: Option<u16>,
    /// Storage backend selector
    pub backend_type: BackendType,
    /// Domain for generated Message-IDs and Path headers
    pub domain: String,
    /// Directory for attachment files
    pub upload_path: PathBuf,
    /// SQLite backend settings
    #[serde(default)]
    pub sqlite: SqliteConfig,
}

impl Config {
    /// Load and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| YansError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&data).map_err(|e| YansError::Config(e.to_string()))
    }

    /// `address:port` for the TCP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// `address:ws_port` for the WebSocket listener, when enabled.
    pub fn ws_listen_addr(&self) -> Option<String> {
        self.ws_port
            .map(|port| format!("{}:{}", self.address, port))
    }
}
