use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::history::DEFAULT_HISTORY_LIMIT;

// =============================================================================
// Unified config (figment-deserialized from defaults / gloom.toml / env vars)
// =============================================================================
//
// Equivalent ways to configure:
//
//   gloom.toml:      [relay]
//                    history_limit = 50
//
//   env var:         GLOOM_RELAY__HISTORY_LIMIT=50   (double underscore = nesting)
//
//   PORT=8080 is honored for hosting platforms that inject it.

pub const DEFAULT_CONFIG_PATH: &str = "gloom.toml";

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub relay: RelayFileConfig,
}

/// HTTP listener and static assets (lives under `[server]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            index_file: default_index_file(),
        }
    }
}

/// Relay tunables (lives under `[relay]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayFileConfig {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_send_channel_capacity")]
    pub send_channel_capacity: usize,
    #[serde(default = "default_command_channel_capacity")]
    pub command_channel_capacity: usize,
}

impl Default for RelayFileConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            send_channel_capacity: default_send_channel_capacity(),
            command_channel_capacity: default_command_channel_capacity(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}
fn default_index_file() -> PathBuf {
    PathBuf::from("index.html")
}
fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_send_channel_capacity() -> usize {
    100
}
fn default_command_channel_capacity() -> usize {
    256
}

/// Build a figment that layers: defaults → config file → GLOOM_* env vars → PORT.
///
/// Env vars use double-underscore for nesting into sections:
///   `GLOOM_SERVER__PORT=8080`  →  `server.port = 8080`
///   `GLOOM_RELAY__HISTORY_LIMIT=50`  →  `relay.history_limit = 50`
pub fn load_config(config_path: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_path))
        .merge(Env::prefixed("GLOOM_").split("__"))
        .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
}

// =============================================================================
// Runtime config structs (derived from FileConfig)
// =============================================================================

/// Listener and asset configuration (runtime view).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub index_file: PathBuf,
}

impl ServerConfig {
    pub fn from_file(fc: &ServerFileConfig) -> Self {
        Self {
            host: fc.host.clone(),
            port: fc.port,
            static_dir: fc.static_dir.clone(),
            index_file: fc.index_file.clone(),
        }
    }

    /// `host:port` as handed to the listener (host names are resolved at bind time).
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Relay configuration (runtime view).
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Messages retained for late joiners
    pub history_limit: usize,
    /// Per-connection outbound queue depth; overflow is dropped
    pub send_channel_capacity: usize,
    /// Hub inbox depth
    pub command_channel_capacity: usize,
}

impl RelayConfig {
    pub fn from_file(fc: &RelayFileConfig) -> Self {
        Self {
            history_limit: fc.history_limit,
            // tokio channels panic on zero capacity
            send_channel_capacity: fc.send_channel_capacity.max(1),
            command_channel_capacity: fc.command_channel_capacity.max(1),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::from_file(&RelayFileConfig::default())
    }
}

/// Fully resolved configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub relay: RelayConfig,
}

impl AppConfig {
    pub fn from_file(fc: &FileConfig) -> Self {
        Self {
            server: ServerConfig::from_file(&fc.server),
            relay: RelayConfig::from_file(&fc.relay),
        }
    }

    /// Extract and resolve a layered figment.
    pub fn extract(figment: &figment::Figment) -> Result<Self> {
        let fc: FileConfig = figment.extract()?;
        Ok(Self::from_file(&fc))
    }
}
