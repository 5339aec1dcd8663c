//! Server configuration and the full layered settings.

use lanwatch_core::config::load_section;
use lanwatch_discover::DiscoverConfig;
use lanwatch_registry::RegistryConfig;
use lanwatch_sync::HubConfig;
use serde::Deserialize;

use crate::error::ServerError;

/// Every configuration section the binary reads.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub discover: DiscoverConfig,
    pub hub: HubConfig,
    pub registry: RegistryConfig,
}

impl Settings {
    /// Load all sections from `<file_prefix>.toml` and `LANWATCH__*` variables.
    pub fn load(file_prefix: &str) -> Result<Self, ServerError> {
        Ok(Self {
            server: load_section(file_prefix, "server")?,
            discover: load_section(file_prefix, "discover")?,
            hub: load_section(file_prefix, "hub")?,
            registry: load_section(file_prefix, "registry")?,
        })
    }
}

/// `[server]` configuration section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_bind")]
    pub http_bind: String,

    #[serde(default = "default_ws_bind")]
    pub ws_bind: String,

    /// Upgrade path accepted by the WebSocket listener.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Origins allowed to call the HTTP API from a browser.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Interval for scheduled scans of the default range. Unset disables them.
    #[serde(default)]
    pub scan_interval_secs: Option<u64>,
}

fn default_http_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_ws_bind() -> String {
    "0.0.0.0:8001".to_string()
}

fn default_ws_path() -> String {
    "/ws/sync".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind: default_http_bind(),
            ws_bind: default_ws_bind(),
            ws_path: default_ws_path(),
            cors_origins: default_cors_origins(),
            scan_interval_secs: None,
        }
    }
}
