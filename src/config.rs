use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NoteboxError, Result};

/// Request budget for the global rate limiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests admitted per window; 0 disables limiting
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0 && self.window_secs > 0
    }
}

/// Configuration for `notebox serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// SQLite database file
    pub database: PathBuf,
    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
            database: PathBuf::from("notes.db"),
            cors_origins: vec!["http://localhost:5173".to_string()],
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from a YAML file. Keys missing from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            NoteboxError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Resolve `host` (an IP or a hostname such as `localhost`) with `port`.
    pub async fn socket_addr(&self) -> Result<SocketAddr> {
        let invalid = |detail: String| {
            NoteboxError::Config(format!("invalid listen address {}: {}", self.host, detail))
        };

        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("no addresses found".to_string()))
    }
}
