//! Configuration loading and config file resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Steps 1 and 2 are collected by the binary (clap reads both) and applied
//! through [`ConfigOverrides`]; this module owns steps 3 and 4.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SOCKDRAWER_CONFIG";

/// Guess bridge configuration
///
/// Every field has a compiled default, so a TOML file only needs to name the
/// keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Scoring service endpoint (ZeroMQ syntax, e.g. `tcp://127.0.0.1:5555`)
    pub scoring_endpoint: String,
    /// Deadline for one scoring exchange, in milliseconds
    pub scoring_timeout_ms: u64,
    /// Longest accepted request URL, in bytes
    pub max_url_length: usize,
    /// Recent posts fetched per identifier
    pub post_limit: usize,
    /// Base URL of the content source
    pub content_source_url: String,
    /// Timeout for one content-source fetch, in milliseconds
    pub content_timeout_ms: u64,
    /// Lifetime of cached content-source results, in seconds (0 disables caching)
    pub content_cache_ttl_secs: u64,
    /// Most content-source results held in the cache; least recently used go first
    pub content_cache_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            scoring_endpoint: "tcp://127.0.0.1:5555".to_string(),
            scoring_timeout_ms: 10_000,
            max_url_length: 2048,
            post_limit: 20,
            content_source_url: "http://127.0.0.1:8080".to_string(),
            content_timeout_ms: 5_000,
            content_cache_ttl_secs: 3600 * 72,
            content_cache_capacity: 10_000,
        }
    }
}

/// Values supplied on the command line or through the environment
///
/// `None` means "not supplied"; the file/default value is kept.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_addr: Option<String>,
    pub scoring_endpoint: Option<String>,
    pub scoring_timeout_ms: Option<u64>,
    pub max_url_length: Option<usize>,
    pub post_limit: Option<usize>,
    pub content_source_url: Option<String>,
    pub content_timeout_ms: Option<u64>,
    pub content_cache_ttl_secs: Option<u64>,
    pub content_cache_capacity: Option<usize>,
}

impl BridgeConfig {
    /// Parse a TOML document; missing keys take their compiled defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from `path`, or from the first config file found
    ///
    /// A missing file is not an error: compiled defaults are used and a
    /// warning is logged. A file that exists but cannot be read or parsed is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = resolve_config_path(path) else {
            warn!("No config file found, using compiled defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Config file {} not found, using compiled defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply command-line/environment values on top of this configuration
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(v) = overrides.bind_addr {
            self.bind_addr = v;
        }
        if let Some(v) = overrides.scoring_endpoint {
            self.scoring_endpoint = v;
        }
        if let Some(v) = overrides.scoring_timeout_ms {
            self.scoring_timeout_ms = v;
        }
        if let Some(v) = overrides.max_url_length {
            self.max_url_length = v;
        }
        if let Some(v) = overrides.post_limit {
            self.post_limit = v;
        }
        if let Some(v) = overrides.content_source_url {
            self.content_source_url = v;
        }
        if let Some(v) = overrides.content_timeout_ms {
            self.content_timeout_ms = v;
        }
        if let Some(v) = overrides.content_cache_ttl_secs {
            self.content_cache_ttl_secs = v;
        }
        if let Some(v) = overrides.content_cache_capacity {
            self.content_cache_capacity = v;
        }
        self
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.scoring_timeout_ms == 0 {
            return Err(Error::Config("scoring_timeout_ms must be greater than 0".to_string()));
        }
        if self.content_timeout_ms == 0 {
            return Err(Error::Config("content_timeout_ms must be greater than 0".to_string()));
        }
        if self.max_url_length == 0 {
            return Err(Error::Config("max_url_length must be greater than 0".to_string()));
        }
        if self.post_limit == 0 {
            return Err(Error::Config("post_limit must be greater than 0".to_string()));
        }
        if self.content_cache_ttl_secs > 0 && self.content_cache_capacity == 0 {
            return Err(Error::Config(
                "content_cache_capacity must be greater than 0 while caching is enabled".to_string(),
            ));
        }
        if !["tcp://", "ipc://", "inproc://"]
            .iter()
            .any(|scheme| self.scoring_endpoint.starts_with(scheme))
        {
            return Err(Error::Config(format!(
                "scoring_endpoint must start with tcp://, ipc:// or inproc:// (got {:?})",
                self.scoring_endpoint
            )));
        }
        if !(self.content_source_url.starts_with("http://")
            || self.content_source_url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "content_source_url must be an http(s) URL (got {:?})",
                self.content_source_url
            )));
        }
        Ok(())
    }

    pub fn scoring_timeout(&self) -> Duration {
        Duration::from_millis(self.scoring_timeout_ms)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_millis(self.content_timeout_ms)
    }

    /// `None` when caching is disabled
    pub fn content_cache_ttl(&self) -> Option<Duration> {
        (self.content_cache_ttl_secs > 0).then(|| Duration::from_secs(self.content_cache_ttl_secs))
    }

    /// `None` when the capacity is zero
    pub fn content_cache_capacity(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.content_cache_capacity)
    }
}

/// Pick the config file to read
///
/// Priority: explicit path, then `SOCKDRAWER_CONFIG`, then the per-user
/// config directory, then `/etc/sockdrawer/config.toml`. The explicit and
/// environment paths are returned even if they do not exist, so the caller
/// can report them; the fallback locations are only returned when present.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("sockdrawer").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/sockdrawer/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}
