//! Server configuration
//!
//! Configuration comes from an optional YAML file named by `DOCROOT_CONFIG`,
//! with `LISTEN` and `DOCROOT_DIR` environment overrides applied on top.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default page served for directory requests.
pub const DEFAULT_PAGE: &str = "index.html";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("read_buffer_size must be greater than zero")]
    ZeroBuffer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub defaults: ServerDefaults,
    pub handler: HandlerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Seconds a streaming response may wait for the socket before the
    /// connection is dropped.
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            idle_timeout_secs: 60,
        }
    }
}

/// Default page name and document directory.
///
/// Set up once before the listener starts and shared read-only with every
/// connection afterwards. An empty `default_dir` means no document root is
/// configured, and every request then fails URL validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerDefaults {
    default_page: String,
    default_dir: String,
}

impl Default for ServerDefaults {
    fn default() -> Self {
        Self {
            default_page: DEFAULT_PAGE.to_string(),
            default_dir: String::new(),
        }
    }
}

impl ServerDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page appended to directory URLs when redirecting.
    pub fn default_page(&self) -> &str {
        &self.default_page
    }

    /// Document root. Empty when unset.
    pub fn default_dir(&self) -> &str {
        &self.default_dir
    }

    pub fn set_default_page(&mut self, page: impl Into<String>) -> Result<(), ConfigError> {
        let page = page.into();
        if page.is_empty() {
            return Err(ConfigError::Empty("default_page"));
        }
        self.default_page = page;
        Ok(())
    }

    pub fn set_default_dir(&mut self, dir: impl Into<String>) -> Result<(), ConfigError> {
        let dir = dir.into();
        if dir.is_empty() {
            return Err(ConfigError::Empty("default_dir"));
        }
        self.default_dir = dir;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Reject DOS device names (`con`, `nul`, `aux`, ...) in URL segments.
    pub reject_reserved_names: bool,
    /// Extensions handed to the script evaluator instead of being streamed.
    pub dynamic_extensions: Vec<String>,
    /// Scratch buffer size for each streaming write event.
    pub read_buffer_size: usize,
    /// Redirect `/` to the default page before the default handler runs.
    pub home_page_redirect: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            reject_reserved_names: false,
            dynamic_extensions: vec!["asp".to_string()],
            read_buffer_size: 8192,
            home_page_redirect: false,
        }
    }
}

impl Config {
    /// Loads configuration from `DOCROOT_CONFIG` (if set) and the environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("DOCROOT_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path}"))?;
                Self::from_yaml(&raw)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = addr;
        }
        if let Ok(dir) = std::env::var("DOCROOT_DIR") {
            cfg.defaults.set_default_dir(dir)?;
        }

        Ok(cfg)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw).context("invalid YAML configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.default_page.is_empty() {
            return Err(ConfigError::Empty("default_page"));
        }
        if self.handler.read_buffer_size == 0 {
            return Err(ConfigError::ZeroBuffer);
        }
        Ok(())
    }
}
