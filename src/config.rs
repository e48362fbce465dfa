//! Library and CLI configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MTOMXOP_CONFIG` (environment variable)
//! 2. `~/.config/mtomxop/config.toml` (Linux/macOS)
//!    `%APPDATA%\mtomxop\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::cid::{CidDomain, DEFAULT_CID_DOMAIN, DEFAULT_ROOT_LOCAL_PART};
use crate::xop::{PackageSettings, DEFAULT_CHARSET};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// XOP package identity.
    pub package: PackageConfig,
    /// HTTP transport settings.
    pub http: HttpConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// XOP package identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// Domain part of every generated Content-ID.
    pub cid_domain: String,
    /// Local part of the root part's Content-ID.
    pub root_local_part: String,
    /// Charset declared on the root part.
    pub charset: String,
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds (0 = no timeout).
    pub timeout_secs: u64,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            cid_domain: DEFAULT_CID_DOMAIN.to_string(),
            root_local_part: DEFAULT_ROOT_LOCAL_PART.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            user_agent: concat!("mtomxop/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// CID domain passed to attachment constructors.
    pub fn cid_domain(&self) -> CidDomain {
        CidDomain::new(self.package.cid_domain.clone())
    }

    /// Settings for envelopes and packages.
    pub fn package_settings(&self) -> PackageSettings {
        PackageSettings {
            cid_domain: self.cid_domain(),
            root_local_part: self.package.root_local_part.clone(),
            charset: self.package.charset.clone(),
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MTOMXOP_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mtomxop").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mtomxop")
}
