//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to all Meetly consent-service data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Persistent key-value storage (`data/storage.json`).
    pub storage_file: PathBuf,
    /// Consent-layer configuration overrides (`data/consent-config.json`).
    pub consent_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            storage_file: root.join("storage.json"),
            consent_config_file: root.join("consent-config.json"),
            root,
        };
        std::fs::create_dir_all(&paths.root)?;
        Ok(paths)
    }
}

/// Consent-layer configuration: storage key, allow-lists, origin host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    /// Key the consent record is persisted under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Origin hostname used for domain-scoped cookie expiry.
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Cookies whose names contain any of these substrings survive a purge.
    #[serde(default = "default_cookie_allowlist")]
    pub cookie_allowlist: Vec<String>,
    /// Storage keys that survive a purge (exact match).
    #[serde(default = "default_storage_allowlist")]
    pub storage_allowlist: Vec<String>,
    /// Delay before the front end shows the banner, in milliseconds.
    #[serde(default = "default_banner_delay_ms")]
    pub banner_delay_ms: u64,
}

fn default_storage_key() -> String {
    "cookies-consent".into()
}
fn default_hostname() -> String {
    "meetly.example".into()
}
fn default_cookie_allowlist() -> Vec<String> {
    ["cookies-consent", "session", "csrf-token", "auth-token"]
        .map(String::from)
        .to_vec()
}
fn default_storage_allowlist() -> Vec<String> {
    ["cookies-consent", "auth-user", "booking-data"]
        .map(String::from)
        .to_vec()
}
fn default_banner_delay_ms() -> u64 {
    1000
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            hostname: default_hostname(),
            cookie_allowlist: default_cookie_allowlist(),
            storage_allowlist: default_storage_allowlist(),
            banner_delay_ms: default_banner_delay_ms(),
        }
    }
}

impl ConsentConfig {
    /// Load configuration overrides from a JSON file, or return defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        std::fs::read_to_string(path.as_ref())
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }
}

/// Top-level Meetly consent-service configuration.
#[derive(Debug, Clone)]
pub struct MeetlyConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data file paths.
    pub data_paths: DataPaths,
    /// Consent-layer settings.
    pub consent: ConsentConfig,
}

impl MeetlyConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3004);

        let data_paths = DataPaths::new(data_dir)?;
        let consent = ConsentConfig::load(&data_paths.consent_config_file);

        Ok(Self {
            port,
            data_paths,
            consent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allowlists() {
        let config = ConsentConfig::default();
        assert_eq!(config.storage_key, "cookies-consent");
        assert!(config.cookie_allowlist.iter().any(|s| s == "csrf-token"));
        assert!(config.storage_allowlist.iter().any(|s| s == "booking-data"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: ConsentConfig =
            serde_json::from_str(r#"{"hostname": "meetly.app"}"#).unwrap();
        assert_eq!(config.hostname, "meetly.app");
        assert_eq!(config.storage_key, "cookies-consent");
        assert_eq!(config.banner_delay_ms, 1000);
    }
}
