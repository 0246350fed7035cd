use crate::error::{GalleryError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3005";
const DEFAULT_KEEP_UNUSED_SECS: u64 = 60;

/// Keys accepted by [`GalleryConfig::get`] and [`GalleryConfig::set`].
pub const KEYS: [&str; 3] = ["base-url", "latency-ms", "keep-unused-secs"];

/// Configuration for gallery, stored in `<config dir>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GalleryConfig {
    /// Root URL of the REST backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Artificial delay before each request, for watching loading states
    #[serde(default)]
    pub latency_ms: u64,

    /// How long a query result outlives its last subscriber
    #[serde(default = "default_keep_unused_secs")]
    pub keep_unused_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_keep_unused_secs() -> u64 {
    DEFAULT_KEEP_UNUSED_SECS
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            latency_ms: 0,
            keep_unused_secs: DEFAULT_KEEP_UNUSED_SECS,
        }
    }
}

impl GalleryConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir)?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn keep_unused_for(&self) -> Duration {
        Duration::from_secs(self.keep_unused_secs)
    }

    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            "base-url" => Ok(self.base_url.clone()),
            "latency-ms" => Ok(self.latency_ms.to_string()),
            "keep-unused-secs" => Ok(self.keep_unused_secs.to_string()),
            other => Err(unknown_key(other)),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "base-url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(GalleryError::Config(format!(
                        "base-url must start with http:// or https://, got {}",
                        value
                    )));
                }
                self.base_url = value.trim_end_matches('/').to_string();
            }
            "latency-ms" => self.latency_ms = parse_number(key, value)?,
            "keep-unused-secs" => self.keep_unused_secs = parse_number(key, value)?,
            other => return Err(unknown_key(other)),
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| GalleryError::Config(format!("{} expects a whole number, got {}", key, value)))
}

fn unknown_key(key: &str) -> GalleryError {
    GalleryError::Config(format!(
        "Unknown config key: {} (expected one of {})",
        key,
        KEYS.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GalleryConfig::default();
        assert_eq!(config.base_url, "http://localhost:3005");
        assert_eq!(config.latency(), Duration::ZERO);
        assert_eq!(config.keep_unused_for(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_missing_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = GalleryConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config, GalleryConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("gallery");

        let mut config = GalleryConfig::default();
        config.set("base-url", "http://10.0.0.2:3005/").unwrap();
        config.set("latency-ms", "250").unwrap();
        config.save(&nested).unwrap();

        let loaded = GalleryConfig::load(&nested).unwrap();
        assert_eq!(loaded.base_url, "http://10.0.0.2:3005");
        assert_eq!(loaded.latency(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILENAME),
            r#"{"latency-ms": 1000}"#,
        )
        .unwrap();

        let config = GalleryConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.latency_ms, 1000);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.keep_unused_secs, 60);
    }

    #[test]
    fn test_get_and_set_reject_bad_input() {
        let mut config = GalleryConfig::default();
        assert!(matches!(config.get("colour"), Err(GalleryError::Config(_))));
        assert!(config.set("latency-ms", "soon").is_err());
        assert!(config.set("base-url", "localhost:3005").is_err());
        assert_eq!(config, GalleryConfig::default());

        config.set("keep-unused-secs", "0").unwrap();
        assert_eq!(config.get("keep-unused-secs").unwrap(), "0");
    }
}
