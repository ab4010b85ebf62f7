use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "TASKBOARD_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub allow_insecure_certs: bool,
    pub request_timeout_secs: u64,
    /// Period of the background full reload.
    pub reload_interval_secs: u64,
    /// Fallback log filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            allow_insecure_certs: false,
            request_timeout_secs: 10,
            reload_interval_secs: 30,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn path() -> Option<PathBuf> {
        if let Ok(p) = env::var(CONFIG_PATH_ENV)
            && !p.is_empty()
        {
            return Some(PathBuf::from(p));
        }
        ProjectDirs::from("com", "taskboard", "taskboard")
            .map(|proj| proj.config_dir().join("config.toml"))
    }

    /// Loads the config file; a missing file yields the defaults.
    pub fn load() -> Result<Self> {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("in config {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw).context("parsing TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            bail!("base_url must not be empty");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        if self.reload_interval_secs == 0 {
            bail!("reload_interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml_str("base_url = \"https://tasks.example.org\"\n").unwrap();
        assert_eq!(config.base_url, "https://tasks.example.org");
        assert_eq!(config.reload_interval(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(!config.allow_insecure_certs);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn rejects_zero_interval_and_bad_types() {
        assert!(Config::from_toml_str("reload_interval_secs = 0").is_err());
        assert!(Config::from_toml_str("base_url = \"\"").is_err());
        assert!(Config::from_toml_str("request_timeout_secs = \"ten\"").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "base_url = \"http://10.0.0.2:8000\"\nallow_insecure_certs = true\nlog_level = \"debug\"\n",
        )
        .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert!(config.allow_insecure_certs);
        assert_eq!(config.log_level, "debug");
    }
}
