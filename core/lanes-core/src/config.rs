//! Configuration loading.
//!
//! Producers (`lanes-hook`) and the consumer (`lanes-watch`) must agree on the
//! signal directories, so both resolve them through [`load_config`]:
//! defaults, then `~/.lanes/config.toml`, then environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agents::AgentConfig;
use crate::error::{LanesError, Result};

/// Environment variable carrying the owning workspace into agent processes.
pub const WORKSPACE_ID_ENV: &str = "LANES_WORKSPACE_ID";
pub const ACTIVITY_DIR_ENV: &str = "LANES_ACTIVITY_DIR";
pub const NOTIFY_DIR_ENV: &str = "LANES_NOTIFY_DIR";
pub const POLL_INTERVAL_ENV: &str = "LANES_POLL_INTERVAL_MS";
pub const CONFIG_PATH_ENV: &str = "LANES_CONFIG";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const MIN_POLL_INTERVAL_MS: u64 = 50;
const MAX_POLL_INTERVAL_MS: u64 = 5_000;

const APP_DIR_NAME: &str = ".lanes";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanesConfig {
    /// Directory holding activity markers.
    pub activity_dir: PathBuf,
    /// Directory holding one-shot notify signals.
    pub notify_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub agents: AgentConfig,
}

impl Default for LanesConfig {
    fn default() -> Self {
        let tmp = std::env::temp_dir();
        Self {
            activity_dir: tmp.join("lanes-activity"),
            notify_dir: tmp.join("lanes-notify"),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            agents: AgentConfig::default(),
        }
    }
}

impl LanesConfig {
    /// Config rooted at an explicit directory; used by tests and embedders.
    pub fn in_dir(root: &Path) -> Self {
        Self {
            activity_dir: root.join("activity"),
            notify_dir: root.join("notify"),
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.poll_interval_ms
                .clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS),
        )
    }

    /// Applies `LANES_*` overrides through `lookup` (normally `std::env::var`).
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = non_empty(ACTIVITY_DIR_ENV) {
            self.activity_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty(NOTIFY_DIR_ENV) {
            self.notify_dir = PathBuf::from(dir);
        }
        if let Some(raw) = non_empty(POLL_INTERVAL_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.poll_interval_ms = ms,
                Err(_) => {
                    tracing::warn!(value = %raw, "Ignoring invalid {}", POLL_INTERVAL_ENV);
                }
            }
        }
        self
    }
}

/// Returns `~/.lanes`.
pub fn lanes_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_DIR_NAME))
}

pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    lanes_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok_or(LanesError::HomeDirNotFound)
}

/// Reads a config file, returning defaults if it doesn't exist.
pub fn read_config_file(path: &Path) -> Result<LanesConfig> {
    if !path.exists() {
        return Ok(LanesConfig::default());
    }

    let content = fs_err::read_to_string(path)
        .map_err(|err| LanesError::io(format!("reading {}", path.display()), err))?;
    toml::from_str::<LanesConfig>(&content).map_err(|err| LanesError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

/// Loads configuration from `path` (or the default location) and applies
/// environment overrides.
pub fn load_config(path: Option<PathBuf>) -> Result<LanesConfig> {
    let path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };
    Ok(read_config_file(&path)?.apply_overrides(|key| std::env::var(key).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = tempfile::tempdir().expect("temp dir");
        let config = read_config_file(&temp.path().join("missing.toml")).expect("config");
        assert_eq!(config, LanesConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_parses_partial_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
activity_dir = "/var/run/lanes/activity"
poll_interval_ms = 250

[agents]
disabled = ["amp"]
"#,
        )
        .expect("write config");

        let config = read_config_file(&path).expect("config");
        assert_eq!(config.activity_dir, PathBuf::from("/var/run/lanes/activity"));
        assert_eq!(config.notify_dir, LanesConfig::default().notify_dir);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.agents.disabled, vec!["amp".to_string()]);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("config.toml");
        fs_err::write(&path, "poll_interval_ms = \"fast\"").expect("write config");

        assert!(matches!(
            read_config_file(&path),
            Err(LanesError::ConfigMalformed { .. })
        ));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let env: HashMap<&str, &str> = [
            (ACTIVITY_DIR_ENV, "/a"),
            (NOTIFY_DIR_ENV, "  "),
            (POLL_INTERVAL_ENV, "125"),
        ]
        .into_iter()
        .collect();

        let config =
            LanesConfig::default().apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.activity_dir, PathBuf::from("/a"));
        assert_eq!(config.notify_dir, LanesConfig::default().notify_dir);
        assert_eq!(config.poll_interval_ms, 125);
    }

    #[test]
    fn test_invalid_interval_override_is_ignored() {
        let config = LanesConfig::default().apply_overrides(|key| {
            (key == POLL_INTERVAL_ENV).then(|| "soon".to_string())
        });
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[test]
    fn test_poll_interval_is_clamped() {
        let mut config = LanesConfig::default();
        config.poll_interval_ms = 0;
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        config.poll_interval_ms = 60_000;
        assert_eq!(config.poll_interval(), Duration::from_millis(5_000));
    }
}
