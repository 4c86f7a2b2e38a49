use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "D2B_ASL_CONFIG";

/// Name of the pointer file stored next to the default config file.
pub const POINTER_FILE_NAME: &str = ".d2b_asl_config_path";

/// Keys accepted by `config set`, in display order.
pub const CONFIG_KEYS: &[&str] = &["include-aslcontext-json", "log-dir"];

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Default for `--include-aslcontext-json` when neither flag is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_aslcontext_json: Option<bool>,
    /// Directory for the run log file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

impl Config {
    /// Directory holding the default config file and the pointer file.
    pub fn default_dir() -> PathBuf {
        #[cfg(not(target_os = "windows"))]
        let base = dirs::home_dir().map(|home| home.join(".config"));

        #[cfg(target_os = "windows")]
        let base = dirs::config_dir();

        base.unwrap_or_else(|| PathBuf::from(".")).join("d2b-asl")
    }

    /// Resolve the config file path.
    ///
    /// Precedence: `D2B_ASL_CONFIG`, then the pointer file, then the default
    /// `d2b-asl.toml` in [`Config::default_dir`].
    pub fn path() -> PathBuf {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        let dir = Self::default_dir();
        if let Some(pointed) = read_pointer(&dir.join(POINTER_FILE_NAME)) {
            return pointed;
        }

        dir.join("d2b-asl.toml")
    }

    /// Path of the pointer file used by `config path <new_path>`.
    pub fn pointer_path() -> PathBuf {
        Self::default_dir().join(POINTER_FILE_NAME)
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path())
    }

    /// Load the config at `path`; a missing file yields the default config.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "include-aslcontext-json" => self.include_aslcontext_json.map(|v| v.to_string()),
            "log-dir" => self.log_dir.clone(),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "include-aslcontext-json" => {
                let parsed = parse_bool(value).ok_or_else(|| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected true or false".to_string(),
                })?;
                self.include_aslcontext_json = Some(parsed);
            }
            "log-dir" => {
                if value.trim().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        reason: "path must not be empty".to_string(),
                    });
                }
                self.log_dir = Some(value.trim().to_string());
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.include_aslcontext_json.is_none() && self.log_dir.is_none()
    }

    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        CONFIG_KEYS
            .iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }

    pub fn log_dir_path(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(PathBuf::from)
    }

    /// Effective default for writing `*_aslcontext.json` files.
    pub fn include_aslcontext_json(&self) -> bool {
        self.include_aslcontext_json.unwrap_or(false)
    }
}

fn read_pointer(pointer: &Path) -> Option<PathBuf> {
    let contents = fs::read_to_string(pointer).ok()?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}
