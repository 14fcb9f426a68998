use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const APP_DIR: &str = "gator";
const CONFIG_ENV: &str = "GATOR_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Session state: the user every authenticated command runs as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,

    #[serde(skip)]
    path: PathBuf,
}

/// The database lives under the platform data dir; the directory itself is
/// created when the database is opened.
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("gator.db")
        .to_string_lossy()
        .to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Reads the config at `path`, writing out defaults if it does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.path = path.to_path_buf();
            Ok(config)
        } else {
            let config = Config {
                db_path: default_db_path(),
                current_user_name: None,
                path: path.to_path_buf(),
            };
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn current_user_name(&self) -> Option<&str> {
        self.current_user_name.as_deref()
    }

    /// Switches the session user and persists the change immediately.
    pub fn set_user(&mut self, name: &str) -> Result<()> {
        self.current_user_name = Some(name.to_string());
        self.save()
    }

    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }
}
