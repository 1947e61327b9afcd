use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, SubtransError};

/// Environment variable naming a config file when `--config` is absent
pub const CONFIG_ENV: &str = "SUBTRANS_CONFIG";

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "subtrans.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Which translation backend to drive
    pub kind: BackendKind,
    pub argos: ArgosConfig,
    pub libretranslate: LibreTranslateConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Argos Translate: `argospm` for packages, `argos-translate` for text
    #[default]
    Argos,
    /// LibreTranslate HTTP server
    #[value(name = "libretranslate")]
    LibreTranslate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgosConfig {
    /// Path to the argos-translate binary
    pub translate_binary: String,
    /// Path to the argospm package manager binary
    pub package_binary: String,
    /// Exported as ARGOS_PACKAGES_DIR to both tools when set
    pub packages_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibreTranslateConfig {
    /// LibreTranslate server URL
    pub endpoint: String,
    /// API key stored directly in config
    pub api_key: Option<String>,
    /// Environment variable holding the API key, preferred over `api_key`
    pub api_key_env: Option<String>,
    /// Request timeout
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files; console-only when unset
    pub directory: Option<PathBuf>,
}

impl Default for ArgosConfig {
    fn default() -> Self {
        Self {
            translate_binary: "argos-translate".to_string(),
            package_binary: "argospm".to_string(),
            packages_dir: None,
        }
    }
}

impl Default for LibreTranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000".to_string(),
            api_key: None,
            api_key_env: None,
            timeout_secs: 60,
        }
    }
}

impl LibreTranslateConfig {
    /// Gets the API key, preferring the environment variable over the config file.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(env_var) = &self.api_key_env {
            if let Ok(key) = std::env::var(env_var) {
                if !key.is_empty() {
                    return Some(key);
                }
            }
        }
        self.api_key.clone()
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SubtransError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| SubtransError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubtransError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubtransError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Locate and load the configuration.
    ///
    /// Order: explicit path, `SUBTRANS_CONFIG`, `subtrans.toml` in the working
    /// directory, built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Self::from_file(path);
            }
        }

        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }

        Ok(Self::default())
    }
}
