use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `tmdb.api_key`
pub const TMDB_API_KEY_ENV: &str = "TMDB_API_KEY";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tmdb: TmdbConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TmdbConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HistoryConfig {
    /// Only attach a fetched trailer if its movie is still the most recent entry
    #[serde(default)]
    pub require_trailer_match: bool,
    #[serde(default = "default_storage_file")]
    pub storage_file: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json_logging")]
    pub json: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_storage_file() -> String {
    "continue-watching-storage.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json_logging() -> bool {
    use std::io::IsTerminal;
    !std::io::stdout().is_terminal()
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_tmdb_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl TmdbConfig {
    /// API key from the environment, falling back to the config file
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(TMDB_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            require_trailer_match: false,
            storage_file: default_storage_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json_logging(),
            file: None,
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config file, or defaults when it has not been written yet
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tmdb.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("tmdb.timeout_seconds must be greater than zero"));
        }
        if self.tmdb.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("tmdb.base_url cannot be empty"));
        }
        if self.history.storage_file.trim().is_empty() {
            return Err(anyhow::anyhow!("history.storage_file cannot be empty"));
        }
        Ok(())
    }
}
