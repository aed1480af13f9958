use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";

/// Load-time settings shared by the web server and the terminal app.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ollama_url: String,
    pub bind_addr: String,
    /// Preferred model when it is installed
    pub default_model: Option<String>,
    /// Select the first installed model when nothing else applies
    pub auto_select_first_model: bool,
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            default_model: None,
            auto_select_first_model: true,
            connect_timeout_secs: 5,
        }
    }

    /// Reads the config file (if any), then applies environment overrides.
    pub fn load() -> Result<Self> {
        Ok(Self::load_from(&Self::get_config_path()?)?.with_env())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Applies `OLLAMA_HOST` and `TRJ_CHAT_BIND` when set.
    pub fn with_env(self) -> Self {
        self.with_overrides(
            std::env::var("OLLAMA_HOST").ok(),
            std::env::var("TRJ_CHAT_BIND").ok(),
        )
    }

    /// Environment values win over the file.
    pub fn with_overrides(mut self, ollama_host: Option<String>, bind_addr: Option<String>) -> Self {
        if let Some(host) = ollama_host.filter(|h| !h.trim().is_empty()) {
            self.ollama_url = host;
        }
        if let Some(bind) = bind_addr.filter(|b| !b.trim().is_empty()) {
            self.bind_addr = bind;
        }
        self.ollama_url = normalize_base_url(&self.ollama_url);
        self
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("trj-chat"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

/// Accepts `host:port` as well as full URLs, like `OLLAMA_HOST` does.
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"default_model": "mistral", "auto_select_first_model": false}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.default_model.as_deref(), Some("mistral"));
        assert!(!config.auto_select_first_model);
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides_win() {
        let config = Config::new().with_overrides(
            Some("0.0.0.0:11434".to_string()),
            Some("0.0.0.0:9000".to_string()),
        );
        assert_eq!(config.ollama_url, "http://0.0.0.0:11434");
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        let config = Config::new().with_overrides(Some("  ".to_string()), None);
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        assert_eq!(normalize_base_url("http://gpu-box:11434/"), "http://gpu-box:11434");
    }
}
