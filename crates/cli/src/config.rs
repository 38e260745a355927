use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
const CONFIG_FILE_NAME: &str = "cli.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            api_key: String::new(),
        }
    }
}

impl CliConfig {
    /// Apply `--server` / `--api-key` (or their env vars) over the file.
    pub fn with_overrides(mut self, server: Option<String>, api_key: Option<String>) -> Self {
        if let Some(url) = server.filter(|s| !s.trim().is_empty()) {
            self.server.url = url;
        }
        if let Some(key) = api_key.filter(|s| !s.trim().is_empty()) {
            self.server.api_key = key;
        }
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        Some(self.server.api_key.trim()).filter(|k| !k.is_empty())
    }
}

/// Get the config directory path (~/.config/gametaverns/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("gametaverns"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Read the config at `path`, or defaults when the file does not exist.
pub fn load_from(path: &Path) -> Result<CliConfig> {
    if !path.exists() {
        return Ok(CliConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config at {}", path.display()))
}

pub fn save_to(path: &Path, config: &CliConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config dir at {}", dir.display()))?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config at {}", path.display()))
}

pub fn load_config() -> Result<CliConfig> {
    load_from(&config_path()?)
}

pub fn save_config(config: &CliConfig) -> Result<()> {
    save_to(&config_path()?, config)
}

fn masked(key: &str) -> String {
    if key.is_empty() {
        "(not set)".to_string()
    } else {
        format!("{}...", &key[..8.min(key.len())])
    }
}

/// Print current config.
pub fn show_config(config: &CliConfig) -> Result<()> {
    println!("Config file: {}", config_path()?.display());
    println!();
    println!("[server]");
    println!("  url     = {}", config.server.url);
    println!("  api_key = {}", masked(&config.server.api_key));
    Ok(())
}

/// Persist the provided values, leaving the rest of the file alone.
pub fn set_config(server_url: Option<String>, api_key: Option<String>) -> Result<()> {
    let config = load_config()?.with_overrides(server_url, api_key);
    save_config(&config)?;
    println!("Configuration updated.");
    show_config(&config)
}
