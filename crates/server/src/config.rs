use std::path::PathBuf;
use std::time::Duration;

use gametaverns_api::service::DEFAULT_MESSAGE_RATE_LIMIT;
use gametaverns_bgg::BggConfig;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub base_url: String,
    pub registration_open: bool,
    pub message_rate_limit: u32,
    pub ip_hash_salt: String,
    pub bgg: BggConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            port: 3000,
            base_url: "http://localhost:3000".into(),
            registration_open: true,
            message_rate_limit: DEFAULT_MESSAGE_RATE_LIMIT,
            ip_hash_salt: String::new(),
            bgg: BggConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let port = get("PORT").and_then(|v| v.parse().ok()).unwrap_or(defaults.port);
        let base_url = get("BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}"));

        let ip_hash_salt = get("IP_HASH_SALT").unwrap_or_default();
        if ip_hash_salt.is_empty() {
            tracing::warn!("IP_HASH_SALT not set, sender IPs are hashed without a salt");
        }

        let mut bgg = defaults.bgg;
        if let Some(base) = get("BGG_API_BASE") {
            bgg.base_url = base;
        }
        if let Some(ms) = get("BGG_PAGE_DELAY_MS").and_then(|v| v.parse().ok()) {
            bgg.page_delay = Duration::from_millis(ms);
        }

        Self {
            data_dir: get("GAMETAVERNS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            port,
            base_url,
            registration_open: get("GAMETAVERNS_REGISTRATION").as_deref() != Some("closed"),
            message_rate_limit: get("MESSAGE_RATE_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.message_rate_limit),
            ip_hash_salt,
            bgg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = from_map(&[]);
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.base_url, "http://localhost:3000");
        assert!(cfg.registration_open);
        assert_eq!(cfg.message_rate_limit, 5);
        assert_eq!(cfg.bgg.base_url, "https://boardgamegeek.com");
        assert_eq!(cfg.bgg.page_delay, Duration::from_secs(1));
    }

    #[test]
    fn reads_overrides() {
        let cfg = from_map(&[
            ("PORT", "8080"),
            ("GAMETAVERNS_REGISTRATION", "closed"),
            ("MESSAGE_RATE_LIMIT", "2"),
            ("BGG_API_BASE", "http://bgg.local"),
            ("BGG_PAGE_DELAY_MS", "0"),
            ("GAMETAVERNS_DATA_DIR", "/var/lib/gt"),
        ]);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.base_url, "http://localhost:8080");
        assert!(!cfg.registration_open);
        assert_eq!(cfg.message_rate_limit, 2);
        assert_eq!(cfg.bgg.base_url, "http://bgg.local");
        assert_eq!(cfg.bgg.page_delay, Duration::ZERO);
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/gt"));
    }

    #[test]
    fn blank_values_fall_back() {
        let cfg = from_map(&[("PORT", "  "), ("MESSAGE_RATE_LIMIT", "lots")]);
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.message_rate_limit, 5);
    }
}
