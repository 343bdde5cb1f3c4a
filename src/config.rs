use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SchoolMatchError};

pub const MISSING_PUBLIC_KEY_MESSAGE: &str = "Google Maps API key is missing. Please add NEXT_PUBLIC_GOOGLE_MAPS_API_KEY to your environment variables.";

/// Main configuration structure for school-match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub maps: MapsConfig,
    pub backend: BackendConfig,
    pub proxy: ProxyConfig,
    pub autocomplete: AutocompleteConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    /// Key used server-side by the geocode proxy
    #[serde(default)]
    pub server_api_key: Option<String>,
    /// Key used by the address autocomplete
    #[serde(default)]
    pub public_api_key: Option<String>,
    pub geocode_url: String,
    pub autocomplete_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutocompleteConfig {
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub default_k: u32,
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    /// Always returns a usable config.
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!("No .env file found - continuing with env vars only");
        }

        let config_path = env::var("SCHOOL_MATCH_CONFIG_PATH")
            .unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match Self::from_yaml(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| SchoolMatchError::Config(e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key lookup (the process environment in production).
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Maps overrides
        if let Some(key) = lookup("GOOGLE_MAPS_API_KEY") {
            self.maps.server_api_key = Some(key);
        }
        if let Some(key) = lookup("NEXT_PUBLIC_GOOGLE_MAPS_API_KEY") {
            self.maps.public_api_key = Some(key);
        }
        if let Some(url) = lookup("GOOGLE_GEOCODING_API_URI") {
            self.maps.geocode_url = url;
        }
        if let Some(url) = lookup("GOOGLE_AUTOCOMPLETE_API_URI") {
            self.maps.autocomplete_url = url;
        }

        // Backend overrides
        if let Some(url) = lookup("NEXT_PUBLIC_BACKEND_URI") {
            self.backend.base_url = url;
        }
        if let Some(timeout) = lookup("SCHOOL_MATCH_BACKEND_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.backend.timeout_seconds = secs;
            }
        }

        if let Some(bind) = lookup("SCHOOL_MATCH_PROXY_BIND") {
            self.proxy.bind = bind;
        }

        if let Some(debounce) = lookup("SCHOOL_MATCH_DEBOUNCE_MS") {
            if let Ok(ms) = debounce.parse() {
                self.autocomplete.debounce_ms = ms;
            }
        }

        if let Some(k) = lookup("SCHOOL_MATCH_DEFAULT_K") {
            if let Ok(k) = k.parse() {
                self.ranking.default_k = k;
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> std::result::Result<(), Box<dyn std::error::Error>> {
        if self.backend.base_url.trim().is_empty() {
            return Err("Backend base URL cannot be empty".into());
        }
        if self.backend.timeout_seconds == 0 {
            return Err("Backend timeout cannot be 0".into());
        }
        if self.proxy.bind.parse::<SocketAddr>().is_err() {
            return Err(format!("Invalid proxy bind address: {}", self.proxy.bind).into());
        }
        if self.ranking.default_k == 0 {
            return Err("Ranking default_k cannot be 0".into());
        }
        if self.maps.public_api_key.as_deref().is_none_or(str::is_empty) {
            return Err("NEXT_PUBLIC_GOOGLE_MAPS_API_KEY is not set".into());
        }
        Ok(())
    }

    /// Public maps key, or the configuration error that replaces the search UI.
    pub fn public_maps_key(&self) -> Result<&str> {
        match self.maps.public_api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(SchoolMatchError::Config(MISSING_PUBLIC_KEY_MESSAGE.to_string())),
        }
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_seconds)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.autocomplete.debounce_ms)
    }

    pub fn proxy_addr(&self) -> Result<SocketAddr> {
        self.proxy.bind.parse().map_err(|_| {
            SchoolMatchError::Config(format!(
                "Invalid SCHOOL_MATCH_PROXY_BIND (expected host:port): {}",
                self.proxy.bind
            ))
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            maps: MapsConfig {
                server_api_key: None,
                public_api_key: None,
                geocode_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
                autocomplete_url: "https://maps.googleapis.com/maps/api/place/autocomplete/json"
                    .to_string(),
            },
            backend: BackendConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_seconds: 60,
            },
            proxy: ProxyConfig {
                bind: "127.0.0.1:9002".to_string(),
            },
            autocomplete: AutocompleteConfig { debounce_ms: 300 },
            ranking: RankingConfig { default_k: 10 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.debounce(), Duration::from_millis(300));
        assert_eq!(cfg.backend.base_url, "http://localhost:8000");
        assert!(cfg.proxy_addr().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = Config::default();
        cfg.apply_overrides(lookup_from(&[
            ("NEXT_PUBLIC_BACKEND_URI", "http://backend:8000"),
            ("NEXT_PUBLIC_GOOGLE_MAPS_API_KEY", "public-key"),
            ("GOOGLE_MAPS_API_KEY", "server-key"),
            ("SCHOOL_MATCH_DEBOUNCE_MS", "150"),
            ("SCHOOL_MATCH_DEFAULT_K", "not-a-number"),
        ]));
        assert_eq!(cfg.backend.base_url, "http://backend:8000");
        assert_eq!(cfg.maps.server_api_key.as_deref(), Some("server-key"));
        assert_eq!(cfg.public_maps_key().unwrap(), "public-key");
        assert_eq!(cfg.autocomplete.debounce_ms, 150);
        // Unparseable overrides are ignored
        assert_eq!(cfg.ranking.default_k, 10);
    }

    #[test]
    fn test_missing_public_key_is_config_error() {
        let cfg = Config::default();
        match cfg.public_maps_key() {
            Err(SchoolMatchError::Config(msg)) => assert_eq!(msg, MISSING_PUBLIC_KEY_MESSAGE),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_yaml_round_trip_fields() {
        let yaml = r#"
maps:
  public_api_key: abc
  geocode_url: http://geo
  autocomplete_url: http://auto
backend:
  base_url: http://b
  timeout_seconds: 5
proxy:
  bind: 0.0.0.0:9002
autocomplete:
  debounce_ms: 250
ranking:
  default_k: 3
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.maps.server_api_key, None);
        assert_eq!(cfg.maps.public_api_key.as_deref(), Some("abc"));
        assert_eq!(cfg.ranking.default_k, 3);
        assert!(cfg.validate().is_ok());
    }
}
