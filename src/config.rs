use crate::orchestration::LookupSettings;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: BackendKind,
    pub catalog_ttl_ms: u64,
    pub debounce_ms: u64,
    pub duplicate_debounce_ms: u64,
    pub company_min_search_len: usize,
    pub http_max_elapsed_ms: u64,
}

/// Where collaborator calls go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// The back office REST API at `INSTRUMENT_API_URL`.
    Http { url: String },
    /// In-memory data, for local runs.
    Mock,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
    expected: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.trim())
        .unwrap_or(default)
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), format!("must be {}", expected)))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", "8080", "a valid u16")?;

        let instrument_api_url = env_map
            .get("INSTRUMENT_API_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let backend = match env_map
            .get("INSTRUMENT_BACKEND")
            .map(|s| s.as_str())
            .unwrap_or("http")
        {
            "http" => BackendKind::Http {
                url: instrument_api_url
                    .ok_or_else(|| ConfigError::MissingEnv("INSTRUMENT_API_URL".to_string()))?,
            },
            "mock" => BackendKind::Mock,
            other => {
                return Err(ConfigError::InvalidValue(
                    "INSTRUMENT_BACKEND".to_string(),
                    format!("must be http or mock, got {}", other),
                ))
            }
        };

        let catalog_ttl_ms = parse_or(&env_map, "CATALOG_TTL_MS", "300000", "a valid u64")?;
        let debounce_ms = parse_or(&env_map, "DEBOUNCE_MS", "300", "a valid u64")?;
        let duplicate_debounce_ms =
            parse_or(&env_map, "DUPLICATE_DEBOUNCE_MS", "500", "a valid u64")?;
        let company_min_search_len =
            parse_or(&env_map, "COMPANY_MIN_SEARCH_LEN", "2", "a valid usize")?;
        let http_max_elapsed_ms =
            parse_or(&env_map, "HTTP_MAX_ELAPSED_MS", "30000", "a valid u64")?;

        Ok(Config {
            port,
            backend,
            catalog_ttl_ms,
            debounce_ms,
            duplicate_debounce_ms,
            company_min_search_len,
            http_max_elapsed_ms,
        })
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_millis(self.catalog_ttl_ms)
    }

    pub fn http_max_elapsed(&self) -> Duration {
        Duration::from_millis(self.http_max_elapsed_ms)
    }

    pub fn lookup_settings(&self) -> LookupSettings {
        LookupSettings {
            debounce: Duration::from_millis(self.debounce_ms),
            duplicate_debounce: Duration::from_millis(self.duplicate_debounce_ms),
            min_search_len: self.company_min_search_len,
        }
    }
}
