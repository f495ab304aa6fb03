//! Client configuration resolved from the environment.

use estate_core::error::{EstateError, EstateResult};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Max concurrent detail fetches during [`prefetch`](crate::properties::PropertiesStore::prefetch).
pub const DEFAULT_PREFETCH_CONCURRENCY: usize = 4;

pub const ENV_BASE_URL: &str = "ESTATE_API_BASE_URL";
/// Build-time variable name used by the web bundle; honoured as a fallback.
pub const ENV_BASE_URL_FALLBACK: &str = "VITE_API_BASE_URL";
pub const ENV_TOKEN_FILE: &str = "ESTATE_TOKEN_FILE";
pub const ENV_TIMEOUT_SECS: &str = "ESTATE_HTTP_TIMEOUT_SECS";
pub const ENV_MAPS_API_KEY: &str = "VITE_GOOGLE_MAPS_API_KEY";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub token_file: Option<PathBuf>,
    /// Carried for consumers that render maps; the client never calls it.
    pub maps_api_key: Option<String>,
    pub prefetch_concurrency: usize,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> EstateResult<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            timeout: DEFAULT_TIMEOUT,
            token_file: None,
            maps_api_key: None,
            prefetch_concurrency: DEFAULT_PREFETCH_CONCURRENCY,
        })
    }

    pub fn from_env() -> EstateResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> EstateResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty(ENV_BASE_URL)
            .or_else(|| non_empty(ENV_BASE_URL_FALLBACK))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let mut config = Self::new(&base_url)?;

        if let Some(raw) = non_empty(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                EstateError::InvalidInput(format!(
                    "{ENV_TIMEOUT_SECS} must be whole seconds, got `{raw}`"
                ))
            })?;
            config = config.with_timeout(Duration::from_secs(secs))?;
        }
        config.token_file = non_empty(ENV_TOKEN_FILE).map(PathBuf::from);
        config.maps_api_key = non_empty(ENV_MAPS_API_KEY);

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> EstateResult<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> EstateResult<Self> {
        if timeout.is_zero() {
            return Err(EstateError::InvalidInput("timeout must be positive".into()));
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_file = Some(path.into());
        self
    }

    pub fn with_prefetch_concurrency(mut self, n: usize) -> Self {
        self.prefetch_concurrency = n.max(1);
        self
    }
}

fn parse_base_url(raw: &str) -> EstateResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| EstateError::InvalidInput(format!("invalid API base URL `{raw}`: {e}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(EstateError::InvalidInput(format!(
            "API base URL must be http(s), got `{raw}`"
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.token_file.is_none());
        assert!(config.maps_api_key.is_none());
    }

    #[test]
    fn primary_variable_wins_over_fallback() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "https://a.example/api/v1"),
            (ENV_BASE_URL_FALLBACK, "https://b.example/api/v1"),
        ]))
        .unwrap();
        assert_eq!(config.base_url.host_str(), Some("a.example"));

        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, " "),
            (ENV_BASE_URL_FALLBACK, "https://b.example/api/v1"),
        ]))
        .unwrap();
        assert_eq!(config.base_url.host_str(), Some("b.example"));
    }

    #[test]
    fn timeout_and_token_file_from_env() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_TIMEOUT_SECS, "5"),
            (ENV_TOKEN_FILE, "/tmp/estate.json"),
            (ENV_MAPS_API_KEY, "k"),
        ]))
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.token_file, Some(PathBuf::from("/tmp/estate.json")));
        assert_eq!(config.maps_api_key.as_deref(), Some("k"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ClientConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "soon")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "0")])).is_err());
        assert!(ClientConfig::new("mailto:a@b.com").is_err());
        assert!(ClientConfig::new("ftp://files.example").is_err());
        assert!(ClientConfig::new("not a url").is_err());
    }

    #[test]
    fn base_url_override_keeps_other_settings() {
        let config = ClientConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "5")]))
            .unwrap()
            .with_base_url("https://staging.example/api/v1")
            .unwrap();
        assert_eq!(config.base_url.host_str(), Some("staging.example"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }
}
