//! Environment-driven configuration.

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Runtime configuration for the pipeline.
///
/// Everything has a default except the API key, which [`Config::validate`]
/// requires before any network call is attempted.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-completions endpoint.
    pub api_url: String,
    /// Bearer token for the model provider.
    pub api_key: Option<String>,
    /// Attempts per model before escalating to the next fallback.
    pub retry_attempts: u32,
    /// Fixed delay between retries.
    pub retry_delay: Duration,
    /// Fixed pause between entities, to respect provider rate limits.
    pub request_pause: Duration,
    /// Path to the SQLite case store.
    pub database_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "https://api.venice.ai/api/v1/chat/completions".to_string(),
            api_key: None,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
            request_pause: Duration::from_secs(5),
            database_path: "doj_cases.db".to_string(),
        }
    }
}

impl Config {
    /// Builds a configuration from the environment, falling back to
    /// defaults for anything unset.
    ///
    /// Recognized variables: `CASEMINER_API_URL`, `CASEMINER_API_KEY`,
    /// `CASEMINER_RETRY_ATTEMPTS`, `CASEMINER_DB`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: env_non_empty("CASEMINER_API_URL").unwrap_or(defaults.api_url),
            api_key: env_non_empty("CASEMINER_API_KEY"),
            retry_attempts: env_non_empty("CASEMINER_RETRY_ATTEMPTS")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(defaults.retry_attempts),
            retry_delay: defaults.retry_delay,
            request_pause: defaults.request_pause,
            database_path: env_non_empty("CASEMINER_DB").unwrap_or(defaults.database_path),
        }
    }

    /// Confirms the configuration can support live API calls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the API key is missing.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(Error::config("CASEMINER_API_KEY is not set"));
        }
        Ok(())
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}
