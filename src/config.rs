//! Environment-driven configuration.
//!
//! Credentials are collected from `GEMINI_API_KEYS` (comma separated), then
//! `GEMINI_API_KEY`, then `GEMINI_API_KEY_1` through `GEMINI_API_KEY_9`.
//! Blank and duplicate values are dropped; at least one must remain.

use std::time::Duration;

use crate::error::{GatewayError, Result};
use crate::services::gemini_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

const MAX_NUMBERED_KEYS: usize = 9;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;
const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_PORT: u16 = 5000;

#[derive(Clone)]
pub struct GatewayConfig {
    pub api_keys: Vec<String>,
    pub model: String,
    pub base_url: String,
    /// Output token cap applied to chat calls that carry history.
    pub max_output_tokens: u32,
    pub attempt_timeout: Option<Duration>,
    /// `None` means one attempt per configured credential.
    pub max_attempts: Option<usize>,
    pub retry_timeouts: bool,
    pub port: u16,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("attempt_timeout", &self.attempt_timeout)
            .field("max_attempts", &self.max_attempts)
            .field("retry_timeouts", &self.retry_timeouts)
            .field("port", &self.port)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            attempt_timeout: Some(Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS)),
            max_attempts: None,
            retry_timeouts: false,
            port: DEFAULT_PORT,
        }
    }
}

impl GatewayConfig {
    /// Load `.env` (if present) and read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|v| !v.is_empty());

        let mut raw_keys: Vec<String> = Vec::new();
        if let Some(list) = get("GEMINI_API_KEYS") {
            raw_keys.extend(list.split(',').map(|key| key.trim().to_string()));
        }
        raw_keys.extend(get("GEMINI_API_KEY"));
        for idx in 1..=MAX_NUMBERED_KEYS {
            raw_keys.extend(get(&format!("GEMINI_API_KEY_{idx}")));
        }

        let mut api_keys: Vec<String> = Vec::new();
        for key in raw_keys {
            if !key.is_empty() && !api_keys.contains(&key) {
                api_keys.push(key);
            }
        }

        if api_keys.is_empty() {
            return Err(GatewayError::NoCredentialsConfigured);
        }

        let attempt_timeout = match parse_var::<u64>(&get, "WANDERAI_ATTEMPT_TIMEOUT_SECS")? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.attempt_timeout,
        };

        let max_attempts = match parse_var::<usize>(&get, "WANDERAI_MAX_ATTEMPTS")? {
            Some(0) => {
                return Err(GatewayError::Config(
                    "WANDERAI_MAX_ATTEMPTS must be at least 1".to_string(),
                ))
            }
            other => other,
        };

        Ok(Self {
            api_keys,
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            max_output_tokens: parse_var(&get, "GEMINI_MAX_OUTPUT_TOKENS")?
                .unwrap_or(defaults.max_output_tokens),
            attempt_timeout,
            max_attempts,
            retry_timeouts: parse_bool(&get, "WANDERAI_RETRY_TIMEOUTS")?
                .unwrap_or(defaults.retry_timeouts),
            port: parse_var(&get, "PORT")?.unwrap_or(defaults.port),
        })
    }
}

fn parse_var<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|err| GatewayError::Config(format!("{key}={value:?}: {err}")))
        })
        .transpose()
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>> {
    get(key)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(GatewayError::Config(format!(
                "{key}={value:?}: expected a boolean"
            ))),
        })
        .transpose()
}
