//! Application configuration structs
//!
//! Loads configuration from environment variables for the bot runner
//! binary. Library consumers build `ClientOptions` programmatically and
//! never touch this.

use std::env;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bot authentication token
    pub token: String,
    /// Shard coordinates; both must be set together
    pub shard_id: Option<u16>,
    pub shard_count: Option<u16>,
    /// Request full member lists for large guilds
    pub load_all_members: bool,
    /// Dispatch event names removed from the registry
    pub disabled_events: Vec<String>,
    /// Wire encoding ("json" is the only implemented value)
    pub encoding: String,
    /// Emit JSON logs instead of the pretty format
    pub log_json: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `ACCORD_TOKEN` is missing, or if only one of the
    /// shard variables is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let shard_id = parse_optional("ACCORD_SHARD_ID")?;
        let shard_count = parse_optional("ACCORD_SHARD_COUNT")?;
        if shard_id.is_some() != shard_count.is_some() {
            return Err(ConfigError::InvalidValue(
                "ACCORD_SHARD_ID/ACCORD_SHARD_COUNT",
                "both must be set together".to_string(),
            ));
        }

        Ok(Self {
            token: env::var("ACCORD_TOKEN").map_err(|_| ConfigError::MissingVar("ACCORD_TOKEN"))?,
            shard_id,
            shard_count,
            load_all_members: parse_bool("ACCORD_LOAD_ALL_MEMBERS"),
            disabled_events: parse_list("ACCORD_DISABLED_EVENTS"),
            encoding: env::var("ACCORD_ENCODING").unwrap_or_else(|_| default_encoding()),
            log_json: parse_bool("ACCORD_LOG_JSON"),
        })
    }
}

fn default_encoding() -> String {
    "json".to_string()
}

fn parse_bool(var: &str) -> bool {
    env::var(var)
        .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn parse_list(var: &str) -> Vec<String> {
    env::var(var)
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_optional(var: &'static str) -> Result<Option<u16>, ConfigError> {
    match env::var(var) {
        Ok(s) => s
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(var, s)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
