//! Gateway URL discovery
//!
//! The only REST call the session makes: asking the API where the gateway
//! lives. Discovery failure falls back to the well-known default so a
//! transient API outage cannot keep the bot offline.

use serde::Deserialize;
use tracing::warn;

use crate::error::GatewayError;
use crate::protocol::GATEWAY_VERSION;

/// Fallback gateway URL when discovery fails
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";

/// HTTP user-agent, also sent as `$browser`/`$device` in IDENTIFY
pub const USER_AGENT: &str = concat!(
    "accord (https://github.com/accord-rs/accord, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

const GATEWAY_ENDPOINT: &str = "https://discord.com/api/gateway";

/// Response from the gateway discovery endpoint
#[derive(Debug, Deserialize)]
struct GatewayResponse {
    url: String,
}

/// Wire encodings the connection query string can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Json,
    /// Declared by the options surface, rejected at validation time
    Etf,
}

impl Encoding {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Etf => "etf",
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Encoding {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "etf" => Ok(Self::Etf),
            other => Err(GatewayError::Config(format!("unknown encoding: {other}"))),
        }
    }
}

/// Thin REST client used only for gateway URL discovery
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    token: String,
}

impl RestClient {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            token: token.into(),
        }
    }

    /// Fetch the gateway URL from the REST API
    pub async fn gateway_url(&self) -> Result<String, GatewayError> {
        let response = self
            .http
            .get(GATEWAY_ENDPOINT)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await?;
        let body: GatewayResponse = response.json().await?;
        Ok(body.url)
    }

    /// Fetch the gateway URL, falling back to the default on failure
    pub async fn gateway_url_or_default(&self) -> String {
        match self.gateway_url().await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, fallback = DEFAULT_GATEWAY_URL, "Gateway discovery failed");
                DEFAULT_GATEWAY_URL.to_string()
            }
        }
    }
}

/// Build the full connection URL from a base gateway URL
///
/// A single trailing slash is trimmed before the query string is appended.
#[must_use]
pub fn websocket_url(base: &str, encoding: Encoding) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    format!("{base}/?v={GATEWAY_VERSION}&encoding={encoding}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_url() {
        assert_eq!(
            websocket_url("wss://gateway.discord.gg", Encoding::Json),
            "wss://gateway.discord.gg/?v=6&encoding=json"
        );
    }

    #[test]
    fn test_websocket_url_trims_single_trailing_slash() {
        assert_eq!(
            websocket_url("wss://gateway.discord.gg/", Encoding::Json),
            "wss://gateway.discord.gg/?v=6&encoding=json"
        );
        // Only one slash is trimmed
        assert_eq!(
            websocket_url("wss://gateway.discord.gg//", Encoding::Json),
            "wss://gateway.discord.gg//?v=6&encoding=json"
        );
    }

    #[test]
    fn test_encoding_display() {
        assert_eq!(Encoding::Json.to_string(), "json");
        assert_eq!(Encoding::Etf.to_string(), "etf");
    }

    #[test]
    fn test_encoding_parse() {
        assert_eq!("json".parse::<Encoding>().unwrap(), Encoding::Json);
        assert_eq!("etf".parse::<Encoding>().unwrap(), Encoding::Etf);
        assert!("msgpack".parse::<Encoding>().is_err());
    }

    #[test]
    fn test_gateway_response_deserializes() {
        let json = r#"{"url": "wss://gateway.discord.gg", "shards": 1}"#;
        let resp: GatewayResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.url, "wss://gateway.discord.gg");
    }
}
