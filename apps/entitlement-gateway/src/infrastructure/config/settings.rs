//! Gateway Configuration Settings
//!
//! Configuration types for the gateway, loaded from environment variables.

use std::time::Duration;

use crate::domain::identity::Token;

/// Default security when none are configured.
pub const DEFAULT_SECURITY: &str = "MSFT US Equity";

/// Default upstream host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default upstream port.
pub const DEFAULT_PORT: u16 = 8194;

/// Default bound on each per-token authorization wait.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream server host name or IP.
    pub host: String,
    /// Upstream server port.
    pub port: u16,
    /// Securities to request.
    pub securities: Vec<String>,
    /// Subscriber tokens, one per prospective subscriber.
    pub tokens: Vec<Token>,
    /// Bound on each per-token authorization wait.
    pub auth_timeout: Duration,
}

impl GatewayConfig {
    /// Create configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `GATEWAY_TOKENS` - comma-separated subscriber tokens (required)
    /// - `GATEWAY_SECURITIES` - comma-separated securities (default: `MSFT US Equity`)
    /// - `GATEWAY_HOST` - upstream host (default: `localhost`)
    /// - `GATEWAY_PORT` - upstream port (default: `8194`)
    /// - `GATEWAY_AUTH_TIMEOUT_SECS` - per-token authorization timeout (default: 10)
    ///
    /// # Errors
    ///
    /// Returns an error if no tokens are configured.
    pub fn from_env() -> Result<Self, ConfigError> {
        let tokens: Vec<Token> = split_csv(&std::env::var("GATEWAY_TOKENS").unwrap_or_default())
            .into_iter()
            .map(Token::new)
            .collect();

        if tokens.is_empty() {
            return Err(ConfigError::MissingTokens);
        }

        let mut securities = split_csv(&std::env::var("GATEWAY_SECURITIES").unwrap_or_default());
        if securities.is_empty() {
            securities = vec![DEFAULT_SECURITY.to_string()];
        }

        let host =
            std::env::var("GATEWAY_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

        Ok(Self {
            host,
            port: parse_env_u16("GATEWAY_PORT", DEFAULT_PORT),
            securities,
            tokens,
            auth_timeout: parse_env_duration_secs(
                "GATEWAY_AUTH_TIMEOUT_SECS",
                DEFAULT_AUTH_TIMEOUT,
            ),
        })
    }

    /// The upstream session URL.
    #[must_use]
    pub fn session_url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No subscriber tokens were supplied.
    #[error("no tokens were specified: set GATEWAY_TOKENS")]
    MissingTokens,
}

/// Split a comma-separated value, trimming whitespace and dropping empty
/// entries.
fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_drops_empties() {
        assert_eq!(
            split_csv("MSFT US Equity, IBM US Equity , ,"),
            vec!["MSFT US Equity".to_string(), "IBM US Equity".to_string()]
        );
        assert!(split_csv("").is_empty());
        assert!(split_csv(" , ,").is_empty());
    }

    #[test]
    fn session_url_formats_host_and_port() {
        let config = GatewayConfig {
            host: "feed.example.com".to_string(),
            port: 8194,
            securities: vec![DEFAULT_SECURITY.to_string()],
            tokens: vec![Token::new("tokA")],
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
        };
        assert_eq!(config.session_url(), "ws://feed.example.com:8194");
    }

    #[test]
    fn defaults_match_upstream_conventions() {
        assert_eq!(DEFAULT_HOST, "localhost");
        assert_eq!(DEFAULT_PORT, 8194);
        assert_eq!(DEFAULT_AUTH_TIMEOUT, Duration::from_secs(10));
    }
}
