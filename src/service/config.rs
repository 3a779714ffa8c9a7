//! Connection settings for the hosted services.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default role sent with agent requests.
pub const DEFAULT_ROLE: &str = "ACCOUNTADMIN";
/// Default warehouse sent with agent requests.
pub const DEFAULT_WAREHOUSE: &str = "CHESS_WH";
/// Default database holding the agent and search service.
pub const DEFAULT_DATABASE: &str = "CHESS_DB";
/// Default schema holding the agent and search service.
pub const DEFAULT_SCHEMA: &str = "ANALYTICS";
/// Default agent object name.
pub const DEFAULT_AGENT: &str = "CHESS_COPILOT";
/// Default semantic model for the analyst.
pub const DEFAULT_SEMANTIC_MODEL: &str = "@CHESS_DB.ANALYTICS.SEMANTIC_MODELS/scacchi_semantica.yaml";
/// Default document search service.
pub const DEFAULT_SEARCH_SERVICE: &str = "CHESS_OPENINGS_SEARCH";
/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default per-read timeout in seconds for streamed responses.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 900;
/// Default total timeout in seconds for non-streamed requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Validated service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL, e.g. `https://xy12345.snowflakecomputing.com`.
    pub base_url: String,
    /// Programmatic access token.
    pub token: String,
    /// Role routing header.
    pub role: String,
    /// Warehouse routing header.
    pub warehouse: String,
    /// Database name.
    pub database: String,
    /// Schema name.
    pub schema: String,
    /// Agent object name.
    pub agent: String,
    /// Staged semantic model file for the analyst.
    pub semantic_model: String,
    /// Search service name.
    pub search_service: String,
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Time allowed between reads of a response body.
    pub read_timeout: Duration,
    /// Total time allowed for a non-streamed request.
    pub request_timeout: Duration,
}

impl ServiceConfig {
    /// Creates a configuration with default routing and timeouts.
    ///
    /// A host without a scheme is given `https://`; a trailing slash is
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host or token is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use chess_copilot::service::ServiceConfig;
    ///
    /// let config = ServiceConfig::new("acct.snowflakecomputing.com", "pat").unwrap();
    /// assert_eq!(config.base_url, "https://acct.snowflakecomputing.com");
    /// ```
    pub fn new(host: &str, token: &str) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(Error::Config {
                message: "service host is required (--host or SNOWFLAKE_HOST)".to_string(),
            });
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Config {
                message: "access token is required (--token or SNOWFLAKE_PAT)".to_string(),
            });
        }

        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", host.trim_end_matches('/'))
        };

        Ok(Self {
            base_url,
            token: token.to_string(),
            role: DEFAULT_ROLE.to_string(),
            warehouse: DEFAULT_WAREHOUSE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            agent: DEFAULT_AGENT.to_string(),
            semantic_model: DEFAULT_SEMANTIC_MODEL.to_string(),
            search_service: DEFAULT_SEARCH_SERVICE.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    /// Joins an API path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_gets_scheme() {
        let config = ServiceConfig::new("acct.snowflakecomputing.com/", "t").unwrap();
        assert_eq!(config.base_url, "https://acct.snowflakecomputing.com");
    }

    #[test]
    fn test_explicit_scheme_is_kept() {
        let config = ServiceConfig::new("http://127.0.0.1:8080", "t").unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(
            config.url("/api/v2/cortex/analyst/message"),
            "http://127.0.0.1:8080/api/v2/cortex/analyst/message"
        );
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::new("h", "t").unwrap();
        assert_eq!(config.role, "ACCOUNTADMIN");
        assert_eq!(config.warehouse, "CHESS_WH");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(900));
    }

    #[test]
    fn test_missing_values_rejected() {
        assert!(matches!(ServiceConfig::new("  ", "t"), Err(Error::Config { .. })));
        assert!(matches!(ServiceConfig::new("h", ""), Err(Error::Config { .. })));
    }
}
