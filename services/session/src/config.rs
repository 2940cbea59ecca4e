//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Default storefront API base URL
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default Authorization header scheme expected by the storefront backend
pub const DEFAULT_AUTH_HEADER_TYPE: &str = "JWT";

/// Default location of the persisted credentials
pub const DEFAULT_SESSION_FILE: &str = ".storefront-session.json";

/// Storefront API client configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the storefront API (e.g., "http://localhost:8000")
    pub api_url: String,
    /// Scheme placed before the access token in the Authorization header
    pub auth_header_type: String,
    /// Whole-request timeout in seconds (default: 10)
    pub request_timeout_secs: u64,
    /// Connection establishment timeout in seconds (default: 5)
    pub connect_timeout_secs: u64,
    /// File the access and refresh tokens are persisted to
    pub session_file: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_header_type: DEFAULT_AUTH_HEADER_TYPE.to_string(),
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }
}

impl ApiConfig {
    /// Create a new ApiConfig from environment variables
    ///
    /// # Environment Variables
    /// - `STOREFRONT_API_URL`: API base URL (default: "http://localhost:8000")
    /// - `STOREFRONT_AUTH_HEADER_TYPE`: Authorization scheme (default: "JWT")
    /// - `STOREFRONT_REQUEST_TIMEOUT_SECS`: Request timeout (default: 10)
    /// - `STOREFRONT_CONNECT_TIMEOUT_SECS`: Connect timeout (default: 5)
    /// - `STOREFRONT_SESSION_FILE`: Credential file (default: ".storefront-session.json")
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("auth_header_type", defaults.auth_header_type)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("connect_timeout_secs", defaults.connect_timeout_secs as i64)?
            .set_default(
                "session_file",
                defaults.session_file.to_string_lossy().into_owned(),
            )?
            .add_source(Environment::with_prefix("STOREFRONT"))
            .build()?
            .try_deserialize()
    }

    /// Create a configuration pointing at `api_url` with every other field defaulted
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// Whole-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connection establishment timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Absolute URL for an API path
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
