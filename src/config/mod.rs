//! Configuration management for the AgriConnect client
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

/// Application environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend origin, e.g. `http://localhost:8000`
    pub api_base_url: String,

    /// File holding the persisted refresh token
    pub token_file: PathBuf,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Where the route guard sends unauthenticated users
    pub login_path: String,

    /// Current environment
    pub environment: Environment,

    /// Log level (RUST_LOG)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let api_base_url = env::var("AGRICONNECT_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let api_base_url = validate_api_url(&api_base_url, &environment)?;

        let token_file = match env::var("AGRICONNECT_TOKEN_FILE") {
            Ok(path) => PathBuf::from(path),
            Err(_) => default_token_file(),
        };

        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("REQUEST_TIMEOUT_SECS must be a number".to_string())
            })?;

        let login_path = env::var("LOGIN_PATH").unwrap_or_else(|_| "/login".to_string());

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Config {
            api_base_url,
            token_file,
            request_timeout_secs,
            login_path,
            environment,
            log_level,
        })
    }

    /// Config pointing at `api_base_url` with every other field defaulted
    pub fn for_base_url(api_base_url: impl Into<String>) -> Self {
        Config {
            api_base_url: api_base_url.into(),
            token_file: default_token_file(),
            request_timeout_secs: 30,
            login_path: "/login".to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Absolute URL for an API path such as `/api/token/`
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn validate_api_url(url: &str, environment: &Environment) -> Result<String, ConfigError> {
    let url = url.trim().trim_end_matches('/').to_string();

    if environment.is_production() {
        if !url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(format!(
                "'{}' must use https in production",
                url
            )));
        }
    } else if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}' must start with http:// or https://",
            url
        )));
    }

    Ok(url)
}

/// Default session file
/// - Linux/macOS: `~/.config/agriconnect/session.json`
/// - Windows: `%APPDATA%\agriconnect\session.json`
fn default_token_file() -> PathBuf {
    let dir = if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("agriconnect")
    } else if let Some(home_dir) = dirs::home_dir() {
        home_dir.join(".config").join("agriconnect")
    } else {
        PathBuf::from(".agriconnect")
    };
    dir.join("session.json")
}
