//! Configuration module for the Movie Scraper API
//!
//! Handles loading environment variables and application configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while reading configuration at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be true or false, got {value:?}")]
    InvalidFlag { name: &'static str, value: String },

    #[error("FETCH_STRATEGY must be \"static\" or \"browser\", got {0:?}")]
    InvalidStrategy(String),

    #[error("No Chrome/Chromium executable found: {0}")]
    ExecutableNotFound(String),
}

/// Runtime environment, controls how the browser executable is located
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }
}

/// How pages are obtained from the target site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Plain GET, markup parsed without running scripts
    Static,
    /// Rendered in a headless Chromium session
    Browser,
}

impl FromStr for FetchStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" | "" => Ok(FetchStrategy::Static),
            "browser" => Ok(FetchStrategy::Browser),
            other => Err(ConfigError::InvalidStrategy(other.to_string())),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Root URL of the scraped site
    pub base_url: String,
    /// Development or production
    pub environment: Environment,
    /// Static GET or headless browser
    pub fetch_strategy: FetchStrategy,
    /// Abort image/stylesheet/font/script loads while rendering
    pub block_subresources: bool,
    /// Navigation and HTTP timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Explicit browser executable for production
    pub chrome_path: Option<PathBuf>,
    /// Browser executable used in development
    pub dev_chrome_path: PathBuf,
}

#[cfg(target_os = "windows")]
const DEFAULT_DEV_CHROME: &str = "C:/Program Files/Google/Chrome/Application/chrome.exe";
#[cfg(target_os = "macos")]
const DEFAULT_DEV_CHROME: &str = "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_DEV_CHROME: &str = "/usr/bin/google-chrome";

/// Executable names searched on PATH in production
const CHROME_BINARIES: &[&str] = &["chromium", "chromium-browser", "google-chrome", "google-chrome-stable"];

impl Config {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { name: "PORT", value })?,
            None => 4000,
        };

        let navigation_timeout_secs = match lookup("NAVIGATION_TIMEOUT_SECS") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                name: "NAVIGATION_TIMEOUT_SECS",
                value,
            })?,
            None => 30,
        };

        let block_subresources = match lookup("BLOCK_SUBRESOURCES") {
            Some(value) => parse_flag("BLOCK_SUBRESOURCES", value)?,
            None => true,
        };

        let fetch_strategy = match lookup("FETCH_STRATEGY") {
            Some(value) => value.parse()?,
            None => FetchStrategy::Static,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            base_url: lookup("BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://movies123.example".to_string()),
            environment: Environment::from_value(&lookup("APP_ENV").unwrap_or_default()),
            fetch_strategy,
            block_subresources,
            navigation_timeout_secs,
            chrome_path: lookup("CHROME_PATH").map(PathBuf::from),
            dev_chrome_path: lookup("DEV_CHROME_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DEV_CHROME)),
        })
    }

    /// Resolve the browser executable for the current environment
    ///
    /// Production honours `CHROME_PATH` and otherwise searches PATH;
    /// development always uses the fixed local install path.
    pub fn resolve_chrome_executable(&self) -> Result<PathBuf, ConfigError> {
        match self.environment {
            Environment::Development => Ok(self.dev_chrome_path.clone()),
            Environment::Production => {
                if let Some(path) = &self.chrome_path {
                    return Ok(path.clone());
                }
                CHROME_BINARIES
                    .iter()
                    .find_map(|name| which::which(name).ok())
                    .ok_or_else(|| ConfigError::ExecutableNotFound(CHROME_BINARIES.join(", ")))
            }
        }
    }
}

fn parse_flag(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { name, value }),
    }
}
