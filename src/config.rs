//! Configuration management for Deepdex.
//!
//! This module handles loading and validating environment variables and application settings.

use crate::error::{DeepdexError, Result};
use std::env;

/// Default port for the liveness HTTP endpoint.
const DEFAULT_HTTP_PORT: u16 = 10000;

/// Default base URL of the Deepwoken build planner API.
const DEFAULT_API_BASE: &str = "https://api.deepwoken.co";

/// Default prefix for legacy text commands.
const DEFAULT_COMMAND_PREFIX: &str = ".";

/// Configuration for the application, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// Path to SQLite database file
    pub db_path: String,
    /// Port the liveness HTTP endpoint listens on
    pub http_port: u16,
    /// Externally visible base URL, used only for diagnostic logging
    pub external_url: Option<String>,
    /// Base URL of the Deepwoken build planner API
    pub api_base_url: String,
    /// Prefix for legacy text commands
    pub command_prefix: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This will attempt to load a .env file if present using dotenv,
    /// then read required environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required environment variable is missing or invalid.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use deepdex::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load configuration");
    /// println!("Health endpoint on port {}", config.http_port);
    /// ```
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors - it's optional)
        dotenv::dotenv().ok();

        let discord_token = env::var("DISCORD_TOKEN")
            .map_err(|_| DeepdexError::Config(
                "Missing DISCORD_TOKEN environment variable. Set it in your environment or create a .env file (never commit this file).".to_string()
            ))?;

        let db_path = Self::get_db_path()?;

        let http_port = match env::var("PORT") {
            Ok(raw) => Self::parse_port(&raw)?,
            Err(_) => DEFAULT_HTTP_PORT,
        };

        // Optional: Render-style external URL, surfaced in the health endpoint logs.
        let external_url = env::var("EXTERNAL_URL").ok().filter(|u| !u.is_empty());
        if let Some(url) = &external_url {
            Self::validate_base_url(url, "EXTERNAL_URL")?;
        }

        let api_base_url =
            env::var("DEEPWOKEN_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::validate_base_url(&api_base_url, "DEEPWOKEN_API_BASE")?;

        let command_prefix = env::var("COMMAND_PREFIX")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());

        Ok(Self {
            discord_token,
            db_path,
            http_port,
            external_url,
            api_base_url,
            command_prefix,
        })
    }

    /// Get the database path from environment or use default.
    fn get_db_path() -> Result<String> {
        match env::var("DB_PATH") {
            Ok(path) => Ok(path),
            Err(_) => {
                let mut path = env::current_dir()
                    .map_err(|e| DeepdexError::Config(
                        format!("Failed to determine current directory: {}", e)
                    ))?;

                path.push("data");
                path.push("deepdex.db");

                path.into_os_string()
                    .into_string()
                    .map_err(|os_str| DeepdexError::Config(
                        format!("Database path contains invalid Unicode: {:?}", os_str)
                    ))
            }
        }
    }

    /// Parse a port number from its textual environment value.
    fn parse_port(raw: &str) -> Result<u16> {
        raw.trim().parse::<u16>().map_err(|_| {
            DeepdexError::Config(format!("Invalid PORT value: '{}'. Expected 1-65535.", raw))
        })
    }

    /// Validate a base URL using proper URL parsing.
    fn validate_base_url(url_str: &str, var_name: &str) -> Result<()> {
        use url::Url;

        let parsed_url = Url::parse(url_str).map_err(|e| {
            DeepdexError::Config(format!("Invalid {} '{}': {}", var_name, url_str, e))
        })?;

        let scheme = parsed_url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(DeepdexError::Config(format!(
                "{} must use http:// or https:// scheme, got: '{}'",
                var_name, scheme
            )));
        }

        if parsed_url.host_str().is_none() {
            return Err(DeepdexError::Config(format!(
                "{} must contain a valid host: '{}'",
                var_name, url_str
            )));
        }

        Ok(())
    }
}
