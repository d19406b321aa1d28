//! Custom error types for Deepdex.
//!
//! This module provides a centralized error handling system with specific error types
//! for different parts of the application.

use std::fmt;

/// Main error type for Deepdex operations.
#[derive(Debug)]
pub enum DeepdexError {
    /// Configuration errors (missing env vars, invalid values)
    Config(String),
    /// SQLite persistence errors
    Store(String),
    /// Deepwoken build planner API errors
    Api(String),
    /// Breakdown image rendering errors
    Render(String),
    /// Channel lifecycle (clopen) errors
    Clopen(String),
    /// Discord bot errors
    Discord(String),
    /// Validation errors (invalid schedule times, queries, etc.)
    Validation(String),
    /// Generic I/O errors
    Io(std::io::Error),
}

impl fmt::Display for DeepdexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Store(msg) => write!(f, "Store error: {}", msg),
            Self::Api(msg) => write!(f, "Planner API error: {}", msg),
            Self::Render(msg) => write!(f, "Render error: {}", msg),
            Self::Clopen(msg) => write!(f, "Clopen error: {}", msg),
            Self::Discord(msg) => write!(f, "Discord error: {}", msg),
            Self::Validation(msg) => write!(f, "Validation error: {}", msg),
            Self::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DeepdexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeepdexError::Io(err) => Some(err),
            _ => None,
        }
    }
}

// Implement From traits for automatic error conversion
impl From<std::io::Error> for DeepdexError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<rusqlite::Error> for DeepdexError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<reqwest::Error> for DeepdexError {
    fn from(err: reqwest::Error) -> Self {
        Self::Api(err.to_string())
    }
}

impl From<serde_json::Error> for DeepdexError {
    fn from(err: serde_json::Error) -> Self {
        Self::Api(format!("JSON parsing error: {}", err))
    }
}

impl From<std::env::VarError> for DeepdexError {
    fn from(err: std::env::VarError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DeepdexError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Discord(format!("Task join error: {}", err))
    }
}

impl From<image::ImageError> for DeepdexError {
    fn from(err: image::ImageError) -> Self {
        Self::Render(err.to_string())
    }
}

/// Result type alias for Deepdex operations.
pub type Result<T> = std::result::Result<T, DeepdexError>;
