//! Type definitions and aliases for the bot.
//!
//! This module contains shared types used throughout the application.

use crate::clopen::ClopenHandle;
use crate::lang::LanguageStore;
use std::sync::Arc;

/// Bot application data shared across all commands.
///
/// This data is accessible in all command handlers through the context.
pub struct Data {
    /// HTTP client for planner API requests
    pub http_client: reqwest::Client,
    /// Base URL of the Deepwoken build planner API
    pub api_base_url: String,
    /// Prefix for legacy text commands
    pub command_prefix: String,
    /// Per-guild language selection
    pub languages: Arc<LanguageStore>,
    /// Handle to the clopen manager task
    pub clopen: ClopenHandle,
}

/// Error type for bot commands (maintains compatibility with poise).
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Command context type alias for easier usage.
pub type Context<'a> = poise::Context<'a, Data, Error>;
