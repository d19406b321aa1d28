//! Deepdex library.
//!
//! Deepwoken companion Discord bot: static game-data lookups, EHP build
//! breakdowns fed by the deepwoken.co planner, and per-guild scheduled
//! open/close channel management.

pub mod bot;
pub mod clopen;
pub mod commands;
pub mod config;
pub mod deepwoken;
pub mod discord;
pub mod ehp;
pub mod error;
pub mod health;
pub mod lang;
pub mod lookup;
pub mod render;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{DeepdexError, Result};
