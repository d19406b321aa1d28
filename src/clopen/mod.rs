//! Scheduled open/close ("clopen") channel management.
//!
//! Each guild can designate one channel that follows a daily schedule: the
//! bot opens it at a configured time and closes it at another, by mutating
//! the channel's send permission. While the channel is open, members can
//! post a trigger message and react to it; once enough distinct members have
//! reacted, the channel closes early, ahead of the schedule.
//!
//! The moving parts are split so the state machine stays testable without a
//! gateway connection:
//! - [`schedule`] does the daily-window time math,
//! - [`registry`] owns the per-guild state machine (pure, no I/O),
//! - [`manager`] is the task that owns the registry, receives events over a
//!   channel and applies transitions through a [`ChannelGate`].

pub mod manager;
pub mod registry;
pub mod schedule;

pub use manager::ClopenHandle;
pub use registry::{
    ChannelState, ClopenRegistry, ClopenSettings, ClopenStatus, Transition, TransitionKind,
    VoteOutcome,
};
pub use schedule::DailySchedule;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Interval between scheduler evaluations.
pub const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Default number of distinct reactions that force an early close.
pub const DEFAULT_THRESHOLD: u32 = 5;

/// Default emoji counted as a qualifying reaction.
pub const DEFAULT_EMOJI: &str = "🔒";

/// Prefix a message must start with to become the active control message.
pub const CONTROL_TRIGGER: &str = "!close";

/// Platform side effects the manager needs: flipping a channel's closed
/// state and posting notices. Implemented against Discord in the binary and
/// mocked in tests.
#[async_trait]
pub trait ChannelGate: Send + Sync {
    /// Apply (`closed = true`) or lift (`closed = false`) the closed state
    /// of a channel. The manager only advances its in-memory state after
    /// this succeeds.
    async fn set_closed(&self, guild_id: u64, channel_id: u64, closed: bool) -> Result<()>;

    /// Post a notice into the channel. Best effort; callers ignore failures.
    async fn announce(&self, channel_id: u64, message: &str) -> Result<()>;
}
