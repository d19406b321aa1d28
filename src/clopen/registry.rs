use crate::clopen::schedule::{format_minute, DailySchedule};
use crate::clopen::CONTROL_TRIGGER;
use crate::error::{DeepdexError, Result};
use crate::store::ClopenRow;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Lifecycle state of a managed channel.
///
/// `PendingClose` marks a channel whose reaction quorum was reached but whose
/// permission change failed; the scheduler retries the close on every tick
/// until it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closed,
    PendingClose,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Open => "open",
            ChannelState::Closed => "closed",
            ChannelState::PendingClose => "pending_close",
        }
    }
}

impl FromStr for ChannelState {
    type Err = DeepdexError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "open" => Ok(ChannelState::Open),
            "closed" => Ok(ChannelState::Closed),
            "pending_close" => Ok(ChannelState::PendingClose),
            other => Err(DeepdexError::Validation(format!(
                "Unknown channel state '{other}'"
            ))),
        }
    }
}

/// Configuration accepted from the `clopen setup` command.
#[derive(Debug, Clone)]
pub struct ClopenSettings {
    pub guild_id: u64,
    pub channel_id: u64,
    pub schedule: DailySchedule,
    pub threshold: u32,
    pub emoji: String,
}

/// A state change the scheduler wants applied to Discord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub guild_id: u64,
    pub channel_id: u64,
    pub kind: TransitionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Open,
    Close,
}

/// Result of feeding a reaction into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Reaction was not on the active control message, used the wrong emoji,
    /// or the channel is not open.
    NotTracked,
    /// The user already voted in this round.
    AlreadyVoted,
    /// Vote counted; carries the new total.
    Counted(u32),
    /// The vote tipped the count over the threshold.
    QuorumReached(Transition),
}

/// Snapshot of a guild's managed channel, for the `clopen status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClopenStatus {
    pub channel_id: u64,
    pub state: ChannelState,
    pub open_time: String,
    pub close_time: String,
    pub threshold: u32,
    pub emoji: String,
    pub votes: u32,
    /// Next scheduled state change. `None` while a failed close is being
    /// retried, because it happens as soon as Discord cooperates.
    pub next_change: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct ManagedChannel {
    guild_id: u64,
    channel_id: u64,
    schedule: DailySchedule,
    threshold: u32,
    emoji: String,
    state: ChannelState,
    /// Set whenever a close is applied. Quorum closes park the channel until
    /// the next scheduled opening instead of letting the very next tick
    /// reopen it mid-window.
    reopen_at: Option<DateTime<Utc>>,
    last_transition: Option<DateTime<Utc>>,
    control_message: Option<u64>,
    votes: HashSet<u64>,
}

impl ManagedChannel {
    fn to_row(&self) -> ClopenRow {
        ClopenRow {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            open_minute: self.schedule.open_minute(),
            close_minute: self.schedule.close_minute(),
            threshold: self.threshold,
            emoji: self.emoji.clone(),
            state: self.state,
            reopen_at: self.reopen_at,
            last_transition: self.last_transition,
        }
    }
}

/// In-memory state for every guild's managed channel. Owned exclusively by
/// the manager task; all methods are synchronous and free of I/O.
#[derive(Debug, Default)]
pub struct ClopenRegistry {
    channels: HashMap<u64, ManagedChannel>,
}

impl ClopenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the registry from persisted rows. Rows whose stored schedule
    /// can no longer be represented are skipped with a warning so one bad
    /// guild cannot keep the rest from loading.
    pub fn from_rows(rows: Vec<ClopenRow>) -> Self {
        let mut channels = HashMap::new();
        for row in rows {
            let schedule = match DailySchedule::new(row.open_minute, row.close_minute) {
                Ok(schedule) => schedule,
                Err(error) => {
                    tracing::warn!(
                        guild_id = row.guild_id,
                        %error,
                        "Skipping clopen config with unusable schedule"
                    );
                    continue;
                }
            };
            channels.insert(
                row.guild_id,
                ManagedChannel {
                    guild_id: row.guild_id,
                    channel_id: row.channel_id,
                    schedule,
                    threshold: row.threshold,
                    emoji: row.emoji,
                    state: row.state,
                    reopen_at: row.reopen_at,
                    last_transition: row.last_transition,
                    control_message: None,
                    votes: HashSet::new(),
                },
            );
        }
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Installs or replaces a guild's configuration and returns the row to
    /// persist. Reconfiguring the same channel keeps its current state but
    /// resets the vote round; pointing the guild at a different channel
    /// starts over as open.
    pub fn upsert(&mut self, settings: ClopenSettings) -> ClopenRow {
        let channel = self
            .channels
            .entry(settings.guild_id)
            .and_modify(|existing| {
                if existing.channel_id != settings.channel_id {
                    existing.channel_id = settings.channel_id;
                    existing.state = ChannelState::Open;
                    existing.reopen_at = None;
                    existing.last_transition = None;
                }
                existing.schedule = settings.schedule;
                existing.threshold = settings.threshold;
                existing.emoji = settings.emoji.clone();
                existing.control_message = None;
                existing.votes.clear();
            })
            .or_insert_with(|| ManagedChannel {
                guild_id: settings.guild_id,
                channel_id: settings.channel_id,
                schedule: settings.schedule,
                threshold: settings.threshold,
                emoji: settings.emoji,
                state: ChannelState::Open,
                reopen_at: None,
                last_transition: None,
                control_message: None,
                votes: HashSet::new(),
            });
        channel.to_row()
    }

    pub fn remove(&mut self, guild_id: u64) -> bool {
        self.channels.remove(&guild_id).is_some()
    }

    pub fn status(&self, guild_id: u64, now: DateTime<Utc>) -> Option<ClopenStatus> {
        let channel = self.channels.get(&guild_id)?;
        let next_change = match channel.state {
            ChannelState::Open => Some(channel.schedule.next_close_after(now)),
            ChannelState::Closed => Some(
                channel
                    .reopen_at
                    .unwrap_or_else(|| channel.schedule.next_open_after(now)),
            ),
            ChannelState::PendingClose => None,
        };
        Some(ClopenStatus {
            channel_id: channel.channel_id,
            state: channel.state,
            open_time: format_minute(channel.schedule.open_minute()),
            close_time: format_minute(channel.schedule.close_minute()),
            threshold: channel.threshold,
            emoji: channel.emoji.clone(),
            votes: channel.votes.len() as u32,
            next_change,
        })
    }

    /// Collects every transition that should be applied at `now`. Calling
    /// this repeatedly without committing returns the same transitions, so a
    /// failed apply is naturally retried on the next tick.
    pub fn due_transitions(&self, now: DateTime<Utc>) -> Vec<Transition> {
        let mut due = Vec::new();
        for channel in self.channels.values() {
            let kind = match channel.state {
                ChannelState::Open => {
                    if channel.schedule.is_open_at(now) {
                        continue;
                    }
                    TransitionKind::Close
                }
                ChannelState::PendingClose => TransitionKind::Close,
                ChannelState::Closed => {
                    let due_open = match channel.reopen_at {
                        Some(reopen_at) => now >= reopen_at,
                        None => channel.schedule.is_open_at(now),
                    };
                    if !due_open {
                        continue;
                    }
                    TransitionKind::Open
                }
            };
            due.push(Transition {
                guild_id: channel.guild_id,
                channel_id: channel.channel_id,
                kind,
            });
        }
        due
    }

    /// Records a transition that was successfully applied to Discord and
    /// returns the updated row to persist.
    pub fn commit(&mut self, transition: Transition, now: DateTime<Utc>) -> Option<ClopenRow> {
        let channel = self.channels.get_mut(&transition.guild_id)?;
        if channel.channel_id != transition.channel_id {
            return None;
        }
        match transition.kind {
            TransitionKind::Close => {
                channel.state = ChannelState::Closed;
                channel.reopen_at = Some(channel.schedule.next_open_after(now));
                channel.votes.clear();
                channel.control_message = None;
            }
            TransitionKind::Open => {
                channel.state = ChannelState::Open;
                channel.reopen_at = None;
            }
        }
        channel.last_transition = Some(now);
        Some(channel.to_row())
    }

    /// Records that a quorum close could not be applied. The vote round is
    /// spent either way; the scheduler keeps retrying the close.
    pub fn mark_pending_close(&mut self, guild_id: u64) -> Option<ClopenRow> {
        let channel = self.channels.get_mut(&guild_id)?;
        channel.state = ChannelState::PendingClose;
        channel.votes.clear();
        channel.control_message = None;
        Some(channel.to_row())
    }

    /// Makes `message_id` the active control message if its content starts
    /// with the trigger and the channel is open. Any previous round's votes
    /// are discarded.
    pub fn register_control_message(
        &mut self,
        channel_id: u64,
        message_id: u64,
        content: &str,
    ) -> bool {
        if !content.trim_start().starts_with(CONTROL_TRIGGER) {
            return false;
        }
        let Some(channel) = self.channel_mut(channel_id) else {
            return false;
        };
        if channel.state != ChannelState::Open {
            return false;
        }
        channel.control_message = Some(message_id);
        channel.votes.clear();
        true
    }

    /// Feeds one reaction into the active vote round.
    pub fn record_vote(
        &mut self,
        channel_id: u64,
        message_id: u64,
        user_id: u64,
        emoji: &str,
    ) -> VoteOutcome {
        let Some(channel) = self.channel_mut(channel_id) else {
            return VoteOutcome::NotTracked;
        };
        if channel.state != ChannelState::Open
            || channel.control_message != Some(message_id)
            || channel.emoji != emoji
        {
            return VoteOutcome::NotTracked;
        }
        if !channel.votes.insert(user_id) {
            return VoteOutcome::AlreadyVoted;
        }
        let count = channel.votes.len() as u32;
        if count >= channel.threshold {
            VoteOutcome::QuorumReached(Transition {
                guild_id: channel.guild_id,
                channel_id: channel.channel_id,
                kind: TransitionKind::Close,
            })
        } else {
            VoteOutcome::Counted(count)
        }
    }

    fn channel_mut(&mut self, channel_id: u64) -> Option<&mut ManagedChannel> {
        self.channels
            .values_mut()
            .find(|channel| channel.channel_id == channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const GUILD: u64 = 100;
    const CHANNEL: u64 = 200;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, hour, minute, 0).unwrap()
    }

    fn settings(open: &str, close: &str, threshold: u32) -> ClopenSettings {
        ClopenSettings {
            guild_id: GUILD,
            channel_id: CHANNEL,
            schedule: DailySchedule::parse(open, close).unwrap(),
            threshold,
            emoji: "🔒".to_string(),
        }
    }

    fn registry_with(open: &str, close: &str, threshold: u32) -> ClopenRegistry {
        let mut registry = ClopenRegistry::new();
        registry.upsert(settings(open, close, threshold));
        registry
    }

    fn sample_row(open: &str, close: &str, threshold: u32) -> ClopenRow {
        let mut registry = ClopenRegistry::new();
        registry.upsert(settings(open, close, threshold))
    }

    fn close_transition() -> Transition {
        Transition {
            guild_id: GUILD,
            channel_id: CHANNEL,
            kind: TransitionKind::Close,
        }
    }

    #[test]
    fn test_channel_state_round_trip() {
        for state in [
            ChannelState::Open,
            ChannelState::Closed,
            ChannelState::PendingClose,
        ] {
            assert_eq!(state.as_str().parse::<ChannelState>().unwrap(), state);
        }
        assert!("ajar".parse::<ChannelState>().is_err());
    }

    #[test]
    fn test_closes_when_tick_passes_close_time() {
        let registry = registry_with("09:00", "17:00", 5);

        assert!(registry.due_transitions(at(12, 0)).is_empty());
        let due = registry.due_transitions(at(17, 0));
        assert_eq!(due, vec![close_transition()]);
    }

    #[test]
    fn test_due_transitions_repeat_until_committed() {
        let mut registry = registry_with("09:00", "17:00", 5);

        let first = registry.due_transitions(at(18, 0));
        let second = registry.due_transitions(at(18, 5));
        assert_eq!(first, second);

        registry.commit(first[0], at(18, 5));
        assert!(registry.due_transitions(at(18, 6)).is_empty());
    }

    #[test]
    fn test_commit_close_schedules_next_opening() {
        let mut registry = registry_with("09:00", "17:00", 5);

        let row = registry.commit(close_transition(), at(17, 0)).unwrap();
        assert_eq!(row.state, ChannelState::Closed);
        assert_eq!(row.reopen_at, Some(at(9, 0) + Duration::days(1)));
        assert_eq!(row.last_transition, Some(at(17, 0)));

        // Stays closed for the rest of the day, reopens at the next opening.
        assert!(registry.due_transitions(at(23, 59)).is_empty());
        let due = registry.due_transitions(at(9, 0) + Duration::days(1));
        assert_eq!(due[0].kind, TransitionKind::Open);
    }

    #[test]
    fn test_commit_open_clears_reopen_marker() {
        let mut registry = registry_with("09:00", "17:00", 5);
        registry.commit(close_transition(), at(17, 0));

        let open = Transition {
            kind: TransitionKind::Open,
            ..close_transition()
        };
        let row = registry.commit(open, at(9, 0) + Duration::days(1)).unwrap();
        assert_eq!(row.state, ChannelState::Open);
        assert_eq!(row.reopen_at, None);
    }

    #[test]
    fn test_quorum_closes_ahead_of_schedule() {
        let mut registry = registry_with("09:00", "17:00", 5);
        assert!(registry.register_control_message(CHANNEL, 1, "!close"));

        for user in 1..=4 {
            assert_eq!(
                registry.record_vote(CHANNEL, 1, user, "🔒"),
                VoteOutcome::Counted(user as u32)
            );
        }
        assert_eq!(
            registry.record_vote(CHANNEL, 1, 5, "🔒"),
            VoteOutcome::QuorumReached(close_transition())
        );

        // Mid-window close sticks until the next scheduled opening.
        let row = registry.commit(close_transition(), at(12, 0)).unwrap();
        assert_eq!(row.reopen_at, Some(at(9, 0) + Duration::days(1)));
        assert!(registry.due_transitions(at(13, 0)).is_empty());
    }

    #[test]
    fn test_duplicate_votes_are_ignored() {
        let mut registry = registry_with("09:00", "17:00", 5);
        registry.register_control_message(CHANNEL, 1, "!close");

        assert_eq!(
            registry.record_vote(CHANNEL, 1, 42, "🔒"),
            VoteOutcome::Counted(1)
        );
        assert_eq!(
            registry.record_vote(CHANNEL, 1, 42, "🔒"),
            VoteOutcome::AlreadyVoted
        );
        assert_eq!(registry.status(GUILD, at(12, 0)).unwrap().votes, 1);
    }

    #[test]
    fn test_reactions_elsewhere_are_not_tracked() {
        let mut registry = registry_with("09:00", "17:00", 5);
        registry.register_control_message(CHANNEL, 1, "!close");

        // Wrong message, wrong emoji, wrong channel.
        assert_eq!(
            registry.record_vote(CHANNEL, 2, 42, "🔒"),
            VoteOutcome::NotTracked
        );
        assert_eq!(
            registry.record_vote(CHANNEL, 1, 42, "👍"),
            VoteOutcome::NotTracked
        );
        assert_eq!(
            registry.record_vote(999, 1, 42, "🔒"),
            VoteOutcome::NotTracked
        );
    }

    #[test]
    fn test_new_control_message_resets_the_round() {
        let mut registry = registry_with("09:00", "17:00", 5);
        registry.register_control_message(CHANNEL, 1, "!close");
        registry.record_vote(CHANNEL, 1, 42, "🔒");
        registry.record_vote(CHANNEL, 1, 43, "🔒");

        assert!(registry.register_control_message(CHANNEL, 2, "!close please"));
        assert_eq!(registry.status(GUILD, at(12, 0)).unwrap().votes, 0);
        assert_eq!(
            registry.record_vote(CHANNEL, 1, 44, "🔒"),
            VoteOutcome::NotTracked
        );
        assert_eq!(
            registry.record_vote(CHANNEL, 2, 42, "🔒"),
            VoteOutcome::Counted(1)
        );
    }

    #[test]
    fn test_control_message_requires_trigger_and_open_channel() {
        let mut registry = registry_with("09:00", "17:00", 5);
        assert!(!registry.register_control_message(CHANNEL, 1, "close it"));

        registry.commit(close_transition(), at(17, 0));
        assert!(!registry.register_control_message(CHANNEL, 2, "!close"));
        assert_eq!(
            registry.record_vote(CHANNEL, 2, 42, "🔒"),
            VoteOutcome::NotTracked
        );
    }

    #[test]
    fn test_pending_close_retries_every_tick() {
        let mut registry = registry_with("09:00", "17:00", 5);
        let row = registry.mark_pending_close(GUILD).unwrap();
        assert_eq!(row.state, ChannelState::PendingClose);

        // Due even though the schedule says open.
        let due = registry.due_transitions(at(12, 0));
        assert_eq!(due, vec![close_transition()]);

        let row = registry.commit(due[0], at(12, 1)).unwrap();
        assert_eq!(row.state, ChannelState::Closed);
    }

    #[test]
    fn test_channel_overdue_at_load_closes_on_first_tick() {
        let row = sample_row("09:00", "17:00", 5);
        assert_eq!(row.state, ChannelState::Open);

        let registry = ClopenRegistry::from_rows(vec![row]);
        let due = registry.due_transitions(at(20, 0));
        assert_eq!(due, vec![close_transition()]);
    }

    #[test]
    fn test_from_rows_skips_unusable_schedules() {
        let good = sample_row("09:00", "17:00", 5);
        let mut bad = good.clone();
        bad.guild_id = 999;
        bad.open_minute = 600;
        bad.close_minute = 600;

        let registry = ClopenRegistry::from_rows(vec![good, bad]);
        assert_eq!(registry.len(), 1);
        assert!(registry.status(GUILD, at(12, 0)).is_some());
    }

    #[test]
    fn test_reconfiguring_same_channel_keeps_state() {
        let mut registry = registry_with("09:00", "17:00", 5);
        registry.commit(close_transition(), at(17, 0));

        let row = registry.upsert(settings("10:00", "16:00", 3));
        assert_eq!(row.state, ChannelState::Closed);
        assert_eq!(row.threshold, 3);

        // Switching to another channel starts over as open.
        let mut moved = settings("10:00", "16:00", 3);
        moved.channel_id = 555;
        let row = registry.upsert(moved);
        assert_eq!(row.state, ChannelState::Open);
        assert_eq!(row.reopen_at, None);
    }

    #[test]
    fn test_status_reports_next_change() {
        let mut registry = registry_with("09:00", "17:00", 5);

        let status = registry.status(GUILD, at(12, 0)).unwrap();
        assert_eq!(status.state, ChannelState::Open);
        assert_eq!(status.open_time, "09:00");
        assert_eq!(status.close_time, "17:00");
        assert_eq!(status.next_change, Some(at(17, 0)));

        registry.commit(close_transition(), at(17, 0));
        let status = registry.status(GUILD, at(17, 1)).unwrap();
        assert_eq!(status.next_change, Some(at(9, 0) + Duration::days(1)));

        registry.mark_pending_close(GUILD);
        assert_eq!(registry.status(GUILD, at(17, 2)).unwrap().next_change, None);

        assert!(registry.status(12345, at(17, 2)).is_none());
    }

    #[test]
    fn test_remove_forgets_the_guild() {
        let mut registry = registry_with("09:00", "17:00", 5);
        assert!(registry.remove(GUILD));
        assert!(!registry.remove(GUILD));
        assert!(registry.due_transitions(at(20, 0)).is_empty());
    }
}
