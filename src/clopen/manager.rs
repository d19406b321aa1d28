//! The manager task that owns the clopen registry.
//!
//! All mutation goes through a single mpsc channel, so the registry needs no
//! locking: gateway events, scheduler ticks and command requests are applied
//! one at a time, in arrival order. A companion timer task feeds the manager
//! a tick every minute.

use crate::clopen::registry::{
    ChannelState, ClopenRegistry, ClopenSettings, ClopenStatus, Transition, TransitionKind,
    VoteOutcome,
};
use crate::clopen::ChannelGate;
use crate::error::{DeepdexError, Result};
use crate::lang::Lang;
use crate::store::{ClopenRow, GuildStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
enum ClopenEvent {
    Tick(DateTime<Utc>),
    Message {
        channel_id: u64,
        message_id: u64,
        content: String,
    },
    Reaction {
        channel_id: u64,
        message_id: u64,
        user_id: u64,
        emoji: String,
    },
    Configure {
        settings: ClopenSettings,
        reply: oneshot::Sender<Result<()>>,
    },
    Remove {
        guild_id: u64,
        reply: oneshot::Sender<Result<bool>>,
    },
    Status {
        guild_id: u64,
        reply: oneshot::Sender<Option<ClopenStatus>>,
    },
}

/// Cheap, cloneable handle for talking to the manager task.
#[derive(Clone)]
pub struct ClopenHandle {
    sender: mpsc::Sender<ClopenEvent>,
}

impl ClopenHandle {
    /// Starts the manager and its timer and returns a handle to both.
    pub fn spawn(
        registry: ClopenRegistry,
        store: GuildStore,
        gate: Arc<dyn ChannelGate>,
        tick_interval: Duration,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(64);
        tokio::spawn(run_timer(sender.clone(), tick_interval));
        tokio::spawn(run_manager(receiver, registry, store, gate));
        Self { sender }
    }

    /// Forwards a guild message. Only messages starting with the control
    /// trigger in a managed channel have any effect.
    pub async fn on_message(&self, channel_id: u64, message_id: u64, content: String) {
        let _ = self
            .sender
            .send(ClopenEvent::Message {
                channel_id,
                message_id,
                content,
            })
            .await;
    }

    /// Forwards a reaction added somewhere in a guild.
    pub async fn on_reaction(&self, channel_id: u64, message_id: u64, user_id: u64, emoji: String) {
        let _ = self
            .sender
            .send(ClopenEvent::Reaction {
                channel_id,
                message_id,
                user_id,
                emoji,
            })
            .await;
    }

    /// Installs or replaces a guild's configuration.
    pub async fn configure(&self, settings: ClopenSettings) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(ClopenEvent::Configure { settings, reply })
            .await
            .map_err(|_| manager_gone())?;
        response.await.map_err(|_| manager_gone())?
    }

    /// Stops managing a guild's channel. Returns whether one was configured.
    pub async fn remove(&self, guild_id: u64) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(ClopenEvent::Remove { guild_id, reply })
            .await
            .map_err(|_| manager_gone())?;
        response.await.map_err(|_| manager_gone())?
    }

    /// Current state of a guild's managed channel, if one is configured.
    pub async fn status(&self, guild_id: u64) -> Result<Option<ClopenStatus>> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(ClopenEvent::Status { guild_id, reply })
            .await
            .map_err(|_| manager_gone())?;
        response.await.map_err(|_| manager_gone())
    }
}

fn manager_gone() -> DeepdexError {
    DeepdexError::Clopen("Channel manager is not running".to_string())
}

async fn run_timer(sender: mpsc::Sender<ClopenEvent>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        if sender.send(ClopenEvent::Tick(Utc::now())).await.is_err() {
            return;
        }
    }
}

async fn run_manager(
    mut receiver: mpsc::Receiver<ClopenEvent>,
    mut registry: ClopenRegistry,
    store: GuildStore,
    gate: Arc<dyn ChannelGate>,
) {
    tracing::info!(configs = registry.len(), "Clopen manager started");

    while let Some(event) = receiver.recv().await {
        match event {
            ClopenEvent::Tick(now) => {
                handle_tick(&mut registry, &store, gate.as_ref(), now).await;
            }
            ClopenEvent::Message {
                channel_id,
                message_id,
                content,
            } => {
                if registry.register_control_message(channel_id, message_id, &content) {
                    tracing::debug!(channel_id, message_id, "Registered close control message");
                }
            }
            ClopenEvent::Reaction {
                channel_id,
                message_id,
                user_id,
                emoji,
            } => {
                handle_reaction(
                    &mut registry,
                    &store,
                    gate.as_ref(),
                    channel_id,
                    message_id,
                    user_id,
                    &emoji,
                )
                .await;
            }
            ClopenEvent::Configure { settings, reply } => {
                let result = handle_configure(&mut registry, &store, settings).await;
                let configured = result.is_ok();
                let _ = reply.send(result);
                // Converge immediately instead of waiting for the next tick.
                if configured {
                    handle_tick(&mut registry, &store, gate.as_ref(), Utc::now()).await;
                }
            }
            ClopenEvent::Remove { guild_id, reply } => {
                let result = handle_remove(&mut registry, &store, gate.as_ref(), guild_id).await;
                let _ = reply.send(result);
            }
            ClopenEvent::Status { guild_id, reply } => {
                let _ = reply.send(registry.status(guild_id, Utc::now()));
            }
        }
    }
}

async fn handle_tick(
    registry: &mut ClopenRegistry,
    store: &GuildStore,
    gate: &dyn ChannelGate,
    now: DateTime<Utc>,
) {
    for transition in registry.due_transitions(now) {
        apply_transition(registry, store, gate, transition, now).await;
    }
}

/// Applies one transition to Discord and, only if that succeeds, to the
/// registry and the database. A failed apply leaves the registry untouched
/// so the next tick produces the same transition again.
async fn apply_transition(
    registry: &mut ClopenRegistry,
    store: &GuildStore,
    gate: &dyn ChannelGate,
    transition: Transition,
    now: DateTime<Utc>,
) {
    let close = transition.kind == TransitionKind::Close;
    if let Err(error) = gate
        .set_closed(transition.guild_id, transition.channel_id, close)
        .await
    {
        tracing::warn!(
            guild_id = transition.guild_id,
            channel_id = transition.channel_id,
            %error,
            "Failed to apply channel transition, retrying on next tick"
        );
        return;
    }

    let Some(row) = registry.commit(transition, now) else {
        return;
    };
    tracing::info!(
        guild_id = row.guild_id,
        channel_id = row.channel_id,
        state = row.state.as_str(),
        "Channel transition applied"
    );
    persist_state(store, &row).await;
    announce_transition(store, gate, &transition).await;
}

async fn handle_reaction(
    registry: &mut ClopenRegistry,
    store: &GuildStore,
    gate: &dyn ChannelGate,
    channel_id: u64,
    message_id: u64,
    user_id: u64,
    emoji: &str,
) {
    match registry.record_vote(channel_id, message_id, user_id, emoji) {
        VoteOutcome::NotTracked | VoteOutcome::AlreadyVoted => {}
        VoteOutcome::Counted(count) => {
            tracing::debug!(channel_id, count, "Close vote counted");
        }
        VoteOutcome::QuorumReached(transition) => {
            tracing::info!(
                guild_id = transition.guild_id,
                channel_id,
                "Close vote quorum reached"
            );
            let now = Utc::now();
            match gate
                .set_closed(transition.guild_id, transition.channel_id, true)
                .await
            {
                Ok(()) => {
                    if let Some(row) = registry.commit(transition, now) {
                        persist_state(store, &row).await;
                    }
                    announce_transition(store, gate, &transition).await;
                }
                Err(error) => {
                    tracing::warn!(
                        guild_id = transition.guild_id,
                        %error,
                        "Quorum close failed, retrying on next tick"
                    );
                    if let Some(row) = registry.mark_pending_close(transition.guild_id) {
                        persist_state(store, &row).await;
                    }
                }
            }
        }
    }
}

async fn handle_configure(
    registry: &mut ClopenRegistry,
    store: &GuildStore,
    settings: ClopenSettings,
) -> Result<()> {
    let guild_id = settings.guild_id;
    let row = registry.upsert(settings);
    store.upsert_clopen(row).await?;
    tracing::info!(guild_id, "Clopen configuration saved");
    Ok(())
}

async fn handle_remove(
    registry: &mut ClopenRegistry,
    store: &GuildStore,
    gate: &dyn ChannelGate,
    guild_id: u64,
) -> Result<bool> {
    let Some(status) = registry.status(guild_id, Utc::now()) else {
        return Ok(false);
    };
    store.delete_clopen(guild_id).await?;
    registry.remove(guild_id);

    // Do not leave the channel locked once nobody will ever reopen it.
    if status.state != ChannelState::Open {
        if let Err(error) = gate.set_closed(guild_id, status.channel_id, false).await {
            tracing::warn!(guild_id, %error, "Could not reopen channel while disabling");
        }
    }
    tracing::info!(guild_id, "Clopen configuration removed");
    Ok(true)
}

async fn persist_state(store: &GuildStore, row: &ClopenRow) {
    if let Err(error) = store
        .update_clopen_state(row.guild_id, row.state, row.reopen_at, row.last_transition)
        .await
    {
        tracing::error!(guild_id = row.guild_id, %error, "Failed to persist channel state");
    }
}

async fn announce_transition(store: &GuildStore, gate: &dyn ChannelGate, transition: &Transition) {
    let lang = guild_language(store, transition.guild_id).await;
    let notice = match transition.kind {
        TransitionKind::Close => lang.channel_closed_notice(),
        TransitionKind::Open => lang.channel_opened_notice(),
    };
    if let Err(error) = gate.announce(transition.channel_id, notice).await {
        tracing::debug!(
            channel_id = transition.channel_id,
            %error,
            "Could not post transition notice"
        );
    }
}

async fn guild_language(store: &GuildStore, guild_id: u64) -> Lang {
    match store.get_language(guild_id).await {
        Ok(tag) => tag.as_deref().and_then(Lang::from_tag).unwrap_or_default(),
        Err(error) => {
            tracing::debug!(guild_id, %error, "Could not load guild language");
            Lang::default()
        }
    }
}
