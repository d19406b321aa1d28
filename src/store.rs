//! SQLite persistence layer.
//!
//! This module provides a repository over the bot's two persisted tables:
//! per-guild language settings and per-guild clopen (scheduled open/close)
//! configurations. The database is a write-through cache; while the process
//! runs, the in-memory registries are the source of truth.

use crate::clopen::ChannelState;
use crate::error::{DeepdexError, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;

/// One persisted clopen configuration, as stored per guild.
#[derive(Debug, Clone, PartialEq)]
pub struct ClopenRow {
    pub guild_id: u64,
    pub channel_id: u64,
    /// Minute of day (UTC) at which the channel opens
    pub open_minute: u16,
    /// Minute of day (UTC) at which the channel closes
    pub close_minute: u16,
    /// Number of distinct qualifying reactions that force an early close
    pub threshold: u32,
    /// Emoji counted as a qualifying reaction
    pub emoji: String,
    pub state: ChannelState,
    /// When set, the channel reopens at the first tick at or after this time
    pub reopen_at: Option<DateTime<Utc>>,
    pub last_transition: Option<DateTime<Utc>>,
}

/// Initialize the database schema.
///
/// Creates the necessary tables if they don't already exist. Also creates
/// the parent directory if needed.
///
/// # Errors
///
/// Returns an error if the database cannot be created or initialized.
pub async fn init_db(path: &str) -> Result<()> {
    let path = path.to_string();
    tokio::task::spawn_blocking(move || init_db_sync(&path))
        .await
        .map_err(|e| DeepdexError::Store(format!("Task join error: {}", e)))??;
    Ok(())
}

fn init_db_sync(path: &str) -> Result<()> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS guild_settings (
            guild_id TEXT NOT NULL PRIMARY KEY,
            language TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS clopen_configs (
            guild_id TEXT NOT NULL PRIMARY KEY,
            channel_id TEXT NOT NULL,
            open_minute INTEGER NOT NULL,
            close_minute INTEGER NOT NULL,
            threshold INTEGER NOT NULL,
            emoji TEXT NOT NULL,
            state TEXT NOT NULL,
            reopen_at INTEGER,
            last_transition INTEGER
        )",
        [],
    )?;

    Ok(())
}

/// Repository for guild-scoped persisted state.
#[derive(Clone)]
pub struct GuildStore {
    db_path: String,
}

impl GuildStore {
    /// Create a new guild store over the given database file.
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    /// Get the stored language code for a guild, if any.
    pub async fn get_language(&self, guild_id: u64) -> Result<Option<String>> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let mut stmt =
                conn.prepare("SELECT language FROM guild_settings WHERE guild_id = ?1")?;
            let mut rows = stmt.query(rusqlite::params![guild_id.to_string()])?;

            if let Some(row) = rows.next()? {
                Ok(Some(row.get(0)?))
            } else {
                Ok(None)
            }
        })
        .await
        .map_err(|e| DeepdexError::Store(format!("Task join error: {}", e)))?
    }

    /// Insert or update the language code for a guild.
    pub async fn set_language(&self, guild_id: u64, language: &str) -> Result<()> {
        let db_path = self.db_path.clone();
        let language = language.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "INSERT INTO guild_settings (guild_id, language)
                 VALUES (?1, ?2)
                 ON CONFLICT(guild_id) DO UPDATE SET language = ?2",
                rusqlite::params![guild_id.to_string(), language],
            )?;
            Ok::<_, DeepdexError>(())
        })
        .await
        .map_err(|e| DeepdexError::Store(format!("Task join error: {}", e)))??;
        Ok(())
    }

    /// Load every persisted clopen configuration.
    ///
    /// Loading fails soft per guild: a malformed row is logged and skipped
    /// rather than failing the whole load.
    pub async fn load_clopen_rows(&self) -> Result<Vec<ClopenRow>> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT guild_id, channel_id, open_minute, close_minute, threshold,
                        emoji, state, reopen_at, last_transition
                 FROM clopen_configs",
            )?;

            let raw_rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<i64>>(7)?,
                    row.get::<_, Option<i64>>(8)?,
                ))
            })?;

            let mut rows = Vec::new();
            for raw in raw_rows {
                let raw = raw?;
                match parse_clopen_row(&raw) {
                    Ok(row) => rows.push(row),
                    Err(e) => {
                        tracing::warn!(guild_id = %raw.0, error = %e, "Skipping malformed clopen config row");
                    }
                }
            }
            Ok(rows)
        })
        .await
        .map_err(|e| DeepdexError::Store(format!("Task join error: {}", e)))?
    }

    /// Insert or replace the full clopen configuration for a guild.
    pub async fn upsert_clopen(&self, row: ClopenRow) -> Result<()> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "INSERT INTO clopen_configs
                     (guild_id, channel_id, open_minute, close_minute, threshold,
                      emoji, state, reopen_at, last_transition)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(guild_id) DO UPDATE SET
                     channel_id = ?2, open_minute = ?3, close_minute = ?4,
                     threshold = ?5, emoji = ?6, state = ?7,
                     reopen_at = ?8, last_transition = ?9",
                rusqlite::params![
                    row.guild_id.to_string(),
                    row.channel_id.to_string(),
                    i64::from(row.open_minute),
                    i64::from(row.close_minute),
                    i64::from(row.threshold),
                    row.emoji,
                    row.state.as_str(),
                    row.reopen_at.map(|t| t.timestamp()),
                    row.last_transition.map(|t| t.timestamp()),
                ],
            )?;
            Ok::<_, DeepdexError>(())
        })
        .await
        .map_err(|e| DeepdexError::Store(format!("Task join error: {}", e)))??;
        Ok(())
    }

    /// Persist the channel state for a guild after an applied transition.
    pub async fn update_clopen_state(
        &self,
        guild_id: u64,
        state: ChannelState,
        reopen_at: Option<DateTime<Utc>>,
        last_transition: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "UPDATE clopen_configs
                 SET state = ?2, reopen_at = ?3, last_transition = ?4
                 WHERE guild_id = ?1",
                rusqlite::params![
                    guild_id.to_string(),
                    state.as_str(),
                    reopen_at.map(|t| t.timestamp()),
                    last_transition.map(|t| t.timestamp()),
                ],
            )?;
            Ok::<_, DeepdexError>(())
        })
        .await
        .map_err(|e| DeepdexError::Store(format!("Task join error: {}", e)))??;
        Ok(())
    }

    /// Remove the clopen configuration for a guild.
    pub async fn delete_clopen(&self, guild_id: u64) -> Result<()> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "DELETE FROM clopen_configs WHERE guild_id = ?1",
                rusqlite::params![guild_id.to_string()],
            )?;
            Ok::<_, DeepdexError>(())
        })
        .await
        .map_err(|e| DeepdexError::Store(format!("Task join error: {}", e)))??;
        Ok(())
    }
}

type RawClopenRow = (
    String,
    String,
    i64,
    i64,
    i64,
    String,
    String,
    Option<i64>,
    Option<i64>,
);

fn parse_clopen_row(raw: &RawClopenRow) -> Result<ClopenRow> {
    let guild_id = raw
        .0
        .parse::<u64>()
        .map_err(|_| DeepdexError::Store(format!("invalid guild id '{}'", raw.0)))?;
    let channel_id = raw
        .1
        .parse::<u64>()
        .map_err(|_| DeepdexError::Store(format!("invalid channel id '{}'", raw.1)))?;

    let open_minute = minute_of_day(raw.2)?;
    let close_minute = minute_of_day(raw.3)?;

    if raw.4 < 1 {
        return Err(DeepdexError::Store(format!(
            "invalid reaction threshold {}",
            raw.4
        )));
    }
    let threshold = raw.4 as u32;

    if raw.5.is_empty() {
        return Err(DeepdexError::Store("empty reaction emoji".to_string()));
    }

    let state = raw
        .6
        .parse::<ChannelState>()
        .map_err(|_| DeepdexError::Store(format!("unknown channel state '{}'", raw.6)))?;

    Ok(ClopenRow {
        guild_id,
        channel_id,
        open_minute,
        close_minute,
        threshold,
        emoji: raw.5.clone(),
        state,
        reopen_at: raw.7.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        last_transition: raw.8.and_then(|secs| DateTime::from_timestamp(secs, 0)),
    })
}

fn minute_of_day(value: i64) -> Result<u16> {
    if (0..1440).contains(&value) {
        Ok(value as u16)
    } else {
        Err(DeepdexError::Store(format!(
            "minute of day {} out of range",
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Helper function to create a test database in a temporary directory
    async fn setup_test_db() -> (TempDir, GuildStore) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_str().expect("Invalid path").to_string();

        init_db(&db_path_str).await.expect("Failed to initialize database");

        let store = GuildStore::new(db_path_str);
        (temp_dir, store)
    }

    fn sample_row(guild_id: u64) -> ClopenRow {
        ClopenRow {
            guild_id,
            channel_id: 222,
            open_minute: 8 * 60,
            close_minute: 22 * 60,
            threshold: 5,
            emoji: "🔒".to_string(),
            state: ChannelState::Open,
            reopen_at: None,
            last_transition: None,
        }
    }

    #[tokio::test]
    async fn test_language_missing_by_default() {
        let (_temp_dir, store) = setup_test_db().await;
        assert_eq!(store.get_language(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_language_set_and_overwrite() {
        let (_temp_dir, store) = setup_test_db().await;

        store.set_language(1, "es").await.unwrap();
        assert_eq!(store.get_language(1).await.unwrap(), Some("es".to_string()));

        store.set_language(1, "en").await.unwrap();
        assert_eq!(store.get_language(1).await.unwrap(), Some("en".to_string()));

        // Other guilds are unaffected
        assert_eq!(store.get_language(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clopen_upsert_and_load_round_trip() {
        let (_temp_dir, store) = setup_test_db().await;

        let mut row = sample_row(100);
        row.state = ChannelState::Closed;
        row.reopen_at = DateTime::from_timestamp(1_700_000_000, 0);
        row.last_transition = DateTime::from_timestamp(1_699_990_000, 0);

        store.upsert_clopen(row.clone()).await.unwrap();
        store.upsert_clopen(sample_row(200)).await.unwrap();

        let mut loaded = store.load_clopen_rows().await.unwrap();
        loaded.sort_by_key(|r| r.guild_id);

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], row);
        assert_eq!(loaded[1], sample_row(200));
    }

    #[tokio::test]
    async fn test_clopen_upsert_replaces_existing() {
        let (_temp_dir, store) = setup_test_db().await;

        store.upsert_clopen(sample_row(100)).await.unwrap();

        let mut changed = sample_row(100);
        changed.threshold = 3;
        changed.close_minute = 23 * 60;
        store.upsert_clopen(changed.clone()).await.unwrap();

        let loaded = store.load_clopen_rows().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], changed);
    }

    #[tokio::test]
    async fn test_update_clopen_state_persists() {
        let (_temp_dir, store) = setup_test_db().await;

        store.upsert_clopen(sample_row(100)).await.unwrap();

        let reopen = DateTime::from_timestamp(1_800_000_000, 0);
        store
            .update_clopen_state(100, ChannelState::Closed, reopen, reopen)
            .await
            .unwrap();

        let loaded = store.load_clopen_rows().await.unwrap();
        assert_eq!(loaded[0].state, ChannelState::Closed);
        assert_eq!(loaded[0].reopen_at, reopen);
        assert_eq!(loaded[0].last_transition, reopen);
    }

    #[tokio::test]
    async fn test_delete_clopen() {
        let (_temp_dir, store) = setup_test_db().await;

        store.upsert_clopen(sample_row(100)).await.unwrap();
        store.delete_clopen(100).await.unwrap();

        assert!(store.load_clopen_rows().await.unwrap().is_empty());

        // Deleting a missing config should not error
        store.delete_clopen(100).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_skips_malformed_rows() {
        let (temp_dir, store) = setup_test_db().await;

        store.upsert_clopen(sample_row(100)).await.unwrap();

        // Write rows the application would never produce: a non-numeric guild
        // id, an out-of-range minute and an unknown state.
        let db_path = temp_dir.path().join("test.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute(
            "INSERT INTO clopen_configs VALUES ('not-a-guild', '1', 0, 60, 5, 'x', 'open', NULL, NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO clopen_configs VALUES ('300', '1', 9999, 60, 5, 'x', 'open', NULL, NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO clopen_configs VALUES ('400', '1', 0, 60, 5, 'x', 'ajar', NULL, NULL)",
            [],
        )
        .unwrap();
        drop(conn);

        let loaded = store.load_clopen_rows().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].guild_id, 100);
    }
}
