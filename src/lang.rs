//! Per-guild language selection and the bot's message catalog.
//!
//! Game terms (talents, mantras, stat names) are left in English in both
//! languages because that is how the community plays; only the bot's own
//! chrome is translated.

use crate::error::Result;
use crate::store::GuildStore;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A language the bot can reply in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    En,
    Es,
}

impl Lang {
    /// Parses a stored or user-supplied language tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Lang::En),
            "es" | "spanish" | "espanol" | "español" => Some(Lang::Es),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Es => "es",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Lang::En => "English",
            Lang::Es => "Español",
        }
    }

    pub fn empty_query(&self) -> &'static str {
        match self {
            Lang::En => "❌ Please provide a search term.",
            Lang::Es => "❌ Escribe un término de búsqueda.",
        }
    }

    pub fn not_found(&self, query: &str) -> String {
        match self {
            Lang::En => format!("❌ No match found for '{query}'."),
            Lang::Es => format!("❌ No se encontró nada para '{query}'."),
        }
    }

    pub fn invalid_build_link(&self) -> &'static str {
        match self {
            Lang::En => "❌ That doesn't look like a builder link or build id.",
            Lang::Es => "❌ Eso no parece un enlace del builder ni un id de build.",
        }
    }

    pub fn build_not_found(&self, id: &str) -> String {
        match self {
            Lang::En => format!("❌ Build '{id}' was not found on the planner."),
            Lang::Es => format!("❌ No se encontró la build '{id}' en el planner."),
        }
    }

    pub fn missing_build_link(&self) -> &'static str {
        match self {
            Lang::En => "❌ Provide a builder link, or reply to a message that contains one.",
            Lang::Es => "❌ Pon un enlace del builder, o responde a un mensaje que tenga uno.",
        }
    }

    pub fn build_load_failed_title(&self) -> &'static str {
        match self {
            Lang::En => "Build Load Failed",
            Lang::Es => "Error al cargar la build",
        }
    }

    pub fn build_load_failed(&self) -> &'static str {
        match self {
            Lang::En => {
                "Could not load the build from the planner. Make sure the link is a valid Deepwoken builder URL."
            }
            Lang::Es => {
                "No se pudo cargar la build desde el planner. Verifica que el enlace del builder sea válido."
            }
        }
    }

    pub fn ehp_failed_title(&self) -> &'static str {
        match self {
            Lang::En => "EHP Calculation Failed",
            Lang::Es => "Error al calcular el EHP",
        }
    }

    pub fn help_title(&self) -> &'static str {
        match self {
            Lang::En => "Deepdex Help",
            Lang::Es => "Ayuda de Deepdex",
        }
    }

    pub fn language_title(&self) -> &'static str {
        match self {
            Lang::En => "Language Settings",
            Lang::Es => "Configuración de idioma",
        }
    }

    pub fn language_info(&self) -> String {
        match self {
            Lang::En => format!(
                "The bot currently replies in **{}**. Pick a language with `/language English` or `/language Spanish`.",
                self.name()
            ),
            Lang::Es => format!(
                "El bot responde actualmente en **{}**. Elige un idioma con `/language English` o `/language Spanish`.",
                self.name()
            ),
        }
    }

    pub fn language_set(&self) -> String {
        match self {
            Lang::En => format!("✅ Language set to {}.", self.name()),
            Lang::Es => format!("✅ Idioma cambiado a {}.", self.name()),
        }
    }

    pub fn guild_only(&self) -> &'static str {
        match self {
            Lang::En => "❌ This command only works in a server.",
            Lang::Es => "❌ Este comando solo funciona en un servidor.",
        }
    }

    pub fn admin_only(&self) -> &'static str {
        match self {
            Lang::En => "❌ You need administrator permissions to do that.",
            Lang::Es => "❌ Necesitas permisos de administrador para hacer eso.",
        }
    }

    pub fn clopen_saved(&self) -> &'static str {
        match self {
            Lang::En => "✅ Channel schedule saved.",
            Lang::Es => "✅ Horario del canal guardado.",
        }
    }

    pub fn clopen_removed(&self) -> &'static str {
        match self {
            Lang::En => "✅ This server's channel schedule was removed.",
            Lang::Es => "✅ Se eliminó el horario del canal de este servidor.",
        }
    }

    pub fn clopen_missing(&self) -> &'static str {
        match self {
            Lang::En => "❌ No managed channel is configured for this server.",
            Lang::Es => "❌ No hay ningún canal configurado en este servidor.",
        }
    }

    pub fn clopen_status_title(&self) -> &'static str {
        match self {
            Lang::En => "Channel schedule",
            Lang::Es => "Horario del canal",
        }
    }

    pub fn label_state(&self) -> &'static str {
        match self {
            Lang::En => "State",
            Lang::Es => "Estado",
        }
    }

    pub fn label_opens(&self) -> &'static str {
        match self {
            Lang::En => "Opens (UTC)",
            Lang::Es => "Abre (UTC)",
        }
    }

    pub fn label_closes(&self) -> &'static str {
        match self {
            Lang::En => "Closes (UTC)",
            Lang::Es => "Cierra (UTC)",
        }
    }

    pub fn label_votes(&self) -> &'static str {
        match self {
            Lang::En => "Close votes",
            Lang::Es => "Votos de cierre",
        }
    }

    pub fn label_next_change(&self) -> &'static str {
        match self {
            Lang::En => "Next change (UTC)",
            Lang::Es => "Próximo cambio (UTC)",
        }
    }

    pub fn state_open(&self) -> &'static str {
        match self {
            Lang::En => "Open",
            Lang::Es => "Abierto",
        }
    }

    pub fn state_closed(&self) -> &'static str {
        match self {
            Lang::En => "Closed",
            Lang::Es => "Cerrado",
        }
    }

    pub fn state_pending_close(&self) -> &'static str {
        match self {
            Lang::En => "Closing (retrying)",
            Lang::Es => "Cerrando (reintentando)",
        }
    }

    pub fn channel_closed_notice(&self) -> &'static str {
        match self {
            Lang::En => "🔒 This channel is now closed. It will reopen on schedule.",
            Lang::Es => "🔒 Este canal está cerrado. Volverá a abrir según el horario.",
        }
    }

    pub fn channel_opened_notice(&self) -> &'static str {
        match self {
            Lang::En => "🔓 This channel is now open!",
            Lang::Es => "🔓 ¡Este canal está abierto!",
        }
    }
}

/// Per-guild language selection, backed by the database with a small
/// in-memory cache so message rendering doesn't hit SQLite.
pub struct LanguageStore {
    store: GuildStore,
    cache: RwLock<HashMap<u64, Lang>>,
}

impl LanguageStore {
    pub fn new(store: GuildStore) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The language for a guild, defaulting to English for direct messages,
    /// unknown guilds and unreadable settings.
    pub async fn get(&self, guild_id: Option<u64>) -> Lang {
        let Some(guild_id) = guild_id else {
            return Lang::default();
        };

        if let Some(lang) = self.cache.read().await.get(&guild_id) {
            return *lang;
        }

        let lang = match self.store.get_language(guild_id).await {
            Ok(tag) => tag.as_deref().and_then(Lang::from_tag).unwrap_or_default(),
            Err(error) => {
                tracing::warn!(guild_id, %error, "Could not load guild language");
                return Lang::default();
            }
        };
        self.cache.write().await.insert(guild_id, lang);
        lang
    }

    /// Persists a guild's language and updates the cache.
    pub async fn set(&self, guild_id: u64, lang: Lang) -> Result<()> {
        self.store.set_language(guild_id, lang.tag()).await?;
        self.cache.write().await.insert(guild_id, lang);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store;
    use tempfile::TempDir;

    #[test]
    fn test_from_tag() {
        assert_eq!(Lang::from_tag("en"), Some(Lang::En));
        assert_eq!(Lang::from_tag("ES"), Some(Lang::Es));
        assert_eq!(Lang::from_tag("Español"), Some(Lang::Es));
        assert_eq!(Lang::from_tag("fr"), None);
        assert_eq!(Lang::from_tag(""), None);
    }

    #[test]
    fn test_default_is_english() {
        assert_eq!(Lang::default(), Lang::En);
    }

    #[test]
    fn test_tag_round_trip() {
        for lang in [Lang::En, Lang::Es] {
            assert_eq!(Lang::from_tag(lang.tag()), Some(lang));
        }
    }

    #[test]
    fn test_messages_carry_the_query() {
        assert!(Lang::En.not_found("enforcer axe").contains("enforcer axe"));
        assert!(Lang::Es.not_found("enforcer axe").contains("enforcer axe"));
    }

    async fn setup_store() -> (TempDir, GuildStore) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_str().expect("Invalid path").to_string();
        store::init_db(&db_path_str).await.expect("init_db failed");
        (temp_dir, GuildStore::new(db_path_str))
    }

    #[tokio::test]
    async fn test_language_store_defaults_and_updates() {
        let (_temp_dir, store) = setup_store().await;
        let languages = LanguageStore::new(store);

        assert_eq!(languages.get(None).await, Lang::En);
        assert_eq!(languages.get(Some(1)).await, Lang::En);

        languages.set(1, Lang::Es).await.unwrap();
        assert_eq!(languages.get(Some(1)).await, Lang::Es);
        assert_eq!(languages.get(Some(2)).await, Lang::En);
    }

    #[tokio::test]
    async fn test_language_store_reads_persisted_value() {
        let (_temp_dir, store) = setup_store().await;
        store.set_language(7, "es").await.unwrap();

        let languages = LanguageStore::new(store);
        assert_eq!(languages.get(Some(7)).await, Lang::Es);
    }

    #[tokio::test]
    async fn test_unknown_persisted_tag_falls_back_to_english() {
        let (_temp_dir, store) = setup_store().await;
        store.set_language(7, "klingon").await.unwrap();

        let languages = LanguageStore::new(store);
        assert_eq!(languages.get(Some(7)).await, Lang::En);
    }
}
