use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::bot::{chat_event::chat_event::GuildId, commands::commands::BotResult, db::{initialize_database, GLOBAL_ROW}};

/// Key/value settings scoped to a guild, or global when `guild` is `None`.
pub trait SettingsProvider: Send + Sync {
    fn get<'a>(&'a self, guild: Option<&'a GuildId>, key: &'a str, default: Value) -> BoxFuture<'a, BotResult<Value>>;

    fn set<'a>(&'a self, guild: Option<&'a GuildId>, key: &'a str, value: Value) -> BoxFuture<'a, BotResult<()>>;

    /// Returns the removed value, if there was one.
    fn remove<'a>(&'a self, guild: Option<&'a GuildId>, key: &'a str) -> BoxFuture<'a, BotResult<Option<Value>>>;
}

fn row_key(guild: Option<&GuildId>) -> String {
    guild.map(|g| g.as_str().to_string()).unwrap_or_else(|| GLOBAL_ROW.to_string())
}

/// Settings that live only as long as the process.
#[derive(Default)]
pub struct MemorySettings {
    rows: DashMap<String, Map<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsProvider for MemorySettings {
    fn get<'a>(&'a self, guild: Option<&'a GuildId>, key: &'a str, default: Value) -> BoxFuture<'a, BotResult<Value>> {
        Box::pin(async move {
            let value = self.rows.get(&row_key(guild)).and_then(|row| row.get(key).cloned());
            Ok(value.unwrap_or(default))
        })
    }

    fn set<'a>(&'a self, guild: Option<&'a GuildId>, key: &'a str, value: Value) -> BoxFuture<'a, BotResult<()>> {
        Box::pin(async move {
            self.rows.entry(row_key(guild)).or_default().insert(key.to_string(), value);
            Ok(())
        })
    }

    fn remove<'a>(&'a self, guild: Option<&'a GuildId>, key: &'a str) -> BoxFuture<'a, BotResult<Option<Value>>> {
        Box::pin(async move {
            Ok(self.rows.get_mut(&row_key(guild)).and_then(|mut row| row.remove(key)))
        })
    }
}

/// SQLite-backed settings: one JSON document per guild, cached in memory and written
/// through on every change.
pub struct SqliteSettings {
    pool: SqlitePool,
    cache: DashMap<String, Map<String, Value>>,
}

impl SqliteSettings {
    pub async fn init(pool: SqlitePool) -> BotResult<Self> {
        initialize_database(&pool).await?;

        let rows: Vec<(String, String)> = sqlx::query_as("SELECT guild, settings FROM settings")
            .fetch_all(&pool)
            .await?;

        let cache = DashMap::new();
        for (guild, raw) in rows {
            let settings: Map<String, Value> = serde_json::from_str(&raw)?;
            cache.insert(guild, settings);
        }
        info!("Loaded settings for {} guild rows", cache.len());

        Ok(SqliteSettings { pool, cache })
    }

    async fn persist(&self, row: &str) -> BotResult<()> {
        let json = match self.cache.get(row) {
            Some(settings) => serde_json::to_string(&*settings)?,
            None => return Ok(()),
        };

        sqlx::query(
            r#"
            INSERT INTO settings (guild, settings)
            VALUES (?1, ?2)
            ON CONFLICT (guild)
            DO UPDATE SET settings = excluded.settings
            "#,
        )
        .bind(row)
        .bind(json)
        .execute(&self.pool)
        .await?;

        debug!("Persisted settings row {row}");
        Ok(())
    }
}

impl SettingsProvider for SqliteSettings {
    fn get<'a>(&'a self, guild: Option<&'a GuildId>, key: &'a str, default: Value) -> BoxFuture<'a, BotResult<Value>> {
        Box::pin(async move {
            let value = self.cache.get(&row_key(guild)).and_then(|row| row.get(key).cloned());
            Ok(value.unwrap_or(default))
        })
    }

    fn set<'a>(&'a self, guild: Option<&'a GuildId>, key: &'a str, value: Value) -> BoxFuture<'a, BotResult<()>> {
        Box::pin(async move {
            let row = row_key(guild);
            self.cache.entry(row.clone()).or_default().insert(key.to_string(), value);
            self.persist(&row).await
        })
    }

    fn remove<'a>(&'a self, guild: Option<&'a GuildId>, key: &'a str) -> BoxFuture<'a, BotResult<Option<Value>>> {
        Box::pin(async move {
            let row = row_key(guild);
            let removed = self.cache.get_mut(&row).and_then(|mut settings| settings.remove(key));
            if removed.is_some() {
                self.persist(&row).await?;
            }
            Ok(removed)
        })
    }
}
