use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub mod settings;

pub const SETTINGS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS settings (
        guild TEXT PRIMARY KEY,
        settings TEXT NOT NULL
    );
";

/// Row key used for settings that are not tied to a guild.
pub const GLOBAL_ROW: &str = "global";

pub async fn initialize_database(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SETTINGS_TABLE).execute(pool).await?;
    Ok(())
}

/// Opens a pool suitable for the settings store. In-memory URLs are pinned to a single
/// long-lived connection, otherwise every pooled connection would see its own database.
pub async fn open_pool(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let mut options = SqlitePoolOptions::new();
    if url.contains(":memory:") {
        options = options.max_connections(1).idle_timeout(None).max_lifetime(None);
    }
    options.connect(url).await
}
