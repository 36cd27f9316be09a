use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use droma_core::DromaError;

use crate::config::Config;

/// Open the configured database. The file must already exist.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;
    if !db_path.exists() {
        return Err(DromaError::connection(
            format!("Database file not found: {}", db_path.display()),
            "Run `droma init` first or check the file path",
        )
        .into());
    }
    open(db_path, false).await
}

/// Open the configured database, creating the file and its parent
/// directories when missing.
pub async fn connect_or_create(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    open(db_path, true).await
}

async fn open(db_path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(create)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| {
            DromaError::connection(
                format!("Failed to open database: {}", db_path.display()),
                e.to_string(),
            )
        })?;

    Ok(pool)
}

/// Whether `table` exists in `sqlite_master`.
pub async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name = ?",
    )
    .bind(table)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// Column names of `table`, in declaration order.
pub async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>> {
    use sqlx::Row;

    let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|r| r.get::<String, _>("name")).collect())
}

/// Quote an SQL identifier with double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("sample_anno"), "\"sample_anno\"");
        assert_eq!(quote_ident("Harmonized ID (Pubchem ID)"), "\"Harmonized ID (Pubchem ID)\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
