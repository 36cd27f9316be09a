//! SQLite-backed [`ReferenceStore`] implementation.
//!
//! Reads canonical entities straight from the annotation tables created by
//! [`migrate`](crate::migrate), in `rowid` order.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use droma_core::models::{EntityKind, ReferenceEntity, ReferenceSet};
use droma_core::store::ReferenceStore;

use crate::db::{quote_ident, table_columns, table_exists};

/// SQLite implementation of the [`ReferenceStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ReferenceStore for SqliteStore {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        table_exists(&self.pool, table).await
    }

    async fn load_reference(&self, kind: EntityKind) -> Result<Option<ReferenceSet>> {
        let table = kind.table();
        if !table_exists(&self.pool, table).await? {
            return Ok(None);
        }

        let columns = table_columns(&self.pool, table).await?;
        let has_raw = columns.iter().any(|c| c == "ProjectRawName");
        let has_alternates = columns.iter().any(|c| c == "AlternateName");

        let mut select = vec![format!(
            "CAST({} AS TEXT) AS canonical_id",
            quote_ident(kind.id_column())
        )];
        select.push(if has_raw {
            "CAST(ProjectRawName AS TEXT) AS raw_name".to_string()
        } else {
            "NULL AS raw_name".to_string()
        });
        select.push(if has_alternates {
            "CAST(AlternateName AS TEXT) AS alternate_names".to_string()
        } else {
            "NULL AS alternate_names".to_string()
        });

        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            select.join(", "),
            quote_ident(table)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            let canonical_id: Option<String> = row.get("canonical_id");
            let raw_name: Option<String> = row.get("raw_name");
            let alternates: Option<String> = row.get("alternate_names");
            let mut entity =
                ReferenceEntity::new(canonical_id.unwrap_or_default(), raw_name.unwrap_or_default());
            entity.alternate_names = alternates;
            entities.push(entity);
        }

        Ok(Some(
            ReferenceSet::new(kind, entities).with_alternate_column(has_alternates),
        ))
    }
}
