//! In-memory [`ReferenceStore`] for tests and fixtures.
//!
//! Tables are keyed by [`EntityKind`] behind `std::sync::RwLock`. A kind
//! that was never inserted reports its table as missing.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{EntityKind, ReferenceEntity, ReferenceSet};

use super::ReferenceStore;

struct StoredTable {
    entities: Vec<ReferenceEntity>,
    has_alternate_column: bool,
}

pub struct MemoryStore {
    tables: RwLock<HashMap<EntityKind, StoredTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Create or replace the table for `kind`. The alternate-name column is
    /// considered present when any entity carries alternates.
    pub fn insert(&self, kind: EntityKind, entities: Vec<ReferenceEntity>) -> Result<()> {
        let has_alternate_column = entities.iter().any(|e| e.alternate_names.is_some());
        self.insert_table(kind, entities, has_alternate_column)
    }

    pub fn insert_table(
        &self,
        kind: EntityKind,
        entities: Vec<ReferenceEntity>,
        has_alternate_column: bool,
    ) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        tables.insert(
            kind,
            StoredTable {
                entities,
                has_alternate_column,
            },
        );
        Ok(())
    }

    /// Drop the table for `kind`.
    pub fn remove(&self, kind: EntityKind) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        tables.remove(&kind);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn table_exists(&self, table: &str) -> Result<bool> {
        let tables = self
            .tables
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(tables.keys().any(|kind| kind.table() == table))
    }

    async fn load_reference(&self, kind: EntityKind) -> Result<Option<ReferenceSet>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(tables.get(&kind).map(|t| {
            ReferenceSet::new(kind, t.entities.clone())
                .with_alternate_column(t.has_alternate_column)
        }))
    }
}
