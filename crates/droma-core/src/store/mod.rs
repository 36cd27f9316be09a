//! Reference lookup abstraction.
//!
//! The harmonizer only needs two things from storage: whether an
//! annotation table exists, and its rows in table order. [`ReferenceStore`]
//! is that capability; the SQLite backend lives in the application crate,
//! [`memory::MemoryStore`] serves fixtures and tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EntityKind, ReferenceSet};

/// Read-only access to annotation tables.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`table_exists`](ReferenceStore::table_exists) | Whether a logical table is present |
/// | [`load_reference`](ReferenceStore::load_reference) | Rows of the annotation table for a kind |
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Canonical entities for `kind` in stable table order.
    ///
    /// Returns `None` when the annotation table does not exist. An existing
    /// but empty table yields an empty [`ReferenceSet`].
    async fn load_reference(&self, kind: EntityKind) -> Result<Option<ReferenceSet>>;
}
