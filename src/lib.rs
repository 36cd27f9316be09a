//! # DROMA
//!
//! Data access and name harmonization for DROMA drug-response and omics
//! SQLite databases.
//!
//! Externally supplied sample (cell line, PDX, organoid) and drug names are
//! resolved against the `sample_anno` / `drug_anno` annotation tables with
//! the tiered matcher from [`droma_core`], and the resulting mapping can be
//! written back as new annotation rows.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │ names file  │──▶│   droma_core     │◀──│ SqliteStore  │
//! │  / stdin    │   │ canonicalize +   │   │ sample_anno  │
//! └─────────────┘   │ tiered matcher   │   │ drug_anno    │
//!                   └────────┬─────────┘   └──────▲───────┘
//!                            ▼                    │
//!                   table / csv / json ──apply────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! droma init
//! droma harmonize samples names.txt --format csv
//! droma harmonize drugs drugs.txt --apply --project gCSI
//! droma tables --pattern '^gCSI_'
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection and SQL helpers |
//! | [`migrate`] | Annotation and project tables |
//! | [`sqlite_store`] | `ReferenceStore` over SQLite |
//! | [`annotation`] | Annotation retrieval and update |
//! | [`catalog`] | Table and project listing |
//! | [`harmonize`] | The `harmonize` command: input, rendering, write-back |
//! | [`logging`] | tracing subscriber setup |

pub mod annotation;
pub mod catalog;
pub mod config;
pub mod db;
pub mod harmonize;
pub mod logging;
pub mod migrate;
pub mod sqlite_store;
