//! # DROMA Core
//!
//! Store-agnostic name harmonization for DROMA annotation tables: data
//! models, canonicalization, similarity scoring, the tiered matcher and the
//! reference store abstraction.
//!
//! This crate has no sqlx, tokio or filesystem dependencies. The SQLite
//! backend and the CLI live in the `droma` crate.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Reference entities, match types, match results |
//! | [`canonical`] | Sample and drug name canonicalization |
//! | [`similarity`] | Fuzzy scorers on a 0 to 100 scale |
//! | [`matcher`] | Ordered match tiers and batch matching |
//! | [`report`] | Summary counts and the review log |
//! | [`store`] | [`ReferenceStore`](store::ReferenceStore) trait and in-memory backend |
//! | [`harmonize`] | Store-driven harmonization |
//! | [`error`] | [`DromaError`](error::DromaError) |

pub mod canonical;
pub mod error;
pub mod harmonize;
pub mod matcher;
pub mod models;
pub mod report;
pub mod similarity;
pub mod store;

pub use error::DromaError;
