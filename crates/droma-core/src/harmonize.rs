//! Store-driven harmonization entry point.
//!
//! Loads the reference set for a kind from a [`ReferenceStore`], runs the
//! [`Matcher`](crate::matcher::Matcher) over the input names and logs the
//! summary. The store handle is owned by the caller.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::canonical::canonicalize;
use crate::error::{DromaError, Result};
use crate::matcher::{MatchOptions, Matcher};
use crate::models::{EntityKind, MatchField, MatchResult};
use crate::report::log_summary;
use crate::store::ReferenceStore;

/// Matcher tuning plus reporting knobs for one harmonization call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonizeOptions {
    pub matching: MatchOptions,
    /// Medium/low matches listed in the review log.
    pub review_sample_size: usize,
}

impl Default for HarmonizeOptions {
    fn default() -> Self {
        Self {
            matching: MatchOptions::default(),
            review_sample_size: 5,
        }
    }
}

/// Resolve `names` against the annotation table for `kind`.
///
/// Fails with [`DromaError::TableNotFound`] when the table is absent. An
/// empty table is not an error: every name comes back as `no_match` with
/// its original spelling kept.
pub async fn harmonize<S>(
    store: &dyn ReferenceStore,
    kind: EntityKind,
    names: &[S],
    options: &HarmonizeOptions,
) -> Result<Vec<MatchResult>>
where
    S: AsRef<str> + Sync,
{
    options.matching.validate()?;

    let reference = store
        .load_reference(kind)
        .await?
        .ok_or_else(|| DromaError::table_not_found(kind.table()))?;

    if reference.is_empty() {
        warn!("{} annotation table is empty", capitalize(kind.noun()));
        return Ok(names
            .iter()
            .map(|n| {
                let n = n.as_ref();
                MatchResult::passthrough(n, &canonicalize(n, kind))
            })
            .collect());
    }

    let matcher = Matcher::new(kind, &options.matching);
    let prepared = matcher.prepare(&reference);
    debug!(
        kind = %kind,
        entities = reference.len(),
        alternates = prepared.field_size(MatchField::Alternate),
        inputs = names.len(),
        "loaded reference set"
    );

    let results = matcher.match_prepared(names, &prepared);
    log_summary(kind, &results, options.review_sample_size);
    Ok(results)
}

/// Shorthand for [`harmonize`] with [`EntityKind::Sample`].
pub async fn harmonize_samples<S>(
    store: &dyn ReferenceStore,
    names: &[S],
    options: &HarmonizeOptions,
) -> Result<Vec<MatchResult>>
where
    S: AsRef<str> + Sync,
{
    harmonize(store, EntityKind::Sample, names, options).await
}

/// Shorthand for [`harmonize`] with [`EntityKind::Drug`].
pub async fn harmonize_drugs<S>(
    store: &dyn ReferenceStore,
    names: &[S],
    options: &HarmonizeOptions,
) -> Result<Vec<MatchResult>>
where
    S: AsRef<str> + Sync,
{
    harmonize(store, EntityKind::Drug, names, options).await
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
