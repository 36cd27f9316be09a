//! Result aggregation and the harmonization summary log.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::models::{EntityKind, MatchConfidence, MatchResult, MatchType};

/// Counts over one batch of match results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub total: usize,
    pub by_type: BTreeMap<MatchType, usize>,
    pub by_confidence: BTreeMap<MatchConfidence, usize>,
}

impl MatchSummary {
    pub fn count_type(&self, match_type: MatchType) -> usize {
        self.by_type.get(&match_type).copied().unwrap_or(0)
    }

    pub fn count_confidence(&self, confidence: MatchConfidence) -> usize {
        self.by_confidence.get(&confidence).copied().unwrap_or(0)
    }

    /// Number of medium and low confidence results.
    pub fn needs_review(&self) -> usize {
        self.by_confidence
            .iter()
            .filter(|(c, _)| c.needs_review())
            .map(|(_, n)| n)
            .sum()
    }
}

pub fn summarize(results: &[MatchResult]) -> MatchSummary {
    let mut summary = MatchSummary {
        total: results.len(),
        ..MatchSummary::default()
    };
    for r in results {
        *summary.by_type.entry(r.match_type).or_insert(0) += 1;
        *summary.by_confidence.entry(r.match_confidence).or_insert(0) += 1;
    }
    summary
}

/// Emit the per-type counts and the review listing for medium/low matches.
///
/// Observational only; the results are not touched.
pub fn log_summary(kind: EntityKind, results: &[MatchResult], review_sample_size: usize) {
    let summary = summarize(results);
    for (match_type, count) in &summary.by_type {
        info!(kind = %kind, match_type = %match_type, count, "harmonization summary");
    }

    let flagged = results
        .iter()
        .filter(|r| r.match_confidence.needs_review())
        .count();
    if flagged == 0 {
        return;
    }

    warn!(
        "{} {}s have medium/low confidence matches.",
        flagged,
        kind.noun()
    );
    for line in review_lines(results, review_sample_size) {
        info!("{}", line);
    }
}

/// The review listing logged after the medium/low warning: a header, up to
/// `review_sample_size` sample matches and a remainder line. Empty when no
/// result needs review.
pub fn review_lines(results: &[MatchResult], review_sample_size: usize) -> Vec<String> {
    let review: Vec<&MatchResult> = results
        .iter()
        .filter(|r| r.match_confidence.needs_review())
        .collect();
    if review.is_empty() {
        return Vec::new();
    }

    let mut lines = vec!["Consider manual review of these matches:".to_string()];
    lines.extend(review.iter().take(review_sample_size).map(|r| {
        format!(
            "  {} -> {} ({})",
            r.original_name, r.harmonized_name, r.match_type
        )
    }));
    if review.len() > review_sample_size {
        lines.push(format!("  ... and {} more", review.len() - review_sample_size));
    }
    lines
}
