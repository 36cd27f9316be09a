//! String similarity scorers for the fuzzy tier.
//!
//! All scorers report on a `0.0..=100.0` scale. [`Scorer::Indel`] is the
//! default: `rapidfuzz`'s normalized insertion/deletion ratio. The `strsim`
//! metrics are available as alternatives for reference sets where
//! transpositions or shared prefixes matter more.

use serde::{Deserialize, Serialize};

/// Similarity metric used by the fuzzy tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// `100 × (1 − indel / (len_a + len_b))`.
    #[default]
    Indel,
    /// `strsim::normalized_levenshtein × 100`.
    Levenshtein,
    /// `strsim::jaro_winkler × 100`.
    JaroWinkler,
}

impl Scorer {
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Scorer::Indel => indel_ratio(a, b),
            Scorer::Levenshtein => strsim::normalized_levenshtein(a, b) * 100.0,
            Scorer::JaroWinkler => strsim::jaro_winkler(a, b) * 100.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scorer::Indel => "indel",
            Scorer::Levenshtein => "levenshtein",
            Scorer::JaroWinkler => "jaro_winkler",
        }
    }
}

/// Minimum accepted score for a given `max_distance`.
pub fn score_cutoff(max_distance: f64) -> f64 {
    ((1.0 - max_distance) * 100.0).floor()
}

/// Normalized Indel similarity. Two empty strings are identical (100).
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    rapidfuzz::fuzz::ratio(a.chars(), b.chars()) * 100.0
}

/// Best `(index, score)` among `candidates` scoring at least `cutoff`.
/// Ties keep the earliest candidate.
pub fn best_match<'a, I>(
    scorer: Scorer,
    query: &str,
    candidates: I,
    cutoff: f64,
) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.into_iter().enumerate() {
        let score = scorer.score(query, candidate);
        if score < cutoff {
            continue;
        }
        match best {
            Some((_, s)) if s >= score => {}
            _ => best = Some((i, score)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_indel_identical_and_empty() {
        assert!(approx(indel_ratio("hela", "hela"), 100.0));
        assert!(approx(indel_ratio("", ""), 100.0));
        assert!(approx(indel_ratio("abc", ""), 0.0));
    }

    #[test]
    fn test_indel_known_values() {
        // lcs("kitten", "sitting") = 4 -> 2*4/13
        assert!(approx(indel_ratio("kitten", "sitting"), 800.0 / 13.0));
        // one deletion: 2*4/9
        assert!(approx(indel_ratio("mcf7a", "mcf7"), 800.0 / 9.0));
        // substitution costs two edits under Indel: 2*3/8
        assert!(approx(indel_ratio("hela", "hila"), 75.0));
    }

    #[test]
    fn test_indel_separator_and_prefix_values() {
        // "5fu" vs "5 fu": lcs 3 -> 2*3/7
        assert!(approx(indel_ratio("5fu", "5 fu"), 600.0 / 7.0));
        // prefix of a longer key: lcs 4 -> 2*4/16
        assert!(approx(indel_ratio("a549", "a549luadline"), 50.0));
    }

    #[test]
    fn test_indel_symmetric() {
        assert!(approx(
            indel_ratio("doxorubicin", "doxorubicine"),
            indel_ratio("doxorubicine", "doxorubicin")
        ));
    }

    #[test]
    fn test_cutoff_truncates() {
        assert!(approx(score_cutoff(0.2), 80.0));
        assert!(approx(score_cutoff(0.0), 100.0));
        assert!(approx(score_cutoff(1.0), 0.0));
    }

    #[test]
    fn test_best_match_first_of_ties() {
        let candidates = ["abcx", "abcy", "zzz"];
        let best = best_match(Scorer::Indel, "abcz", candidates, 50.0).unwrap();
        // "abcx" and "abcy" both score 75; the earlier wins.
        assert_eq!(best.0, 0);
        assert!(approx(best.1, 75.0));
    }

    #[test]
    fn test_best_match_respects_cutoff() {
        let candidates = ["zzzz", "yyyy"];
        assert!(best_match(Scorer::Indel, "abcd", candidates, 80.0).is_none());
    }

    #[test]
    fn test_strsim_scorers_on_scale() {
        assert!(approx(Scorer::Levenshtein.score("hela", "hela"), 100.0));
        let jw = Scorer::JaroWinkler.score("cisplatin", "cisplatine");
        assert!(jw > 90.0 && jw <= 100.0);
    }
}
