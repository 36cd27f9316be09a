//! Name canonicalization.
//!
//! Turns a free-text sample or drug name into the comparison key used by
//! every matching tier. The two profiles differ in bracket handling and in
//! what survives character-class reduction:
//!
//! | Step | Sample | Drug |
//! |------|--------|------|
//! | lowercase, drop `[?]`, drop CJK ideographs | yes | yes |
//! | drop `[...]` segments | yes | no |
//! | parenthesis handling | yes | yes |
//! | non `[a-z0-9]` characters | removed | become single spaces |
//!
//! So `"MCF-7"` and `"mcf 7"` both become `mcf7` as samples, while
//! `"5-Fluorouracil"` becomes `5 fluorouracil` as a drug.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::EntityKind;

static CJK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\x{4e00}-\x{9fff}]").unwrap());
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").unwrap());
static FULLY_PARENTHESIZED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\(.*\)\s*$").unwrap());
static OUTER_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\(|\)\s*$").unwrap());
static PAREN_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]+\)").unwrap());
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Canonicalize `raw` under the profile of `kind`.
///
/// Pure and idempotent: canonicalizing an already canonical key returns it
/// unchanged. Empty input yields an empty key.
pub fn canonicalize(raw: &str, kind: EntityKind) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut name = raw.to_lowercase().replace("[?]", "");
    name = CJK.replace_all(&name, "").into_owned();

    if kind == EntityKind::Sample {
        name = BRACKETED.replace_all(&name, "").into_owned();
    }

    name = strip_parentheses(&name);

    match kind {
        EntityKind::Sample => name
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .collect(),
        EntityKind::Drug => {
            let spaced = NON_ALNUM.replace_all(&name, " ");
            WHITESPACE_RUN
                .replace_all(&spaced, " ")
                .trim()
                .to_string()
        }
    }
}

/// Canonicalize a nullable value; `None` yields an empty key.
pub fn canonicalize_opt(raw: Option<&str>, kind: EntityKind) -> String {
    raw.map(|r| canonicalize(r, kind)).unwrap_or_default()
}

/// A name that is one parenthesized group keeps its content. Otherwise each
/// group, with the whitespace before it, is treated as an annotation and
/// removed.
fn strip_parentheses(name: &str) -> String {
    if FULLY_PARENTHESIZED.is_match(name) {
        OUTER_PARENS.replace_all(name, "").into_owned()
    } else {
        PAREN_GROUP.replace_all(name, "").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(s: &str) -> String {
        canonicalize(s, EntityKind::Sample)
    }

    fn drug(s: &str) -> String {
        canonicalize(s, EntityKind::Drug)
    }

    #[test]
    fn test_empty_and_none() {
        assert_eq!(sample(""), "");
        assert_eq!(drug(""), "");
        assert_eq!(canonicalize_opt(None, EntityKind::Sample), "");
        assert_eq!(canonicalize_opt(None, EntityKind::Drug), "");
    }

    #[test]
    fn test_sample_separators_collapse() {
        assert_eq!(sample("MCF-7"), "mcf7");
        assert_eq!(sample("mcf 7"), "mcf7");
        assert_eq!(sample("MCF7"), "mcf7");
    }

    #[test]
    fn test_drug_separators_become_spaces() {
        assert_eq!(drug("5-Fluorouracil"), "5 fluorouracil");
        assert_eq!(drug("  Doxorubicin__HCl "), "doxorubicin hcl");
    }

    #[test]
    fn test_missing_marker_removed() {
        assert_eq!(sample("HeLa[?]"), "hela");
        assert_eq!(drug("[?]Tamoxifen"), "tamoxifen");
    }

    #[test]
    fn test_cjk_removed() {
        assert_eq!(sample("A549肺癌"), "a549");
        assert_eq!(drug("顺铂 Cisplatin"), "cisplatin");
    }

    #[test]
    fn test_sample_brackets_removed_before_parentheses() {
        assert_eq!(sample("HCT116 [colon] (p53 wt)"), "hct116");
        // A bracket containing a parenthesis is removed whole.
        assert_eq!(sample("K562 [CML (blast)]"), "k562");
    }

    #[test]
    fn test_drug_keeps_bracket_content() {
        assert_eq!(drug("Paclitaxel [Taxol]"), "paclitaxel taxol");
    }

    #[test]
    fn test_parenthesized_annotation_removed() {
        assert_eq!(sample("A549 (lung)"), "a549");
        assert_eq!(drug("Erlotinib (Tarceva) HCl"), "erlotinib hcl");
    }

    #[test]
    fn test_fully_parenthesized_keeps_content() {
        assert_eq!(sample("(MCF-7)"), "mcf7");
        assert_eq!(drug(" (5-FU) "), "5 fu");
    }

    #[test]
    fn test_empty_parentheses_not_a_group() {
        // `[^)]+` needs content, so `()` falls through to character reduction.
        assert_eq!(sample("PC3 ()"), "pc3");
        assert_eq!(drug("PC3 () x"), "pc3 x");
    }

    #[test]
    fn test_idempotent() {
        for raw in ["MCF-7", "HCT 116 (colon)", "(SK-BR-3)", "NCI-H460 [lung]"] {
            let once = sample(raw);
            assert_eq!(sample(&once), once, "sample profile not idempotent for {}", raw);
        }
        for raw in ["5-Fluorouracil", "Erlotinib (Tarceva) HCl", "all-trans retinoic acid"] {
            let once = drug(raw);
            assert_eq!(drug(&once), once, "drug profile not idempotent for {}", raw);
        }
    }
}
