//! Core data models for name harmonization.
//!
//! These types describe the canonical reference entities read from an
//! annotation table and the per-input match records produced by the
//! [`matcher`](crate::matcher).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which annotation table a harmonization run resolves against.
///
/// The kind also selects the canonicalization profile and the default
/// long-name threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Sample,
    Drug,
}

impl EntityKind {
    /// Annotation table holding the canonical entities.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Sample => "sample_anno",
            EntityKind::Drug => "drug_anno",
        }
    }

    /// Column holding the canonical identifier.
    pub fn id_column(self) -> &'static str {
        match self {
            EntityKind::Sample => "SampleID",
            EntityKind::Drug => "DrugName",
        }
    }

    /// Suffix used in `exact_*`, `fuzzy_*` and `partial_*` match tags.
    pub fn id_tag(self) -> &'static str {
        match self {
            EntityKind::Sample => "sampleid",
            EntityKind::Drug => "drugname",
        }
    }

    /// Prefix of generated `IndexID` values.
    pub fn index_prefix(self) -> &'static str {
        match self {
            EntityKind::Sample => "UM_SAMPLE_",
            EntityKind::Drug => "UM_DRUG_",
        }
    }

    /// Names longer than this (in characters) bypass matching.
    pub fn default_long_name_threshold(self) -> usize {
        match self {
            EntityKind::Sample => 30,
            EntityKind::Drug => 17,
        }
    }

    /// Singular noun for log lines.
    pub fn noun(self) -> &'static str {
        match self {
            EntityKind::Sample => "sample",
            EntityKind::Drug => "drug",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sample" | "samples" => Ok(EntityKind::Sample),
            "drug" | "drugs" => Ok(EntityKind::Drug),
            other => Err(format!(
                "unknown annotation type '{}': must be 'sample' or 'drug'",
                other
            )),
        }
    }
}

/// One canonical record from an annotation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntity {
    /// `SampleID` / `DrugName`.
    pub canonical_id: String,
    /// `ProjectRawName`; empty when NULL.
    pub raw_name: String,
    /// `AlternateName`, a `:`/`|` delimited list.
    pub alternate_names: Option<String>,
}

impl ReferenceEntity {
    pub fn new(canonical_id: impl Into<String>, raw_name: impl Into<String>) -> Self {
        Self {
            canonical_id: canonical_id.into(),
            raw_name: raw_name.into(),
            alternate_names: None,
        }
    }

    pub fn with_alternates(mut self, alternates: impl Into<String>) -> Self {
        self.alternate_names = Some(alternates.into());
        self
    }

    /// Individual alternate names: split on `:` or `|`, trimmed, empties dropped.
    pub fn split_alternates(&self) -> Vec<&str> {
        match self.alternate_names.as_deref() {
            Some(list) => list
                .split([':', '|'])
                .map(str::trim)
                .filter(|name| !name.is_empty() && *name != "|")
                .collect(),
            None => Vec::new(),
        }
    }
}

/// A row of the transient alternate-name expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateName {
    /// The name as written in the reference table.
    pub raw_name: String,
    /// Canonical id owning this name.
    pub canonical_id: String,
}

/// The reference rows of one annotation table, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSet {
    pub kind: EntityKind,
    pub entities: Vec<ReferenceEntity>,
    /// Whether the table carries an alternate-name column. The alternate
    /// tier only runs when it does.
    pub has_alternates: bool,
}

impl ReferenceSet {
    pub fn new(kind: EntityKind, entities: Vec<ReferenceEntity>) -> Self {
        let has_alternates = entities.iter().any(|e| e.alternate_names.is_some());
        Self {
            kind,
            entities,
            has_alternates,
        }
    }

    /// Override column detection, e.g. when the column exists but every
    /// value is NULL.
    pub fn with_alternate_column(mut self, present: bool) -> Self {
        self.has_alternates = present;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Sort rows by canonical id so ties resolve independently of storage order.
    pub fn sort_by_id(&mut self) {
        self.entities.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));
    }

    /// Build the alternate-name expansion: every canonical id maps to itself,
    /// followed by each of its alternate names. Empty when the table has no
    /// alternate-name column.
    pub fn expand_alternates(&self) -> Vec<AlternateName> {
        if !self.has_alternates {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.entities.len() * 2);
        for entity in &self.entities {
            out.push(AlternateName {
                raw_name: entity.canonical_id.clone(),
                canonical_id: entity.canonical_id.clone(),
            });
            for alt in entity.split_alternates() {
                out.push(AlternateName {
                    raw_name: alt.to_string(),
                    canonical_id: entity.canonical_id.clone(),
                });
            }
        }
        out
    }
}

/// Reference field a tier compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchField {
    /// `SampleID` / `DrugName`.
    CanonicalId,
    /// `ProjectRawName`.
    RawName,
    /// Alternate-name expansion.
    Alternate,
}

/// Tag identifying which tier and field produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchType {
    KeepOriginalLong,
    Exact(EntityKind, MatchField),
    Fuzzy(EntityKind, MatchField),
    Partial(EntityKind, MatchField),
    NoMatch,
}

impl MatchType {
    /// The wire tag, e.g. `exact_sampleid`, `fuzzy_rawname`, `no_match`.
    pub fn tag(&self) -> String {
        fn field(kind: EntityKind, field: MatchField) -> &'static str {
            match field {
                MatchField::CanonicalId => kind.id_tag(),
                MatchField::RawName => "rawname",
                MatchField::Alternate => "alternate",
            }
        }
        match *self {
            MatchType::KeepOriginalLong => "keep_original_long".to_string(),
            MatchType::Exact(k, f) => format!("exact_{}", field(k, f)),
            MatchType::Fuzzy(k, f) => format!("fuzzy_{}", field(k, f)),
            MatchType::Partial(k, f) => format!("partial_{}", field(k, f)),
            MatchType::NoMatch => "no_match".to_string(),
        }
    }

    /// Confidence is a function of the tier alone.
    pub fn confidence(&self) -> MatchConfidence {
        match self {
            MatchType::Exact(..) => MatchConfidence::High,
            MatchType::KeepOriginalLong | MatchType::Fuzzy(..) => MatchConfidence::Medium,
            MatchType::Partial(..) => MatchConfidence::Low,
            MatchType::NoMatch => MatchConfidence::None,
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl Serialize for MatchType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.tag())
    }
}

/// Ordinal trust level of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    High,
    Medium,
    Low,
    None,
}

impl MatchConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchConfidence::High => "high",
            MatchConfidence::Medium => "medium",
            MatchConfidence::Low => "low",
            MatchConfidence::None => "none",
        }
    }

    /// Medium and low matches are listed for manual review.
    pub fn needs_review(&self) -> bool {
        matches!(self, MatchConfidence::Medium | MatchConfidence::Low)
    }
}

impl fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of harmonizing one input name.
///
/// Serializes to the `original_name, cleaned_name, harmonized_name,
/// match_type, match_confidence, new_name` column shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub original_name: String,
    pub cleaned_name: String,
    pub harmonized_name: String,
    pub match_type: MatchType,
    pub match_confidence: MatchConfidence,
    /// Name persisted downstream. Mirrors `harmonized_name` except for
    /// `no_match`, where it is the original name.
    #[serde(rename = "new_name")]
    pub resolved_name: String,
}

impl MatchResult {
    /// A resolved match: harmonized and resolved names are the canonical id.
    pub fn resolved(
        original_name: &str,
        cleaned_name: &str,
        canonical_id: &str,
        match_type: MatchType,
    ) -> Self {
        Self {
            original_name: original_name.to_string(),
            cleaned_name: cleaned_name.to_string(),
            harmonized_name: canonical_id.to_string(),
            match_type,
            match_confidence: match_type.confidence(),
            resolved_name: canonical_id.to_string(),
        }
    }

    /// Long names are kept verbatim without consulting the reference.
    pub fn keep_original(original_name: &str, cleaned_name: &str) -> Self {
        Self::resolved(
            original_name,
            cleaned_name,
            original_name,
            MatchType::KeepOriginalLong,
        )
    }

    /// No tier matched: harmonized falls back to the cleaned name, the
    /// resolved name to the original.
    pub fn unmatched(original_name: &str, cleaned_name: &str) -> Self {
        Self {
            original_name: original_name.to_string(),
            cleaned_name: cleaned_name.to_string(),
            harmonized_name: cleaned_name.to_string(),
            match_type: MatchType::NoMatch,
            match_confidence: MatchConfidence::None,
            resolved_name: original_name.to_string(),
        }
    }

    /// No reference rows at all: every name is passed through unchanged.
    pub fn passthrough(original_name: &str, cleaned_name: &str) -> Self {
        Self {
            harmonized_name: original_name.to_string(),
            ..Self::unmatched(original_name, cleaned_name)
        }
    }

    /// Alias of `resolved_name` under the column name used downstream.
    pub fn new_name(&self) -> &str {
        &self.resolved_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_type_tags() {
        assert_eq!(
            MatchType::Exact(EntityKind::Sample, MatchField::CanonicalId).tag(),
            "exact_sampleid"
        );
        assert_eq!(
            MatchType::Fuzzy(EntityKind::Drug, MatchField::CanonicalId).tag(),
            "fuzzy_drugname"
        );
        assert_eq!(
            MatchType::Partial(EntityKind::Drug, MatchField::RawName).tag(),
            "partial_rawname"
        );
        assert_eq!(
            MatchType::Exact(EntityKind::Sample, MatchField::Alternate).tag(),
            "exact_alternate"
        );
        assert_eq!(MatchType::KeepOriginalLong.tag(), "keep_original_long");
        assert_eq!(MatchType::NoMatch.tag(), "no_match");
    }

    #[test]
    fn test_confidence_none_iff_no_match() {
        let all = [
            MatchType::KeepOriginalLong,
            MatchType::Exact(EntityKind::Sample, MatchField::RawName),
            MatchType::Fuzzy(EntityKind::Sample, MatchField::Alternate),
            MatchType::Partial(EntityKind::Drug, MatchField::CanonicalId),
            MatchType::NoMatch,
        ];
        for t in all {
            assert_eq!(
                t.confidence() == MatchConfidence::None,
                t == MatchType::NoMatch,
                "{}",
                t
            );
        }
    }

    #[test]
    fn test_split_alternates_discards_empty_tokens() {
        let e = ReferenceEntity::new("MCF7", "MCF-7")
            .with_alternates(" MCF 7 :| |Michigan Cancer Foundation-7::");
        assert_eq!(
            e.split_alternates(),
            vec!["MCF 7", "Michigan Cancer Foundation-7"]
        );
    }

    #[test]
    fn test_expand_alternates_includes_self_mapping() {
        let set = ReferenceSet::new(
            EntityKind::Sample,
            vec![
                ReferenceEntity::new("MCF7", "").with_alternates("MCF-7|MCF 7"),
                ReferenceEntity::new("HELA", "HeLa").with_alternates(""),
            ],
        );
        let expanded = set.expand_alternates();
        let pairs: Vec<(&str, &str)> = expanded
            .iter()
            .map(|a| (a.raw_name.as_str(), a.canonical_id.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("MCF7", "MCF7"),
                ("MCF-7", "MCF7"),
                ("MCF 7", "MCF7"),
                ("HELA", "HELA"),
            ]
        );
    }

    #[test]
    fn test_no_alternate_column_means_no_expansion() {
        let set = ReferenceSet::new(
            EntityKind::Drug,
            vec![ReferenceEntity::new("Cisplatin", "CDDP")],
        );
        assert!(!set.has_alternates);
        assert!(set.expand_alternates().is_empty());
    }

    #[test]
    fn test_result_serializes_as_table_row() {
        let r = MatchResult::unmatched("Foo-1", "foo1");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["match_type"], "no_match");
        assert_eq!(v["match_confidence"], "none");
        assert_eq!(v["harmonized_name"], "foo1");
        assert_eq!(v["new_name"], "Foo-1");
    }

    #[test]
    fn test_entity_kind_from_str() {
        assert_eq!("Sample".parse::<EntityKind>().unwrap(), EntityKind::Sample);
        assert_eq!("drugs".parse::<EntityKind>().unwrap(), EntityKind::Drug);
        assert!("gene".parse::<EntityKind>().is_err());
    }
}
