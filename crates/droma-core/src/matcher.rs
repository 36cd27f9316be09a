//! Tiered name matcher.
//!
//! Each input name is tried against an ordered list of [`MatchTier`]s and
//! resolved by the first tier that yields a result:
//!
//! 1. **Long-name bypass**: names longer than the profile threshold are kept.
//! 2. **Exact**: canonical key equality against the id field, the raw-name
//!    field, then the alternate-name expansion.
//! 3. **Fuzzy**: best similarity score at or above the cutoff, per field in
//!    the same order. Needs a key of at least 3 characters.
//! 4. **Partial**: the key is a substring of an id or raw-name key. Needs a
//!    key of at least `min_name_length` characters.
//!
//! Anything left over is recorded as `no_match`. Within a tier the first
//! qualifying reference row in table order wins.

use serde::{Deserialize, Serialize};

use crate::canonical::canonicalize;
use crate::error::DromaError;
use crate::models::{EntityKind, MatchField, MatchResult, MatchType, ReferenceSet};
use crate::similarity::{best_match, score_cutoff, Scorer};

/// Shortest key the fuzzy tier will score.
pub const MIN_FUZZY_LENGTH: usize = 3;

/// Per-call tuning for the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Fuzzy acceptance: score must reach `(1 - max_distance) * 100`.
    pub max_distance: f64,
    /// Shortest key the partial tier will try.
    pub min_name_length: usize,
    /// Long-name bypass threshold; `None` uses the profile default.
    pub long_name_threshold: Option<usize>,
    pub scorer: Scorer,
    /// Sort reference rows by canonical id before matching.
    pub sort_reference: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            max_distance: 0.2,
            min_name_length: 5,
            long_name_threshold: None,
            scorer: Scorer::Indel,
            sort_reference: false,
        }
    }
}

impl MatchOptions {
    pub fn validate(&self) -> Result<(), DromaError> {
        if !(0.0..=1.0).contains(&self.max_distance) {
            return Err(DromaError::Validation(format!(
                "max_distance must be in [0.0, 1.0], got {}",
                self.max_distance
            )));
        }
        if self.min_name_length == 0 {
            return Err(DromaError::Validation(
                "min_name_length must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn long_name_threshold_for(&self, kind: EntityKind) -> usize {
        self.long_name_threshold
            .unwrap_or_else(|| kind.default_long_name_threshold())
    }
}

/// An input name together with its canonical key.
#[derive(Debug, Clone, Copy)]
pub struct NameInput<'a> {
    pub original: &'a str,
    pub cleaned: &'a str,
}

impl NameInput<'_> {
    fn cleaned_len(&self) -> usize {
        self.cleaned.chars().count()
    }
}

/// One comparable reference value: its canonical key and the id it resolves to.
#[derive(Debug, Clone)]
struct FieldEntry {
    key: String,
    canonical_id: String,
}

/// Reference set with every field canonicalized once per call.
#[derive(Debug, Clone)]
pub struct PreparedReference {
    kind: EntityKind,
    fields: Vec<(MatchField, Vec<FieldEntry>)>,
}

impl PreparedReference {
    pub fn new(reference: &ReferenceSet) -> Self {
        let kind = reference.kind;
        let ids = reference
            .entities
            .iter()
            .map(|e| FieldEntry {
                key: canonicalize(&e.canonical_id, kind),
                canonical_id: e.canonical_id.clone(),
            })
            .collect();
        let raw = reference
            .entities
            .iter()
            .map(|e| FieldEntry {
                key: canonicalize(&e.raw_name, kind),
                canonical_id: e.canonical_id.clone(),
            })
            .collect();

        let mut fields = vec![(MatchField::CanonicalId, ids), (MatchField::RawName, raw)];
        if reference.has_alternates {
            let alternates = reference
                .expand_alternates()
                .into_iter()
                .map(|a| FieldEntry {
                    key: canonicalize(&a.raw_name, kind),
                    canonical_id: a.canonical_id,
                })
                .collect();
            fields.push((MatchField::Alternate, alternates));
        }

        Self { kind, fields }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Fields in tier order, skipping any not listed in `only`.
    fn fields<'a>(
        &'a self,
        only: &'a [MatchField],
    ) -> impl Iterator<Item = (MatchField, &'a [FieldEntry])> + 'a {
        self.fields
            .iter()
            .filter(move |(f, _)| only.contains(f))
            .map(|(f, entries)| (*f, entries.as_slice()))
    }

    /// Number of values per field, for diagnostics.
    pub fn field_sizes(&self) -> Vec<(MatchField, usize)> {
        self.fields.iter().map(|(f, e)| (*f, e.len())).collect()
    }

    /// Values in one field; zero for a field the reference does not carry.
    pub fn field_size(&self, field: MatchField) -> usize {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map_or(0, |(_, e)| e.len())
    }
}

/// A single matching strategy.
///
/// Tiers are tried in order; the first `Some` wins. Adding a strategy
/// means implementing this trait and inserting it into [`Matcher::tiers`].
pub trait MatchTier: Send + Sync {
    fn name(&self) -> &'static str;

    fn attempt(&self, input: &NameInput<'_>, reference: &PreparedReference) -> Option<MatchResult>;
}

const ALL_FIELDS: [MatchField; 3] = [
    MatchField::CanonicalId,
    MatchField::RawName,
    MatchField::Alternate,
];

/// Keeps names longer than the threshold verbatim.
pub struct LongNameBypass {
    pub threshold: usize,
}

impl MatchTier for LongNameBypass {
    fn name(&self) -> &'static str {
        "long_name_bypass"
    }

    fn attempt(&self, input: &NameInput<'_>, _reference: &PreparedReference) -> Option<MatchResult> {
        (input.original.chars().count() > self.threshold)
            .then(|| MatchResult::keep_original(input.original, input.cleaned))
    }
}

/// Canonical key equality.
pub struct ExactTier;

impl MatchTier for ExactTier {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn attempt(&self, input: &NameInput<'_>, reference: &PreparedReference) -> Option<MatchResult> {
        if input.cleaned.is_empty() {
            return None;
        }
        reference.fields(&ALL_FIELDS).find_map(|(field, entries)| {
            entries.iter().find(|e| e.key == input.cleaned).map(|e| {
                MatchResult::resolved(
                    input.original,
                    input.cleaned,
                    &e.canonical_id,
                    MatchType::Exact(reference.kind(), field),
                )
            })
        })
    }
}

/// Best similarity score per field.
pub struct FuzzyTier {
    pub scorer: Scorer,
    pub cutoff: f64,
}

impl MatchTier for FuzzyTier {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    fn attempt(&self, input: &NameInput<'_>, reference: &PreparedReference) -> Option<MatchResult> {
        if input.cleaned_len() < MIN_FUZZY_LENGTH {
            return None;
        }
        reference.fields(&ALL_FIELDS).find_map(|(field, entries)| {
            let keys = entries.iter().map(|e| e.key.as_str());
            best_match(self.scorer, input.cleaned, keys, self.cutoff).map(|(idx, _score)| {
                MatchResult::resolved(
                    input.original,
                    input.cleaned,
                    &entries[idx].canonical_id,
                    MatchType::Fuzzy(reference.kind(), field),
                )
            })
        })
    }
}

/// Key contained in an id or raw-name key.
pub struct PartialTier {
    pub min_name_length: usize,
}

impl MatchTier for PartialTier {
    fn name(&self) -> &'static str {
        "partial"
    }

    fn attempt(&self, input: &NameInput<'_>, reference: &PreparedReference) -> Option<MatchResult> {
        if input.cleaned_len() < self.min_name_length {
            return None;
        }
        const FIELDS: [MatchField; 2] = [MatchField::CanonicalId, MatchField::RawName];
        reference.fields(&FIELDS).find_map(|(field, entries)| {
            entries
                .iter()
                .find(|e| e.key.contains(input.cleaned))
                .map(|e| {
                    MatchResult::resolved(
                        input.original,
                        input.cleaned,
                        &e.canonical_id,
                        MatchType::Partial(reference.kind(), field),
                    )
                })
        })
    }
}

/// Ordered tier list for one entity kind.
pub struct Matcher {
    kind: EntityKind,
    tiers: Vec<Box<dyn MatchTier>>,
    sort_reference: bool,
}

impl Matcher {
    pub fn new(kind: EntityKind, options: &MatchOptions) -> Self {
        let tiers: Vec<Box<dyn MatchTier>> = vec![
            Box::new(LongNameBypass {
                threshold: options.long_name_threshold_for(kind),
            }),
            Box::new(ExactTier),
            Box::new(FuzzyTier {
                scorer: options.scorer,
                cutoff: score_cutoff(options.max_distance),
            }),
            Box::new(PartialTier {
                min_name_length: options.min_name_length,
            }),
        ];
        Self {
            kind,
            tiers,
            sort_reference: options.sort_reference,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Tier names in evaluation order.
    pub fn tiers(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Resolve one name against a prepared reference.
    pub fn match_one(&self, original: &str, reference: &PreparedReference) -> MatchResult {
        let cleaned = canonicalize(original, self.kind);
        let input = NameInput {
            original,
            cleaned: &cleaned,
        };
        self.tiers
            .iter()
            .find_map(|tier| tier.attempt(&input, reference))
            .unwrap_or_else(|| MatchResult::unmatched(original, &cleaned))
    }

    /// Resolve every name, one result per input in input order.
    ///
    /// An empty reference set passes every name through as `no_match`.
    pub fn match_batch<S: AsRef<str>>(&self, inputs: &[S], reference: &ReferenceSet) -> Vec<MatchResult> {
        if reference.is_empty() {
            return inputs
                .iter()
                .map(|name| {
                    let name = name.as_ref();
                    MatchResult::passthrough(name, &canonicalize(name, self.kind))
                })
                .collect();
        }

        let prepared = self.prepare(reference);
        self.match_prepared(inputs, &prepared)
    }

    /// Canonicalize `reference` once, sorting it first when configured to.
    pub fn prepare(&self, reference: &ReferenceSet) -> PreparedReference {
        if self.sort_reference {
            let mut sorted = reference.clone();
            sorted.sort_by_id();
            PreparedReference::new(&sorted)
        } else {
            PreparedReference::new(reference)
        }
    }

    /// Resolve every name against an already prepared reference.
    pub fn match_prepared<S: AsRef<str>>(
        &self,
        inputs: &[S],
        prepared: &PreparedReference,
    ) -> Vec<MatchResult> {
        inputs
            .iter()
            .map(|name| self.match_one(name.as_ref(), prepared))
            .collect()
    }
}

/// Match `inputs` against `reference` with the profile of `reference.kind`.
pub fn match_batch<S: AsRef<str>>(
    inputs: &[S],
    reference: &ReferenceSet,
    options: &MatchOptions,
) -> Vec<MatchResult> {
    Matcher::new(reference.kind, options).match_batch(inputs, reference)
}
