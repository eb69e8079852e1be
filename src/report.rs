//! Merge report: the provenance ledger of a merge run.
//!
//! Two ledgers share one shape, directive → value → document id →
//! document. `information` records values that were considered for the
//! merged policy; `errors` records values rejected because a conflicting
//! directive disagreed with what had already been accepted.

use std::collections::BTreeMap;
use std::fmt;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::directive::Directive;
use crate::document::{DocumentId, PolicyDocument};

/// Documents that contributed one (directive, value) pair, keyed by id.
pub type Contributors = BTreeMap<DocumentId, PolicyDocument>;

/// One leaf of a [`Ledger`].
#[derive(Debug, Clone, Copy)]
pub struct LedgerEntry<'a> {
    /// The directive.
    pub directive: Directive,
    /// The contributed value.
    pub value: &'a str,
    /// The contributing document.
    pub document: &'a PolicyDocument,
}

/// A three-level provenance mapping.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: BTreeMap<Directive, BTreeMap<String, Contributors>>,
}

impl Ledger {
    /// Upserts `document` as a contributor of (`directive`, `value`).
    ///
    /// Returns true if the document was not already listed there.
    fn record(&mut self, directive: Directive, value: &str, document: &PolicyDocument) -> bool {
        self.entries
            .entry(directive)
            .or_default()
            .entry(value.to_string())
            .or_default()
            .insert(document.id().clone(), document.clone())
            .is_none()
    }

    /// True if no leaf holds a contributor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of (directive, value, document) leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    /// Directives with at least one recorded value.
    pub fn directives(&self) -> impl Iterator<Item = Directive> + '_ {
        self.entries.keys().copied()
    }

    /// Values recorded under `directive`, sorted.
    pub fn values_of(&self, directive: Directive) -> impl Iterator<Item = &str> {
        self.entries
            .get(&directive)
            .into_iter()
            .flat_map(BTreeMap::keys)
            .map(String::as_str)
    }

    /// Documents that contributed (`directive`, `value`).
    #[must_use]
    pub fn contributors(&self, directive: Directive, value: &str) -> Option<&Contributors> {
        self.entries.get(&directive)?.get(value)
    }

    /// True if `id` contributed (`directive`, `value`).
    #[must_use]
    pub fn contains(&self, directive: Directive, value: &str, id: &DocumentId) -> bool {
        self.contributors(directive, value)
            .is_some_and(|docs| docs.contains_key(id))
    }

    /// Every leaf, ordered by directive, value, then document id.
    pub fn entries(&self) -> impl Iterator<Item = LedgerEntry<'_>> {
        self.entries.iter().flat_map(|(&directive, values)| {
            values.iter().flat_map(move |(value, docs)| {
                docs.values().map(move |document| LedgerEntry {
                    directive,
                    value: value.as_str(),
                    document,
                })
            })
        })
    }
}

/// Whether a contributed value made it into the merged policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inclusion {
    /// The merged policy holds the value.
    Present,
    /// The value was considered but the merged policy no longer holds it.
    MergedOut,
    /// A conflicting directive turned the value away.
    Rejected,
}

impl fmt::Display for Inclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "PRESENT"),
            Self::MergedOut => write!(f, "merged out"),
            Self::Rejected => write!(f, "rejected (conflict)"),
        }
    }
}

/// One line of the "where did this rule come from" audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// The directive.
    pub directive: Directive,
    /// The contributed value.
    pub value: String,
    /// Where the value ended up.
    pub inclusion: Inclusion,
    /// The document that contributed the value.
    pub source: DocumentId,
}

impl ReportRow {
    fn from_entry(entry: LedgerEntry<'_>, inclusion: Inclusion) -> Self {
        Self {
            directive: entry.directive,
            value: entry.value.to_string(),
            inclusion,
            source: entry.document.id().clone(),
        }
    }
}

/// Provenance of one merge run.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    information: Ledger,
    errors: Ledger,
}

impl MergeReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `document` contributed `value` to `directive`.
    pub fn add_information(&mut self, directive: Directive, value: &str, document: &PolicyDocument) {
        if self.information.record(directive, value, document) {
            trace!("information: {directive} '{value}' from {}", document.id());
        }
    }

    /// Records that `document`'s `value` for `directive` was rejected.
    pub fn add_error(&mut self, directive: Directive, value: &str, document: &PolicyDocument) {
        if self.errors.record(directive, value, document) {
            trace!("error: {directive} '{value}' from {}", document.id());
        }
    }

    /// Values considered for the merged policy.
    #[must_use]
    pub fn information(&self) -> &Ledger {
        &self.information
    }

    /// Values rejected by conflicting directives.
    #[must_use]
    pub fn errors(&self) -> &Ledger {
        &self.errors
    }

    /// True if any value was rejected.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Negation of [`MergeReport::has_errors`].
    #[must_use]
    pub fn has_no_errors(&self) -> bool {
        !self.has_errors()
    }

    /// One row per ledger leaf: information leaves first, marked by whether
    /// `merged` still holds the value, then rejected leaves.
    #[must_use]
    pub fn rows(&self, merged: &PolicyDocument) -> Vec<ReportRow> {
        let considered = self.information.entries().map(|entry| {
            let inclusion = if merged.contains(entry.directive.as_str(), entry.value) {
                Inclusion::Present
            } else {
                Inclusion::MergedOut
            };
            ReportRow::from_entry(entry, inclusion)
        });
        let rejected = self
            .errors
            .entries()
            .map(|entry| ReportRow::from_entry(entry, Inclusion::Rejected));

        considered.chain(rejected).collect()
    }
}
