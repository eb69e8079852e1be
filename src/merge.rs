//! Merge engine.
//!
//! Merging is asymmetric: `self` is the accumulator and `other` is the
//! document being folded in. Mergeable directives are unioned. Conflicting
//! directives keep the accumulator's values when both sides disagree, and
//! the rejected values are recorded as errors against `other`.

use std::collections::BTreeSet;

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::directive::Directive;
use crate::document::PolicyDocument;
use crate::error::{CspError, CspResult};
use crate::report::MergeReport;
use crate::schema::{self, NONE_KEYWORD};
use crate::utils::json_arrays_are_not_equal;

impl PolicyDocument {
    /// Merges `other` into this document and returns the result.
    ///
    /// Every value `other` contributes is recorded in `report`, as
    /// information when it was considered for the result and as an error
    /// when a conflicting directive rejected it. Directives outside the
    /// merge classification (`plugin-types`, `sandbox`) are dropped.
    ///
    /// # Errors
    ///
    /// Returns `CspError::DocumentRules` if either document fails schema
    /// validation.
    pub fn merge_with(&self, other: &PolicyDocument, report: &mut MergeReport) -> CspResult<PolicyDocument> {
        let other_validation = other.validate();
        if !other_validation.is_valid() {
            return Err(CspError::document_rules(format!(
                "the document to merge in ({}) is not valid: {other_validation}",
                other.id()
            )));
        }
        let self_validation = self.validate();
        if !self_validation.is_valid() {
            return Err(CspError::document_rules(format!(
                "the document to merge with ({}) is not valid: {self_validation}",
                self.id()
            )));
        }

        let mut merged = Map::new();

        for &directive in schema::mergeable_keys() {
            let values = self.merge_mergeable_key(other, directive, report)?;
            if !values.is_empty() {
                debug!("{directive}: {} value(s) after merging {}", values.len(), other.id());
                merged.insert(directive.as_str().to_string(), string_array(values));
            }
        }

        for &directive in schema::conflicting_keys() {
            let mut values = self.merge_conflicting_key(other, directive, report)?;
            match values.len() {
                0 => {}
                1 => {
                    let value = values.remove(0);
                    merged.insert(directive.as_str().to_string(), Value::String(value));
                }
                _ => {
                    merged.insert(directive.as_str().to_string(), string_array(values));
                }
            }
        }

        Ok(PolicyDocument::new(merged))
    }

    /// Union of both sides' values for a mergeable directive, sorted, with
    /// `'none'` removed when anything else is present.
    fn merge_mergeable_key(
        &self,
        other: &PolicyDocument,
        directive: Directive,
        report: &mut MergeReport,
    ) -> CspResult<Vec<String>> {
        if !directive.is_mergeable() {
            return Err(CspError::document_rules(format!(
                "unknown key in mergeable merge: {directive}"
            )));
        }

        let name = directive.as_str();
        let other_values = other.values_of(name);
        for value in &other_values {
            report.add_information(directive, value, other);
        }

        let union: BTreeSet<String> = self.values_of(name).into_iter().chain(other_values).collect();
        Ok(drop_dominated_none(union).into_iter().collect())
    }

    /// Agreement check for a conflicting directive.
    ///
    /// When both sides are non-empty and differ as sets, the accumulator's
    /// values stand and `other`'s values become errors. Otherwise the two
    /// sides are unioned.
    fn merge_conflicting_key(
        &self,
        other: &PolicyDocument,
        directive: Directive,
        report: &mut MergeReport,
    ) -> CspResult<Vec<String>> {
        if !directive.is_conflicting() {
            return Err(CspError::document_rules(format!(
                "unknown key in conflicting merge: {directive}"
            )));
        }

        let name = directive.as_str();
        let this_values = self.values_of(name);
        let other_values = other.values_of(name);

        let disagree = !this_values.is_empty()
            && !other_values.is_empty()
            && json_arrays_are_not_equal(&self.array_value_of(name), &other.array_value_of(name))?;

        let merged: BTreeSet<String> = if disagree {
            for value in &other_values {
                warn!(
                    "{directive}: rejecting '{value}' from {} (keeping {})",
                    other.id(),
                    this_values.join(" ")
                );
                report.add_error(directive, value, other);
            }
            this_values.into_iter().collect()
        } else {
            for value in &other_values {
                report.add_information(directive, value, other);
            }
            this_values.into_iter().chain(other_values).collect()
        };

        Ok(merged.into_iter().collect())
    }
}

/// Drops `'none'` from a value set that holds anything else.
fn drop_dominated_none(mut values: BTreeSet<String>) -> BTreeSet<String> {
    if values.len() > 1 {
        values.remove(NONE_KEYWORD);
    }
    values
}

fn string_array(values: Vec<String>) -> Value {
    Value::Array(values.into_iter().map(Value::String).collect())
}
