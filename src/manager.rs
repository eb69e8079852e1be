//! Policy manager: folds an ordered list of documents into one policy.
//!
//! The merged document and its report are computed on first request and
//! kept until the document list changes. Order matters: conflicts are
//! resolved against what has been accumulated so far, so the first
//! document to set a conflicting directive wins.

use log::info;
use serde_json::Value;

use crate::document::PolicyDocument;
use crate::error::{CspError, CspResult};
use crate::report::MergeReport;
use crate::schema::json_type_name;

/// The merged policy together with the report that explains it.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    document: PolicyDocument,
    report: MergeReport,
}

impl MergeOutcome {
    /// The merged policy.
    #[must_use]
    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    /// Provenance of the merged policy.
    #[must_use]
    pub fn report(&self) -> &MergeReport {
        &self.report
    }

    /// Splits the outcome into its parts.
    #[must_use]
    pub fn into_parts(self) -> (PolicyDocument, MergeReport) {
        (self.document, self.report)
    }
}

/// Merges documents left to right and owns the report of that run.
#[derive(Debug, Clone, Default)]
pub struct PolicyManager {
    documents: Vec<PolicyDocument>,
    outcome: Option<MergeOutcome>,
}

impl PolicyManager {
    /// Creates a manager with no documents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager over `documents`.
    #[must_use]
    pub fn with_documents(documents: Vec<PolicyDocument>) -> Self {
        Self {
            documents,
            outcome: None,
        }
    }

    /// The documents in merge order.
    #[must_use]
    pub fn documents(&self) -> &[PolicyDocument] {
        &self.documents
    }

    /// Replaces the document list and discards any previous outcome, even
    /// if the new list is equal to the old one.
    pub fn set_documents(&mut self, documents: Vec<PolicyDocument>) {
        self.documents = documents;
        self.invalidate();
    }

    /// Replaces the document list from a JSON array whose elements are
    /// document objects or JSON-encoded document strings.
    ///
    /// # Errors
    ///
    /// `ManagerType` if `documents` is not an array or an element is
    /// neither an object nor a string. Element parse failures propagate as
    /// returned by [`PolicyDocument::from_value`]. The current list is left
    /// untouched on error.
    pub fn set_documents_from_json(&mut self, documents: Value) -> CspResult<()> {
        let Value::Array(items) = documents else {
            return Err(CspError::manager_type(format!(
                "documents must be an array, got {}",
                json_type_name(&documents)
            )));
        };

        let mut parsed = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            if !(item.is_object() || item.is_string()) {
                return Err(CspError::manager_type(format!(
                    "documents must only contain policy documents, element {index} is {}",
                    json_type_name(&item)
                )));
            }
            parsed.push(PolicyDocument::from_value(item)?);
        }

        self.set_documents(parsed);
        Ok(())
    }

    /// Appends one document and discards any previous outcome.
    pub fn add_document(&mut self, document: PolicyDocument) {
        self.documents.push(document);
        self.invalidate();
    }

    /// Drops the memoized outcome; the next request re-merges.
    pub fn invalidate(&mut self) {
        self.outcome = None;
    }

    /// True if an outcome is memoized for the current document list.
    #[must_use]
    pub fn is_merged(&self) -> bool {
        self.outcome.is_some()
    }

    /// Merges the current documents, or returns the memoized outcome.
    ///
    /// An empty list merges to `{}` with an error-free report.
    ///
    /// # Errors
    ///
    /// `DocumentRules` if any document fails schema validation. Nothing is
    /// memoized in that case.
    pub fn merge(&mut self) -> CspResult<&MergeOutcome> {
        let outcome = match self.outcome.take() {
            Some(outcome) => outcome,
            None => fold(&self.documents)?,
        };
        let outcome: &MergeOutcome = self.outcome.insert(outcome);
        Ok(outcome)
    }

    /// The merged policy for the current documents.
    ///
    /// # Errors
    ///
    /// See [`PolicyManager::merge`].
    pub fn merged_document(&mut self) -> CspResult<&PolicyDocument> {
        Ok(self.merge()?.document())
    }

    /// The report for the current documents.
    ///
    /// # Errors
    ///
    /// See [`PolicyManager::merge`].
    pub fn report(&mut self) -> CspResult<&MergeReport> {
        Ok(self.merge()?.report())
    }
}

fn fold(documents: &[PolicyDocument]) -> CspResult<MergeOutcome> {
    let mut report = MergeReport::new();
    let mut merged = PolicyDocument::empty();

    for document in documents {
        merged = merged.merge_with(document, &mut report)?;
    }

    info!(
        "merged {} document(s) into {} directive(s){}",
        documents.len(),
        merged.rules().len(),
        if report.has_errors() { " with conflicts" } else { "" }
    );

    Ok(MergeOutcome {
        document: merged,
        report,
    })
}
