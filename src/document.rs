//! Policy documents.
//!
//! A `PolicyDocument` wraps one JSON CSP fragment: a mapping of directive
//! names to values. Documents are immutable once built. Validity is a
//! derived predicate; an invalid document can exist, it just cannot take
//! part in a merge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{CspError, CspResult};
use crate::schema::{self, json_type_name, ValidationReport};
use crate::utils::{sorted_unique, values_are_equal};

/// Identity of a policy document.
///
/// Either supplied by the caller (a file name, say) or derived from the
/// document's canonical JSON, so the same content always yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wraps a caller-supplied identity.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives an identity from canonical JSON text (UUIDv5, OID namespace).
    #[must_use]
    pub fn from_content(canonical_json: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, canonical_json.as_bytes()).to_string())
    }

    /// The identity as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One JSON CSP document.
#[derive(Debug, Clone)]
pub struct PolicyDocument {
    id: DocumentId,
    rules: Map<String, Value>,
}

impl PolicyDocument {
    /// Wraps a parsed rule mapping; the id is derived from its content.
    #[must_use]
    pub fn new(rules: Map<String, Value>) -> Self {
        let id = DocumentId::from_content(&canonical_json(&rules));
        Self { id, rules }
    }

    /// Wraps a parsed rule mapping under a caller-supplied id.
    #[must_use]
    pub fn with_id(rules: Map<String, Value>, id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            rules,
        }
    }

    /// The document `{}`.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Map::new())
    }

    /// Parses a JSON-encoded document.
    ///
    /// # Errors
    ///
    /// `DocumentRules` if `json` is not parsable, `DocumentType` if it
    /// parses to something other than an object.
    pub fn from_json_str(json: &str) -> CspResult<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            CspError::document_rules(format!("expected a JSON parsable string. Got: {e}"))
        })?;
        match value {
            Value::Object(rules) => Ok(Self::new(rules)),
            other => Err(CspError::document_type(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Builds a document from either a JSON string or a JSON object.
    ///
    /// # Errors
    ///
    /// `DocumentType` for null, booleans, numbers and arrays; string input
    /// fails as in [`PolicyDocument::from_json_str`].
    pub fn from_value(value: Value) -> CspResult<Self> {
        match value {
            Value::String(json) => Self::from_json_str(&json),
            Value::Object(rules) => Ok(Self::new(rules)),
            other => Err(CspError::document_type(format!(
                "expected a JSON parsable string, or an object. Got: {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Replaces the identity of this document.
    #[must_use]
    pub fn identified_as(mut self, id: impl Into<DocumentId>) -> Self {
        self.id = id.into();
        self
    }

    /// The document's identity.
    #[must_use]
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// The raw directive → value mapping.
    #[must_use]
    pub fn rules(&self) -> &Map<String, Value> {
        &self.rules
    }

    /// Directive names present in this document, sorted.
    pub fn directives(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Returns true if the document has no directives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Schema validation with every violation found.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        schema::validate_rules(&self.rules)
    }

    /// Returns true if the document satisfies the rule schema.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_valid()
    }

    /// The stored value of a directive, untouched.
    #[must_use]
    pub fn raw_value_of(&self, directive: &str) -> Option<&Value> {
        self.rules.get(directive)
    }

    /// The values of a directive as a sequence.
    ///
    /// Absent directives yield `[]`; a bare scalar is wrapped into a
    /// one-element sequence; arrays are returned in stored order.
    #[must_use]
    pub fn values_of(&self, directive: &str) -> Vec<String> {
        match self.rules.get(directive) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(value_text).collect(),
            Some(scalar) => vec![value_text(scalar)],
        }
    }

    /// Like [`PolicyDocument::values_of`], as a JSON array.
    #[must_use]
    pub fn array_value_of(&self, directive: &str) -> Value {
        match self.rules.get(directive) {
            None | Some(Value::Null) => Value::Array(Vec::new()),
            Some(Value::Array(items)) => Value::Array(items.clone()),
            Some(scalar) => Value::Array(vec![scalar.clone()]),
        }
    }

    /// Returns true if `directive` is present and holds every candidate.
    pub fn has<I, S>(&self, directive: &str, candidates: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.rules.contains_key(directive) {
            return false;
        }
        let values = self.values_of(directive);
        candidates
            .into_iter()
            .all(|candidate| values.iter().any(|v| v == candidate.as_ref()))
    }

    /// Returns true if `directive` is present and holds `value`.
    #[must_use]
    pub fn contains(&self, directive: &str, value: &str) -> bool {
        self.has(directive, [value])
    }

    /// Returns true if both documents hold the same directives with the
    /// same value sets. Identity is ignored.
    #[must_use]
    pub fn same_rules(&self, other: &Self) -> bool {
        self.rules.len() == other.rules.len()
            && self.directives().all(|directive| {
                other.rules.contains_key(directive)
                    && values_are_equal(&self.values_of(directive), &other.values_of(directive))
            })
    }

    /// Canonical JSON of the rule mapping (keys sorted).
    ///
    /// # Errors
    ///
    /// Returns `CspError::Serialization` if encoding fails.
    pub fn to_json(&self) -> CspResult<String> {
        Ok(serde_json::to_string(&self.rules)?)
    }

    /// Pretty-printed JSON of the rule mapping.
    ///
    /// # Errors
    ///
    /// Returns `CspError::Serialization` if encoding fails.
    pub fn to_json_pretty(&self) -> CspResult<String> {
        Ok(serde_json::to_string_pretty(&self.rules)?)
    }

    /// The policy as a CSP header value.
    ///
    /// Directives and their values are sorted lexicographically, so the
    /// output does not depend on insertion order:
    /// `"default-src: 'self' example.com; script-src: 'self';"`.
    #[must_use]
    pub fn to_csp_header_value(&self) -> String {
        let mut names: Vec<&str> = self.directives().collect();
        names.sort_unstable();

        names
            .into_iter()
            .map(|name| {
                let values = sorted_unique(self.values_of(name));
                format!("{name}: {};", values.join(" "))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for PolicyDocument {
    fn eq(&self, other: &Self) -> bool {
        self.same_rules(other)
    }
}

impl Eq for PolicyDocument {}

impl FromStr for PolicyDocument {
    type Err = CspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json_str(s)
    }
}

impl fmt::Display for PolicyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_csp_header_value())
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn canonical_json(rules: &Map<String, Value>) -> String {
    // serde_json's Map is key-ordered, which is what makes this canonical.
    Value::Object(rules.clone()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> PolicyDocument {
        PolicyDocument::from_value(value).unwrap()
    }

    #[test]
    fn test_from_json_str() {
        let d = PolicyDocument::from_json_str(r#"{"default-src": ["'self'", "domain.com"]}"#).unwrap();
        assert!(d.is_valid());
        assert_eq!(d.values_of("default-src"), vec!["'self'", "domain.com"]);
    }

    #[test]
    fn test_truncated_json_is_rules_error() {
        let err = PolicyDocument::from_json_str("{").unwrap_err();
        assert!(err.is_document_rules());
    }

    #[test]
    fn test_null_is_type_error() {
        assert!(PolicyDocument::from_value(Value::Null).unwrap_err().is_document_type());
        assert!(PolicyDocument::from_value(json!(42)).unwrap_err().is_document_type());
        assert!(PolicyDocument::from_value(json!(["'self'"])).unwrap_err().is_document_type());
    }

    #[test]
    fn test_string_parsing_to_non_object_is_type_error() {
        assert!(PolicyDocument::from_json_str("null").unwrap_err().is_document_type());
        assert!(PolicyDocument::from_value(json!("[1, 2]")).unwrap_err().is_document_type());
    }

    #[test]
    fn test_string_value_is_parsed() {
        let d = PolicyDocument::from_value(json!(r#"{"img-src": ["'self'"]}"#)).unwrap();
        assert!(d.contains("img-src", "'self'"));
    }

    #[test]
    fn test_invalid_document_can_exist() {
        let d = doc(json!({"default-src": ["'self'", "'none'"]}));
        assert!(!d.is_valid());
        assert_eq!(d.validate().violations().len(), 1);
    }

    #[test]
    fn test_derived_id_is_stable() {
        let a = doc(json!({"script-src": ["'self'"], "img-src": ["example.com"]}));
        let b = doc(json!({"img-src": ["example.com"], "script-src": ["'self'"]}));
        assert_eq!(a.id(), b.id());
        let c = doc(json!({"script-src": ["'none'"]}));
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_supplied_id_wins() {
        let d = PolicyDocument::with_id(Map::new(), "base.json");
        assert_eq!(d.id().as_str(), "base.json");
        let e = PolicyDocument::empty().identified_as("other.json");
        assert_eq!(e.id().to_string(), "other.json");
    }

    #[test]
    fn test_values_of_shapes() {
        let d = doc(json!({"base-uri": "example.com", "img-src": ["a.com", "b.com"]}));
        assert_eq!(d.values_of("base-uri"), vec!["example.com"]);
        assert_eq!(d.values_of("img-src"), vec!["a.com", "b.com"]);
        assert!(d.values_of("script-src").is_empty());
        assert_eq!(d.array_value_of("base-uri"), json!(["example.com"]));
        assert_eq!(d.array_value_of("font-src"), json!([]));
    }

    #[test]
    fn test_has_requires_every_candidate() {
        let d = doc(json!({"img-src": ["a.com", "b.com"]}));
        assert!(d.has("img-src", ["a.com"]));
        assert!(d.has("img-src", ["a.com", "b.com"]));
        assert!(!d.has("img-src", ["a.com", "c.com"]));
        assert!(!d.has("script-src", ["a.com"]));
        assert!(d.contains("img-src", "b.com"));
    }

    #[test]
    fn test_has_on_scalar_directive() {
        let d = doc(json!({"base-uri": "example.com"}));
        assert!(d.contains("base-uri", "example.com"));
        assert!(!d.contains("base-uri", "e"));
    }

    #[test]
    fn test_csp_header_is_sorted() {
        let d = doc(json!({
            "script-src": ["'self'", "cdn.example.com"],
            "default-src": ["example.com", "'self'"]
        }));
        assert_eq!(
            d.to_csp_header_value(),
            "default-src: 'self' example.com; script-src: 'self' cdn.example.com;"
        );
    }

    #[test]
    fn test_csp_header_ignores_insertion_order() {
        let a = PolicyDocument::from_json_str(
            r#"{"img-src": ["b.com", "a.com"], "base-uri": "example.com"}"#,
        )
        .unwrap();
        let b = PolicyDocument::from_json_str(
            r#"{"base-uri": "example.com", "img-src": ["a.com", "b.com"]}"#,
        )
        .unwrap();
        assert_eq!(a.to_csp_header_value(), b.to_csp_header_value());
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_document_header() {
        assert_eq!(PolicyDocument::empty().to_csp_header_value(), "");
        assert_eq!(PolicyDocument::empty().to_json().unwrap(), "{}");
    }

    #[test]
    fn test_json_roundtrip_preserves_validity_and_header() {
        let original = doc(json!({"default-src": ["'self'", "domain.com"], "report-uri": "https://r.example.com/csp"}));
        let reparsed = PolicyDocument::from_json_str(&original.to_json().unwrap()).unwrap();
        assert_eq!(original.is_valid(), reparsed.is_valid());
        assert_eq!(original.to_csp_header_value(), reparsed.to_csp_header_value());
        assert_eq!(original.id(), reparsed.id());
    }

    #[test]
    fn test_equality_ignores_id_and_value_order() {
        let a = PolicyDocument::with_id(
            json!({"img-src": ["a.com", "b.com"]}).as_object().unwrap().clone(),
            "a",
        );
        let b = PolicyDocument::with_id(
            json!({"img-src": ["b.com", "a.com"]}).as_object().unwrap().clone(),
            "b",
        );
        assert_eq!(a, b);
        assert_ne!(a, PolicyDocument::empty());
    }
}
