//! Rule schema for JSON CSP documents.
//!
//! This is not a general JSON Schema engine. It checks the one document
//! shape this crate understands: an object keyed by known directive names,
//! with per-directive value shapes and formats. Failures are collected into
//! a [`ValidationReport`] rather than raised.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::directive::{Directive, ValueShape};
use crate::error::SchemaViolation;

/// The source keyword that excludes every other source.
pub const NONE_KEYWORD: &str = "'none'";

/// Source keywords allowed next to hostnames and URIs.
pub const SOURCE_KEYWORDS: [&str; 2] = ["'data'", "'self'"];

/// Allowed `sandbox` flags.
pub const SANDBOX_FLAGS: [&str; 4] = [
    "allow-forms",
    "allow-same-origin",
    "allow-scripts",
    "allow-top-navigation",
];

/// Maximum length of a hostname, trailing dot excluded.
pub const MAX_HOSTNAME_LEN: usize = 255;

const MERGEABLE_KEYS: [Directive; 12] = [
    Directive::ChildSrc,
    Directive::ConnectSrc,
    Directive::DefaultSrc,
    Directive::FontSrc,
    Directive::FormAction,
    Directive::FrameAncestors,
    Directive::FrameSrc,
    Directive::ImgSrc,
    Directive::MediaSrc,
    Directive::ObjectSrc,
    Directive::ScriptSrc,
    Directive::StyleSrc,
];

const CONFLICTING_KEYS: [Directive; 2] = [Directive::BaseUri, Directive::ReportUri];

/// Directives whose values are unioned across documents.
#[must_use]
pub fn mergeable_keys() -> &'static [Directive] {
    &MERGEABLE_KEYS
}

/// Directives on which documents must agree.
#[must_use]
pub fn conflicting_keys() -> &'static [Directive] {
    &CONFLICTING_KEYS
}

fn hostname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[0-9A-Za-z](?:[0-9A-Za-z-]{0,61}[0-9A-Za-z])?(?:\.[0-9A-Za-z](?:[0-9A-Za-z-]{0,61}[0-9A-Za-z])?)*\.?$",
        )
        .expect("hostname pattern is valid")
    })
}

fn uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S*$").expect("uri pattern is valid"))
}

fn media_type_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^/]+/[^/]+$").expect("media type pattern is valid"))
}

/// Returns true if `candidate` is an RFC 1123 hostname.
#[must_use]
pub fn is_hostname(candidate: &str) -> bool {
    let len = candidate.strip_suffix('.').unwrap_or(candidate).len();
    (1..=MAX_HOSTNAME_LEN).contains(&len) && hostname_regex().is_match(candidate)
}

/// Returns true if `candidate` is an absolute URI (scheme followed by `:`).
#[must_use]
pub fn is_uri(candidate: &str) -> bool {
    uri_regex().is_match(candidate)
}

/// Returns true if `candidate` looks like `type/subtype`.
#[must_use]
pub fn is_media_type(candidate: &str) -> bool {
    media_type_regex().is_match(candidate)
}

/// Outcome of validating one candidate document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<SchemaViolation>,
}

impl ValidationReport {
    /// True if no violation was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Every violation, in document key order.
    #[must_use]
    pub fn violations(&self) -> &[SchemaViolation] {
        &self.violations
    }

    fn push(&mut self, violation: SchemaViolation) {
        self.violations.push(violation);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return f.write_str("valid");
        }
        let messages: Vec<String> = self.violations.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Validates a candidate document of any JSON type.
#[must_use]
pub fn validate(document: &Value) -> ValidationReport {
    match document {
        Value::Object(rules) => validate_rules(rules),
        other => ValidationReport {
            violations: vec![SchemaViolation::NotAnObject {
                actual: json_type_name(other).to_string(),
            }],
        },
    }
}

/// Validates a directive → value mapping.
#[must_use]
pub fn validate_rules(rules: &Map<String, Value>) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (name, value) in rules {
        let Some(directive) = Directive::from_name(name) else {
            report.push(SchemaViolation::UnknownDirective {
                directive: name.clone(),
            });
            continue;
        };

        match directive.shape() {
            ValueShape::SourceList => check_source_list(name, value, &mut report),
            ValueShape::UriOrHostname => {
                check_scalar(name, value, "URI or hostname", |s| is_uri(s) || is_hostname(s), &mut report);
            }
            ValueShape::Uri => check_scalar(name, value, "URI", is_uri, &mut report),
            ValueShape::MediaTypes => check_media_types(name, value, &mut report),
            ValueShape::SandboxFlags => check_sandbox_flags(name, value, &mut report),
        }
    }

    report
}

fn check_source_list(name: &str, value: &Value, report: &mut ValidationReport) {
    let Some(items) = value.as_array() else {
        report.push(wrong_type(name, "an array of sources", value));
        return;
    };

    // `[]` satisfies both the 'none' branch and the source branch of the
    // shape, so it matches neither exclusively.
    if items.is_empty() {
        report.push(SchemaViolation::EmptySourceList {
            directive: name.to_string(),
        });
        return;
    }

    let has_none = items.iter().any(|v| v.as_str() == Some(NONE_KEYWORD));
    if has_none && items.len() > 1 {
        report.push(SchemaViolation::NoneNotAlone {
            directive: name.to_string(),
        });
    }

    let mut seen = HashSet::new();
    for item in items {
        let Some(source) = item.as_str() else {
            report.push(wrong_type(name, "a string", item));
            continue;
        };

        if !seen.insert(source) {
            report.push(SchemaViolation::DuplicateValue {
                directive: name.to_string(),
                value: source.to_string(),
            });
            continue;
        }

        if source == NONE_KEYWORD || SOURCE_KEYWORDS.contains(&source) {
            continue;
        }
        if source.starts_with('\'') {
            report.push(SchemaViolation::NotAllowed {
                directive: name.to_string(),
                value: source.to_string(),
            });
        } else if !is_hostname(source) && !is_uri(source) {
            report.push(SchemaViolation::InvalidFormat {
                directive: name.to_string(),
                value: source.to_string(),
                format: "hostname or URI",
            });
        }
    }
}

fn check_scalar(
    name: &str,
    value: &Value,
    format: &'static str,
    accepts: impl Fn(&str) -> bool,
    report: &mut ValidationReport,
) {
    let Some(s) = value.as_str() else {
        report.push(wrong_type(name, "a string", value));
        return;
    };
    if !accepts(s) {
        report.push(SchemaViolation::InvalidFormat {
            directive: name.to_string(),
            value: s.to_string(),
            format,
        });
    }
}

fn check_media_types(name: &str, value: &Value, report: &mut ValidationReport) {
    let Some(items) = value.as_array() else {
        report.push(wrong_type(name, "an array of media types", value));
        return;
    };
    for item in items {
        match item.as_str() {
            Some(s) if is_media_type(s) => {}
            Some(s) => report.push(SchemaViolation::InvalidFormat {
                directive: name.to_string(),
                value: s.to_string(),
                format: "media type",
            }),
            None => report.push(wrong_type(name, "a string", item)),
        }
    }
}

fn check_sandbox_flags(name: &str, value: &Value, report: &mut ValidationReport) {
    let Some(items) = value.as_array() else {
        report.push(wrong_type(name, "an array of sandbox flags", value));
        return;
    };
    for item in items {
        match item.as_str() {
            Some(s) if SANDBOX_FLAGS.contains(&s) => {}
            Some(s) => report.push(SchemaViolation::NotAllowed {
                directive: name.to_string(),
                value: s.to_string(),
            }),
            None => report.push(wrong_type(name, "a string", item)),
        }
    }
}

fn wrong_type(name: &str, expected: &'static str, actual: &Value) -> SchemaViolation {
    SchemaViolation::WrongType {
        directive: name.to_string(),
        expected,
        actual: json_type_name(actual).to_string(),
    }
}

/// JSON type name used in violation messages.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn source_list_schema() -> Value {
    json!({
        "oneOf": [
            {
                "type": "array",
                "items": { "enum": [NONE_KEYWORD] },
                "additionalItems": false,
                "maxItems": 1
            },
            {
                "type": "array",
                "items": {
                    "anyOf": [
                        { "type": "string", "enum": SOURCE_KEYWORDS },
                        { "type": "string", "format": "hostname" },
                        { "type": "string", "format": "uri" }
                    ]
                },
                "additionalItems": false,
                "uniqueItems": true
            }
        ]
    })
}

/// The declarative JSON Schema for a JSON CSP document.
///
/// `validate` enforces exactly this shape; the document is exported for
/// tooling that wants to validate policy files on its own.
#[must_use]
pub fn json_schema() -> Value {
    let mut properties = Map::new();
    for directive in Directive::ALL {
        let shape = match directive.shape() {
            ValueShape::SourceList => source_list_schema(),
            ValueShape::UriOrHostname => json!({
                "oneOf": [
                    { "type": "string", "format": "uri" },
                    { "type": "string", "format": "hostname" }
                ]
            }),
            ValueShape::Uri => json!({ "type": "string", "format": "uri" }),
            ValueShape::MediaTypes => json!({
                "type": "array",
                "items": { "type": "string", "pattern": "^[^/]+/[^/]+$" }
            }),
            ValueShape::SandboxFlags => json!({
                "type": "array",
                "items": { "type": "string", "enum": SANDBOX_FLAGS }
            }),
        };
        properties.insert(directive.as_str().to_string(), shape);
    }

    json!({
        "title": "JSON-CSP",
        "id": "http://jsoncsp",
        "description": "Definition of a valid JSON-CSP document",
        "type": "object",
        "additionalProperties": false,
        "properties": properties
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violations_of(doc: Value) -> Vec<SchemaViolation> {
        validate(&doc).violations().to_vec()
    }

    #[test]
    fn test_valid_document() {
        let doc = json!({"default-src": ["'self'", "domain.com"], "script-src": ["'self'"]});
        assert!(validate(&doc).is_valid());
    }

    #[test]
    fn test_empty_document_is_valid() {
        assert!(validate(&json!({})).is_valid());
    }

    #[test]
    fn test_non_object_is_invalid() {
        assert_eq!(
            violations_of(json!(["'self'"])),
            vec![SchemaViolation::NotAnObject { actual: "array".to_string() }]
        );
    }

    #[test]
    fn test_unknown_directive() {
        let v = violations_of(json!({"upgrade-insecure-requests": true}));
        assert!(matches!(&v[0], SchemaViolation::UnknownDirective { directive } if directive == "upgrade-insecure-requests"));
    }

    #[test]
    fn test_invalid_keyword_in_source_list() {
        let v = violations_of(json!({"default-src": ["'broken'", "domain.com"], "script-src": ["'none'"]}));
        assert_eq!(v.len(), 1);
        assert!(matches!(&v[0], SchemaViolation::NotAllowed { value, .. } if value == "'broken'"));
    }

    #[test]
    fn test_invalid_hostname_in_source_list() {
        let v = violations_of(json!({"default-src": ["'self'", "domain com"]}));
        assert!(matches!(&v[0], SchemaViolation::InvalidFormat { value, .. } if value == "domain com"));
    }

    #[test]
    fn test_none_must_be_alone() {
        let v = violations_of(json!({"default-src": ["'self'", "'none'"]}));
        assert_eq!(v, vec![SchemaViolation::NoneNotAlone { directive: "default-src".to_string() }]);
        assert!(validate(&json!({"default-src": ["'none'"]})).is_valid());
    }

    #[test]
    fn test_empty_source_list_is_invalid() {
        let v = violations_of(json!({"img-src": []}));
        assert!(matches!(&v[0], SchemaViolation::EmptySourceList { .. }));
    }

    #[test]
    fn test_duplicate_sources() {
        let v = violations_of(json!({"img-src": ["example.com", "example.com"]}));
        assert!(matches!(&v[0], SchemaViolation::DuplicateValue { .. }));
    }

    #[test]
    fn test_source_list_rejects_scalar() {
        let v = violations_of(json!({"script-src": "'self'"}));
        assert!(matches!(&v[0], SchemaViolation::WrongType { actual, .. } if actual == "string"));
    }

    #[test]
    fn test_uri_sources_accepted() {
        let doc = json!({"connect-src": ["https://api.example.com/v1", "wss://socket.example.com"]});
        assert!(validate(&doc).is_valid());
    }

    #[test]
    fn test_base_uri_shape() {
        assert!(validate(&json!({"base-uri": "example.com"})).is_valid());
        assert!(validate(&json!({"base-uri": "https://example.com/"})).is_valid());
        assert!(!validate(&json!({"base-uri": ["example.com"]})).is_valid());
        assert!(!validate(&json!({"base-uri": "not a host"})).is_valid());
    }

    #[test]
    fn test_report_uri_requires_uri() {
        assert!(validate(&json!({"report-uri": "https://report.example.com/csp"})).is_valid());
        assert!(!validate(&json!({"report-uri": "report.example.com/csp-report"})).is_valid());
    }

    #[test]
    fn test_plugin_types_and_sandbox() {
        assert!(validate(&json!({"plugin-types": ["application/pdf"]})).is_valid());
        assert!(!validate(&json!({"plugin-types": ["application"]})).is_valid());
        assert!(validate(&json!({"sandbox": ["allow-forms", "allow-scripts"]})).is_valid());
        assert!(!validate(&json!({"sandbox": ["allow-popups"]})).is_valid());
    }

    #[test]
    fn test_hostname_format() {
        assert!(is_hostname("example.com"));
        assert!(is_hostname("example.com."));
        assert!(is_hostname("localhost"));
        assert!(!is_hostname("-example.com"));
        assert!(!is_hostname("exa mple.com"));
        assert!(!is_hostname(""));
        assert!(!is_hostname(&"a".repeat(64)));
    }

    #[test]
    fn test_uri_format() {
        assert!(is_uri("https://example.com"));
        assert!(is_uri("data:"));
        assert!(!is_uri("example.com"));
        assert!(!is_uri("1http://x"));
    }

    #[test]
    fn test_classification_matches_directives() {
        for d in mergeable_keys() {
            assert!(d.is_mergeable());
        }
        for d in conflicting_keys() {
            assert!(d.is_conflicting());
        }
        let classified = mergeable_keys().len() + conflicting_keys().len();
        let merging = Directive::ALL.iter().filter(|d| d.merge_class().is_some()).count();
        assert_eq!(classified, merging);
    }

    #[test]
    fn test_json_schema_lists_every_directive() {
        let schema = json_schema();
        assert_eq!(schema["additionalProperties"], json!(false));
        let props = schema["properties"].as_object().unwrap();
        assert_eq!(props.len(), Directive::ALL.len());
        assert!(props.contains_key("script-src"));
        assert_eq!(props["report-uri"]["format"], json!("uri"));
    }

    #[test]
    fn test_report_display() {
        let report = validate(&json!({"img-src": []}));
        assert!(report.to_string().contains("img-src"));
        assert_eq!(validate(&json!({})).to_string(), "valid");
    }
}
