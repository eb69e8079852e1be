//! Error types for csp-merge.
//!
//! Two families live here. `CspError` covers contract violations: the wrong
//! kind of input reached a constructor, a merge or the manager. Those abort
//! the operation and propagate to the caller. `SchemaViolation` covers
//! content validity: it is data collected by `schema::validate`, never
//! raised on its own.

use thiserror::Error;

/// A single reason a candidate document does not satisfy the rule schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("Document must be a JSON object, got {actual}")]
    NotAnObject {
        actual: String,
    },

    #[error("Unknown directive '{directive}'")]
    UnknownDirective {
        directive: String,
    },

    #[error("Directive '{directive}' must be {expected}, got {actual}")]
    WrongType {
        directive: String,
        expected: &'static str,
        actual: String,
    },

    #[error("Directive '{directive}' value '{value}' is not a valid {format}")]
    InvalidFormat {
        directive: String,
        value: String,
        format: &'static str,
    },

    #[error("Directive '{directive}' value '{value}' is not one of the allowed keywords")]
    NotAllowed {
        directive: String,
        value: String,
    },

    #[error("Directive '{directive}' lists '{value}' more than once")]
    DuplicateValue {
        directive: String,
        value: String,
    },

    #[error("Directive '{directive}' combines 'none' with other sources")]
    NoneNotAlone {
        directive: String,
    },

    #[error("Directive '{directive}' has an empty source list")]
    EmptySourceList {
        directive: String,
    },
}

impl SchemaViolation {
    /// The directive this violation is about, if any.
    #[must_use]
    pub fn directive(&self) -> Option<&str> {
        match self {
            Self::NotAnObject { .. } => None,
            Self::UnknownDirective { directive }
            | Self::WrongType { directive, .. }
            | Self::InvalidFormat { directive, .. }
            | Self::NotAllowed { directive, .. }
            | Self::DuplicateValue { directive, .. }
            | Self::NoneNotAlone { directive }
            | Self::EmptySourceList { directive } => Some(directive),
        }
    }
}

/// Top-level error type for csp-merge.
#[derive(Debug, Error)]
pub enum CspError {
    /// Input was neither a JSON-parsable string nor a JSON object.
    #[error("Document type error: {message}")]
    DocumentType {
        message: String,
    },

    /// Input could not be parsed, or a merge touched invalid rules.
    #[error("Document rules error: {message}")]
    DocumentRules {
        message: String,
    },

    /// The manager was handed something other than a list of documents.
    #[error("Manager type error: {message}")]
    ManagerType {
        message: String,
    },

    /// An equality helper was handed something other than two arrays.
    #[error("Utils type error: {message}")]
    UtilsType {
        message: String,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },
}

impl CspError {
    /// Creates a document type error.
    #[must_use]
    pub fn document_type(message: impl Into<String>) -> Self {
        Self::DocumentType {
            message: message.into(),
        }
    }

    /// Creates a document rules error.
    #[must_use]
    pub fn document_rules(message: impl Into<String>) -> Self {
        Self::DocumentRules {
            message: message.into(),
        }
    }

    /// Creates a manager type error.
    #[must_use]
    pub fn manager_type(message: impl Into<String>) -> Self {
        Self::ManagerType {
            message: message.into(),
        }
    }

    /// Creates a utils type error.
    #[must_use]
    pub fn utils_type(message: impl Into<String>) -> Self {
        Self::UtilsType {
            message: message.into(),
        }
    }

    /// Returns true if this is a document type error.
    #[must_use]
    pub const fn is_document_type(&self) -> bool {
        matches!(self, Self::DocumentType { .. })
    }

    /// Returns true if this is a document rules error.
    #[must_use]
    pub const fn is_document_rules(&self) -> bool {
        matches!(self, Self::DocumentRules { .. })
    }

    /// Returns true if this is a manager type error.
    #[must_use]
    pub const fn is_manager_type(&self) -> bool {
        matches!(self, Self::ManagerType { .. })
    }

    /// Returns true if this is a utils type error.
    #[must_use]
    pub const fn is_utils_type(&self) -> bool {
        matches!(self, Self::UtilsType { .. })
    }
}

impl From<serde_json::Error> for CspError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

/// Result type alias for csp-merge operations.
pub type CspResult<T> = Result<T, CspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_error() {
        let err = CspError::document_type("expected an object, got null");
        assert!(err.is_document_type());
        assert!(!err.is_document_rules());
        let msg = format!("{err}");
        assert!(msg.contains("Document type error"));
        assert!(msg.contains("null"));
    }

    #[test]
    fn test_document_rules_error() {
        let err = CspError::document_rules("truncated");
        assert!(err.is_document_rules());
        assert!(format!("{err}").contains("truncated"));
    }

    #[test]
    fn test_manager_and_utils_errors() {
        assert!(CspError::manager_type("not an array").is_manager_type());
        assert!(CspError::utils_type("not an array").is_utils_type());
    }

    #[test]
    fn test_violation_display() {
        let v = SchemaViolation::InvalidFormat {
            directive: "default-src".to_string(),
            value: "domain com".to_string(),
            format: "hostname or URI",
        };
        let msg = format!("{v}");
        assert!(msg.contains("default-src"));
        assert!(msg.contains("domain com"));
        assert_eq!(v.directive(), Some("default-src"));
    }

    #[test]
    fn test_not_an_object_has_no_directive() {
        let v = SchemaViolation::NotAnObject {
            actual: "array".to_string(),
        };
        assert_eq!(v.directive(), None);
    }
}
