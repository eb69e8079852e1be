//! # csp-merge - merge partial Content-Security-Policy documents
//!
//! Projects often own their CSP in fragments: one file per feature, per
//! third-party integration, per team. csp-merge folds those JSON fragments
//! into a single schema-valid policy and keeps a ledger of which fragment
//! contributed which value, and which values were rejected.
//!
//! ## Core Concepts
//!
//! - **Directive**: a named CSP rule, either *mergeable* (values are
//!   unioned) or *conflicting* (documents must agree)
//! - **PolicyDocument**: one JSON CSP fragment with a stable identity
//! - **MergeReport**: provenance of every value considered or rejected
//! - **PolicyManager**: folds an ordered list of documents left to right
//!
//! ## Usage
//!
//! ```rust
//! use csp_merge::{PolicyDocument, PolicyManager};
//!
//! let base: PolicyDocument = r#"{"script-src": ["'none'"], "base-uri": "example.com"}"#.parse()?;
//! let cdn: PolicyDocument = r#"{"script-src": ["cdn.example.com"]}"#.parse()?;
//!
//! let mut manager = PolicyManager::with_documents(vec![base, cdn]);
//! let outcome = manager.merge()?;
//!
//! assert_eq!(
//!     outcome.document().to_csp_header_value(),
//!     "base-uri: example.com; script-src: cdn.example.com;"
//! );
//! assert!(!outcome.report().has_errors());
//! # Ok::<(), csp_merge::CspError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod directive;
pub mod document;
pub mod error;
pub mod manager;
pub mod merge;
pub mod report;
pub mod schema;
pub mod utils;

// Re-export primary types at crate root for convenience
pub use directive::{Directive, MergeClass, ValueShape};
pub use document::{DocumentId, PolicyDocument};
pub use error::{CspError, CspResult, SchemaViolation};
pub use manager::{MergeOutcome, PolicyManager};
pub use report::{Inclusion, Ledger, LedgerEntry, MergeReport, ReportRow};
pub use schema::{conflicting_keys, mergeable_keys, validate, ValidationReport};
