//! Set-equality helpers for directive values.
//!
//! Directive values are ordered on output but compared as sets: `["a", "b"]`
//! equals `["b", "a", "a"]`.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::error::{CspError, CspResult};
use crate::schema::json_type_name;

/// Returns true if both slices hold the same distinct values.
#[must_use]
pub fn values_are_equal<S: AsRef<str>>(a: &[S], b: &[S]) -> bool {
    let a: BTreeSet<&str> = a.iter().map(AsRef::as_ref).collect();
    let b: BTreeSet<&str> = b.iter().map(AsRef::as_ref).collect();
    a == b
}

/// Set equality over two JSON arrays.
///
/// # Errors
///
/// Returns `CspError::UtilsType` if either argument is not an array.
pub fn json_arrays_are_equal(a: &Value, b: &Value) -> CspResult<bool> {
    let (Some(a), Some(b)) = (a.as_array(), b.as_array()) else {
        return Err(CspError::utils_type(format!(
            "arrays_are_equal requires two arrays, got {} and {}",
            json_type_name(a),
            json_type_name(b)
        )));
    };

    let a: BTreeSet<String> = a.iter().map(ToString::to_string).collect();
    let b: BTreeSet<String> = b.iter().map(ToString::to_string).collect();
    Ok(a == b)
}

/// Negation of [`json_arrays_are_equal`].
///
/// # Errors
///
/// Returns `CspError::UtilsType` if either argument is not an array.
pub fn json_arrays_are_not_equal(a: &Value, b: &Value) -> CspResult<bool> {
    json_arrays_are_equal(a, b).map(|equal| !equal)
}

/// Sorted, de-duplicated copy of `values`.
#[must_use]
pub fn sorted_unique<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values
        .into_iter()
        .map(Into::into)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}
