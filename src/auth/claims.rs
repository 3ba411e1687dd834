//! Claim-set matching.

use serde_json::Value;

/// Named assertions from a token or credential, or the expectations on them.
pub type Claims = serde_json::Map<String, Value>;

/// Check `actual` against every expectation in `expected`.
///
/// - a string expectation must equal the actual string
/// - a list expectation must be non-empty and each element must appear in the
///   actual list
/// - anything else (missing key, type mismatch, other scalar kinds) fails
pub fn satisfies(expected: &Claims, actual: &Claims) -> bool {
    expected.iter().all(|(key, want)| match (want, actual.get(key)) {
        (Value::String(want), Some(Value::String(have))) => want == have,
        (Value::Array(want), Some(Value::Array(have))) => {
            !want.is_empty() && want.iter().all(|w| have.contains(w))
        }
        _ => false,
    })
}
