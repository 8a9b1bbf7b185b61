//! Opaque identifier strings.
//!
//! ```text
//! id struct ──canonical JSON──► bytes ──base64url (no pad)──► "eyJjb25uZWN0b3..."
//! ```
//!
//! Decoding reverses the steps and then re-encodes the result: a string that
//! does not re-encode to itself was not produced by [`encode`] and is rejected
//! as malformed. This is what makes `encode(decode(s)) == s` hold for every
//! string `decode` accepts.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::canonical::to_canonical_bytes;

/// Identifier decode failures.
///
/// Both variants mean "this string is not a valid identifier". Neither is ever
/// used for "valid identifier, no such entity"; storage reports that.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Empty input, invalid base64, invalid JSON, wrong shape, unknown fields,
    /// or a non-canonical encoding.
    #[error("malformed identifier: {reason}")]
    Malformed { reason: String },
    /// Well-formed payload missing a required field.
    #[error("malformed identifier: missing field `{field}`")]
    MissingField { field: String },
}

impl IdError {
    fn malformed(reason: impl Into<String>) -> Self {
        IdError::Malformed {
            reason: reason.into(),
        }
    }
}

/// Fallible form of [`encode`].
pub fn try_encode<T: Serialize + ?Sized>(id: &T) -> Result<String, serde_json::Error> {
    let bytes = to_canonical_bytes(id)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Render an identifier struct to its opaque string form.
///
/// # Panics
/// Panics if `id` cannot be serialized to JSON. Identifier structs are plain
/// data with string keys, so this only happens on a programming error in the
/// struct definition.
pub fn encode<T: Serialize + ?Sized>(id: &T) -> String {
    match try_encode(id) {
        Ok(s) => s,
        Err(e) => panic!("identifier serialization failed: {e}"),
    }
}

/// Parse an opaque identifier string back into its struct.
pub fn decode<T>(s: &str) -> Result<T, IdError>
where
    T: Serialize + DeserializeOwned,
{
    if s.is_empty() {
        return Err(IdError::malformed("empty identifier"));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| IdError::malformed(format!("invalid base64: {e}")))?;

    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| IdError::malformed(format!("invalid json: {e}")))?;
    if !value.is_object() {
        return Err(IdError::malformed("identifier payload is not an object"));
    }

    let id: T = serde_json::from_value(value).map_err(classify)?;

    let reencoded =
        try_encode(&id).map_err(|e| IdError::malformed(format!("re-encode failed: {e}")))?;
    if reencoded != s {
        return Err(IdError::malformed("non-canonical encoding"));
    }

    Ok(id)
}

fn classify(err: serde_json::Error) -> IdError {
    let msg = err.to_string();
    match missing_field_name(&msg) {
        Some(field) => IdError::MissingField { field },
        None => IdError::Malformed { reason: msg },
    }
}

/// serde's derive reports absent required fields as "missing field `name`".
fn missing_field_name(msg: &str) -> Option<String> {
    let rest = msg.strip_prefix("missing field `")?;
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}
