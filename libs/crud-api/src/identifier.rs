//! Unique-identifier parsing.
//!
//! An identifier reaches the decoder in one of two shapes: the canonical
//! hyphenated text form (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`) or the
//! 16-byte raw binary form. Drivers deliver the text form either as text or
//! as a byte buffer, so byte buffers are told apart by length.

use uuid::Uuid;

use crate::error::IdentifierError;
use crate::value::Value;

/// Length of the canonical hyphenated text form.
pub const CANONICAL_LEN: usize = 36;

/// Length of the raw binary form.
pub const RAW_LEN: usize = 16;

/// Parse a scanned cell into an identifier.
pub fn parse_identifier(value: &Value<'_>) -> Result<Uuid, IdentifierError> {
    match value {
        Value::Uuid(id) => Ok(*id),
        Value::Text(text) => parse_canonical(text),
        Value::Bytes(bytes) => parse_bytes(bytes),
        other => Err(IdentifierError::Unsupported(other.type_name())),
    }
}

/// Canonical text first, raw binary second, anything else is rejected.
pub fn parse_bytes(bytes: &[u8]) -> Result<Uuid, IdentifierError> {
    match bytes.len() {
        CANONICAL_LEN => parse_canonical(std::str::from_utf8(bytes)?),
        RAW_LEN => Ok(Uuid::from_slice(bytes)?),
        len => Err(IdentifierError::Length(len)),
    }
}

fn parse_canonical(text: &str) -> Result<Uuid, IdentifierError> {
    if text.len() != CANONICAL_LEN {
        return Err(IdentifierError::Length(text.len()));
    }
    Ok(Uuid::try_parse(text)?)
}
