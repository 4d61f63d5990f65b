//! Row decoding and type coercion.
//!
//! Every mapped cell goes through [`coerce`] before it reaches a field's
//! setter. The policy, in priority order:
//!
//! 1. `Null` becomes the field's zero value (`None` for `Option<T>`).
//! 2. A cell whose type already matches the field is stored as is.
//! 3. Identifier fields parse text, 36-byte and 16-byte cells.
//! 4. Widening and textual conversions: `int64` into any integer field that
//!    can hold it and into float fields, `float64` into `f32`, bytes into
//!    `String` when valid UTF-8, text into `Vec<u8>`, identifiers into
//!    `String` (canonical form) and `Vec<u8>` (raw form).
//! 5. Anything else is a type mismatch.
//!
//! With [`CommitMode::InPlace`] a failure leaves the record partially
//! written: fields before the failing one keep their new values. With
//! [`CommitMode::Staged`] every cell is coerced before any setter runs, so a
//! failed decode leaves the record untouched.

use std::borrow::Cow;

use serde::Deserialize;

use crate::error::CrudError;
use crate::identifier;
use crate::mapping::FieldMapping;
use crate::schema::{FieldDescriptor, FieldKind, Record, Shape};
use crate::value::{Row, Value, ValueError};

/// When decoded values are written into the destination record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Write each field as soon as it is converted. No rollback on failure.
    #[default]
    InPlace,
    /// Convert every mapped cell first, write only if all succeeded.
    Staged,
}

/// Decode one row into `record`, writing fields in place.
pub fn decode<R: Record>(
    record: &mut R,
    row: Row<'_>,
    mapping: &FieldMapping,
) -> Result<(), CrudError> {
    decode_with(record, row, mapping, CommitMode::InPlace)
}

pub fn decode_with<R: Record>(
    record: &mut R,
    row: Row<'_>,
    mapping: &FieldMapping,
    mode: CommitMode,
) -> Result<(), CrudError> {
    let shape = R::shape()?;
    if row.len() != mapping.len() {
        return Err(CrudError::RowLength {
            columns: mapping.len(),
            values: row.len(),
        });
    }

    let cells = mapping
        .iter()
        .zip(row.into_values())
        .filter_map(|(slot, value)| slot.map(|field| (field, value)));

    match mode {
        CommitMode::InPlace => {
            for (field_ref, value) in cells {
                let field = locate(shape, field_ref.index, &field_ref.name)?;
                let value = coerce(field, value)?;
                commit(field, record, value)?;
            }
        }
        CommitMode::Staged => {
            let mut staged = Vec::with_capacity(mapping.mapped_count());
            for (field_ref, value) in cells {
                let field = locate(shape, field_ref.index, &field_ref.name)?;
                staged.push((field, coerce(field, value)?));
            }
            for (field, value) in staged {
                commit(field, record, value)?;
            }
        }
    }
    Ok(())
}

/// Assign one value to the field declared as `field`, under the same
/// policy as [`decode`].
pub fn set_field<R: Record>(
    record: &mut R,
    field: &str,
    value: Value<'_>,
) -> Result<(), CrudError> {
    let shape = R::shape()?;
    let (index, _) = shape
        .field_by_name(field)
        .ok_or_else(|| CrudError::FieldNotFound {
            field: field.to_string(),
        })?;
    let descriptor = locate(shape, index, field)?;
    let value = coerce(descriptor, value)?;
    commit(descriptor, record, value)
}

/// Find the field a mapping slot names, preferring its recorded index.
fn locate<'s, R>(
    shape: &'s Shape<R>,
    index: usize,
    name: &str,
) -> Result<&'s FieldDescriptor<R>, CrudError> {
    let field = shape
        .field(index)
        .filter(|f| f.name() == name)
        .or_else(|| shape.field_by_name(name).map(|(_, f)| f))
        .ok_or_else(|| CrudError::FieldNotFound {
            field: name.to_string(),
        })?;
    if !field.is_settable() {
        return Err(CrudError::FieldNotSettable {
            field: name.to_string(),
        });
    }
    Ok(field)
}

/// Convert `value` to the canonical variant for `field`'s kind.
pub(crate) fn coerce<'v, R>(
    field: &FieldDescriptor<R>,
    value: Value<'v>,
) -> Result<Value<'v>, CrudError> {
    let ty = field.field_type();
    let actual = value.type_name();
    let mismatch = || CrudError::TypeMismatch {
        field: field.name().to_string(),
        expected: ty.to_string(),
        actual,
    };
    let conversion = |reason: String| CrudError::TypeConversion {
        field: field.name().to_string(),
        expected: ty.to_string(),
        actual,
        reason,
    };

    match (ty.kind, value) {
        (_, Value::Null) => Ok(Value::Null),

        (FieldKind::Uuid, v @ Value::Uuid(_)) => Ok(v),
        (FieldKind::Uuid, other) => identifier::parse_identifier(&other)
            .map(Value::Uuid)
            .map_err(|e| conversion(e.to_string())),

        (FieldKind::Bool, v @ Value::Bool(_)) => Ok(v),

        (kind, Value::Int64(v)) if kind.is_integer() => {
            if kind.holds(v) {
                Ok(Value::Int64(v))
            } else {
                Err(conversion(format!("{v} is out of range")))
            }
        }

        (FieldKind::F32 | FieldKind::F64, v @ Value::Float64(_)) => Ok(v),
        (FieldKind::F32 | FieldKind::F64, Value::Int64(v)) => Ok(Value::Float64(v as f64)),

        (FieldKind::Text, v @ Value::Text(_)) => Ok(v),
        (FieldKind::Text, Value::Bytes(bytes)) => bytes_to_text(bytes)
            .map(Value::Text)
            .map_err(|e| conversion(e.to_string())),
        (FieldKind::Text, Value::Uuid(id)) => {
            Ok(Value::Text(Cow::Owned(id.hyphenated().to_string())))
        }

        (FieldKind::Bytes, v @ Value::Bytes(_)) => Ok(v),
        (FieldKind::Bytes, Value::Text(text)) => Ok(Value::Bytes(match text {
            Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
            Cow::Owned(s) => Cow::Owned(s.into_bytes()),
        })),
        (FieldKind::Bytes, Value::Uuid(id)) => Ok(Value::Bytes(Cow::Owned(id.as_bytes().to_vec()))),

        _ => Err(mismatch()),
    }
}

fn bytes_to_text(bytes: Cow<'_, [u8]>) -> Result<Cow<'_, str>, std::str::Utf8Error> {
    match bytes {
        Cow::Borrowed(b) => std::str::from_utf8(b).map(Cow::Borrowed),
        Cow::Owned(b) => String::from_utf8(b)
            .map(Cow::Owned)
            .map_err(|e| e.utf8_error()),
    }
}

fn commit<R>(
    field: &FieldDescriptor<R>,
    record: &mut R,
    value: Value<'_>,
) -> Result<(), CrudError> {
    let actual = value.type_name();
    tracing::trace!(field = field.name(), value = actual, "assigning field");
    match field.set(record, value) {
        None => Err(CrudError::FieldNotSettable {
            field: field.name().to_string(),
        }),
        Some(Ok(())) => Ok(()),
        Some(Err(ValueError::Mismatch { expected, actual })) => Err(CrudError::TypeMismatch {
            field: field.name().to_string(),
            expected: expected.to_string(),
            actual,
        }),
        Some(Err(ValueError::OutOfRange { expected, value })) => {
            Err(CrudError::TypeConversion {
                field: field.name().to_string(),
                expected: expected.to_string(),
                actual,
                reason: format!("{value} is out of range"),
            })
        }
    }
}
