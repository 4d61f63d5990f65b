use std::borrow::Cow;

use uuid::Uuid;

use crate::schema::{FieldKind, FieldType};

/// Canonical representation of one scanned cell.
///
/// Closed set of types a query cursor can produce. Text and bytes are `Cow`
/// so a cursor can lend cells straight out of its own buffers; the decoder
/// copies only what ends up in a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Text(Cow<'a, str>),
    /// Raw bytes, not necessarily UTF-8.
    Bytes(Cow<'a, [u8]>),
    Uuid(Uuid),
}

impl<'a> Value<'a> {
    /// Short name of the dynamic type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow text and bytes from `self` instead of cloning them.
    pub fn borrowed(&self) -> Value<'_> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(v) => Value::Bool(*v),
            Value::Int64(v) => Value::Int64(*v),
            Value::Float64(v) => Value::Float64(*v),
            Value::Text(v) => Value::Text(Cow::Borrowed(v.as_ref())),
            Value::Bytes(v) => Value::Bytes(Cow::Borrowed(v.as_ref())),
            Value::Uuid(v) => Value::Uuid(*v),
        }
    }

    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(v) => Value::Bool(v),
            Value::Int64(v) => Value::Int64(v),
            Value::Float64(v) => Value::Float64(v),
            Value::Text(v) => Value::Text(Cow::Owned(v.into_owned())),
            Value::Bytes(v) => Value::Bytes(Cow::Owned(v.into_owned())),
            Value::Uuid(v) => Value::Uuid(v),
        }
    }
}

/// Positional array of values. Order matches the cursor's column list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row<'a>(pub Vec<Value<'a>>);

impl<'a> Row<'a> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<Value<'a>> {
        self.0
    }
}

impl<'a> From<Vec<Value<'a>>> for Row<'a> {
    fn from(values: Vec<Value<'a>>) -> Self {
        Row(values)
    }
}

impl<'a> FromIterator<Value<'a>> for Row<'a> {
    fn from_iter<T: IntoIterator<Item = Value<'a>>>(iter: T) -> Self {
        Row(iter.into_iter().collect())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Conversions into Value
// ═══════════════════════════════════════════════════════════════

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value<'_> {
                fn from(v: $ty) -> Self {
                    Value::Int64(i64::from(v))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Float64(f64::from(v))
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Text(Cow::Borrowed(v))
    }
}

impl From<String> for Value<'_> {
    fn from(v: String) -> Self {
        Value::Text(Cow::Owned(v))
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Value::Bytes(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for Value<'_> {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Cow::Owned(v))
    }
}

impl From<Uuid> for Value<'_> {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ═══════════════════════════════════════════════════════════════
//  FromValue: typed field extraction
// ═══════════════════════════════════════════════════════════════

/// Value could not be stored into a typed field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("expected {expected}, got {actual}")]
    Mismatch {
        expected: FieldType,
        actual: &'static str,
    },

    #[error("{value} is out of range for {expected}")]
    OutOfRange { expected: FieldType, value: i64 },
}

/// A Rust type that a tagged record field can have.
///
/// `FIELD_TYPE` is what the decoder coerces raw values towards before
/// calling `from_value`, so implementations only unwrap the canonical
/// variant for their kind. `Null` yields the type's zero value.
pub trait FromValue: Sized {
    const FIELD_TYPE: FieldType;

    fn from_value(value: Value<'_>) -> Result<Self, ValueError>;
}

fn mismatch<T: FromValue>(value: &Value<'_>) -> ValueError {
    ValueError::Mismatch {
        expected: T::FIELD_TYPE,
        actual: value.type_name(),
    }
}

macro_rules! int_from_value {
    ($($ty:ty => $kind:ident),*) => {
        $(
            impl FromValue for $ty {
                const FIELD_TYPE: FieldType = FieldType::required(FieldKind::$kind);

                fn from_value(value: Value<'_>) -> Result<Self, ValueError> {
                    match value {
                        Value::Null => Ok(0),
                        Value::Int64(v) => <$ty>::try_from(v).map_err(|_| ValueError::OutOfRange {
                            expected: Self::FIELD_TYPE,
                            value: v,
                        }),
                        other => Err(mismatch::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

int_from_value!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64
);

impl FromValue for bool {
    const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Bool);

    fn from_value(value: Value<'_>) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for f32 {
    const FIELD_TYPE: FieldType = FieldType::required(FieldKind::F32);

    fn from_value(value: Value<'_>) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(0.0),
            Value::Float64(v) => Ok(v as f32),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for f64 {
    const FIELD_TYPE: FieldType = FieldType::required(FieldKind::F64);

    fn from_value(value: Value<'_>) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(0.0),
            Value::Float64(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for String {
    const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Text);

    fn from_value(value: Value<'_>) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(v) => Ok(v.into_owned()),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for Vec<u8> {
    const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Bytes);

    fn from_value(value: Value<'_>) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Bytes(v) => Ok(v.into_owned()),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromValue for Uuid {
    const FIELD_TYPE: FieldType = FieldType::required(FieldKind::Uuid);

    fn from_value(value: Value<'_>) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(Uuid::nil()),
            Value::Uuid(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const FIELD_TYPE: FieldType = FieldType::optional(T::FIELD_TYPE.kind);

    fn from_value(value: Value<'_>) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  ToValue: query arguments
// ═══════════════════════════════════════════════════════════════

/// A Rust value that can be passed as a query argument.
///
/// No `u64` impl: arguments travel as `Int64`.
pub trait ToValue {
    fn to_value(&self) -> Value<'_>;
}

macro_rules! to_value_copy {
    ($($ty:ty),*) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value<'_> {
                    Value::from(*self)
                }
            }
        )*
    };
}

to_value_copy!(bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, Uuid);

impl ToValue for str {
    fn to_value(&self) -> Value<'_> {
        Value::Text(Cow::Borrowed(self))
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value<'_> {
        Value::Text(Cow::Borrowed(self.as_str()))
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Value<'_> {
        Value::Bytes(Cow::Borrowed(self))
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value<'_> {
        Value::Bytes(Cow::Borrowed(self.as_slice()))
    }
}

impl ToValue for Value<'_> {
    fn to_value(&self) -> Value<'_> {
        self.borrowed()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value<'_> {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value<'_> {
        (**self).to_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_integers_reject_out_of_range_values() {
        assert_eq!(i16::from_value(Value::Int64(-300)), Ok(-300));
        assert_eq!(
            u8::from_value(Value::Int64(256)),
            Err(ValueError::OutOfRange {
                expected: FieldType::required(FieldKind::U8),
                value: 256,
            })
        );
    }

    #[test]
    fn null_yields_zero_values() {
        assert_eq!(i64::from_value(Value::Null), Ok(0));
        assert_eq!(String::from_value(Value::Null), Ok(String::new()));
        assert_eq!(Uuid::from_value(Value::Null), Ok(Uuid::nil()));
        assert_eq!(Option::<Uuid>::from_value(Value::Null), Ok(None));
    }

    #[test]
    fn option_marks_field_type_nullable() {
        let ty = <Option<Uuid> as FromValue>::FIELD_TYPE;
        assert_eq!(ty.kind, FieldKind::Uuid);
        assert!(ty.nullable);
        assert!(!<Uuid as FromValue>::FIELD_TYPE.nullable);
    }

    #[test]
    fn extraction_does_not_convert() {
        let err = String::from_value(Value::Int64(7)).unwrap_err();
        assert_eq!(err.to_string(), "expected String, got int64");
    }

    #[test]
    fn borrowed_shares_the_buffer() {
        let owned = Value::from(String::from("John Doe"));
        match owned.borrowed() {
            Value::Text(Cow::Borrowed(s)) => assert_eq!(s, "John Doe"),
            other => panic!("expected borrowed text, got {other:?}"),
        }
    }

    #[test]
    fn optional_arguments_become_null() {
        let missing: Option<i32> = None;
        assert!(missing.to_value().is_null());
        assert_eq!(Some(30i32).to_value(), Value::Int64(30));
        assert_eq!("x".to_value(), Value::Text(Cow::Borrowed("x")));
    }
}
