use std::fmt;
use std::sync::OnceLock;

use crate::error::ShapeError;
use crate::value::{FromValue, Value, ValueError};

/// Declared type of a record field, as seen by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Text,
    Bytes,
    Uuid,
    /// A type the decoder never converts into (nested records, enums, ...).
    /// Carries the Rust type name for diagnostics.
    Opaque(&'static str),
}

impl FieldKind {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            FieldKind::I8
                | FieldKind::I16
                | FieldKind::I32
                | FieldKind::I64
                | FieldKind::U8
                | FieldKind::U16
                | FieldKind::U32
                | FieldKind::U64
        )
    }

    /// Whether an `Int64` cell fits this integer kind. False for non-integers.
    pub fn holds(self, v: i64) -> bool {
        match self {
            FieldKind::I8 => i8::try_from(v).is_ok(),
            FieldKind::I16 => i16::try_from(v).is_ok(),
            FieldKind::I32 => i32::try_from(v).is_ok(),
            FieldKind::I64 => true,
            FieldKind::U8 => u8::try_from(v).is_ok(),
            FieldKind::U16 => u16::try_from(v).is_ok(),
            FieldKind::U32 => u32::try_from(v).is_ok(),
            FieldKind::U64 => v >= 0,
            _ => false,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Bool => write!(f, "bool"),
            FieldKind::I8 => write!(f, "i8"),
            FieldKind::I16 => write!(f, "i16"),
            FieldKind::I32 => write!(f, "i32"),
            FieldKind::I64 => write!(f, "i64"),
            FieldKind::U8 => write!(f, "u8"),
            FieldKind::U16 => write!(f, "u16"),
            FieldKind::U32 => write!(f, "u32"),
            FieldKind::U64 => write!(f, "u64"),
            FieldKind::F32 => write!(f, "f32"),
            FieldKind::F64 => write!(f, "f64"),
            FieldKind::Text => write!(f, "String"),
            FieldKind::Bytes => write!(f, "Vec<u8>"),
            FieldKind::Uuid => write!(f, "Uuid"),
            FieldKind::Opaque(name) => write!(f, "{name}"),
        }
    }
}

/// Field kind plus nullability (`Option<T>` fields are nullable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType {
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldType {
    pub const fn required(kind: FieldKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub const fn optional(kind: FieldKind) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }

    pub const fn opaque(name: &'static str) -> Self {
        Self::required(FieldKind::Opaque(name))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "Option<{}>", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// Writes one field of `R`. Receives a value already coerced to the
/// field's kind (or `Null`).
pub type Setter<R> = Box<dyn Fn(&mut R, Value<'_>) -> Result<(), ValueError> + Send + Sync>;

/// One declared field: `(name, type, column tag)` plus its setter.
///
/// A field without a setter is declared but not writable by the decoder.
pub struct FieldDescriptor<R> {
    name: &'static str,
    ty: FieldType,
    column: Option<&'static str>,
    setter: Option<Setter<R>>,
}

impl<R> FieldDescriptor<R> {
    pub fn new(
        name: &'static str,
        ty: FieldType,
        column: Option<&'static str>,
        setter: Option<Setter<R>>,
    ) -> Self {
        Self {
            name,
            ty,
            column,
            setter,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    pub fn column(&self) -> Option<&'static str> {
        self.column
    }

    pub fn is_settable(&self) -> bool {
        self.setter.is_some()
    }

    /// Run the setter. `None` if the field is not settable.
    pub(crate) fn set(&self, record: &mut R, value: Value<'_>) -> Option<Result<(), ValueError>> {
        self.setter.as_ref().map(|set| set(record, value))
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("column", &self.column)
            .field("settable", &self.is_settable())
            .finish()
    }
}

/// Static field table of a record type.
///
/// Field order is declaration order; a field's position is its index in
/// `FieldRef`.
pub struct Shape<R> {
    record: &'static str,
    fields: Vec<FieldDescriptor<R>>,
}

impl<R> Shape<R> {
    pub fn builder(record: &'static str) -> ShapeBuilder<R> {
        ShapeBuilder {
            record,
            fields: Vec::new(),
        }
    }

    /// Build a shape once per `cell` and hand out the cached result.
    ///
    /// Used by `#[derive(Record)]`; manual `Record` impls can call it the
    /// same way with their own `static`.
    pub fn cached(
        cell: &'static OnceLock<Result<Shape<R>, ShapeError>>,
        init: impl FnOnce() -> Result<Shape<R>, ShapeError>,
    ) -> Result<&'static Shape<R>, ShapeError> {
        cell.get_or_init(init).as_ref().map_err(Clone::clone)
    }

    pub fn record_name(&self) -> &'static str {
        self.record
    }

    pub fn fields(&self) -> &[FieldDescriptor<R>] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&FieldDescriptor<R>> {
        self.fields.get(index)
    }

    pub fn field_by_name(&self, name: &str) -> Option<(usize, &FieldDescriptor<R>)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    /// First field, in declaration order, tagged with `column`.
    pub fn field_for_column(&self, column: &str) -> Option<(usize, &FieldDescriptor<R>)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.column == Some(column))
    }
}

impl<R> fmt::Debug for Shape<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("record", &self.record)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Registers the fields of a record type in declaration order.
pub struct ShapeBuilder<R> {
    record: &'static str,
    fields: Vec<FieldDescriptor<R>>,
}

impl<R: 'static> ShapeBuilder<R> {
    /// Tagged, writable field. `access` projects the record onto the field.
    pub fn column<T, F>(mut self, name: &'static str, column: &'static str, access: F) -> Self
    where
        T: FromValue,
        F: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        let setter: Setter<R> = Box::new(move |record: &mut R, value: Value<'_>| {
            *access(record) = T::from_value(value)?;
            Ok(())
        });
        self.fields.push(FieldDescriptor::new(
            name,
            T::FIELD_TYPE,
            Some(column),
            Some(setter),
        ));
        self
    }

    /// Tagged field the decoder must not write.
    pub fn read_only<T: FromValue>(mut self, name: &'static str, column: &'static str) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, T::FIELD_TYPE, Some(column), None));
        self
    }

    /// Field without a column tag. Never populated.
    pub fn untagged(mut self, name: &'static str, ty: FieldType) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty, None, None));
        self
    }

    /// Register a hand-built descriptor, e.g. an `Opaque` field with a
    /// custom setter.
    pub fn field(mut self, descriptor: FieldDescriptor<R>) -> Self {
        self.fields.push(descriptor);
        self
    }

    pub fn build(self) -> Result<Shape<R>, ShapeError> {
        if self.fields.is_empty() {
            return Err(ShapeError::Empty {
                record: self.record,
            });
        }

        for (i, field) in self.fields.iter().enumerate() {
            let Some(column) = field.column else {
                continue;
            };
            if let Some(first) = self.fields[..i].iter().find(|f| f.column == Some(column)) {
                return Err(ShapeError::DuplicateColumn {
                    record: self.record,
                    column: column.to_string(),
                    first: first.name,
                    second: field.name,
                });
            }
        }

        Ok(Shape {
            record: self.record,
            fields: self.fields,
        })
    }
}

/// A record type the decoder can populate.
///
/// Implemented by `#[derive(Record)]`. The shape is static metadata:
/// available without an instance and built once per type.
pub trait Record: Sized + 'static {
    fn shape() -> Result<&'static Shape<Self>, ShapeError>;
}
