use crate::error::CrudError;
use crate::schema::{Record, Shape};

/// Reference to a destination field (position in `Shape::fields`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// Position in `Shape::fields`.
    pub index: usize,
    /// Declared field name (checked against the shape before writing).
    pub name: String,
}

/// Positional column → field map for one result set.
///
/// Always as long as the column list it was resolved from. `None` slots are
/// columns no field is tagged with; the decoder skips them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldMapping {
    slots: Vec<Option<FieldRef>>,
}

impl FieldMapping {
    pub fn new(slots: Vec<Option<FieldRef>>) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&FieldRef> {
        self.slots.get(position).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&FieldRef>> {
        self.slots.iter().map(Option::as_ref)
    }

    /// Number of columns that map to a field.
    pub fn mapped_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Position of the first column that maps to no field.
    pub fn first_unmapped(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Field name per column, `None` where unmapped.
    pub fn field_names(&self) -> Vec<Option<&str>> {
        self.iter().map(|s| s.map(|f| f.name.as_str())).collect()
    }
}

impl<R> Shape<R> {
    /// Map each column to the first field, in declaration order, tagged with
    /// the column's name.
    pub fn resolve<S: AsRef<str>>(&self, columns: &[S]) -> FieldMapping {
        let slots = columns
            .iter()
            .map(|column| {
                self.field_for_column(column.as_ref())
                    .map(|(index, field)| FieldRef {
                        index,
                        name: field.name().to_string(),
                    })
            })
            .collect();
        FieldMapping { slots }
    }
}

/// Resolve `columns` against the registered shape of `R`.
pub fn resolve<R: Record, S: AsRef<str>>(columns: &[S]) -> Result<FieldMapping, CrudError> {
    Ok(R::shape()?.resolve(columns))
}
