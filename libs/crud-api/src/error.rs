use std::fmt;

/// Boxed error produced by an external query-execution capability.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Cursor operation that failed while a result was being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Advance,
    Columns,
    ReadRow,
}

impl fmt::Display for ScanStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStage::Advance => write!(f, "advancing cursor"),
            ScanStage::Columns => write!(f, "reading column names"),
            ScanStage::ReadRow => write!(f, "reading row"),
        }
    }
}

/// A record shape that cannot be registered.
///
/// Cloneable so that a failed registration can be cached next to the shape
/// and handed out on every lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("record '{record}' declares no fields")]
    Empty { record: &'static str },

    #[error(
        "record '{record}' tags both '{first}' and '{second}' with column '{column}'"
    )]
    DuplicateColumn {
        record: &'static str,
        column: String,
        first: &'static str,
        second: &'static str,
    },
}

/// Failure to read a raw value as a unique identifier.
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    #[error("invalid identifier text: {0}")]
    Text(#[from] uuid::Error),

    #[error("identifier bytes are not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("identifier must be 16 or 36 bytes, got {0}")]
    Length(usize),

    #[error("{0} value cannot hold an identifier")]
    Unsupported(&'static str),
}

/// Error returned by the decoder, the resolver and the query wrapper.
#[derive(Debug, thiserror::Error)]
pub enum CrudError {
    #[error("invalid record shape: {0}")]
    InvalidShape(#[from] ShapeError),

    #[error("no rows returned for {record}")]
    NoRows { record: &'static str },

    #[error("error executing query for {record}: {source}")]
    QueryExecution {
        record: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("error {stage}: {source}")]
    Scan {
        stage: ScanStage,
        #[source]
        source: BoxError,
    },

    #[error("field {field} not found")]
    FieldNotFound { field: String },

    #[error("field {field} cannot be set")]
    FieldNotSettable { field: String },

    #[error("field {field} type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: &'static str,
    },

    #[error("field {field} cannot convert {actual} to {expected}: {reason}")]
    TypeConversion {
        field: String,
        expected: String,
        actual: &'static str,
        reason: String,
    },

    #[error("row has {values} values for {columns} mapped columns")]
    RowLength { columns: usize, values: usize },

    #[error("column '{column}' is not tagged on any field")]
    UnmappedColumn { column: String },

    #[error("config error: {0}")]
    Config(String),
}

impl CrudError {
    /// Add context to the error.
    ///
    /// Variants carrying a field name get the context prepended to the name,
    /// `Config` gets it prepended to the message. Other variants are returned
    /// unchanged.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        match self {
            CrudError::FieldNotFound { field } => CrudError::FieldNotFound {
                field: format!("{ctx}.{field}"),
            },
            CrudError::FieldNotSettable { field } => CrudError::FieldNotSettable {
                field: format!("{ctx}.{field}"),
            },
            CrudError::TypeMismatch {
                field,
                expected,
                actual,
            } => CrudError::TypeMismatch {
                field: format!("{ctx}.{field}"),
                expected,
                actual,
            },
            CrudError::TypeConversion {
                field,
                expected,
                actual,
                reason,
            } => CrudError::TypeConversion {
                field: format!("{ctx}.{field}"),
                expected,
                actual,
                reason,
            },
            CrudError::Config(msg) => CrudError::Config(format!("{ctx}: {msg}")),
            other => other,
        }
    }

    /// Name of the field the error is about, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            CrudError::FieldNotFound { field }
            | CrudError::FieldNotSettable { field }
            | CrudError::TypeMismatch { field, .. }
            | CrudError::TypeConversion { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_prepended_to_field_names() {
        let err = CrudError::TypeMismatch {
            field: "Age".to_string(),
            expected: "i64".to_string(),
            actual: "text",
        }
        .with_context("User");
        assert_eq!(err.field(), Some("User.Age"));
        assert_eq!(
            err.to_string(),
            "field User.Age type mismatch: expected i64, got text"
        );
    }

    #[test]
    fn context_leaves_no_rows_alone() {
        let err = CrudError::NoRows { record: "User" }.with_context("lookup");
        assert!(matches!(err, CrudError::NoRows { record: "User" }));
        assert_eq!(err.field(), None);
    }

    #[test]
    fn scan_error_names_the_stage() {
        let err = CrudError::Scan {
            stage: ScanStage::ReadRow,
            source: "connection reset".into(),
        };
        assert_eq!(err.to_string(), "error reading row: connection reset");
    }
}
