use std::ops::{Deref, DerefMut};

use crate::config::StoreConfig;
use crate::decode;
use crate::error::{BoxError, CrudError, ScanStage};
use crate::schema::Record;
use crate::value::{Row, Value};

/// Cursor over the rows of one executed query.
pub trait Cursor {
    /// Move to the next row. `false` once the rows are exhausted.
    fn advance(&mut self) -> Result<bool, BoxError>;

    /// Column names of the result set, in positional order.
    fn column_names(&self) -> Result<Vec<String>, BoxError>;

    /// Values of the current row. Cells may borrow from the cursor.
    fn read_row(&mut self) -> Result<Row<'_>, BoxError>;

    /// Release the cursor's resources.
    fn close(&mut self) -> Result<(), BoxError>;
}

/// Query-execution capability the wrapper runs queries through.
///
/// Connection, transaction, retry and timeout handling all live behind this
/// trait.
pub trait Connection {
    type Cursor<'c>: Cursor
    where
        Self: 'c;

    fn execute(&self, query: &str, args: &[Value<'_>]) -> Result<Self::Cursor<'_>, BoxError>;
}

impl<C: Connection + ?Sized> Connection for &C {
    type Cursor<'c>
        = C::Cursor<'c>
    where
        Self: 'c;

    fn execute(&self, query: &str, args: &[Value<'_>]) -> Result<Self::Cursor<'_>, BoxError> {
        (**self).execute(query, args)
    }
}

/// Query input: produces arguments in the order of the query's placeholders.
///
/// Implemented by `#[derive(Args)]`.
pub trait Args {
    fn arguments(&self) -> Vec<Value<'_>>;
}

impl Args for () {
    fn arguments(&self) -> Vec<Value<'_>> {
        Vec::new()
    }
}

impl Args for [Value<'_>] {
    fn arguments(&self) -> Vec<Value<'_>> {
        self.iter().map(Value::borrowed).collect()
    }
}

impl Args for Vec<Value<'_>> {
    fn arguments(&self) -> Vec<Value<'_>> {
        self.as_slice().arguments()
    }
}

impl<T: Args + ?Sized> Args for &T {
    fn arguments(&self) -> Vec<Value<'_>> {
        (**self).arguments()
    }
}

/// Closes the wrapped cursor when dropped, whatever path the caller took.
struct CursorGuard<C: Cursor> {
    cursor: C,
}

impl<C: Cursor> Deref for CursorGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.cursor
    }
}

impl<C: Cursor> DerefMut for CursorGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.cursor
    }
}

impl<C: Cursor> Drop for CursorGuard<C> {
    fn drop(&mut self) {
        if let Err(e) = self.cursor.close() {
            tracing::warn!(error = %e, "failed to close cursor");
        }
    }
}

fn scan_error(stage: ScanStage) -> impl FnOnce(BoxError) -> CrudError {
    move |source| CrudError::Scan { stage, source }
}

/// Run `query` with the arguments of `input` and decode the first result
/// row into `record`. Rows after the first are never read.
pub fn run<C, I, R>(connection: &C, query: &str, input: &I, record: &mut R) -> Result<(), CrudError>
where
    C: Connection,
    I: Args + ?Sized,
    R: Record,
{
    run_with(connection, query, input, record, &StoreConfig::default())
}

pub fn run_with<C, I, R>(
    connection: &C,
    query: &str,
    input: &I,
    record: &mut R,
    config: &StoreConfig,
) -> Result<(), CrudError>
where
    C: Connection,
    I: Args + ?Sized,
    R: Record,
{
    // Resolve the shape before executing so a bad shape never runs a statement.
    let shape = R::shape()?;
    let name = shape.record_name();

    let args = input.arguments();
    tracing::debug!(record = name, args = args.len(), "executing query");
    let cursor = connection
        .execute(query, &args)
        .map_err(|source| CrudError::QueryExecution {
            record: name,
            source,
        })?;
    let mut cursor = CursorGuard { cursor };

    if !cursor.advance().map_err(scan_error(ScanStage::Advance))? {
        return Err(CrudError::NoRows { record: name });
    }

    let columns = cursor
        .column_names()
        .map_err(scan_error(ScanStage::Columns))?;
    let mapping = shape.resolve(&columns);
    tracing::debug!(
        record = name,
        columns = columns.len(),
        mapped = mapping.mapped_count(),
        "resolved columns"
    );

    if let Some(position) = mapping.first_unmapped() {
        if config.strict_columns {
            return Err(CrudError::UnmappedColumn {
                column: columns[position].clone(),
            });
        }
        for (column, slot) in columns.iter().zip(mapping.iter()) {
            if slot.is_none() {
                tracing::debug!(record = name, column = %column, "skipping untagged column");
            }
        }
    }

    let row = cursor.read_row().map_err(scan_error(ScanStage::ReadRow))?;
    decode::decode_with(record, row, &mapping, config.commit)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::Record;
    use crate::decode::CommitMode;

    #[derive(Debug, Default, PartialEq, Record)]
    struct Item {
        #[crud(column = "sku")]
        sku: String,
        #[crud(column = "qty")]
        qty: u32,
    }

    /// Single result set; counts closes and rows read.
    struct Fake {
        columns: Vec<&'static str>,
        rows: Vec<Vec<Value<'static>>>,
        fail_execute: bool,
        closes: Cell<usize>,
        reads: Cell<usize>,
    }

    impl Fake {
        fn new(columns: Vec<&'static str>, rows: Vec<Vec<Value<'static>>>) -> Self {
            Self {
                columns,
                rows,
                fail_execute: false,
                closes: Cell::new(0),
                reads: Cell::new(0),
            }
        }
    }

    struct FakeCursor<'c> {
        fake: &'c Fake,
        next: usize,
    }

    impl Cursor for FakeCursor<'_> {
        fn advance(&mut self) -> Result<bool, BoxError> {
            self.next += 1;
            Ok(self.next <= self.fake.rows.len())
        }

        fn column_names(&self) -> Result<Vec<String>, BoxError> {
            Ok(self.fake.columns.iter().map(|c| c.to_string()).collect())
        }

        fn read_row(&mut self) -> Result<Row<'_>, BoxError> {
            self.fake.reads.set(self.fake.reads.get() + 1);
            let row = &self.fake.rows[self.next - 1];
            Ok(row.iter().map(Value::borrowed).collect())
        }

        fn close(&mut self) -> Result<(), BoxError> {
            self.fake.closes.set(self.fake.closes.get() + 1);
            Ok(())
        }
    }

    impl Connection for Fake {
        type Cursor<'c>
            = FakeCursor<'c>
        where
            Self: 'c;

        fn execute(&self, _query: &str, _args: &[Value<'_>]) -> Result<FakeCursor<'_>, BoxError> {
            if self.fail_execute {
                return Err("relation \"items\" does not exist".into());
            }
            Ok(FakeCursor { fake: self, next: 0 })
        }
    }

    #[test]
    fn decodes_first_row_and_closes() {
        let fake = Fake::new(
            vec!["sku", "qty"],
            vec![
                vec![Value::from("A-1"), Value::Int64(3)],
                vec![Value::from("B-2"), Value::Int64(4)],
            ],
        );
        let mut item = Item::default();
        run(&fake, "SELECT sku, qty FROM items", &(), &mut item).unwrap();
        assert_eq!(
            item,
            Item {
                sku: "A-1".to_string(),
                qty: 3,
            }
        );
        assert_eq!(fake.reads.get(), 1);
        assert_eq!(fake.closes.get(), 1);
    }

    #[test]
    fn no_rows_leaves_record_alone() {
        let fake = Fake::new(vec!["sku", "qty"], Vec::new());
        let mut item = Item {
            sku: "keep".to_string(),
            qty: 9,
        };
        let err = run(&fake, "SELECT", &(), &mut item).unwrap_err();
        assert!(matches!(err, CrudError::NoRows { record: "Item" }));
        assert_eq!(item.sku, "keep");
        assert_eq!(fake.closes.get(), 1);
    }

    #[test]
    fn execution_failure_is_wrapped() {
        let mut fake = Fake::new(vec![], vec![]);
        fake.fail_execute = true;
        let err = run(&fake, "SELECT", &(), &mut Item::default()).unwrap_err();
        assert!(matches!(err, CrudError::QueryExecution { record: "Item", .. }));
        assert_eq!(
            err.to_string(),
            "error executing query for Item: relation \"items\" does not exist"
        );
        assert_eq!(fake.closes.get(), 0);
    }

    #[test]
    fn strict_columns_rejects_untagged_columns() {
        let fake = Fake::new(
            vec!["sku", "price"],
            vec![vec![Value::from("A-1"), Value::Float64(1.5)]],
        );
        let config = StoreConfig {
            strict_columns: true,
            ..StoreConfig::default()
        };
        let err = run_with(&fake, "SELECT", &(), &mut Item::default(), &config).unwrap_err();
        assert!(matches!(err, CrudError::UnmappedColumn { ref column } if column == "price"));
        assert_eq!(fake.reads.get(), 0);
        assert_eq!(fake.closes.get(), 1);
    }

    #[test]
    fn staged_commit_is_honoured() {
        let fake = Fake::new(
            vec!["sku", "qty"],
            vec![vec![Value::from("A-1"), Value::Int64(-1)]],
        );
        let config = StoreConfig {
            commit: CommitMode::Staged,
            ..StoreConfig::default()
        };
        let mut item = Item::default();
        let err = run_with(&fake, "SELECT", &(), &mut item, &config).unwrap_err();
        assert!(matches!(err, CrudError::TypeConversion { .. }));
        assert_eq!(item, Item::default());
        assert_eq!(fake.closes.get(), 1);
    }

    #[test]
    fn value_slices_are_args() {
        let args = vec![Value::from("John Doe"), Value::Int64(30)];
        assert_eq!(args.arguments(), args);
        assert!(().arguments().is_empty());
    }
}
