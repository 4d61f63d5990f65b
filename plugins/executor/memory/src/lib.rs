use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crud_api::{BoxError, Connection, Cursor, Row, Value};

// ═══════════════════════════════════════════════════════════════
//  ResultSet
// ═══════════════════════════════════════════════════════════════

/// Canned result of one query: column names plus rows, with optional
/// injected faults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value<'static>>>,
    fail_advance: Option<String>,
    fail_columns: Option<String>,
    fail_scan: Option<String>,
    fail_close: Option<String>,
}

impl ResultSet {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_row(mut self, row: impl IntoIterator<Item = Value<'static>>) -> Self {
        self.rows.push(row.into_iter().collect());
        self
    }

    /// `advance` fails with `message`.
    pub fn failing_advance(mut self, message: impl Into<String>) -> Self {
        self.fail_advance = Some(message.into());
        self
    }

    /// `column_names` fails with `message`.
    pub fn failing_columns(mut self, message: impl Into<String>) -> Self {
        self.fail_columns = Some(message.into());
        self
    }

    /// `read_row` fails with `message`.
    pub fn failing_scan(mut self, message: impl Into<String>) -> Self {
        self.fail_scan = Some(message.into());
        self
    }

    /// `close` fails with `message` (the cursor still counts as closed).
    pub fn failing_close(mut self, message: impl Into<String>) -> Self {
        self.fail_close = Some(message.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════
//  Errors
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("no result registered for query: {0}")]
    UnknownQuery(String),

    #[error("{0}")]
    Injected(String),

    #[error("cursor is not positioned on a row")]
    NoCurrentRow,

    #[error("cursor is closed")]
    Closed,
}

/// One `execute` call as the connection saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub query: String,
    pub args: Vec<Value<'static>>,
}

enum Outcome {
    Rows(ResultSet),
    Error(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(g) => g,
        Err(poisoned) => {
            tracing::warn!("memory connection lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryConnection
// ═══════════════════════════════════════════════════════════════

/// In-memory query execution: queries are matched verbatim against
/// registered outcomes. Records every call and counts open cursors and rows
/// read, so callers can check what a query wrapper did.
#[derive(Default)]
pub struct MemoryConnection {
    outcomes: Mutex<HashMap<String, Outcome>>,
    executions: Mutex<Vec<Execution>>,
    open_cursors: AtomicUsize,
    rows_read: AtomicUsize,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with `result`. Replaces any earlier registration.
    pub fn register(&self, query: impl Into<String>, result: ResultSet) {
        lock(&self.outcomes).insert(query.into(), Outcome::Rows(result));
    }

    /// Make `query` fail at execution time.
    pub fn register_error(&self, query: impl Into<String>, message: impl Into<String>) {
        lock(&self.outcomes).insert(query.into(), Outcome::Error(message.into()));
    }

    pub fn executions(&self) -> Vec<Execution> {
        lock(&self.executions).clone()
    }

    /// Cursors handed out and not closed yet.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Rows returned by `read_row` across all cursors.
    pub fn rows_read(&self) -> usize {
        self.rows_read.load(Ordering::SeqCst)
    }
}

impl Connection for MemoryConnection {
    type Cursor<'c>
        = MemoryCursor<'c>
    where
        Self: 'c;

    fn execute(&self, query: &str, args: &[Value<'_>]) -> Result<MemoryCursor<'_>, BoxError> {
        lock(&self.executions).push(Execution {
            query: query.to_string(),
            args: args.iter().map(|v| v.clone().into_owned()).collect(),
        });

        let result = match lock(&self.outcomes).get(query) {
            Some(Outcome::Rows(result)) => result.clone(),
            Some(Outcome::Error(message)) => {
                return Err(MemoryError::Injected(message.clone()).into());
            }
            None => return Err(MemoryError::UnknownQuery(query.to_string()).into()),
        };

        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(query, rows = result.rows.len(), "opened memory cursor");
        Ok(MemoryCursor {
            connection: self,
            result,
            position: None,
            closed: false,
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryCursor
// ═══════════════════════════════════════════════════════════════

/// Cursor over a copy of a registered `ResultSet`. Rows are lent out as
/// borrowed values.
pub struct MemoryCursor<'c> {
    connection: &'c MemoryConnection,
    result: ResultSet,
    /// Index of the current row; `None` before the first `advance`.
    position: Option<usize>,
    closed: bool,
}

impl MemoryCursor<'_> {
    fn ensure_open(&self) -> Result<(), MemoryError> {
        if self.closed {
            Err(MemoryError::Closed)
        } else {
            Ok(())
        }
    }
}

fn injected(fault: Option<&str>) -> Result<(), MemoryError> {
    match fault {
        Some(message) => Err(MemoryError::Injected(message.to_string())),
        None => Ok(()),
    }
}

impl Cursor for MemoryCursor<'_> {
    fn advance(&mut self) -> Result<bool, BoxError> {
        self.ensure_open()?;
        injected(self.result.fail_advance.as_deref())?;
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next.min(self.result.rows.len()));
        Ok(next < self.result.rows.len())
    }

    fn column_names(&self) -> Result<Vec<String>, BoxError> {
        self.ensure_open()?;
        injected(self.result.fail_columns.as_deref())?;
        Ok(self.result.columns.clone())
    }

    fn read_row(&mut self) -> Result<Row<'_>, BoxError> {
        self.ensure_open()?;
        injected(self.result.fail_scan.as_deref())?;
        let row = self
            .position
            .and_then(|p| self.result.rows.get(p))
            .ok_or(MemoryError::NoCurrentRow)?;
        self.connection.rows_read.fetch_add(1, Ordering::SeqCst);
        Ok(row.iter().map(Value::borrowed).collect())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.connection.open_cursors.fetch_sub(1, Ordering::SeqCst);
        injected(self.result.fail_close.as_deref()).map_err(Into::into)
    }
}
