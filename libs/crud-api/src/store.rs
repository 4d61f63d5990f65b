use std::marker::PhantomData;

use crate::config::StoreConfig;
use crate::error::CrudError;
use crate::query::{self, Args, Connection};
use crate::schema::Record;

/// Runs queries taking `I` and decodes their first row into `O`.
///
/// Thin glue over [`query::run_with`]; holds the connection and the
/// decoding policy.
pub struct Store<C, I: ?Sized, O> {
    connection: C,
    config: StoreConfig,
    _marker: PhantomData<fn(&I, &mut O)>,
}

impl<C, I, O> Store<C, I, O>
where
    C: Connection,
    I: Args + ?Sized,
    O: Record,
{
    pub fn new(connection: C) -> Self {
        Self::with_config(connection, StoreConfig::default())
    }

    pub fn with_config(connection: C, config: StoreConfig) -> Self {
        Self {
            connection,
            config,
            _marker: PhantomData,
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Execute `query` with `input`'s arguments and decode the first row
    /// into `output`.
    pub fn query_row(&self, query: &str, input: &I, output: &mut O) -> Result<(), CrudError> {
        query::run_with(&self.connection, query, input, output, &self.config)
    }
}
