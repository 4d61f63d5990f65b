use std::path::Path;

use serde::Deserialize;

use crate::decode::CommitMode;
use crate::error::CrudError;

/// Decoding policy for a `Store` or a `run_with` call. Parsed from TOML.
///
/// ```toml
/// commit = "staged"
/// strict_columns = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// When decoded values are written into the record.
    #[serde(default)]
    pub commit: CommitMode,

    /// Fail on result columns no field is tagged with instead of skipping them.
    #[serde(default)]
    pub strict_columns: bool,
}

impl StoreConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CrudError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CrudError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content).map_err(|e| e.with_context(path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, CrudError> {
        toml::from_str(toml_str).map_err(|e| CrudError::Config(e.to_string()))
    }
}
