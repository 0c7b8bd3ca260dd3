//! Error types for the loader

use crate::partition::ColumnType;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Malformed input {}: {reason}", .path.display())]
    MalformedInput { path: PathBuf, reason: String },

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Unmapped type {column_type} for column {column} of table {table}")]
    UnmappedType {
        table: String,
        column: String,
        column_type: ColumnType,
    },

    #[error("Cannot connect to database {database}: {source}")]
    ConnectionError {
        database: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Load failed for {target}: {source}")]
    LoadFailure {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LoaderError {
    pub fn malformed(path: &Path, reason: impl ToString) -> Self {
        LoaderError::MalformedInput {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn load_failure(target: impl Into<String>, source: sqlx::Error) -> Self {
        LoaderError::LoadFailure {
            target: target.into(),
            source,
        }
    }

    /// Short, stable name of the failure kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            LoaderError::MalformedInput { .. } => "malformed_input",
            LoaderError::SchemaMismatch(_) => "schema_mismatch",
            LoaderError::EmptyInput(_) => "empty_input",
            LoaderError::UnmappedType { .. } => "unmapped_type",
            LoaderError::ConnectionError { .. } => "connection_error",
            LoaderError::LoadFailure { .. } => "load_failure",
            LoaderError::Config(_) => "config",
        }
    }

    /// Process exit code reported by the CLI for this failure kind.
    ///
    /// Code 2 is left to clap for usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoaderError::Config(_) => 1,
            LoaderError::MalformedInput { .. } => 3,
            LoaderError::SchemaMismatch(_) => 4,
            LoaderError::EmptyInput(_) => 5,
            LoaderError::UnmappedType { .. } => 6,
            LoaderError::ConnectionError { .. } => 7,
            LoaderError::LoadFailure { .. } => 8,
        }
    }
}
