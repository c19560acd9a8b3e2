//! Error types for table backups.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    /// The connection reports a driver no copy strategy exists for.
    /// Fatal for the whole run.
    #[error("unsupported database driver: {0}")]
    UnsupportedDriver(String),

    #[error("invalid timestamp format '{0}'")]
    InvalidTimestampFormat(String),

    #[error("invalid identifier: {0}")]
    Identifier(String),

    #[error("database error while {context}: {source}")]
    Database {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("SQL Server error: {0}")]
    SqlServer(#[from] tiberius::error::Error),

    /// Column metadata for a table could not be read or was unusable.
    #[error("cannot read columns of table {table}: {message}")]
    Introspection { table: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackupError {
    pub fn database(context: impl Into<String>, source: sqlx::Error) -> Self {
        BackupError::Database {
            context: context.into(),
            source,
        }
    }

    pub fn introspection(table: impl Into<String>, message: impl Into<String>) -> Self {
        BackupError::Introspection {
            table: table.into(),
            message: message.into(),
        }
    }

    /// True for errors that indicate a misconfigured connection rather than a bad target.
    pub fn is_fatal_config(&self) -> bool {
        matches!(
            self,
            BackupError::UnsupportedDriver(_) | BackupError::InvalidTimestampFormat(_) | BackupError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
