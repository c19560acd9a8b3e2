//! Identifier validation and dialect quoting.
//!
//! Table names cannot be bound as statement parameters, so every name that ends
//! up inside generated SQL goes through [`quote_table`]. Schema-qualified names
//! (`schema.table`) are quoted part by part.

use crate::drivers::DriverKind;
use crate::error::{BackupError, Result};

/// Longest identifier each engine accepts without truncating.
pub fn max_identifier_length(kind: DriverKind) -> usize {
    match kind {
        DriverKind::Postgres => 63,
        DriverKind::MySql | DriverKind::MariaDb => 64,
        DriverKind::SqlServer => 128,
        DriverKind::Sqlite => 1024,
    }
}

pub fn validate_identifier(kind: DriverKind, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BackupError::Identifier("identifier cannot be empty".to_string()));
    }
    if name.contains('\0') {
        return Err(BackupError::Identifier(format!("identifier contains a null byte: {:?}", name)));
    }
    let max = max_identifier_length(kind);
    if name.len() > max {
        return Err(BackupError::Identifier(format!(
            "identifier exceeds {} bytes for {}: {:?}",
            max,
            kind.as_str(),
            name
        )));
    }
    Ok(())
}

/// Quote a single identifier part.
pub fn quote_ident(kind: DriverKind, name: &str) -> Result<String> {
    validate_identifier(kind, name)?;
    let quoted = match kind {
        DriverKind::MySql | DriverKind::MariaDb => format!("`{}`", name.replace('`', "``")),
        DriverKind::SqlServer => format!("[{}]", name.replace(']', "]]")),
        DriverKind::Sqlite | DriverKind::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
    };
    Ok(quoted)
}

/// Quote a possibly schema-qualified table name.
pub fn quote_table(kind: DriverKind, name: &str) -> Result<String> {
    let parts = name
        .split('.')
        .map(|part| quote_ident(kind, part))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join("."))
}

/// Split `schema.table` into its schema and table parts.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, name),
    }
}
