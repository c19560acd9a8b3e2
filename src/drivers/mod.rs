use std::fmt;
use std::str::FromStr;

use tokio::runtime::Runtime;

use crate::error::{BackupError, Result};

pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod selector;
pub mod sqlite;

/// A single open database session the backup engine runs its statements on.
///
/// Implementations are blocking: every call is one round-trip to the server.
/// Foreign-key enforcement is session-scoped, so one value must never be
/// shared between concurrent backups.
pub trait Connection {
    /// Driver name as reported by the connection (`sqlite`, `mysql`, `pgsql`, ...).
    fn driver_name(&self) -> &str;

    fn server_version(&mut self) -> Result<String>;

    /// Whether a base table with this (optionally schema-qualified) name exists.
    fn table_exists(&mut self, table: &str) -> Result<bool>;

    fn execute(&mut self, sql: &str) -> Result<()>;

    fn set_foreign_key_checks(&mut self, enabled: bool) -> Result<()>;

    fn row_count(&mut self, table: &str) -> Result<u64>;

    /// Column metadata in ordinal order. Only engines with generated-column
    /// fallbacks need this.
    fn columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>> {
        Err(BackupError::introspection(
            table,
            format!("column introspection is not available for {}", self.driver_name()),
        ))
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn driver_name(&self) -> &str {
        (**self).driver_name()
    }

    fn server_version(&mut self) -> Result<String> {
        (**self).server_version()
    }

    fn table_exists(&mut self, table: &str) -> Result<bool> {
        (**self).table_exists(table)
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        (**self).execute(sql)
    }

    fn set_foreign_key_checks(&mut self, enabled: bool) -> Result<()> {
        (**self).set_foreign_key_checks(enabled)
    }

    fn row_count(&mut self, table: &str) -> Result<u64> {
        (**self).row_count(table)
    }

    fn columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>> {
        (**self).columns(table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    Sqlite,
    MySql,
    MariaDb,
    Postgres,
    SqlServer,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverKind::Sqlite => "sqlite",
            DriverKind::MySql => "mysql",
            DriverKind::MariaDb => "mariadb",
            DriverKind::Postgres => "postgres",
            DriverKind::SqlServer => "sqlserver",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriverKind {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DriverKind::Sqlite),
            "mysql" => Ok(DriverKind::MySql),
            "mariadb" => Ok(DriverKind::MariaDb),
            "pgsql" | "postgres" | "postgresql" => Ok(DriverKind::Postgres),
            "sqlsrv" | "sqlserver" | "mssql" => Ok(DriverKind::SqlServer),
            _ => Err(BackupError::UnsupportedDriver(s.to_string())),
        }
    }
}

/// Statement that toggles foreign-key enforcement for the current session.
pub fn foreign_key_statement(kind: DriverKind, enabled: bool) -> &'static str {
    match (kind, enabled) {
        (DriverKind::Sqlite, false) => "PRAGMA foreign_keys = OFF",
        (DriverKind::Sqlite, true) => "PRAGMA foreign_keys = ON",
        (DriverKind::MySql | DriverKind::MariaDb, false) => "SET FOREIGN_KEY_CHECKS = 0",
        (DriverKind::MySql | DriverKind::MariaDb, true) => "SET FOREIGN_KEY_CHECKS = 1",
        (DriverKind::Postgres, false) => "SET CONSTRAINTS ALL DEFERRED",
        (DriverKind::Postgres, true) => "SET CONSTRAINTS ALL IMMEDIATE",
        (DriverKind::SqlServer, false) => {
            "EXEC sp_MSforeachtable 'ALTER TABLE ? NOCHECK CONSTRAINT ALL'"
        }
        (DriverKind::SqlServer, true) => {
            "EXEC sp_MSforeachtable 'ALTER TABLE ? WITH CHECK CHECK CONSTRAINT ALL'"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parse the leading `major.minor.patch` out of a server banner such as
    /// `5.7.44-log`, `10.11.6-MariaDB` or `16.1 (Debian 16.1-1)`.
    pub fn parse(raw: &str) -> Option<Self> {
        let start = raw.find(|c: char| c.is_ascii_digit())?;
        let numeric: String = raw[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        Some(Self { major, minor, patch })
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Full column type, e.g. `varchar(255)` or `int(11) unsigned`.
    pub column_type: String,
    pub generated: Option<GeneratedColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedColumn {
    pub expression: String,
    pub stored: bool,
}

impl ColumnInfo {
    pub fn concrete(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            generated: None,
        }
    }

    /// Build from an `information_schema.COLUMNS` row. `DEFAULT_GENERATED`
    /// marks a column default, not a generated column.
    pub fn from_information_schema(name: String, column_type: String, extra: &str, expression: String) -> Self {
        let extra = extra.to_ascii_uppercase();
        let generated = if extra.contains("VIRTUAL GENERATED") {
            Some(GeneratedColumn { expression, stored: false })
        } else if extra.contains("STORED GENERATED") || extra.contains("PERSISTENT GENERATED") {
            Some(GeneratedColumn { expression, stored: true })
        } else {
            None
        };
        Self { name, column_type, generated }
    }
}

/// Single-threaded runtime driving one async client.
pub(crate) fn runtime() -> Result<Runtime> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    Ok(runtime)
}
