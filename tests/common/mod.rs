//! Shared fixtures: a scripted in-memory connection that records every call.

#![allow(dead_code)]

use std::collections::BTreeMap;

use backup_tables::drivers::{ColumnInfo, Connection};
use backup_tables::error::{BackupError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Version,
    Exists(String),
    Execute(String),
    ForeignKeys(bool),
    RowCount(String),
    Columns(String),
}

/// Pretends to be a database engine: knows which tables exist and how many
/// rows they hold, and understands just enough of the copy statements to
/// create backup tables.
pub struct FakeConnection {
    pub driver: String,
    pub version: String,
    pub tables: BTreeMap<String, u64>,
    pub columns: BTreeMap<String, Vec<ColumnInfo>>,
    pub calls: Vec<Call>,
    pub foreign_keys_enabled: bool,
    /// Any statement containing this text is rejected.
    pub fail_on: Option<String>,
}

impl FakeConnection {
    pub fn new(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            version: "8.0.36".to_string(),
            tables: BTreeMap::new(),
            columns: BTreeMap::new(),
            calls: Vec::new(),
            foreign_keys_enabled: true,
            fail_on: None,
        }
    }

    pub fn with_table(mut self, name: &str, rows: u64) -> Self {
        self.tables.insert(name.to_string(), rows);
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_columns(mut self, table: &str, columns: Vec<ColumnInfo>) -> Self {
        self.columns.insert(table.to_string(), columns);
        self
    }

    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.fail_on = Some(fragment.to_string());
        self
    }

    pub fn executed(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Execute(sql) => Some(sql.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn exists_checks(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::Exists(_))).count()
    }

    fn apply(&mut self, sql: &str) {
        let names = quoted_identifiers(sql);
        let (Some(first), Some(last)) = (names.first(), names.last()) else {
            return;
        };
        let source_rows = self.tables.get(last).copied().unwrap_or(0);

        if sql.starts_with("CREATE TABLE") {
            let rows = if sql.contains("WHERE 1 = 0") { 0 } else { source_rows };
            self.tables.insert(first.clone(), rows);
        } else if sql.starts_with("INSERT INTO") {
            *self.tables.entry(first.clone()).or_insert(0) += source_rows;
        } else if sql.starts_with("SELECT * INTO") {
            self.tables.insert(first.clone(), source_rows);
        }
    }
}

/// Identifiers wrapped in `"..."`, `` `...` `` or `[...]`, in order.
/// Dotted parts (`[dbo].[users]`) are joined back into one name.
fn quoted_identifiers(sql: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut chars = sql.chars().peekable();
    let mut joined = false;
    while let Some(c) = chars.next() {
        let close = match c {
            '"' => '"',
            '`' => '`',
            '[' => ']',
            _ => {
                joined = false;
                continue;
            }
        };
        let part: String = chars.by_ref().take_while(|ch| *ch != close).collect();
        match names.last_mut() {
            Some(previous) if joined => {
                previous.push('.');
                previous.push_str(&part);
            }
            _ => names.push(part),
        }
        joined = chars.peek() == Some(&'.');
        if joined {
            chars.next();
        }
    }
    names
}

impl Connection for FakeConnection {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    fn server_version(&mut self) -> Result<String> {
        self.calls.push(Call::Version);
        Ok(self.version.clone())
    }

    fn table_exists(&mut self, table: &str) -> Result<bool> {
        self.calls.push(Call::Exists(table.to_string()));
        Ok(self.tables.contains_key(table))
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        self.calls.push(Call::Execute(sql.to_string()));
        if let Some(fragment) = &self.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(BackupError::Config(format!("rejected statement: {}", sql)));
            }
        }
        self.apply(sql);
        Ok(())
    }

    fn set_foreign_key_checks(&mut self, enabled: bool) -> Result<()> {
        self.calls.push(Call::ForeignKeys(enabled));
        self.foreign_keys_enabled = enabled;
        Ok(())
    }

    fn row_count(&mut self, table: &str) -> Result<u64> {
        self.calls.push(Call::RowCount(table.to_string()));
        Ok(self.tables.get(table).copied().unwrap_or(0))
    }

    fn columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.calls.push(Call::Columns(table.to_string()));
        Ok(self.columns.get(table).cloned().unwrap_or_default())
    }
}
