//! Per-engine "copy a table" SQL.
//!
//! A [`CopyStrategy`] is picked once per run from the connection's driver and,
//! for MySQL, its server version. Every strategy leaves the copy to the engine:
//! no rows travel through the client.

use tracing::{debug, warn};

use super::BackupTask;
use crate::drivers::{ColumnInfo, Connection, DriverKind, ServerVersion};
use crate::error::{BackupError, Result};
use crate::utils::ident::{quote_ident, quote_table};

/// First MySQL release whose `CREATE TABLE ... AS SELECT` is trusted with
/// virtual and stored generated columns.
pub const MYSQL_GENERATED_COLUMNS_VERSION: ServerVersion = ServerVersion::new(8, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStrategy {
    /// Empty structural clone, then a bulk insert.
    Sqlite,
    MySql,
    /// MySQL before 8.0: concrete columns are copied, generated columns are
    /// re-added afterwards. Generated columns end up after all concrete
    /// columns in the backup table.
    MySqlLegacy,
    MariaDb,
    Postgres,
    SqlServer,
}

impl CopyStrategy {
    /// Pick the strategy for a connection. Fails for drivers no strategy exists for.
    pub fn detect<C: Connection + ?Sized>(conn: &mut C) -> Result<Self> {
        let kind: DriverKind = conn.driver_name().parse()?;
        if kind != DriverKind::MySql {
            return Ok(Self::for_driver(kind));
        }

        let raw = conn.server_version()?;
        let version = ServerVersion::parse(&raw);
        if version.is_none() {
            warn!("Unrecognised MySQL version '{}'; using the generated-column safe copy", raw);
        }
        Ok(Self::for_mysql(version))
    }

    /// Strategy for a driver, assuming a current server version.
    pub fn for_driver(kind: DriverKind) -> Self {
        match kind {
            DriverKind::Sqlite => CopyStrategy::Sqlite,
            DriverKind::MySql => CopyStrategy::MySql,
            DriverKind::MariaDb => CopyStrategy::MariaDb,
            DriverKind::Postgres => CopyStrategy::Postgres,
            DriverKind::SqlServer => CopyStrategy::SqlServer,
        }
    }

    pub fn for_mysql(version: Option<ServerVersion>) -> Self {
        match version {
            Some(v) if v >= MYSQL_GENERATED_COLUMNS_VERSION => CopyStrategy::MySql,
            _ => CopyStrategy::MySqlLegacy,
        }
    }

    pub fn driver(&self) -> DriverKind {
        match self {
            CopyStrategy::Sqlite => DriverKind::Sqlite,
            CopyStrategy::MySql | CopyStrategy::MySqlLegacy => DriverKind::MySql,
            CopyStrategy::MariaDb => DriverKind::MariaDb,
            CopyStrategy::Postgres => DriverKind::Postgres,
            CopyStrategy::SqlServer => DriverKind::SqlServer,
        }
    }

    /// Statements that copy `task.source_table` into `task.backup_table`.
    /// [`CopyStrategy::MySqlLegacy`] needs column metadata; use [`legacy_mysql_statements`].
    pub fn statements(&self, task: &BackupTask) -> Result<Vec<String>> {
        let kind = self.driver();
        let source = quote_table(kind, &task.source_table)?;
        let backup = quote_table(kind, &task.backup_table)?;

        let statements = match self {
            CopyStrategy::Sqlite => vec![
                format!("CREATE TABLE {} AS SELECT * FROM {} WHERE 1 = 0", backup, source),
                format!("INSERT INTO {} SELECT * FROM {}", backup, source),
            ],
            CopyStrategy::MySql | CopyStrategy::MariaDb | CopyStrategy::Postgres => {
                vec![format!("CREATE TABLE {} AS SELECT * FROM {}", backup, source)]
            }
            CopyStrategy::SqlServer => vec![format!("SELECT * INTO {} FROM {}", backup, source)],
            CopyStrategy::MySqlLegacy => {
                return Err(BackupError::introspection(
                    &task.source_table,
                    "legacy MySQL copies are planned from column metadata",
                ));
            }
        };
        Ok(statements)
    }

    pub fn copy_table<C: Connection + ?Sized>(&self, conn: &mut C, task: &BackupTask) -> Result<()> {
        let statements = match self {
            CopyStrategy::MySqlLegacy => {
                let columns = conn.columns(&task.source_table)?;
                legacy_mysql_statements(task, &columns)?
            }
            _ => self.statements(task)?,
        };

        for sql in &statements {
            debug!(strategy = ?self, "{}", sql);
            conn.execute(sql)?;
        }
        Ok(())
    }
}

/// Copy the concrete columns, then re-add generated columns with their
/// original expressions so the engine recomputes them.
pub fn legacy_mysql_statements(task: &BackupTask, columns: &[ColumnInfo]) -> Result<Vec<String>> {
    let kind = DriverKind::MySql;
    let (generated, concrete): (Vec<&ColumnInfo>, Vec<&ColumnInfo>) =
        columns.iter().partition(|c| c.generated.is_some());

    if concrete.is_empty() {
        return Err(BackupError::introspection(&task.source_table, "no concrete columns found"));
    }

    let source = quote_table(kind, &task.source_table)?;
    let backup = quote_table(kind, &task.backup_table)?;
    let select_list = concrete
        .iter()
        .map(|c| quote_ident(kind, &c.name))
        .collect::<Result<Vec<_>>>()?
        .join(", ");

    let mut statements = vec![format!(
        "CREATE TABLE {} AS SELECT {} FROM {}",
        backup, select_list, source
    )];

    let additions = generated
        .iter()
        .filter_map(|c| c.generated.as_ref().map(|g| (c, g)))
        .map(|(column, generated)| {
            Ok(format!(
                "ADD COLUMN {} {} GENERATED ALWAYS AS ({}) {}",
                quote_ident(kind, &column.name)?,
                column.column_type,
                generated.expression,
                if generated.stored { "STORED" } else { "VIRTUAL" }
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    if !additions.is_empty() {
        statements.push(format!("ALTER TABLE {} {}", backup, additions.join(", ")));
    }

    Ok(statements)
}
