use sqlx::Connection as _;
use tokio::runtime::Runtime;
use tracing::debug;

use super::{Connection, DriverKind, foreign_key_statement, runtime};
use crate::error::{BackupError, Result};
use crate::utils::ident::{quote_ident, quote_table, split_qualified};

pub struct SqliteConnection {
    // declared before the runtime so it is dropped while the runtime is alive
    conn: sqlx::SqliteConnection,
    runtime: Runtime,
}

impl SqliteConnection {
    /// Open a database from a `sqlite:` URL, e.g. `sqlite://data/app.db` or `sqlite::memory:`.
    pub fn open(url: &str) -> Result<Self> {
        let runtime = runtime()?;
        let conn = runtime
            .block_on(sqlx::SqliteConnection::connect(url))
            .map_err(|e| BackupError::database("connecting to SQLite", e))?;
        debug!("Connected to SQLite database {}", url);
        Ok(Self { conn, runtime })
    }
}

impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    fn server_version(&mut self) -> Result<String> {
        let conn = &mut self.conn;
        self.runtime
            .block_on(sqlx::query_scalar::<_, String>("SELECT sqlite_version()").fetch_one(conn))
            .map_err(|e| BackupError::database("reading SQLite version", e))
    }

    fn table_exists(&mut self, table: &str) -> Result<bool> {
        let (schema, name) = split_qualified(table);
        let master = match schema {
            Some(schema) => format!("{}.sqlite_master", quote_ident(DriverKind::Sqlite, schema)?),
            None => "sqlite_master".to_string(),
        };
        let sql = format!("SELECT COUNT(*) FROM {} WHERE type = 'table' AND name = ?1", master);
        let conn = &mut self.conn;
        let count = self
            .runtime
            .block_on(sqlx::query_scalar::<_, i64>(&sql).bind(name).fetch_one(conn))
            .map_err(|e| BackupError::database(format!("checking whether {} exists", table), e))?;
        Ok(count > 0)
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        debug!(sql, "sqlite execute");
        let conn = &mut self.conn;
        self.runtime
            .block_on(sqlx::raw_sql(sql).execute(conn))
            .map_err(|e| BackupError::database("executing statement", e))?;
        Ok(())
    }

    fn set_foreign_key_checks(&mut self, enabled: bool) -> Result<()> {
        self.execute(foreign_key_statement(DriverKind::Sqlite, enabled))
    }

    fn row_count(&mut self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_table(DriverKind::Sqlite, table)?);
        let conn = &mut self.conn;
        let count = self
            .runtime
            .block_on(sqlx::query_scalar::<_, i64>(&sql).fetch_one(conn))
            .map_err(|e| BackupError::database(format!("counting rows of {}", table), e))?;
        Ok(count.max(0) as u64)
    }
}
