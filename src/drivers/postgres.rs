use sqlx::Connection as _;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::{Connection, DriverKind, foreign_key_statement, runtime};
use crate::error::{BackupError, Result};
use crate::utils::ident::{quote_table, split_qualified};

pub struct PostgresConnection {
    conn: sqlx::PgConnection,
    runtime: Runtime,
}

impl PostgresConnection {
    pub fn open(url: &str) -> Result<Self> {
        let runtime = runtime()?;
        let conn = runtime
            .block_on(sqlx::PgConnection::connect(url))
            .map_err(|e| BackupError::database("connecting to PostgreSQL", e))?;
        info!("Connected to PostgreSQL");
        Ok(Self { conn, runtime })
    }
}

impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "pgsql"
    }

    fn server_version(&mut self) -> Result<String> {
        let conn = &mut self.conn;
        self.runtime
            .block_on(sqlx::query_scalar::<_, String>("SELECT current_setting('server_version')").fetch_one(conn))
            .map_err(|e| BackupError::database("reading PostgreSQL version", e))
    }

    fn table_exists(&mut self, table: &str) -> Result<bool> {
        let (schema, name) = split_qualified(table);
        let conn = &mut self.conn;
        let count = self
            .runtime
            .block_on(
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM information_schema.tables \
                     WHERE table_schema = COALESCE($1::text, current_schema()::text) \
                     AND table_name = $2 AND table_type = 'BASE TABLE'",
                )
                .bind(schema)
                .bind(name)
                .fetch_one(conn),
            )
            .map_err(|e| BackupError::database(format!("checking whether {} exists", table), e))?;
        Ok(count > 0)
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        debug!(sql, "postgres execute");
        let conn = &mut self.conn;
        self.runtime
            .block_on(sqlx::raw_sql(sql).execute(conn))
            .map_err(|e| BackupError::database("executing statement", e))?;
        Ok(())
    }

    fn set_foreign_key_checks(&mut self, enabled: bool) -> Result<()> {
        self.execute(foreign_key_statement(DriverKind::Postgres, enabled))
    }

    fn row_count(&mut self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_table(DriverKind::Postgres, table)?);
        let conn = &mut self.conn;
        let count = self
            .runtime
            .block_on(sqlx::query_scalar::<_, i64>(&sql).fetch_one(conn))
            .map_err(|e| BackupError::database(format!("counting rows of {}", table), e))?;
        Ok(count.max(0) as u64)
    }
}
