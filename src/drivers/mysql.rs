use sqlx::Connection as _;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::{ColumnInfo, Connection, DriverKind, foreign_key_statement, runtime};
use crate::error::{BackupError, Result};
use crate::utils::ident::{quote_table, split_qualified};

/// MySQL or MariaDB session. Which of the two is decided from the URL scheme
/// (`mariadb://`) or the server banner.
pub struct MySqlConnection {
    conn: sqlx::MySqlConnection,
    runtime: Runtime,
    kind: DriverKind,
    version: String,
}

impl MySqlConnection {
    pub fn open(url: &str) -> Result<Self> {
        let (url, mariadb_scheme) = match url.strip_prefix("mariadb://") {
            Some(rest) => (format!("mysql://{}", rest), true),
            None => (url.to_string(), false),
        };

        let runtime = runtime()?;
        let mut conn = runtime
            .block_on(sqlx::MySqlConnection::connect(&url))
            .map_err(|e| BackupError::database("connecting to MySQL", e))?;
        let version = runtime
            .block_on(sqlx::query_scalar::<_, String>("SELECT VERSION()").fetch_one(&mut conn))
            .map_err(|e| BackupError::database("reading MySQL version", e))?;

        let kind = if mariadb_scheme || version.to_ascii_lowercase().contains("mariadb") {
            DriverKind::MariaDb
        } else {
            DriverKind::MySql
        };
        info!("Connected to {} server {}", kind, version);

        Ok(Self {
            conn,
            runtime,
            kind,
            version,
        })
    }
}

impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        self.kind.as_str()
    }

    fn server_version(&mut self) -> Result<String> {
        Ok(self.version.clone())
    }

    fn table_exists(&mut self, table: &str) -> Result<bool> {
        let (schema, name) = split_qualified(table);
        let conn = &mut self.conn;
        let count = self
            .runtime
            .block_on(
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM information_schema.TABLES \
                     WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ? AND TABLE_TYPE = 'BASE TABLE'",
                )
                .bind(schema)
                .bind(name)
                .fetch_one(conn),
            )
            .map_err(|e| BackupError::database(format!("checking whether {} exists", table), e))?;
        Ok(count > 0)
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        debug!(sql, "mysql execute");
        let conn = &mut self.conn;
        self.runtime
            .block_on(sqlx::raw_sql(sql).execute(conn))
            .map_err(|e| BackupError::database("executing statement", e))?;
        Ok(())
    }

    fn set_foreign_key_checks(&mut self, enabled: bool) -> Result<()> {
        self.execute(foreign_key_statement(self.kind, enabled))
    }

    fn row_count(&mut self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_table(self.kind, table)?);
        let conn = &mut self.conn;
        let count = self
            .runtime
            .block_on(sqlx::query_scalar::<_, i64>(&sql).fetch_one(conn))
            .map_err(|e| BackupError::database(format!("counting rows of {}", table), e))?;
        Ok(count.max(0) as u64)
    }

    fn columns(&mut self, table: &str) -> Result<Vec<ColumnInfo>> {
        // CAST to CHAR: COLUMN_TYPE and GENERATION_EXPRESSION are LONGTEXT/BLOB depending on version
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)),
                CAST(COLUMN_TYPE AS CHAR(1024)),
                CAST(EXTRA AS CHAR(255)),
                CAST(COALESCE(GENERATION_EXPRESSION, '') AS CHAR(8192))
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let (schema, name) = split_qualified(table);
        let conn = &mut self.conn;
        let rows: Vec<(String, String, String, String)> = self
            .runtime
            .block_on(
                sqlx::query_as(query)
                    .bind(schema)
                    .bind(name)
                    .fetch_all(conn),
            )
            .map_err(|e| BackupError::database(format!("loading columns of {}", table), e))?;

        Ok(rows
            .into_iter()
            .map(|(name, column_type, extra, expression)| {
                ColumnInfo::from_information_schema(name, column_type, &extra, expression)
            })
            .collect())
    }
}
