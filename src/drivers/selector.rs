use tracing::debug;

use super::{Connection, DriverKind, mssql::MssqlConnection, mysql::MySqlConnection, postgres::PostgresConnection, sqlite::SqliteConnection};
use crate::error::{BackupError, Result};

/// Work out which engine a connection URL (or bare SQLite file path) points at.
pub fn driver_for_url(url: &str) -> Result<DriverKind> {
    let lower = url.trim().to_ascii_lowercase();
    if lower.starts_with("sqlite:") {
        return Ok(DriverKind::Sqlite);
    }
    if let Some((scheme, _)) = lower.split_once("://") {
        return match scheme {
            "mysql" => Ok(DriverKind::MySql),
            "mariadb" => Ok(DriverKind::MariaDb),
            "postgres" | "postgresql" => Ok(DriverKind::Postgres),
            "sqlserver" | "mssql" => Ok(DriverKind::SqlServer),
            other => Err(BackupError::UnsupportedDriver(other.to_string())),
        };
    }
    if [".sqlite", ".sqlite3", ".db"].iter().any(|ext| lower.ends_with(ext)) {
        return Ok(DriverKind::Sqlite);
    }
    Err(BackupError::UnsupportedDriver(url.to_string()))
}

/// Open a connection for the given URL. Unknown schemes fail before any network I/O.
pub fn connect(url: &str) -> Result<Box<dyn Connection>> {
    let kind = driver_for_url(url)?;
    debug!("Opening {} connection", kind);

    let conn: Box<dyn Connection> = match kind {
        DriverKind::Sqlite => {
            let url = if url.starts_with("sqlite:") {
                url.to_string()
            } else {
                format!("sqlite://{}", url)
            };
            Box::new(SqliteConnection::open(&url)?)
        }
        DriverKind::MySql | DriverKind::MariaDb => Box::new(MySqlConnection::open(url)?),
        DriverKind::Postgres => Box::new(PostgresConnection::open(url)?),
        DriverKind::SqlServer => Box::new(MssqlConnection::open(url)?),
    };

    Ok(conn)
}
