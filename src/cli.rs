use std::path::PathBuf;

use clap::Parser;

/// backup-tables: point-in-time copies of database tables
#[derive(Parser, Debug)]
#[command(
    name = "backup-tables",
    version,
    about = "Back up database tables (schema and data) into timestamped copies.",
    long_about = None
)]
pub struct Cli {
    /// Table names or entity names to back up (space-separated)
    #[arg(value_name = "TARGETS")]
    pub targets: Vec<String>,

    /// Database URL (sqlite://app.db, mysql://, mariadb://, postgres://, sqlserver://)
    #[arg(short = 'd', long = "database", env = "DATABASE_URL", hide_env_values = true)]
    pub database: Option<String>,

    /// Timestamp format for the backup suffix (chrono strftime)
    #[arg(short = 'f', long = "format", value_name = "FORMAT")]
    pub format: Option<String>,

    /// Config file (defaults to ./backup-tables.json when present)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log verbosity: error, warn, info, debug
    #[arg(long, default_value = "warn")]
    pub verbosity: String,

    /// Never ask interactive questions
    #[arg(long = "no-interaction", short = 'n')]
    pub no_interaction: bool,
}
