//! Point-in-time backups of database tables.
//!
//! Each target (a table name or a registered entity name) is copied into a new
//! table named `<table>_backup_<timestamp>`, schema and rows, using SQL suited
//! to the connected engine. See [`backup::BackupService`].

pub mod backup;
pub mod config;
pub mod drivers;
pub mod error;
pub mod prompt;
pub mod report;
pub mod state;
pub mod utils;

pub use backup::{BackupService, BatchReport, Outcome, TargetOutcome, backup_tables};
pub use drivers::{Connection, DriverKind};
pub use error::{BackupError, Result};
