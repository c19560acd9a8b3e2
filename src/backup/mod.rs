//! Batch orchestration of table backups.
//!
//! One run resolves every target to a table, derives the backup name from a
//! timestamp captured once for the whole batch, skips targets whose backup
//! already exists or whose source is missing, and copies the rest with the
//! connection's [`CopyStrategy`] while foreign-key checks are off.

use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use tracing::{info, info_span, warn};

use crate::drivers::{Connection, DriverKind};
use crate::error::{BackupError, Result};
use crate::utils::ident::quote_table;

pub mod guard;
pub mod naming;
pub mod resolver;
pub mod strategy;

pub use guard::ForeignKeyGuard;
pub use naming::{DEFAULT_TIMESTAMP_FORMAT, RunTimestamp, backup_table_name, validate_format};
pub use resolver::{Entity, EntityRegistry, LiteralTables, TableResolver};
pub use strategy::CopyStrategy;

pub const ALREADY_EXISTS: &str = "already exists";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTask {
    pub source_table: String,
    pub backup_table: String,
}

impl BackupTask {
    pub fn new(source_table: impl Into<String>, backup_table: impl Into<String>) -> Self {
        Self {
            source_table: source_table.into(),
            backup_table: backup_table.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Copied { backup_table: String, rows: u64 },
    Skipped { backup_table: String, reason: String },
    NotFound { table: String },
    /// The backup name cannot exist on this engine (too long, for one).
    InvalidName { backup_table: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    pub target: String,
    pub source_table: String,
    pub outcome: Outcome,
}

impl TargetOutcome {
    pub fn is_copied(&self) -> bool {
        matches!(self.outcome, Outcome::Copied { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// `None` when the batch was empty and nothing was inspected.
    pub driver: Option<DriverKind>,
    pub timestamp: Option<String>,
    pub outcomes: Vec<TargetOutcome>,
}

impl BatchReport {
    /// A batch succeeds when at least one table was copied.
    pub fn succeeded(&self) -> bool {
        self.outcomes.iter().any(TargetOutcome::is_copied)
    }

    pub fn copied(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.outcomes.iter().filter(|o| o.is_copied())
    }

    pub fn backup_tables(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.outcome {
                Outcome::Copied { backup_table, .. } => Some(backup_table.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Runs backup batches against one connection.
pub struct BackupService<'a, C: Connection + ?Sized, R: TableResolver + ?Sized = LiteralTables> {
    conn: &'a mut C,
    resolver: &'a R,
    format: String,
}

impl<'a, C: Connection + ?Sized> BackupService<'a, C, LiteralTables> {
    pub fn new(conn: &'a mut C) -> Self {
        Self {
            conn,
            resolver: &LiteralTables,
            format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl<'a, C: Connection + ?Sized, R: TableResolver + ?Sized> BackupService<'a, C, R> {
    pub fn with_resolver<R2: TableResolver + ?Sized>(self, resolver: &'a R2) -> BackupService<'a, C, R2> {
        BackupService {
            conn: self.conn,
            resolver,
            format: self.format,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn run<S: AsRef<str>>(&mut self, targets: &[S]) -> Result<BatchReport> {
        self.run_at(targets, &Local::now())
    }

    /// Run a batch with an explicit clock reading for the shared timestamp.
    pub fn run_at<S, Tz>(&mut self, targets: &[S], now: &DateTime<Tz>) -> Result<BatchReport>
    where
        S: AsRef<str>,
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        if targets.is_empty() {
            warn!("No tables specified to backup");
            return Ok(BatchReport::default());
        }

        let timestamp = RunTimestamp::capture(now, &self.format)?;
        let strategy = CopyStrategy::detect(&mut *self.conn)?;
        info!(
            driver = %strategy.driver(),
            ?strategy,
            timestamp = timestamp.as_str(),
            "Backing up {} target(s)",
            targets.len()
        );

        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let target = target.as_ref();
            let outcome = self.backup_one(target, &timestamp, strategy)?;
            outcomes.push(outcome);
        }

        Ok(BatchReport {
            driver: Some(strategy.driver()),
            timestamp: Some(timestamp.as_str().to_string()),
            outcomes,
        })
    }

    fn backup_one(&mut self, target: &str, timestamp: &RunTimestamp, strategy: CopyStrategy) -> Result<TargetOutcome> {
        let source_table = self.resolver.resolve(target);
        let span = info_span!("backup", input = target, table = %source_table);
        let _enter = span.enter();

        if source_table.trim().is_empty() {
            warn!("Blank target skipped");
            return Ok(TargetOutcome {
                target: target.to_string(),
                outcome: Outcome::NotFound { table: source_table.clone() },
                source_table,
            });
        }

        let task = BackupTask::new(source_table.as_str(), timestamp.backup_name_for(&source_table));

        let outcome = if let Some(reason) = name_problem(strategy.driver(), &task.backup_table) {
            warn!("Backup name '{}' rejected: {}", task.backup_table, reason);
            Outcome::InvalidName {
                backup_table: task.backup_table.clone(),
                reason,
            }
        } else if self.conn.table_exists(&task.backup_table)? {
            warn!("Table '{}' already exists; skipping", task.backup_table);
            Outcome::Skipped {
                backup_table: task.backup_table.clone(),
                reason: ALREADY_EXISTS.to_string(),
            }
        } else if !self.conn.table_exists(&task.source_table)? {
            warn!("Table '{}' does not exist", task.source_table);
            Outcome::NotFound {
                table: task.source_table.clone(),
            }
        } else {
            let mut guard = ForeignKeyGuard::acquire(&mut *self.conn)?;
            strategy.copy_table(&mut *guard, &task)?;
            guard.release()?;

            let rows = self.conn.row_count(&task.backup_table)?;
            info!("Created '{}' with {} row(s)", task.backup_table, rows);
            Outcome::Copied {
                backup_table: task.backup_table.clone(),
                rows,
            }
        };

        Ok(TargetOutcome {
            target: target.to_string(),
            source_table: task.source_table,
            outcome,
        })
    }
}

/// Why `name` cannot be created on an engine of this kind, if it cannot.
fn name_problem(kind: DriverKind, name: &str) -> Option<String> {
    match quote_table(kind, name) {
        Ok(_) => None,
        Err(BackupError::Identifier(reason)) => Some(reason),
        Err(other) => Some(other.to_string()),
    }
}

/// Back up `targets` with the default timestamp format and no entity mapping.
pub fn backup_tables<C: Connection + ?Sized, S: AsRef<str>>(conn: &mut C, targets: &[S]) -> Result<BatchReport> {
    BackupService::new(conn).run(targets)
}
