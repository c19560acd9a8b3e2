use std::fmt::{Display, Write as _};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};

use crate::error::{BackupError, Result};

/// Sortable `year_month_day_hour_minute_second` suffix.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

const BACKUP_INFIX: &str = "_backup_";

/// Reject formats chrono cannot render, before any I/O happens.
pub fn validate_format(format: &str) -> Result<()> {
    if format.trim().is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(BackupError::InvalidTimestampFormat(format.to_string()));
    }
    Ok(())
}

/// Timestamp suffix shared by every table backed up in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTimestamp(String);

impl RunTimestamp {
    pub fn capture<Tz>(now: &DateTime<Tz>, format: &str) -> Result<Self>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        validate_format(format)?;
        let mut formatted = String::new();
        write!(formatted, "{}", now.format(format))
            .map_err(|_| BackupError::InvalidTimestampFormat(format.to_string()))?;
        Ok(Self(formatted))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn backup_name_for(&self, source_table: &str) -> String {
        backup_table_name(source_table, &self.0)
    }
}

/// `<source>_backup_<timestamp>` with `-` and `:` replaced by `_`.
///
/// A `.` in the timestamp becomes `_` too, so the suffix never adds a
/// qualifier: `app.users` backs up to `app.users_backup_...`.
pub fn backup_table_name(source_table: &str, timestamp: &str) -> String {
    format!("{}{}{}", source_table, BACKUP_INFIX, timestamp.replace('.', "_")).replace(['-', ':'], "_")
}
