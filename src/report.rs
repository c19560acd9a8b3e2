use colored::*;
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets::UTF8_FULL};

use crate::backup::{BatchReport, Outcome, TargetOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Failure,
}

/// One line of user-facing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    fn new(level: Level, text: impl Into<String>) -> Self {
        Self { level, text: text.into() }
    }
}

/// Messages for a finished batch, in target order. Nothing is dropped when
/// some targets succeed and others do not.
pub fn messages(report: &BatchReport) -> Vec<Message> {
    if report.outcomes.is_empty() {
        return vec![Message::new(Level::Failure, "No tables specified to backup.")];
    }

    let mut lines = Vec::new();
    for outcome in &report.outcomes {
        lines.extend(messages_for(outcome));
    }
    lines
}

fn messages_for(outcome: &TargetOutcome) -> Vec<Message> {
    let source = &outcome.source_table;
    match &outcome.outcome {
        Outcome::Copied { backup_table, rows } => vec![
            Message::new(Level::Success, format!("Table '{}' completed backup successfully.", source)),
            Message::new(
                Level::Info,
                format!("Newly created table: {} ({} {})", backup_table, rows, if *rows == 1 { "row" } else { "rows" }),
            ),
        ],
        Outcome::Skipped { backup_table, reason } => vec![Message::new(
            Level::Warning,
            format!("Table '{}' {}. Skipping backup for '{}'.", backup_table, reason, source),
        )],
        Outcome::NotFound { table } => vec![Message::new(
            Level::Failure,
            format!("Table '{}' does not exist. Check the table name again.", table),
        )],
        Outcome::InvalidName { backup_table, reason } => vec![Message::new(
            Level::Failure,
            format!("Backup name '{}' is not usable ({}). Skipping backup for '{}'.", backup_table, reason, source),
        )],
    }
}

pub fn render(message: &Message) -> String {
    match message.level {
        Level::Success => format!("{} {}", "✔".green().bold(), message.text.green()),
        Level::Info => format!("{} {}", "i".cyan().bold(), message.text),
        Level::Warning => format!("{} {}", "!".yellow().bold(), message.text.yellow()),
        Level::Failure => format!("{} {}", "✖".red().bold(), message.text.red()),
    }
}

/// Summary table, one row per target.
pub fn summary_table(report: &BatchReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Target").add_attribute(Attribute::Bold),
            Cell::new("Table").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Backup").add_attribute(Attribute::Bold),
            Cell::new("Rows").add_attribute(Attribute::Bold),
        ]);

    for o in &report.outcomes {
        let (status, backup, rows) = match &o.outcome {
            Outcome::Copied { backup_table, rows } => ("copied", backup_table.as_str(), rows.to_string()),
            Outcome::Skipped { backup_table, .. } => ("skipped", backup_table.as_str(), String::new()),
            Outcome::NotFound { .. } => ("not found", "", String::new()),
            Outcome::InvalidName { backup_table, .. } => ("invalid name", backup_table.as_str(), String::new()),
        };
        table.add_row(vec![
            Cell::new(&o.target),
            Cell::new(&o.source_table),
            Cell::new(status),
            Cell::new(backup),
            Cell::new(rows),
        ]);
    }
    table
}

pub fn print_report(report: &BatchReport) {
    for message in messages(report) {
        match message.level {
            Level::Failure | Level::Warning => eprintln!("{}", render(&message)),
            Level::Success | Level::Info => println!("{}", render(&message)),
        }
    }
    if report.outcomes.len() > 1 {
        println!("{}", summary_table(report));
    }
}
