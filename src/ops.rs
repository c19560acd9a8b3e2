use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use backup_tables::backup::{BackupService, BatchReport};
use backup_tables::config::{self, RunConfig};
use backup_tables::drivers::selector;
use backup_tables::prompt::{Terminal, ask_to_star};
use backup_tables::report;
use backup_tables::state::StateStore;

use crate::cli::Cli;

/// Back up every target on the command line. `Ok(false)` means nothing was copied.
pub fn do_backup(cli: &Cli) -> Result<bool> {
    if cli.targets.is_empty() {
        report::print_report(&BatchReport::default());
        return Ok(false);
    }

    let cwd = std::env::current_dir()?;
    let settings = config::load_settings(cli.config.as_deref(), &cwd)?;
    let run = RunConfig::resolve(settings, cli.database.clone(), cli.format.clone())?;

    let mut conn = selector::connect(&run.database_url)
        .with_context(|| format!("failed to open {}", redact(&run.database_url)))?;

    let bar = create_progress_bar("Backing up tables");
    let result = BackupService::new(&mut *conn)
        .with_resolver(&run.entities)
        .with_format(run.timestamp_format.as_str())
        .run(&cli.targets);
    bar.finish_and_clear();
    let batch = result?;

    report::print_report(&batch);
    if !batch.succeeded() {
        eprintln!("{} {}", "✖".red().bold(), "Failed to backup table.".red());
        return Ok(false);
    }

    let mut terminal = Terminal::new(cli.no_interaction);
    match StateStore::default_location() {
        Ok(mut state) => {
            if let Err(err) = ask_to_star(&mut state, &mut terminal) {
                debug!("Star prompt skipped: {}", err);
            }
        }
        Err(err) => debug!("No state directory: {}", err),
    }

    Ok(true)
}

pub fn setup_logging(verbosity: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "error" => "error",
        "info" => "info",
        "debug" => "debug",
        "trace" => "trace",
        _ => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn create_progress_bar(prefix: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
    );
    bar.set_message(prefix.to_string());
    bar.enable_steady_tick(std::time::Duration::from_millis(80));
    bar
}

/// Hide the password part of a connection URL.
fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("****"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
