mod cli;
mod ops;

use anyhow::Result;
use clap::Parser;

use cli::Cli;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("Error backing up table: {:#}", err);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();
    ops::setup_logging(&cli.verbosity);
    ops::do_backup(&cli)
}
