use std::io::{self, IsTerminal, Write};
use std::process::Command;

use chrono::Local;
use colored::*;
use tracing::debug;

use crate::error::Result;
use crate::state::StateStore;

pub const REPOSITORY_URL: &str = env!("CARGO_PKG_REPOSITORY");
pub const STAR_QUESTION: &str = "🌟 Help other developers find this package by starring it on GitHub?";

/// Console side of the prompt, replaceable in tests.
pub trait Interaction {
    fn is_interactive(&self) -> bool;
    fn confirm(&mut self, question: &str) -> Result<bool>;
    fn open_url(&mut self, url: &str) -> Result<()>;
    fn info(&mut self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarPrompt {
    NotInteractive,
    AlreadyPrompted,
    Declined,
    Accepted,
}

/// Ask once per user to star the repository. The answer is not stored, only
/// the fact that the question was asked.
pub fn ask_to_star(state: &mut StateStore, io: &mut dyn Interaction) -> Result<StarPrompt> {
    if !io.is_interactive() || REPOSITORY_URL.is_empty() {
        return Ok(StarPrompt::NotInteractive);
    }
    if state.get().star_prompted {
        return Ok(StarPrompt::AlreadyPrompted);
    }

    let wants_to_star = io.confirm(STAR_QUESTION)?;
    if wants_to_star {
        if let Err(err) = io.open_url(REPOSITORY_URL) {
            debug!("Could not open browser: {}", err);
        }
        io.info("Thank you!");
    }

    state.update(|s| {
        s.star_prompted = true;
        s.prompted_at = Some(Local::now());
    })?;

    Ok(if wants_to_star { StarPrompt::Accepted } else { StarPrompt::Declined })
}

/// Real terminal: stdin/stdout and the platform URL opener.
pub struct Terminal {
    interactive: bool,
}

impl Terminal {
    pub fn new(no_interaction: bool) -> Self {
        Self {
            interactive: !no_interaction && io::stdin().is_terminal(),
        }
    }
}

impl Interaction for Terminal {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        print!("{} {} ", "?".cyan().bold(), format!("{} [y/N]", question).cyan());
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let ans = input.trim().to_lowercase();
        Ok(ans == "y" || ans == "yes")
    }

    fn open_url(&mut self, url: &str) -> Result<()> {
        let mut command = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        } else {
            Command::new("xdg-open")
        };
        command.arg(url).spawn()?;
        Ok(())
    }

    fn info(&mut self, message: &str) {
        println!("{}", message.green());
    }
}
