//! Modal confirm/alert dialogs.
//!
//! Dialogs block the session until answered, the same way browser
//! `confirm()`/`alert()` suspend every other interaction.

use std::io::{self, BufRead, Write};

use tracing::warn;

pub trait Prompt: Send + Sync {
    /// Ask a yes/no question. `false` means declined.
    fn confirm(&self, message: &str) -> bool;

    /// Show a message the user must acknowledge.
    fn alert(&self, message: &str);
}

/// Interactive prompt on the controlling terminal's stdin/stderr.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&self, message: &str) -> bool {
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "{message} [y/N] ");
        let _ = stderr.flush();

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => parse_answer(&answer),
            Err(e) => {
                warn!(error = %e, "confirm read failed; treating as declined");
                false
            }
        }
    }

    fn alert(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Non-interactive prompt: every confirm gets the same answer.
#[derive(Debug, Clone, Copy)]
pub struct AutoPrompt {
    pub answer: bool,
}

impl Prompt for AutoPrompt {
    fn confirm(&self, message: &str) -> bool {
        tracing::info!(answer = self.answer, "{message}");
        self.answer
    }

    fn alert(&self, message: &str) {
        warn!("{message}");
    }
}

fn parse_answer(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
