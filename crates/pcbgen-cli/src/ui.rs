use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

pub fn success() -> colored::ColoredString {
    "✓".green()
}

pub fn error() -> colored::ColoredString {
    "✗".red()
}

pub fn warning() -> colored::ColoredString {
    "!".yellow()
}

/// Indeterminate progress on stderr; hidden when stderr is not a terminal
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICK_CHARS),
        );
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn error(self, message: impl Into<String>) {
        self.bar
            .finish_with_message(format!("{} {}", error(), message.into()));
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}
