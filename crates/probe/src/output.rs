#[cfg(test)]
#[path = "tests/output.rs"]
mod tests;

use core::fmt;

use clap::ValueEnum;
use color_eyre::owo_colors::OwoColorize;
use serde::Serialize;
use tracing::error;

mod probe;

pub use probe::{Inspection, ProbeEvent};

/// How report lines are written to stdout.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum Format {
    /// One JSON object per line.
    Json,
    /// Tagged, coloured text.
    #[default]
    PlainText,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Output {
    format: Format,
}

/// Plain-text rendering of something the client writes to stdout.
pub trait Report {
    fn report(&self);
}

impl Output {
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    pub fn write<T: Serialize + Report>(&self, value: &T) {
        match self.format {
            Format::Json => match serde_json::to_string(value) {
                Ok(json) => println!("{json}"),
                Err(err) => error!(%err, "Failed to serialize output line"),
            },
            Format::PlainText => value.report(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "{}", "[INFO]".green()),
            Self::Error => write!(f, "{}", "[ERROR]".red()),
        }
    }
}

/// A single human-readable message, prefixed by its level in plain text.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Line<'a> {
    pub level: Level,
    pub message: &'a str,
}

impl<'a> Line<'a> {
    pub const fn info(message: &'a str) -> Self {
        Self {
            level: Level::Info,
            message,
        }
    }

    pub const fn error(message: &'a str) -> Self {
        Self {
            level: Level::Error,
            message,
        }
    }
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level, self.message)
    }
}

impl Report for Line<'_> {
    fn report(&self) {
        println!("{self}");
    }
}
