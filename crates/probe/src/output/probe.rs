use core::fmt;

use comfy_table::{Cell, Color, Table};
use crdt_sync_protocol::FrameSummary;
use serde::Serialize;
use url::Url;

use crate::output::{Line, Report};
use crate::session::{EndReason, ProbeReport};

/// A received message decoded as a y-websocket frame, or why it could not be.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Inspection {
    Frame(FrameSummary),
    Undecodable { error: String },
}

impl Inspection {
    pub fn of(payload: &[u8]) -> Self {
        match FrameSummary::inspect(payload) {
            Ok(summary) => Self::Frame(summary),
            Err(err) => Self::Undecodable {
                error: err.to_string(),
            },
        }
    }
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(summary) => fmt::Display::fmt(summary, f),
            Self::Undecodable { error } => write!(f, "not a y-websocket frame: {error}"),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProbeEvent<'a> {
    Connected {
        endpoint: &'a Url,
    },
    InitialState {
        bytes: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        frame: Option<Inspection>,
    },
    Waiting,
    Update {
        bytes: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        frame: Option<Inspection>,
    },
    IdleTimeout {
        timeout_ms: u64,
    },
    Disconnecting,
    ServerClosed {
        code: Option<u16>,
        message: &'a str,
    },
    Stopped,
}

impl Report for ProbeEvent<'_> {
    fn report(&self) {
        let line = match self {
            Self::Connected { endpoint } => format!("Connected to {endpoint}"),
            Self::InitialState { bytes, frame } => annotate(
                format!("Received initial state: {bytes} bytes"),
                frame.as_ref(),
            ),
            Self::Waiting => "Staying connected... (press Ctrl+C to disconnect)".to_owned(),
            Self::Update { bytes, frame } => {
                annotate(format!("Received update: {bytes} bytes"), frame.as_ref())
            }
            Self::IdleTimeout { timeout_ms } => {
                format!("No message within {timeout_ms} ms, closing connection")
            }
            Self::Disconnecting => "Disconnecting...".to_owned(),
            Self::ServerClosed { code, message } => match code {
                Some(code) if message.is_empty() => format!("Server closed the connection ({code})"),
                Some(code) => format!("Server closed the connection ({code}: {message})"),
                None => "Server closed the connection".to_owned(),
            },
            Self::Stopped => "Stopped".to_owned(),
        };

        Line::info(&line).report();
    }
}

fn annotate(line: String, frame: Option<&Inspection>) -> String {
    match frame {
        Some(frame) => format!("{line} ({frame})"),
        None => line,
    }
}

impl Report for ProbeReport {
    fn report(&self) {
        let mut table = Table::new();
        let _ = table.set_header(vec![
            Cell::new("Endpoint").fg(Color::Blue),
            Cell::new("Initial state").fg(Color::Blue),
            Cell::new("Updates").fg(Color::Blue),
            Cell::new("Update bytes").fg(Color::Blue),
            Cell::new("Ended").fg(Color::Blue),
        ]);

        let initial = self
            .initial_len
            .map_or_else(|| "-".to_owned(), |len| format!("{len} bytes"));

        let _ = table.add_row(vec![
            Cell::new(&self.endpoint),
            Cell::new(initial),
            Cell::new(self.updates.len()),
            Cell::new(self.update_bytes()),
            Cell::new(&self.end),
        ]);

        println!("{table}");
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdleTimeout => f.write_str("idle timeout"),
            Self::Interrupted => f.write_str("interrupted"),
            Self::ServerClosed {
                code: Some(code), ..
            } => write!(f, "closed by server ({code})"),
            Self::ServerClosed { code: None, .. } => f.write_str("closed by server"),
        }
    }
}
