#[cfg(test)]
#[path = "tests/cli.rs"]
mod tests;

use core::time::Duration;
use std::process::ExitCode;

use clap::Parser;
use const_format::concatcp;
use eyre::Report as EyreReport;
use serde::{Serialize, Serializer};
use thiserror::Error as ThisError;
use tracing::warn;
use url::Url;

use crate::defaults;
use crate::output::{Format, Line, Output, Report};
use crate::session::{ProbeError, ProbeSession};

pub const EXAMPLES: &str = r"
  # Probe the local sync server
  $ crdt-probe

  # Probe another server and decode every frame it sends
  $ crdt-probe ws://10.0.0.5:9000 --inspect

  # Wait up to five seconds between updates, one JSON object per line
  $ crdt-probe --idle-timeout-ms 5000 --output-format json
";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(after_help = concatcp!(
    "Environment variables:\n",
    "  CRDT_PROBE_URL                Server endpoint\n",
    "  CRDT_PROBE_IDLE_TIMEOUT_MS    Idle timeout in milliseconds\n",
    "  RUST_LOG                      Diagnostic log filter (written to stderr)\n\n",
    "Examples:",
    EXAMPLES
))]
pub struct RootCommand {
    #[command(flatten)]
    pub args: RootArgs,
}

#[derive(Debug, Parser)]
pub struct RootArgs {
    /// WebSocket endpoint of the sync server
    #[arg(value_name = "URL", default_value = defaults::DEFAULT_ENDPOINT)]
    #[arg(env = "CRDT_PROBE_URL", value_parser = parse_endpoint)]
    pub url: Url,

    /// How long to wait for each update before disconnecting
    #[arg(long, value_name = "MILLIS", default_value_t = defaults::DEFAULT_IDLE_TIMEOUT_MS)]
    #[arg(env = "CRDT_PROBE_IDLE_TIMEOUT_MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub idle_timeout_ms: u64,

    /// Decode each message as a y-websocket frame and report its type
    #[arg(long)]
    pub inspect: bool,

    #[arg(long, value_name = "FORMAT", default_value_t, value_enum)]
    pub output_format: Format,
}

impl RootCommand {
    pub async fn run(self, output: &Output) -> Result<(), CliError> {
        let session = ProbeSession::new(
            self.args.url,
            Duration::from_millis(self.args.idle_timeout_ms),
        )
        .with_inspect(self.args.inspect);

        match session.run(output, interrupted()).await {
            Ok(report) => {
                output.write(&report);
                Ok(())
            }
            Err(err) => {
                let err = CliError::Probe(err);
                output.write(&err);
                Err(err)
            }
        }
    }
}

fn parse_endpoint(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|err| err.to_string())?;

    if url.scheme() != "ws" {
        return Err(format!(
            "unsupported scheme `{}`, expected `ws`",
            url.scheme()
        ));
    }

    if url.host_str().is_none() {
        return Err("missing host".to_owned());
    }

    Ok(url)
}

async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "Unable to listen for Ctrl+C, relying on the idle timeout");
        core::future::pending::<()>().await;
    }
}

#[derive(Debug, Serialize, ThisError)]
pub enum CliError {
    #[error(transparent)]
    Probe(
        #[from]
        #[serde(serialize_with = "serialize_probe_error")]
        ProbeError,
    ),

    #[error(transparent)]
    Setup(
        #[from]
        #[serde(serialize_with = "serialize_eyre_report")]
        EyreReport,
    ),
}

impl From<CliError> for ExitCode {
    fn from(error: CliError) -> Self {
        match error {
            CliError::Probe(ProbeError::Connect { .. }) => Self::from(101),
            CliError::Probe(_) | CliError::Setup(_) => Self::FAILURE,
        }
    }
}

impl Report for CliError {
    fn report(&self) {
        Line::error(&format!("Error: {self}")).report();
    }
}

fn serialize_probe_error<S>(error: &ProbeError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&error.to_string())
}

fn serialize_eyre_report<S>(report: &EyreReport, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(report.chain().map(|e| e.to_string()))
}
