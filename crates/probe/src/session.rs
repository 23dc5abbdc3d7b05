//! A single probe run against a sync server.
//!
//! The server pushes its full document state as soon as a client connects.
//! The probe records that first message, then keeps listening for broadcast
//! updates until the line has been quiet for the idle timeout, the server
//! closes, or the caller's shutdown future resolves.

#[cfg(test)]
#[path = "tests/session.rs"]
mod tests;

use core::future::Future;
use core::time::Duration;

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::output::{Inspection, Output, ProbeEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on finishing a closing handshake the server started.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: Url,
        #[source]
        source: WsError,
    },

    #[error("connection closed before the initial state arrived")]
    ClosedBeforeInitialState,

    #[error("connection failed while receiving: {0}")]
    Receive(#[source] WsError),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EndReason {
    /// No message arrived within the idle timeout.
    IdleTimeout,
    /// The shutdown future resolved.
    Interrupted,
    /// `message` is the close frame's reason text, empty when none was given.
    ServerClosed { code: Option<u16>, message: String },
}

/// What a finished run observed.
#[derive(Clone, Debug, Serialize)]
pub struct ProbeReport {
    pub endpoint: Url,
    /// `None` when the run was interrupted before the server sent anything.
    pub initial_len: Option<usize>,
    pub updates: Vec<usize>,
    pub end: EndReason,
}

impl ProbeReport {
    #[must_use]
    pub fn update_bytes(&self) -> usize {
        self.updates.iter().sum()
    }
}

#[derive(Clone, Debug)]
pub struct ProbeSession {
    endpoint: Url,
    idle_timeout: Duration,
    inspect: bool,
}

enum Incoming {
    Payload(Vec<u8>),
    Closed(Option<CloseFrame<'static>>),
}

impl ProbeSession {
    #[must_use]
    pub const fn new(endpoint: Url, idle_timeout: Duration) -> Self {
        Self {
            endpoint,
            idle_timeout,
            inspect: false,
        }
    }

    #[must_use]
    pub const fn with_inspect(mut self, inspect: bool) -> Self {
        self.inspect = inspect;
        self
    }

    /// Runs the probe until the idle timeout elapses, the server closes the
    /// connection, or `shutdown` resolves. Every observation is written to
    /// `output` as it happens.
    pub async fn run<F>(&self, output: &Output, shutdown: F) -> Result<ProbeReport, ProbeError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut report = ProbeReport {
            endpoint: self.endpoint.clone(),
            initial_len: None,
            updates: Vec::new(),
            end: EndReason::Interrupted,
        };

        info!(endpoint = %self.endpoint, "Connecting");

        let connected = tokio::select! {
            () = &mut shutdown => None,
            result = connect_async(self.endpoint.as_str()) => Some(result),
        };

        let Some(connected) = connected else {
            output.write(&ProbeEvent::Stopped);
            return Ok(report);
        };

        let (mut stream, response) = connected.map_err(|source| ProbeError::Connect {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        debug!(status = %response.status(), "Handshake complete");
        output.write(&ProbeEvent::Connected {
            endpoint: &self.endpoint,
        });

        let initial = tokio::select! {
            () = &mut shutdown => None,
            next = next_payload(&mut stream) => Some(next?),
        };

        let initial = match initial {
            Some(Incoming::Payload(payload)) => payload,
            Some(Incoming::Closed(frame)) => {
                debug!(?frame, "Server closed before sending state");
                acknowledge_close(&mut stream).await;
                return Err(ProbeError::ClosedBeforeInitialState);
            }
            None => {
                output.write(&ProbeEvent::Stopped);
                close(&mut stream).await;
                return Ok(report);
            }
        };

        output.write(&ProbeEvent::InitialState {
            bytes: initial.len(),
            frame: self.inspection(&initial),
        });
        report.initial_len = Some(initial.len());

        output.write(&ProbeEvent::Waiting);

        report.end = loop {
            let next = tokio::select! {
                () = &mut shutdown => None,
                next = timeout(self.idle_timeout, next_payload(&mut stream)) => Some(next),
            };

            let Some(next) = next else {
                break EndReason::Interrupted;
            };

            let Ok(incoming) = next else {
                break EndReason::IdleTimeout;
            };

            match incoming? {
                Incoming::Payload(payload) => {
                    output.write(&ProbeEvent::Update {
                        bytes: payload.len(),
                        frame: self.inspection(&payload),
                    });
                    report.updates.push(payload.len());
                }
                Incoming::Closed(frame) => {
                    let (code, message) = frame.map_or((None, String::new()), |frame| {
                        (Some(u16::from(frame.code)), frame.reason.into_owned())
                    });
                    acknowledge_close(&mut stream).await;
                    break EndReason::ServerClosed { code, message };
                }
            }
        };

        match &report.end {
            EndReason::IdleTimeout => {
                output.write(&ProbeEvent::IdleTimeout {
                    timeout_ms: u64::try_from(self.idle_timeout.as_millis()).unwrap_or(u64::MAX),
                });
                close(&mut stream).await;
            }
            EndReason::Interrupted => {
                output.write(&ProbeEvent::Disconnecting);
                close(&mut stream).await;
            }
            EndReason::ServerClosed { code, message } => {
                output.write(&ProbeEvent::ServerClosed {
                    code: *code,
                    message,
                });
            }
        }

        info!(
            updates = report.updates.len(),
            bytes = report.update_bytes(),
            "Probe finished"
        );

        Ok(report)
    }

    fn inspection(&self, payload: &[u8]) -> Option<Inspection> {
        self.inspect.then(|| Inspection::of(payload))
    }
}

/// Waits for the next text or binary message. Control frames are answered by
/// tungstenite itself and skipped here, so they never count as traffic.
async fn next_payload<S>(stream: &mut S) -> Result<Incoming, ProbeError>
where
    S: Stream<Item = Result<WsMessage, WsError>> + Unpin,
{
    while let Some(message) = stream.next().await {
        match message.map_err(ProbeError::Receive)? {
            WsMessage::Text(text) => return Ok(Incoming::Payload(text.into_bytes())),
            WsMessage::Binary(data) => return Ok(Incoming::Payload(data)),
            WsMessage::Close(frame) => return Ok(Incoming::Closed(frame)),
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {
                trace!("Skipping control frame");
            }
        }
    }

    Ok(Incoming::Closed(None))
}

/// Completes a close the server started. tungstenite only queues its reply
/// when the Close frame is read; polling until the stream ends flushes it.
async fn acknowledge_close(stream: &mut WsStream) {
    let drained = timeout(CLOSE_GRACE, async {
        while let Some(message) = stream.next().await {
            if let Err(err) = message {
                debug!(%err, "Connection ended while acknowledging close");
                break;
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!("Server did not finish the closing handshake");
    }
}

async fn close(stream: &mut WsStream) {
    if let Err(err) = stream.close(None).await {
        warn!(%err, "Failed to close connection cleanly");
    }
}
