// ABOUTME: Protocol engine task that exclusively owns the modem stream and correlates replies
// ABOUTME: Classifies each line as echo, response header/body, final status, body prompt or notification

//! The engine runs as one spawned task. It is the only reader and the only
//! writer of the stream; everything else talks to it through channels:
//!
//! ```text
//!                 requests (mpsc)            replies (mpsc, one exchange at a time)
//!  EngineHandle ───────────────────▶ engine ───────────────────────────────▶ Exchange
//!                                      │
//!                                      ├── notifications (unbounded mpsc) ──▶ application
//!                                      └── ready (oneshot) ─────────────────▶ initializer
//! ```
//!
//! Because the stream is half-duplex by convention, replies carry no
//! identifiers; the engine relies on there being at most one outstanding
//! exchange, enforced by the mutex around the reply receiver.

use crate::client::config::ModemConfig;
use crate::client::error::{ModemError, ModemResult};
use crate::connection::Connection;
use crate::datatypes::{AtCommand, Packet};
use crate::parser::{BODY_PROMPT, STATUS_ERROR, STATUS_OK, parse_packet};
use bytes::Bytes;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, MutexGuard, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, trace, warn};

/// Capacity of the request channel; writers wait when it is full
const REQUEST_BUFFER: usize = 16;

/// A request sent from an `EngineHandle` to the engine task.
pub(crate) enum Request {
    /// Write raw bytes (a command line or a message body)
    Transmit {
        data: Bytes,
        done: oneshot::Sender<io::Result<()>>,
    },
    /// Shut the stream down and stop the task
    Shutdown {
        done: oneshot::Sender<io::Result<()>>,
    },
}

/// What the engine does with one received line
#[derive(Debug, PartialEq)]
pub(crate) enum Dispatch {
    /// Consumed without producing anything (echo, body line, ignored notification)
    Nothing,
    /// Deliver to the waiting requester; `None` when the response did not parse
    Reply(Option<Packet>),
    /// Publish as an unsolicited notification
    Notify(Packet),
}

/// Line classification state.
///
/// Kept apart from the task so the rules can be exercised without a stream.
#[derive(Debug, Default)]
pub(crate) struct Correlator {
    /// Last transmitted line without its terminator, swallowed if echoed back
    echo: String,
    /// `+XXXX` of the last `AT+XXXX` command; lines starting with it open a
    /// response record
    expected_prefix: Option<String>,
    /// First line of the response record being accumulated
    header: Option<String>,
    body: Vec<String>,
}

impl Correlator {
    /// Update echo and prefix bookkeeping for data about to be written
    pub(crate) fn on_transmit(&mut self, data: &[u8]) {
        // a group still open here belongs to an exchange that timed out
        if let Some((header, body)) = self.take_record() {
            warn!("Dropping unterminated response {header:?} ({} body bytes)", body.len());
        }

        let text = String::from_utf8_lossy(data);
        if let Some(prefix) = command_prefix(&text) {
            self.expected_prefix = Some(prefix);
        }
        self.echo = text.trim_end_matches(['\r', '\n']).to_string();
    }

    pub(crate) fn on_line(&mut self, line: &str) -> Dispatch {
        if line == self.echo {
            return Dispatch::Nothing;
        }

        let opens_record = self
            .expected_prefix
            .as_deref()
            .is_some_and(|prefix| line.starts_with(prefix));
        if opens_record {
            // another record follows, so the previous one is not the last
            let previous = self.take_record();
            self.header = Some(line.to_string());
            return match previous {
                Some((header, body)) => Dispatch::Reply(parse_packet("", &header, &body)),
                None => Dispatch::Nothing,
            };
        }

        if line == STATUS_OK || line == STATUS_ERROR {
            let (header, body) = self.take_record().unwrap_or_default();
            return Dispatch::Reply(parse_packet(line, &header, &body));
        }

        if self.header.is_some() {
            self.body.push(line.to_string());
            return Dispatch::Nothing;
        }

        if line == BODY_PROMPT {
            return Dispatch::Reply(Some(Packet::BodyPrompt));
        }

        match parse_packet(STATUS_OK, line, "") {
            Some(packet) => Dispatch::Notify(packet),
            None => Dispatch::Nothing,
        }
    }

    fn take_record(&mut self) -> Option<(String, String)> {
        let header = self.header.take()?;
        let body = std::mem::take(&mut self.body).join("\n");
        Some((header, body))
    }
}

/// Extracts `+CMGR` from `AT+CMGR=1\r\n`
fn command_prefix(line: &str) -> Option<String> {
    let rest = line.strip_prefix("AT+")?;
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_uppercase())
        .collect();
    (!name.is_empty()).then(|| format!("+{name}"))
}

/// Everything produced by [`spawn`]
pub(crate) struct Engine {
    pub handle: EngineHandle,
    /// Fires once the stream has been quiet for the startup timeout
    pub ready: oneshot::Receiver<()>,
    pub notifications: mpsc::UnboundedReceiver<Packet>,
    pub task: JoinHandle<()>,
}

/// Start the engine task on `stream`.
pub(crate) fn spawn<T>(stream: T, config: &ModemConfig) -> Engine
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER);
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    let (notification_tx, notification_rx) = mpsc::unbounded_channel();
    let (ready_tx, ready_rx) = oneshot::channel();

    let task = tokio::spawn(run(
        Connection::new(stream),
        Channels {
            requests: request_rx,
            replies: reply_tx,
            notifications: notification_tx,
            ready: ready_tx,
        },
        config.startup_timeout,
        config.debug,
    ));

    Engine {
        handle: EngineHandle {
            requests: request_tx,
            replies: Mutex::new(reply_rx),
            read_timeout: config.read_timeout,
        },
        ready: ready_rx,
        notifications: notification_rx,
        task,
    }
}

struct Channels {
    requests: mpsc::Receiver<Request>,
    replies: mpsc::UnboundedSender<Option<Packet>>,
    notifications: mpsc::UnboundedSender<Packet>,
    ready: oneshot::Sender<()>,
}

fn log_wire(debug: bool, direction: &str, text: &str) {
    if debug {
        debug!("{direction} {text:?}");
    } else {
        trace!("{direction} {text:?}");
    }
}

/// The engine loop. Returns when the stream ends, a read or write fails,
/// shutdown is requested or every handle has been dropped. Dropping the
/// channel senders on return fails all pending and future exchanges.
async fn run<T>(
    mut connection: Connection<T>,
    channels: Channels,
    startup_timeout: Duration,
    debug: bool,
) where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let Channels {
        mut requests,
        replies,
        notifications,
        ready,
    } = channels;

    let mut correlator = Correlator::default();
    let mut ready = Some(ready);
    let startup = time::sleep(startup_timeout);
    tokio::pin!(startup);

    loop {
        tokio::select! {
            _ = &mut startup, if ready.is_some() => {
                if let Some(ready) = ready.take() {
                    debug!("No modem output for {startup_timeout:?}, ready for commands");
                    let _ = ready.send(());
                }
            }

            line = connection.read_line() => match line {
                Ok(Some(line)) => {
                    log_wire(debug, "<-", &line);
                    if ready.is_some() {
                        startup.as_mut().reset(Instant::now() + startup_timeout);
                    }
                    match correlator.on_line(&line) {
                        Dispatch::Nothing => {}
                        Dispatch::Reply(packet) => {
                            if replies.send(packet).is_err() {
                                debug!("Reply receiver gone, dropping reply");
                            }
                        }
                        Dispatch::Notify(packet) => {
                            trace!("Notification: {packet}");
                            if notifications.send(packet).is_err() {
                                trace!("No notification receiver, dropping notification");
                            }
                        }
                    }
                }
                Ok(None) => {
                    info!("Modem stream closed");
                    break;
                }
                Err(e) => {
                    error!("Modem read failed: {e}");
                    break;
                }
            },

            request = requests.recv() => match request {
                Some(Request::Transmit { data, done }) => {
                    correlator.on_transmit(&data);
                    log_wire(debug, "->", &String::from_utf8_lossy(&data));
                    match connection.write_all(&data).await {
                        Ok(()) => {
                            let _ = done.send(Ok(()));
                        }
                        Err(e) => {
                            error!("Modem write failed: {e}");
                            let _ = done.send(Err(e));
                            break;
                        }
                    }
                }
                Some(Request::Shutdown { done }) => {
                    debug!("Engine shutdown requested");
                    let _ = done.send(connection.shutdown().await);
                    break;
                }
                None => {
                    debug!("All engine handles dropped");
                    break;
                }
            },
        }
    }
}

/// Sending side of the engine, shared by the facade and the initializer.
#[derive(Debug)]
pub(crate) struct EngineHandle {
    requests: mpsc::Sender<Request>,
    replies: Mutex<mpsc::UnboundedReceiver<Option<Packet>>>,
    read_timeout: Duration,
}

impl EngineHandle {
    /// Have the engine write `data`, waiting until it has been flushed
    async fn transmit(&self, data: Bytes) -> ModemResult<()> {
        let (done, written) = oneshot::channel();
        self.requests
            .send(Request::Transmit { data, done })
            .await
            .map_err(|_| ModemError::ConnectionClosed)?;

        written
            .await
            .map_err(|_| ModemError::ConnectionClosed)?
            .map_err(ModemError::Connection)
    }

    /// Claim the reply path for one exchange.
    ///
    /// Waits while another exchange is in progress. Replies still queued from
    /// an earlier exchange that timed out are discarded.
    pub(crate) async fn begin(&self) -> Exchange<'_> {
        let mut replies = self.replies.lock().await;
        while let Ok(stale) = replies.try_recv() {
            warn!("Discarding late reply: {stale:?}");
        }
        Exchange {
            engine: self,
            replies,
        }
    }

    /// Send `command` and wait for its reply
    pub(crate) async fn exchange(&self, command: &AtCommand) -> ModemResult<Packet> {
        self.begin().await.send(command).await
    }

    /// Ask the engine to shut the stream down and stop
    pub(crate) async fn shutdown(&self) -> ModemResult<()> {
        let (done, finished) = oneshot::channel();
        self.requests
            .send(Request::Shutdown { done })
            .await
            .map_err(|_| ModemError::ConnectionClosed)?;

        finished
            .await
            .map_err(|_| ModemError::ConnectionClosed)?
            .map_err(ModemError::Connection)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }
}

/// Exclusive use of the reply path, held for one request/response exchange
/// (or a run of records, as for a message listing).
pub(crate) struct Exchange<'a> {
    engine: &'a EngineHandle,
    replies: MutexGuard<'a, mpsc::UnboundedReceiver<Option<Packet>>>,
}

impl Exchange<'_> {
    /// Write an AT command and wait for the first reply
    pub(crate) async fn send(&mut self, command: &AtCommand) -> ModemResult<Packet> {
        self.send_raw(Bytes::from(command.to_line()), &command.to_string())
            .await
    }

    /// Write raw bytes and wait for the first reply. `label` names the
    /// request in errors.
    pub(crate) async fn send_raw(&mut self, data: Bytes, label: &str) -> ModemResult<Packet> {
        self.engine.transmit(data).await?;
        self.receive(label).await
    }

    /// Wait for the next reply of the current exchange.
    ///
    /// `ERROR` becomes `Rejected`; an undecodable response becomes
    /// `MalformedResponse`.
    pub(crate) async fn receive(&mut self, label: &str) -> ModemResult<Packet> {
        match time::timeout(self.engine.read_timeout, self.replies.recv()).await {
            Err(_) => Err(ModemError::Timeout {
                command: label.to_string(),
            }),
            Ok(None) => Err(ModemError::ConnectionClosed),
            Ok(Some(None)) => Err(ModemError::MalformedResponse {
                command: label.to_string(),
            }),
            Ok(Some(Some(Packet::Error))) => Err(ModemError::Rejected {
                command: label.to_string(),
            }),
            Ok(Some(Some(packet))) => Ok(packet),
        }
    }
}
