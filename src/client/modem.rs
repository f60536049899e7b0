// ABOUTME: High-level modem handle exposing SMS storage and sending operations over the engine
// ABOUTME: Opens a stream, runs the initialization handshake and hands out unsolicited notifications

use crate::client::config::ModemConfig;
use crate::client::error::{ModemError, ModemResult};
use crate::client::init;
use crate::client::traits::{MessageSender, MessageStore, ModemConnection};
use crate::datatypes::gsm7::{self, END_OF_BODY};
use crate::datatypes::{AtCommand, Message, Packet, StorageAreas};
use crate::engine::{self, EngineHandle};
use bytes::Bytes;
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Lifecycle of a modem connection
///
/// `Modem::open` only returns a handshaken modem, so [`Modem::state`] reports
/// `Ready` or `Closed`. `Uninitialized` and `Initializing` name the phases
/// inside `open` and only appear in its log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemState {
    /// Stream opened, modem not yet quiet (logged by `open`)
    Uninitialized,
    /// Handshake in progress (logged by `open`)
    Initializing,
    /// Accepting commands
    Ready,
    /// Engine stopped; the connection cannot be reused
    Closed,
}

impl fmt::Display for ModemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModemState::Uninitialized => "uninitialized",
            ModemState::Initializing => "initializing",
            ModemState::Ready => "ready",
            ModemState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// An initialized GSM modem.
///
/// All operations take `&self`; concurrent callers are served one exchange
/// at a time in the order they acquire the reply path.
///
/// ```rust,no_run
/// use gsmmodem::client::{Modem, ModemConfig};
///
/// # async fn example(stream: tokio::io::DuplexStream) -> Result<(), Box<dyn std::error::Error>> {
/// let mut modem = Modem::open(stream, ModemConfig::default()).await?;
/// let mut notifications = modem.take_notifications().expect("first call");
///
/// modem.send_message("441234567890", "Hello").await?;
/// while let Some(packet) = notifications.recv().await {
///     println!("{packet:?}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Modem {
    engine: EngineHandle,
    notifications: Option<mpsc::UnboundedReceiver<Packet>>,
    task: JoinHandle<()>,
}

impl Modem {
    /// Start the engine on `stream` and run the initialization handshake.
    ///
    /// On failure the engine is shut down before the error is returned.
    pub async fn open<T>(stream: T, config: ModemConfig) -> ModemResult<Modem>
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let engine::Engine {
            handle,
            ready,
            notifications,
            task,
        } = engine::spawn(stream, &config);
        debug!("Modem {}", ModemState::Uninitialized);

        let modem = Modem {
            engine: handle,
            notifications: Some(notifications),
            task,
        };

        debug!("Modem {}", ModemState::Initializing);
        if let Err(e) = init::initialize(&modem.engine, ready, &config.storage).await {
            if let Err(close_err) = modem.close().await {
                debug!("Shutdown after failed initialization: {close_err}");
            }
            return Err(e);
        }

        info!("Modem {}", ModemState::Ready);
        Ok(modem)
    }

    /// Open a serial device (e.g. `/dev/ttyUSB0`) at `config.baud_rate`.
    #[cfg(feature = "serial")]
    pub async fn open_serial(device: &str, config: ModemConfig) -> ModemResult<Modem> {
        use tokio_serial::SerialPortBuilderExt;

        let port = tokio_serial::new(device, config.baud_rate)
            .open_native_async()
            .map_err(|e| ModemError::Connection(e.into()))?;
        info!("Opened {device} at {} baud", config.baud_rate);

        Modem::open(port, config).await
    }

    /// Take the receiver of unsolicited notifications (new message
    /// indications, network status). Returns `None` after the first call.
    ///
    /// The channel is unbounded; a receiver that is taken but never drained
    /// grows without limit.
    pub fn take_notifications(&mut self) -> Option<mpsc::UnboundedReceiver<Packet>> {
        self.notifications.take()
    }

    /// `Ready` while the engine runs, `Closed` once it has stopped
    pub fn state(&self) -> ModemState {
        if self.engine.is_closed() {
            ModemState::Closed
        } else {
            ModemState::Ready
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ModemState::Ready
    }

    /// Shut the stream down and wait for the engine task to finish.
    pub async fn close(self) -> ModemResult<()> {
        let result = match self.engine.shutdown().await {
            // already stopped
            Err(ModemError::ConnectionClosed) => Ok(()),
            other => other,
        };

        if let Err(e) = self.task.await {
            debug!("Engine task ended abnormally: {e}");
        }
        info!("Modem {}", ModemState::Closed);
        result
    }

    /// Read the message stored at `index`.
    pub async fn get_message(&self, index: u32) -> ModemResult<Message> {
        match self.engine.exchange(&AtCommand::set("+CMGR", [index])).await? {
            Packet::Message(mut message) => {
                message.index = index;
                Ok(message)
            }
            Packet::Ok => Err(ModemError::NotFound { index }),
            other => Err(unexpected("Message", other)),
        }
    }

    /// List stored messages matching `filter` (a [`MessageFilter`] or a raw
    /// status string such as `"REC UNREAD"`).
    ///
    /// [`MessageFilter`]: crate::datatypes::MessageFilter
    pub async fn list_messages(&self, filter: impl AsRef<str>) -> ModemResult<Vec<Message>> {
        let command = AtCommand::set("+CMGL", [filter.as_ref()]);
        let label = command.to_string();

        let mut exchange = self.engine.begin().await;
        let mut packet = exchange.send(&command).await?;
        let mut messages = Vec::new();

        loop {
            match packet {
                Packet::Ok if messages.is_empty() => return Ok(messages),
                Packet::Message(message) => {
                    let is_last = message.is_last;
                    messages.push(message);
                    if is_last {
                        return Ok(messages);
                    }
                }
                other => return Err(unexpected("Message", other)),
            }
            packet = exchange.receive(&label).await?;
        }
    }

    /// Delete the message stored at `index`.
    pub async fn delete_message(&self, index: u32) -> ModemResult<()> {
        self.engine
            .exchange(&AtCommand::set("+CMGD", [index]))
            .await
            .map(|_| ())
    }

    /// Send a text message.
    ///
    /// Characters outside the GSM default alphabet are sent as `?`.
    pub async fn send_message(&self, telephone: &str, body: &str) -> ModemResult<()> {
        if telephone.contains(['"', '\r', '\n']) {
            return Err(ModemError::InvalidData(format!(
                "telephone number {telephone:?} cannot be quoted"
            )));
        }

        let mut exchange = self.engine.begin().await;
        match exchange.send(&AtCommand::set("+CMGS", [telephone])).await? {
            Packet::BodyPrompt => {}
            other => return Err(unexpected("BodyPrompt", other)),
        }

        let mut data = gsm7::encode(body);
        data.push(END_OF_BODY);
        exchange
            .send_raw(Bytes::from(data), "message body")
            .await
            .map(|_| ())
    }

    /// The storage areas the modem supports for reading, writing and receiving.
    pub async fn supported_storage_areas(&self) -> ModemResult<StorageAreas> {
        match self.engine.exchange(&AtCommand::test("+CPMS")).await? {
            Packet::StorageAreas(areas) => Ok(areas),
            other => Err(unexpected("StorageAreas", other)),
        }
    }
}

fn unexpected(expected: &'static str, actual: Packet) -> ModemError {
    ModemError::UnexpectedPacket {
        expected,
        actual: actual.to_string(),
    }
}

impl ModemConnection for Modem {
    async fn close(self) -> ModemResult<()> {
        Modem::close(self).await
    }

    fn is_connected(&self) -> bool {
        Modem::is_connected(self)
    }
}

impl MessageStore for Modem {
    async fn get_message(&self, index: u32) -> ModemResult<Message> {
        Modem::get_message(self, index).await
    }

    async fn list_messages(&self, filter: &str) -> ModemResult<Vec<Message>> {
        Modem::list_messages(self, filter).await
    }

    async fn delete_message(&self, index: u32) -> ModemResult<()> {
        Modem::delete_message(self, index).await
    }

    async fn supported_storage_areas(&self) -> ModemResult<StorageAreas> {
        Modem::supported_storage_areas(self).await
    }
}

impl MessageSender for Modem {
    async fn send_message(&self, telephone: &str, body: &str) -> ModemResult<()> {
        Modem::send_message(self, telephone, body).await
    }
}
