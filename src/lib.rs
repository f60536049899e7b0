//! Asynchronous driver for GSM modems speaking the Hayes AT command set.
//!
//! Opens a modem over any tokio byte stream (a serial port with the `serial`
//! feature), brings it into a known state, and offers SMS operations: reading,
//! listing, deleting and sending text messages. Unsolicited reports such as
//! new message indications arrive on a separate channel.
//!
//! Layers, bottom up:
//!
//! * [`connection`] - line framing over the raw stream
//! * [`parser`] - response lines to typed [`Packet`]s
//! * `engine` - the task that owns the stream and correlates replies
//! * [`client`] - the [`Modem`] handle and its initialization handshake

pub mod client;
pub mod connection;
pub mod datatypes;
mod engine;
pub mod parser;

#[cfg(test)]
mod tests;

// Re-export the main client API for easy access
pub use client::{
    MessageSender, MessageStore, Modem, ModemConfig, ModemConnection, ModemError, ModemResult,
    ModemState,
};
pub use datatypes::{Arg, AtCommand, Message, MessageFilter, Packet};

/// A specialized `Result` type for modem operations.
///
/// # Examples
///
/// ## Sending a Message
///
/// ```rust,no_run
/// use gsmmodem::{Modem, ModemConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// #   let stream = tokio::io::duplex(64).0;
///     // Runs the reset / echo off / storage / text mode handshake
///     let modem = Modem::open(stream, ModemConfig::default()).await?;
///
///     modem.send_message("441234567890", "Hello, World!").await?;
///
///     modem.close().await?;
///     Ok(())
/// }
/// ```
///
/// ## Handling Errors
///
/// Per-command failures leave the modem usable; fatal ones do not:
///
/// ```rust,no_run
/// use gsmmodem::{Modem, ModemError};
///
/// # async fn example(modem: &Modem) -> gsmmodem::Result<()> {
/// match modem.get_message(3).await {
///     Ok(message) => println!("{}", message.body),
///     Err(ModemError::NotFound { index }) => println!("slot {index} is empty"),
///     Err(e) if e.is_fatal() => return Err(e),
///     Err(e) => println!("read failed, carrying on: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
pub type Result<T> = std::result::Result<T, ModemError>;
