// ABOUTME: Modem client module providing the high-level handle, configuration and capability traits
// ABOUTME: Exports the modem facade, its error types and the native async trait interfaces

//! GSM Modem Client
//!
//! [`Modem`] drives a GSM modem over any async byte stream (normally a USB
//! serial port):
//!
//! * **Initialization** - resets the modem, disables echo, selects message
//!   storage and text mode before handing the connection out
//! * **Storage** - read, list and delete stored messages
//! * **Sending** - text messages through the modem's body prompt
//! * **Notifications** - new message indications and network status are
//!   delivered on a separate channel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gsmmodem::client::{Modem, ModemConfig};
//! use gsmmodem::datatypes::MessageFilter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let stream = tokio::io::duplex(64).0;
//! let modem = Modem::open(stream, ModemConfig::default()).await?;
//!
//! for message in modem.list_messages(MessageFilter::All).await? {
//!     println!("{}: {}", message.telephone, message.body);
//!     modem.delete_message(message.index).await?;
//! }
//!
//! modem.send_message("441234567890", "Hello!").await?;
//! modem.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Notifications
//!
//! The modem reports events such as a newly received message without being
//! asked. Those arrive on an unbounded channel taken once with
//! [`Modem::take_notifications`]:
//!
//! ```rust,no_run
//! use gsmmodem::client::{Modem, ModemConfig};
//! use gsmmodem::datatypes::Packet;
//!
//! # async fn example(stream: tokio::io::DuplexStream) -> Result<(), Box<dyn std::error::Error>> {
//! let mut modem = Modem::open(stream, ModemConfig::default()).await?;
//! let mut notifications = modem.take_notifications().expect("taken once");
//!
//! while let Some(packet) = notifications.recv().await {
//!     if let Packet::MessageNotification { index, .. } = packet {
//!         let message = modem.get_message(index).await?;
//!         println!("{}: {}", message.telephone, message.body);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! * `ModemConnection` - Connection lifecycle (close, health)
//! * `MessageStore` - Stored message operations (extends ModemConnection)
//! * `MessageSender` - Message sending (extends ModemConnection)

pub mod config;
pub mod error;
mod init;
pub mod modem;
pub mod traits;

// Re-export the main types for easy access
pub use config::ModemConfig;
pub use error::{ModemError, ModemResult};
pub use modem::{Modem, ModemState};
pub use traits::{MessageSender, MessageStore, ModemConnection};
