// ABOUTME: Modem capability traits using native async functions
// ABOUTME: Separates connection lifecycle, message storage and message sending interfaces

use crate::client::error::ModemResult;
use crate::datatypes::{Message, StorageAreas};

/// Connection lifecycle shared by every modem implementation
pub trait ModemConnection {
    /// Shut the connection down. The modem cannot be used afterwards.
    async fn close(self) -> ModemResult<()>
    where
        Self: Sized;

    /// Check if the protocol engine is still running
    fn is_connected(&self) -> bool;
}

/// Access to messages held in the modem's storage
///
/// Indices refer to slots in the storage area selected during
/// initialization.
pub trait MessageStore: ModemConnection {
    /// Read one stored message
    ///
    /// Fails with `NotFound` when the slot is empty.
    async fn get_message(&self, index: u32) -> ModemResult<Message>;

    /// List stored messages whose status matches `filter`
    async fn list_messages(&self, filter: &str) -> ModemResult<Vec<Message>>;

    async fn delete_message(&self, index: u32) -> ModemResult<()>;

    /// Storage areas usable for reading, writing and receiving
    async fn supported_storage_areas(&self) -> ModemResult<StorageAreas>;
}

/// Sending of text messages
pub trait MessageSender: ModemConnection {
    /// Send `body` to `telephone`, returning once the modem has accepted it
    async fn send_message(&self, telephone: &str, body: &str) -> ModemResult<()>;
}
