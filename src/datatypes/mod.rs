mod arg;
mod command;
pub mod gsm7;
mod packet;

pub use arg::Arg;
pub use command::{AtCommand, LINE_END, MessageFilter};
pub use packet::{Message, Packet, StorageAreas, StorageInfo};
