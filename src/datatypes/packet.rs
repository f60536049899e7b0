// ABOUTME: Closed set of typed responses and notifications produced from modem output
// ABOUTME: Every downstream component matches on Packet instead of inspecting raw text

use crate::datatypes::Arg;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::fmt;

/// A decoded modem response or unsolicited notification.
///
/// Packets are built by [`crate::parser::parse_packet`] for one line (or one
/// header plus body group) and handed either to the single waiting requester
/// or to the notification receiver. The engine never keeps them.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    /// Terminal `OK` with no payload
    Ok,
    /// Terminal `ERROR` with no payload
    Error,
    /// A stored SMS, from `+CMGR` or one record of `+CMGL`
    Message(Message),
    /// `+CMTI`: a new message arrived in `storage` at slot `index`
    MessageNotification { storage: String, index: u32 },
    /// `+ZPASR`: radio service status (e.g. "No Service", "UMTS")
    ServiceStatus(String),
    /// `+ZDONR`: registered network name
    NetworkStatus(String),
    /// `+CSCA`: SMSC address arguments, kept opaque for the set round trip
    SmscAddress(Vec<Arg>),
    /// `+CPMS` query shape: supported storage identifiers per area
    StorageAreas(StorageAreas),
    /// `+CPMS` set shape: used/max counts per area
    StorageInfo(StorageInfo),
    /// The modem printed `> ` and waits for a raw message body
    BodyPrompt,
    /// Any response this crate does not special-case
    Unknown { command: String, args: Vec<Arg> },
}

impl Packet {
    /// Short variant name, used in error reports
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Ok => "OK",
            Packet::Error => "ERROR",
            Packet::Message(_) => "Message",
            Packet::MessageNotification { .. } => "MessageNotification",
            Packet::ServiceStatus(_) => "ServiceStatus",
            Packet::NetworkStatus(_) => "NetworkStatus",
            Packet::SmscAddress(_) => "SmscAddress",
            Packet::StorageAreas(_) => "StorageAreas",
            Packet::StorageInfo(_) => "StorageInfo",
            Packet::BodyPrompt => "BodyPrompt",
            Packet::Unknown { .. } => "Unknown",
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Unknown { command, args } => write!(f, "Unknown({command}, {args:?})"),
            other => f.write_str(other.kind()),
        }
    }
}

/// A text-mode SMS as reported by the modem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Storage slot; zero when the response does not carry one
    pub index: u32,
    /// Modem status string such as "REC UNREAD" or "STO SENT"
    pub status: String,
    /// Originating (or destination) telephone number
    pub telephone: String,
    /// Service centre timestamp in the modem's local wall-clock time
    pub timestamp: NaiveDateTime,
    pub body: String,
    /// True on the final record of a listing, or on a single-record reply
    pub is_last: bool,
}

impl Message {
    /// Interprets the modem-local timestamp in `tz` and converts it to UTC.
    ///
    /// Returns `None` when the local time is ambiguous or does not exist in
    /// `tz` (daylight saving transitions).
    ///
    /// ```rust
    /// use chrono::{FixedOffset, NaiveDate};
    /// use gsmmodem::datatypes::Message;
    ///
    /// let message = Message {
    ///     index: 1,
    ///     status: "REC READ".to_string(),
    ///     telephone: "+441234567890".to_string(),
    ///     timestamp: NaiveDate::from_ymd_opt(2014, 2, 1)
    ///         .and_then(|d| d.and_hms_opt(15, 7, 43))
    ///         .unwrap(),
    ///     body: "Hi".to_string(),
    ///     is_last: true,
    /// };
    /// let plus_one = FixedOffset::east_opt(3600).unwrap();
    /// let utc = message.timestamp_in(&plus_one).unwrap();
    /// assert_eq!(utc.to_rfc3339(), "2014-02-01T14:07:43+00:00");
    /// ```
    pub fn timestamp_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        tz.from_local_datetime(&self.timestamp)
            .single()
            .map(|local| local.with_timezone(&Utc))
    }
}

/// Storage identifiers the modem supports for each of its three areas.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageAreas {
    /// Areas usable for reading and deleting
    pub read: Vec<String>,
    /// Areas usable for writing and sending
    pub write: Vec<String>,
    /// Areas usable for newly received messages
    pub receive: Vec<String>,
}

/// Used and maximum message counts for the three selected storage areas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StorageInfo {
    pub used_read: u32,
    pub max_read: u32,
    pub used_write: u32,
    pub max_write: u32,
    pub used_receive: u32,
    pub max_receive: u32,
}
