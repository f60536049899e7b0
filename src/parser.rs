// ABOUTME: Maps AT response lines (header plus optional body) onto typed Packet variants
// ABOUTME: Handles quoted argument tokenization and the per-command decoding rules

use crate::datatypes::{Arg, Message, Packet, StorageAreas, StorageInfo};
use chrono::NaiveDateTime;
use tracing::{debug, warn};

/// The modem's body prompt, emitted without a line terminator
pub const BODY_PROMPT: &str = "> ";

/// Final result code for a successful command
pub const STATUS_OK: &str = "OK";

/// Final result code for a rejected command
pub const STATUS_ERROR: &str = "ERROR";

/// Layout of the leading part of a modem timestamp, e.g. `14/02/01,15:07:43`
const TIMESTAMP_FORMAT: &str = "%y/%m/%d,%H:%M:%S";
const TIMESTAMP_LEN: usize = 17;

/// Builds a packet from a response group.
///
/// `status` is the final result code that closed the group (`"OK"`,
/// `"ERROR"`), or empty when the group was closed because another record of
/// the same response followed. `header` is the first line of the group and
/// `body` any lines after it.
///
/// Returns `None` for responses that are deliberately ignored (`+ZUSIMR`) and
/// for recognized responses whose arguments do not have the expected shape.
///
/// ```rust
/// use gsmmodem::datatypes::Packet;
/// use gsmmodem::parser::parse_packet;
///
/// let packet = parse_packet("OK", "+CMTI: \"SM\",5", "");
/// assert_eq!(
///     packet,
///     Some(Packet::MessageNotification { storage: "SM".to_string(), index: 5 })
/// );
/// ```
pub fn parse_packet(status: &str, header: &str, body: &str) -> Option<Packet> {
    if header.is_empty() {
        if let Some(packet) = status_packet(status) {
            return Some(packet);
        }
    }

    let Some((tag, rest)) = header.split_once(':') else {
        return Some(Packet::Unknown {
            command: header.to_string(),
            args: Vec::new(),
        });
    };

    let value = rest.trim();
    let args = unquote(value);
    let is_last = !status.is_empty();

    match tag {
        // storage unset nag, sent repeatedly by some firmware
        "+ZUSIMR" => None,
        "+ZPASR" => text(&args, 0)
            .map(Packet::ServiceStatus)
            .or_else(|| malformed(header)),
        "+ZDONR" => text(&args, 0)
            .map(Packet::NetworkStatus)
            .or_else(|| malformed(header)),
        "+CMTI" => notification(&args).or_else(|| malformed(header)),
        "+CSCA" => Some(Packet::SmscAddress(args)),
        "+CMGR" => read_message(&args, body, is_last).or_else(|| malformed(header)),
        "+CMGL" => listed_message(&args, body, is_last).or_else(|| malformed(header)),
        "+CPMS" if value.starts_with('(') => storage_areas(value).or_else(|| malformed(header)),
        "+CPMS" => storage_info(&args),
        "" => Some(if status == STATUS_OK {
            Packet::Ok
        } else {
            Packet::Error
        }),
        _ => Some(Packet::Unknown {
            command: tag.to_string(),
            args,
        }),
    }
}

/// Splits an argument list on commas, honouring double-quote grouping.
///
/// Quoted tokens are strings with the quotes removed. Unquoted tokens are
/// trimmed and become integers when they parse as one, strings otherwise.
///
/// ```rust
/// use gsmmodem::datatypes::Arg;
/// use gsmmodem::parser::unquote;
///
/// assert_eq!(
///     unquote("\"+447802092035\",145"),
///     vec![Arg::Str("+447802092035".to_string()), Arg::Int(145)]
/// );
/// ```
pub fn unquote(value: &str) -> Vec<Arg> {
    if value.trim().is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut token = String::new();
    let mut quoted = false;
    let mut in_quotes = false;

    for c in value.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            ',' if !in_quotes => {
                args.push(token_to_arg(&token, quoted));
                token.clear();
                quoted = false;
            }
            _ => token.push(c),
        }
    }
    args.push(token_to_arg(&token, quoted));
    args
}

fn token_to_arg(token: &str, quoted: bool) -> Arg {
    if quoted {
        return Arg::Str(token.to_string());
    }
    let trimmed = token.trim();
    // `+4478...` is an international number, not a signed integer
    if trimmed.starts_with('+') {
        return Arg::Str(trimmed.to_string());
    }
    match trimmed.parse::<i64>() {
        Ok(n) => Arg::Int(n),
        Err(_) => Arg::Str(trimmed.to_string()),
    }
}

/// Parses a modem timestamp such as `14/02/01,15:07:43+00`.
///
/// The trailing quarter-hour offset is ignored; the result is the modem's
/// local wall-clock time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let datetime = value.get(..TIMESTAMP_LEN)?;
    NaiveDateTime::parse_from_str(datetime, TIMESTAMP_FORMAT).ok()
}

fn status_packet(status: &str) -> Option<Packet> {
    match status {
        STATUS_OK => Some(Packet::Ok),
        STATUS_ERROR => Some(Packet::Error),
        _ => None,
    }
}

fn malformed(header: &str) -> Option<Packet> {
    warn!("Dropping malformed response: {header:?}");
    None
}

fn text(args: &[Arg], position: usize) -> Option<String> {
    args.get(position)?.as_str().map(str::to_string)
}

fn index(args: &[Arg], position: usize) -> Option<u32> {
    args.get(position)?.as_index()
}

fn notification(args: &[Arg]) -> Option<Packet> {
    Some(Packet::MessageNotification {
        storage: text(args, 0)?,
        index: index(args, 1)?,
    })
}

/// `+CMGR: <stat>,<oa>,<alpha>,<scts>`; the slot is implied by the request
fn read_message(args: &[Arg], body: &str, is_last: bool) -> Option<Packet> {
    Some(Packet::Message(Message {
        index: 0,
        status: text(args, 0)?,
        telephone: text(args, 1)?,
        timestamp: parse_timestamp(args.get(3)?.as_str()?)?,
        body: body.to_string(),
        is_last,
    }))
}

/// `+CMGL: <index>,<stat>,<oa>,<alpha>,<scts>`
fn listed_message(args: &[Arg], body: &str, is_last: bool) -> Option<Packet> {
    Some(Packet::Message(Message {
        index: index(args, 0)?,
        status: text(args, 1)?,
        telephone: text(args, 2)?,
        timestamp: parse_timestamp(args.get(4)?.as_str()?)?,
        body: body.to_string(),
        is_last,
    }))
}

/// `+CPMS: ("ME","SM"),("ME","SM"),("ME","SM")`
fn storage_areas(value: &str) -> Option<Packet> {
    let value = value.strip_prefix('(').unwrap_or(value);
    let value = value.strip_suffix(')').unwrap_or(value);

    let mut groups = value.splitn(3, "),(");
    let read = string_list(groups.next()?);
    let write = string_list(groups.next()?);
    let receive = string_list(groups.next()?);

    Some(Packet::StorageAreas(StorageAreas {
        read,
        write,
        receive,
    }))
}

fn string_list(group: &str) -> Vec<String> {
    group
        .split(',')
        .map(|item| item.trim().trim_matches('"').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// `+CPMS: 0,100,0,100,0,100`; any other integer count yields no packet
fn storage_info(args: &[Arg]) -> Option<Packet> {
    let counts: Vec<u32> = args
        .iter()
        .filter_map(Arg::as_int)
        .filter_map(|n| u32::try_from(n).ok())
        .collect();

    let [used_read, max_read, used_write, max_write, used_receive, max_receive] = counts[..]
    else {
        debug!("+CPMS set response with {} counts, expected 6", counts.len());
        return None;
    };

    Some(Packet::StorageInfo(StorageInfo {
        used_read,
        max_read,
        used_write,
        max_write,
        used_receive,
        max_receive,
    }))
}
