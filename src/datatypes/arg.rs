// ABOUTME: Untyped AT argument values as they appear in modem responses and set commands
// ABOUTME: Distinguishes quoted strings from bare integers so values round-trip unchanged

use std::fmt;

/// A single argument from an AT response or for an AT set command.
///
/// The modem does not declare argument types. A token that was quoted, or
/// that does not parse as a number, is a string; an unquoted numeric token is
/// an integer. Keeping the distinction lets a value read from a query be sent
/// back verbatim in a set command (e.g. the `+CSCA` round trip).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Arg {
    Str(String),
    Int(i64),
}

impl Arg {
    /// Returns the string payload, if this is a string argument
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            Arg::Int(_) => None,
        }
    }

    /// Returns the integer payload, if this is an integer argument
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(n) => Some(*n),
            Arg::Str(_) => None,
        }
    }

    /// Returns the integer payload as an unsigned storage index
    pub fn as_index(&self) -> Option<u32> {
        self.as_int().and_then(|n| u32::try_from(n).ok())
    }
}

/// Renders the argument in AT set-command syntax: strings quoted, integers bare.
impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Str(s) => write!(f, "\"{s}\""),
            Arg::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<u32> for Arg {
    fn from(value: u32) -> Self {
        Arg::Int(i64::from(value))
    }
}
