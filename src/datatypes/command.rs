// ABOUTME: Typed outbound AT commands and the message listing filters understood by +CMGL
// ABOUTME: Renders the four AT command shapes (execute, query, test, set) into wire text

use crate::datatypes::Arg;
use std::fmt;

/// Line terminator appended to every AT command on the wire
pub const LINE_END: &str = "\r\n";

/// An AT command ready to be written to the modem.
///
/// The `command` part excludes the `AT` prefix, so `+CMGR` renders as
/// `AT+CMGR=...` and `Z` renders as `ATZ`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AtCommand {
    /// `AT<command>`, e.g. `ATZ`, `ATE0`
    Execute(String),
    /// `AT<command>?`, reads the current value
    Query(String),
    /// `AT<command>=?`, lists the supported values
    Test(String),
    /// `AT<command>=<args>`, strings quoted and integers bare
    Set { command: String, args: Vec<Arg> },
}

impl AtCommand {
    pub fn execute(command: impl Into<String>) -> Self {
        AtCommand::Execute(command.into())
    }

    pub fn query(command: impl Into<String>) -> Self {
        AtCommand::Query(command.into())
    }

    pub fn test(command: impl Into<String>) -> Self {
        AtCommand::Test(command.into())
    }

    pub fn set<I, A>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        AtCommand::Set {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The full command line including the trailing `\r\n`
    pub fn to_line(&self) -> String {
        format!("{self}{LINE_END}")
    }
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtCommand::Execute(command) => write!(f, "AT{command}"),
            AtCommand::Query(command) => write!(f, "AT{command}?"),
            AtCommand::Test(command) => write!(f, "AT{command}=?"),
            AtCommand::Set { command, args } => {
                write!(f, "AT{command}=")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{arg}")?;
                }
                Ok(())
            }
        }
    }
}

/// Status filters accepted by `AT+CMGL` in text mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum MessageFilter {
    #[default]
    All,
    ReceivedUnread,
    ReceivedRead,
    StoredUnsent,
    StoredSent,
}

impl MessageFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFilter::All => "ALL",
            MessageFilter::ReceivedUnread => "REC UNREAD",
            MessageFilter::ReceivedRead => "REC READ",
            MessageFilter::StoredUnsent => "STO UNSENT",
            MessageFilter::StoredSent => "STO SENT",
        }
    }
}

impl AsRef<str> for MessageFilter {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for MessageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
