// ABOUTME: Modem connection settings: startup quiet window, reply timeout, storage and serial options
// ABOUTME: Builder-style configuration with presets matching common USB serial GSM dongles

use std::time::Duration;

/// Configuration for a modem connection
///
/// # Example
///
/// ```rust
/// use gsmmodem::client::ModemConfig;
/// use std::time::Duration;
///
/// // Defaults for a USB serial modem (500ms startup window, 4s read timeout)
/// let config = ModemConfig::serial();
///
/// // Tuned configuration
/// let config = ModemConfig::default()
///     .with_read_timeout(Duration::from_secs(10))
///     .with_storage("ME")
///     .with_debug(true);
/// assert_eq!(config.storage, "ME");
/// ```
#[derive(Debug, Clone)]
pub struct ModemConfig {
    /// Quiet period before the modem is considered booted (default: 500ms)
    ///
    /// Modems print a banner and status notifications after power-up or a
    /// port open. Initialization starts once no line has arrived for this
    /// long, so the first command is not interleaved with that output.
    pub startup_timeout: Duration,

    /// Maximum time to wait for each reply (default: 4 seconds)
    pub read_timeout: Duration,

    /// Log every line read and every write at debug level (default: false)
    pub debug: bool,

    /// Storage area selected for reading, writing and receiving (default: "SM")
    pub storage: String,

    /// Serial line speed used by `Modem::open_serial` (default: 115200)
    pub baud_rate: u32,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            startup_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_secs(4),
            debug: false,
            storage: "SM".to_string(),
            baud_rate: 115_200,
        }
    }
}

impl ModemConfig {
    /// Configuration for a modem attached to a serial port
    pub fn serial() -> Self {
        Self::default()
    }

    pub fn with_startup_timeout(mut self, startup_timeout: Duration) -> Self {
        self.startup_timeout = startup_timeout;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_storage(mut self, storage: impl Into<String>) -> Self {
        self.storage = storage.into();
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}
