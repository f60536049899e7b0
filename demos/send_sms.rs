// ABOUTME: Example application sending a single text message through a serial GSM modem
// ABOUTME: Shows the open / send / close flow of the Modem client API

use argh::FromArgs;
use gsmmodem::client::{Modem, ModemConfig};
use std::error::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Example application to show the simplest case of sending an SMS message
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to log the modem conversation
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the serial device the modem is attached to (default: /dev/ttyUSB0)
    #[argh(option)]
    device: Option<String>,

    /// the serial line speed (default: 115200)
    #[argh(option, short = 'b')]
    baud: Option<u32>,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debugging {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let device = cli_args
        .device
        .unwrap_or_else(|| "/dev/ttyUSB0".to_owned());
    let mut config = ModemConfig::serial().with_debug(cli_args.debugging);
    if let Some(baud) = cli_args.baud {
        config = config.with_baud_rate(baud);
    }

    let modem = Modem::open_serial(&device, config).await.map_err(|e| {
        eprintln!("Modem initialization failed: {e}");
        Box::<dyn Error>::from(e.to_string())
    })?;

    println!("Modem ready on {device}");

    let result = modem.send_message(&cli_args.to, &cli_args.message).await;

    if let Err(e) = modem.close().await {
        eprintln!("Warning: close failed: {e}");
    }

    match result {
        Ok(()) => {
            println!("Message sent to {}", cli_args.to);
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to send message: {e}");
            Err(Box::<dyn Error>::from(e.to_string()))
        }
    }
}
