// ABOUTME: Example application listing the messages stored on a serial GSM modem
// ABOUTME: Prints storage areas and each stored message with its UTC receive time

use argh::FromArgs;
use chrono::Local;
use gsmmodem::client::{Modem, ModemConfig};
use gsmmodem::datatypes::MessageFilter;
use std::error::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// List the messages held in the modem's storage
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to log the modem conversation
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the serial device the modem is attached to (default: /dev/ttyUSB0)
    #[argh(option)]
    device: Option<String>,

    /// only list unread messages
    #[argh(switch, short = 'u')]
    unread: bool,
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
    let config = ModemConfig::serial().with_debug(cli_args.debugging);
    let modem = Modem::open_serial(&device, config).await?;

    let areas = modem.supported_storage_areas().await?;
    println!("Storage areas: read {:?}, write {:?}, receive {:?}", areas.read, areas.write, areas.receive);

    let filter = if cli_args.unread {
        MessageFilter::ReceivedUnread
    } else {
        MessageFilter::All
    };

    let messages = modem.list_messages(filter).await?;
    println!("{} message(s)", messages.len());
    for message in &messages {
        // modem clocks run on local time
        let received = message
            .timestamp_in(&Local)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| message.timestamp.to_string());
        println!(
            "[{}] {} {} {}: {}",
            message.index, message.status, received, message.telephone, message.body
        );
    }

    modem.close().await?;
    Ok(())
}
