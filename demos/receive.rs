// ABOUTME: Example application that collects incoming messages from a serial GSM modem
// ABOUTME: Drains stored messages, then fetches and deletes each newly notified message

use argh::FromArgs;
use gsmmodem::client::{Modem, ModemConfig, ModemResult};
use gsmmodem::datatypes::{Message, MessageFilter, Packet};
use std::error::Error;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Print and delete every message the modem receives
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to log the modem conversation
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the serial device the modem is attached to (default: /dev/ttyUSB0)
    #[argh(option)]
    device: Option<String>,
}

async fn handle(modem: &Modem, message: &Message) -> ModemResult<()> {
    println!("{} {}: {}", message.timestamp, message.telephone, message.body);
    modem.delete_message(message.index).await
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
    let mut modem = Modem::open_serial(&device, config).await?;
    let mut notifications = modem
        .take_notifications()
        .ok_or("notification receiver already taken")?;

    for message in modem.list_messages(MessageFilter::All).await? {
        handle(&modem, &message).await?;
    }

    info!("Waiting for messages");
    while let Some(packet) = notifications.recv().await {
        match packet {
            Packet::MessageNotification { index, .. } => match modem.get_message(index).await {
                Ok(message) => handle(&modem, &message).await?,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => warn!("Could not read message {index}: {e}"),
            },
            Packet::ServiceStatus(status) => info!("Service: {status}"),
            Packet::NetworkStatus(network) => info!("Network: {network}"),
            other => info!("Notification: {other}"),
        }
    }

    info!("Modem connection closed");
    Ok(())
}
