//! Scenario tests driving a `Modem` against a scripted modem on the other end
//! of an in-memory stream

use crate::client::{Modem, ModemConfig, ModemError, ModemState};
use crate::datatypes::{Arg, MessageFilter, Packet, StorageAreas};
use chrono::NaiveDate;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
enum Step {
    /// The modem side must write exactly these bytes next
    Expect(&'static [u8]),
    /// Send these bytes to the modem side
    Emit(&'static [u8]),
    /// Pause the script
    Wait(u64),
}

use Step::{Emit, Expect, Wait};

const INIT: &[Step] = &[
    Expect(b"ATZ\r\n"),
    Emit(b"\r\nOK\r\n"),
    Expect(b"ATE0\r\n"),
    Emit(b"ATE0\n"),
    Emit(b"\r\nOK\r\n"),
    Expect(b"AT+CPMS=\"SM\",\"SM\",\"SM\"\r\n"),
    Emit(b"\r\n+CPMS: 50,50,50,50,50,50\r\nOK\n\n"),
    Expect(b"AT+CMGF=1\r\n"),
    Emit(b"\r\nOK\r\n"),
    Expect(b"AT+CSCA?\r\n"),
    Emit(b"\r\n+CSCA: \"+447802092035\",145\r\nOK\r\n"),
    Expect(b"AT+CSCA=\"+447802092035\",145\r\n"),
    Emit(b"\r\nOK\r\n"),
];

fn test_config() -> ModemConfig {
    ModemConfig::default()
        .with_startup_timeout(Duration::from_millis(10))
        .with_read_timeout(Duration::from_millis(100))
}

/// Play `script` against the modem end of a new stream. The driver task
/// hands its end back when the script is done.
fn scripted(script: &[&[Step]]) -> (DuplexStream, JoinHandle<DuplexStream>) {
    let (modem_end, mut peer) = duplex(4096);
    let steps = script.concat();

    let driver = tokio::spawn(async move {
        for step in steps {
            match step {
                Expect(expected) => {
                    let mut received = vec![0u8; expected.len()];
                    tokio::time::timeout(Duration::from_secs(5), peer.read_exact(&mut received))
                        .await
                        .expect("timed out waiting for the modem to write")
                        .expect("read failed");
                    assert_eq!(
                        String::from_utf8_lossy(&received),
                        String::from_utf8_lossy(expected)
                    );
                }
                Emit(data) => peer.write_all(data).await.expect("write failed"),
                Wait(millis) => tokio::time::sleep(Duration::from_millis(millis)).await,
            }
        }
        peer
    });

    (modem_end, driver)
}

async fn open(script: &[&[Step]]) -> (Modem, JoinHandle<DuplexStream>) {
    let (stream, driver) = scripted(script);
    let modem = Modem::open(stream, test_config())
        .await
        .expect("initialization failed");
    (modem, driver)
}

/// Wait for the driver and check nothing was written past the script
async fn finish(modem: Modem, driver: JoinHandle<DuplexStream>) {
    let mut peer = driver.await.expect("script failed");
    modem.close().await.unwrap();

    let mut rest = Vec::new();
    peer.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty(), "unexpected writes: {rest:?}");
}

async fn drain(mut notifications: UnboundedReceiver<Packet>) -> Vec<Packet> {
    let mut packets = Vec::new();
    while let Some(packet) = notifications.recv().await {
        packets.push(packet);
    }
    packets
}

fn timestamp() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2014, 2, 1)
        .unwrap()
        .and_hms_opt(15, 7, 43)
        .unwrap()
}

#[tokio::test]
async fn test_normal_init() {
    let (modem, driver) = open(&[INIT]).await;
    assert_eq!(modem.state(), ModemState::Ready);
    assert!(modem.is_connected());
    finish(modem, driver).await;
}

#[tokio::test]
async fn test_hanging_prompt_init() {
    let hanging: &[Step] = &[Expect(b"ATZ\r\n"), Expect(b"\x1b"), Emit(b"\r\nOK\r\n")];
    let (modem, driver) = open(&[hanging, INIT]).await;
    finish(modem, driver).await;
}

#[tokio::test]
async fn test_init_gives_up_after_four_resets() {
    let silent: &[Step] = &[
        Expect(b"ATZ\r\n"),
        Expect(b"\x1b"),
        Expect(b"ATZ\r\n"),
        Expect(b"\x1b"),
        Expect(b"ATZ\r\n"),
        Expect(b"\x1b"),
        Expect(b"ATZ\r\n"),
    ];
    let (stream, driver) = scripted(&[silent]);

    let result = Modem::open(stream, test_config()).await;
    assert!(matches!(result, Err(ModemError::InitFailed(_))));

    // the engine shuts the stream down after a failed handshake
    let mut peer = driver.await.unwrap();
    let mut rest = Vec::new();
    peer.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_init_fails_on_short_storage_reply() {
    let script: &[Step] = &[
        Expect(b"ATZ\r\n"),
        Emit(b"\r\nOK\r\n"),
        Expect(b"ATE0\r\n"),
        Emit(b"\r\nOK\r\n"),
        Expect(b"AT+CPMS=\"SM\",\"SM\",\"SM\"\r\n"),
        Emit(b"\r\n+CPMS: 50,50,50,50\r\nOK\r\n"),
    ];
    let (stream, driver) = scripted(&[script]);

    let err = Modem::open(stream, test_config()).await.unwrap_err();
    assert!(err.is_fatal());
    assert!(
        matches!(err, ModemError::InitFailed(ref reason) if reason.starts_with("storage selection"))
    );

    let mut peer = driver.await.unwrap();
    let mut rest = Vec::new();
    peer.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty(), "handshake continued: {rest:?}");
}

#[tokio::test]
async fn test_init_fails_when_stream_closes_early() {
    let (stream, peer) = duplex(64);
    drop(peer);

    let result = Modem::open(stream, test_config()).await;
    assert!(matches!(result, Err(ModemError::InitFailed(_))));
}

#[tokio::test]
async fn test_oob_during_startup() {
    let oob: &[Step] = &[
        Emit(b"\r\n+ZUSIMR:2\r\n"),
        Emit(b"\r\n+ZPASR: \"No Service\"\r\n"),
        Emit(b"\r\n+ZDONR: \"O2-UK\",234,10,\"CS_PS\",\"ROAM_OFF\"\r\n"),
        Emit(b"\r\n+ZPASR: \"EDGE\"\r\n"),
        Emit(b"\r\n+ZPASR: \"UMTS\"\r\n"),
        Emit(b"\r\nDODGY\r\n"),
        Emit(b"\r\n+ZZZ: \"A\"\r\n"),
    ];
    let (mut modem, driver) = open(&[oob, INIT]).await;
    let notifications = modem.take_notifications().unwrap();
    assert!(modem.take_notifications().is_none());
    finish(modem, driver).await;

    assert_eq!(
        drain(notifications).await,
        vec![
            Packet::ServiceStatus("No Service".to_string()),
            Packet::NetworkStatus("O2-UK".to_string()),
            Packet::ServiceStatus("EDGE".to_string()),
            Packet::ServiceStatus("UMTS".to_string()),
            Packet::Unknown {
                command: "DODGY".to_string(),
                args: vec![],
            },
            Packet::Unknown {
                command: "+ZZZ".to_string(),
                args: vec![Arg::Str("A".to_string())],
            },
        ]
    );
}

#[tokio::test]
async fn test_incoming_message_notification() {
    let received: &[Step] = &[Emit(b"\r\n+CMTI: \"SM\",5\r\n")];
    let (mut modem, driver) = open(&[INIT, received]).await;
    let mut notifications = modem.take_notifications().unwrap();

    let packet = tokio::time::timeout(Duration::from_secs(1), notifications.recv())
        .await
        .unwrap();
    assert_eq!(
        packet,
        Some(Packet::MessageNotification {
            storage: "SM".to_string(),
            index: 5,
        })
    );
    finish(modem, driver).await;
}

#[tokio::test]
async fn test_get_message() {
    let script: &[Step] = &[
        Expect(b"AT+CMGR=1\r\n"),
        Emit(b"\r\n+CMGR: \"REC UNREAD\",\"+441234567890\",,\"14/02/01,15:07:43+00\"\r\nHi\r\n\r\nOK\r\n"),
    ];
    let (modem, driver) = open(&[INIT, script]).await;

    let message = modem.get_message(1).await.unwrap();
    assert_eq!(message.index, 1);
    assert_eq!(message.status, "REC UNREAD");
    assert_eq!(message.telephone, "+441234567890");
    assert_eq!(message.timestamp, timestamp());
    assert_eq!(message.body, "Hi");
    assert!(message.is_last);

    finish(modem, driver).await;
}

#[tokio::test]
async fn test_get_missing_message() {
    let script: &[Step] = &[Expect(b"AT+CMGR=1\r\n"), Emit(b"\r\nOK\r\n")];
    let (modem, driver) = open(&[INIT, script]).await;

    let err = modem.get_message(1).await.unwrap_err();
    assert!(matches!(err, ModemError::NotFound { index: 1 }));

    finish(modem, driver).await;
}

#[tokio::test]
async fn test_send_message() {
    let script: &[Step] = &[
        Expect(b"AT+CMGS=\"441234567890\"\r\n"),
        Emit(b"> \r\n"),
        Expect(b"Body\x00\x1a"),
        Emit(b"\r\nOK\r\n"),
    ];
    let (modem, driver) = open(&[INIT, script]).await;

    modem.send_message("441234567890", "Body@").await.unwrap();

    finish(modem, driver).await;
}

#[tokio::test]
async fn test_send_message_without_prompt() {
    let script: &[Step] = &[Expect(b"AT+CMGS=\"441234567890\"\r\n"), Emit(b"\r\nOK\r\n")];
    let (modem, driver) = open(&[INIT, script]).await;

    let err = modem.send_message("441234567890", "Body").await.unwrap_err();
    assert!(matches!(
        err,
        ModemError::UnexpectedPacket {
            expected: "BodyPrompt",
            ..
        }
    ));

    // no body was written
    finish(modem, driver).await;
}

#[tokio::test]
async fn test_send_message_rejects_unquotable_number() {
    let (modem, driver) = open(&[INIT]).await;

    let err = modem
        .send_message("44123\"; AT+CMGD=1", "Body")
        .await
        .unwrap_err();
    assert!(matches!(err, ModemError::InvalidData(_)));
    assert!(!err.is_fatal());

    finish(modem, driver).await;
}

#[tokio::test]
async fn test_list_messages() {
    let script: &[Step] = &[
        Expect(b"AT+CMGL=\"ALL\"\r\n"),
        Emit(b"\r\n+CMGL: 0,\"REC UNREAD\",\"+441234567890\",,\"14/02/01,15:07:43+00\"\r\nHi\r\n+CMGL: 1,\"REC READ\",\"+441234567890\",,\"14/02/01,15:07:43+00\"\r\nOla\r\n+CMGL: 2,\"REC UNREAD\",\"+44123456"),
        Emit(b"7890\",,\"14/02/01,15:07:43+00\"\r\nJa\r\n\r\nOK\r\n"),
    ];
    let (modem, driver) = open(&[INIT, script]).await;

    let messages = modem.list_messages(MessageFilter::All).await.unwrap();
    let summary: Vec<_> = messages
        .iter()
        .map(|m| (m.index, m.status.as_str(), m.body.as_str(), m.is_last))
        .collect();
    assert_eq!(
        summary,
        vec![
            (0, "REC UNREAD", "Hi", false),
            (1, "REC READ", "Ola", false),
            (2, "REC UNREAD", "Ja", true),
        ]
    );
    assert!(messages.iter().all(|m| m.telephone == "+441234567890"));
    assert!(messages.iter().all(|m| m.timestamp == timestamp()));

    finish(modem, driver).await;
}

#[tokio::test]
async fn test_list_messages_empty() {
    let script: &[Step] = &[Expect(b"AT+CMGL=\"ALL\"\r\n"), Emit(b"\r\nOK\r\n")];
    let (modem, driver) = open(&[INIT, script]).await;

    let messages = modem.list_messages("ALL").await.unwrap();
    assert!(messages.is_empty());

    finish(modem, driver).await;
}

#[tokio::test]
async fn test_supported_storage_areas() {
    let script: &[Step] = &[
        Expect(b"AT+CPMS=?\r\n"),
        Emit(b"\r\n+CPMS: (\"ME\",\"MT\",\"SM\",\"SR\"),(\"ME\",\"MT\",\"SM\",\"SR\"),(\"ME\",\"MT\",\"SM\",\"SR\")\r\n\r\nOK\r\n"),
    ];
    let (modem, driver) = open(&[INIT, script]).await;

    let areas = modem.supported_storage_areas().await.unwrap();
    let all: Vec<String> = ["ME", "MT", "SM", "SR"].map(String::from).to_vec();
    assert_eq!(
        areas,
        StorageAreas {
            read: all.clone(),
            write: all.clone(),
            receive: all,
        }
    );

    finish(modem, driver).await;
}

#[tokio::test]
async fn test_error_reply_is_rejected() {
    let script: &[Step] = &[
        Expect(b"AT+CMGD=9\r\n"),
        Emit(b"\r\nERROR\r\n"),
        Expect(b"AT+CMGD=1\r\n"),
        Emit(b"\r\nOK\r\n"),
    ];
    let (modem, driver) = open(&[INIT, script]).await;

    let err = modem.delete_message(9).await.unwrap_err();
    assert!(matches!(err, ModemError::Rejected { ref command } if command == "AT+CMGD=9"));
    assert!(!err.is_fatal());

    // still usable
    modem.delete_message(1).await.unwrap();

    finish(modem, driver).await;
}

#[tokio::test]
async fn test_late_reply_is_discarded() {
    let script: &[Step] = &[
        Expect(b"AT+CMGD=3\r\n"),
        Wait(200),
        Emit(b"\r\nOK\r\n"),
        Expect(b"AT+CMGD=4\r\n"),
        Emit(b"\r\nERROR\r\n"),
    ];
    let (modem, driver) = open(&[INIT, script]).await;

    let err = modem.delete_message(3).await.unwrap_err();
    assert!(matches!(err, ModemError::Timeout { .. }));
    assert!(modem.is_connected());

    // let the late OK arrive so it is queued before the next exchange
    tokio::time::sleep(Duration::from_millis(300)).await;

    // answered by the ERROR, not by the stale OK
    let err = modem.delete_message(4).await.unwrap_err();
    assert!(matches!(err, ModemError::Rejected { .. }));

    finish(modem, driver).await;
}

#[tokio::test]
async fn test_unterminated_listing_does_not_leak_into_next_read() {
    let script: &[Step] = &[
        Expect(b"AT+CMGL=\"ALL\"\r\n"),
        Emit(b"\r\n+CMGL: 7,\"REC READ\",\"+449999\",,\"14/02/01,15:07:43+00\"\r\nStale\r\n"),
        Expect(b"AT+CMGR=2\r\n"),
        Emit(b"\r\n+CMGR: \"REC UNREAD\",\"+441234567890\",,\"14/02/01,15:07:43+00\"\r\nReal\r\n\r\nOK\r\n"),
    ];
    let (modem, driver) = open(&[INIT, script]).await;

    let err = modem.list_messages(MessageFilter::All).await.unwrap_err();
    assert!(matches!(err, ModemError::Timeout { .. }));

    let message = modem.get_message(2).await.unwrap();
    assert_eq!(message.index, 2);
    assert_eq!(message.telephone, "+441234567890");
    assert_eq!(message.body, "Real");

    finish(modem, driver).await;
}

#[tokio::test]
async fn test_stream_closed_during_exchange() {
    let script: &[Step] = &[Expect(b"AT+CMGD=1\r\n")];
    let (modem, driver) = open(&[INIT, script]).await;

    let (result, _) = tokio::join!(modem.delete_message(1), async {
        drop(driver.await.unwrap());
    });
    let err = result.unwrap_err();
    assert!(matches!(err, ModemError::ConnectionClosed));
    assert!(err.is_fatal());

    assert_eq!(modem.state(), ModemState::Closed);
    assert!(matches!(
        modem.delete_message(2).await,
        Err(ModemError::ConnectionClosed)
    ));
    modem.close().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_operations_are_serialized() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Modem>();

    let script: &[Step] = &[
        Expect(b"AT+CMGD=1\r\n"),
        Emit(b"\r\nOK\r\n"),
        Expect(b"AT+CMGD=2\r\n"),
        Emit(b"\r\nOK\r\n"),
    ];
    let (modem, driver) = open(&[INIT, script]).await;

    let (first, second) = tokio::join!(modem.delete_message(1), modem.delete_message(2));
    first.unwrap();
    second.unwrap();

    finish(modem, driver).await;
}
