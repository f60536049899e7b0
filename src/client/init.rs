// ABOUTME: Initialization handshake that brings a freshly opened modem into a known state
// ABOUTME: Resets with escape recovery, disables echo, selects storage, text mode and the SMSC

use crate::client::error::{ModemError, ModemResult};
use crate::datatypes::{AtCommand, Packet, gsm7::ESCAPE};
use crate::engine::EngineHandle;
use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Number of `ATZ` attempts before giving up
const RESET_ATTEMPTS: usize = 4;

/// Run the handshake once the engine reports the stream quiet.
///
/// Transport errors are returned as they are; any other failure becomes
/// `InitFailed` naming the step.
pub(crate) async fn initialize(
    engine: &EngineHandle,
    ready: oneshot::Receiver<()>,
    storage: &str,
) -> ModemResult<()> {
    ready
        .await
        .map_err(|_| ModemError::InitFailed("modem stream closed during startup".to_string()))?;

    reset(engine).await?;

    engine
        .exchange(&AtCommand::execute("E0"))
        .await
        .map_err(failed("echo off"))?;

    let areas = [storage, storage, storage];
    let selected = engine
        .exchange(&AtCommand::set("+CPMS", areas))
        .await
        .map_err(failed("storage selection"))?;
    match selected {
        Packet::StorageInfo(info) => info!(
            "Message storage {storage}: {}/{} used",
            info.used_receive, info.max_receive
        ),
        other => {
            return Err(ModemError::InitFailed(format!(
                "storage selection: expected StorageInfo, got {other}"
            )));
        }
    }

    // some modems only support text mode and reject selecting it
    if let Err(e) = engine.exchange(&AtCommand::set("+CMGF", [1u32])).await {
        if e.is_fatal() {
            return Err(e);
        }
        debug!("Text mode selection failed, continuing: {e}");
    }

    // re-applying the service centre address works around firmware that
    // forgets it after a reset
    let smsc = engine
        .exchange(&AtCommand::query("+CSCA"))
        .await
        .map_err(failed("SMSC query"))?;
    match smsc {
        Packet::SmscAddress(args) => {
            debug!("SMSC address: {args:?}");
            engine
                .exchange(&AtCommand::set("+CSCA", args))
                .await
                .map_err(failed("SMSC update"))?;
        }
        other => {
            return Err(ModemError::InitFailed(format!(
                "SMSC query: expected SmscAddress, got {other}"
            )));
        }
    }

    Ok(())
}

/// Wraps a per-command error of handshake `step` as `InitFailed`
fn failed(step: &'static str) -> impl FnOnce(ModemError) -> ModemError {
    move |e| {
        if e.is_fatal() {
            e
        } else {
            ModemError::InitFailed(format!("{step}: {e}"))
        }
    }
}

/// Send `ATZ` until it succeeds. A modem left waiting for a message body
/// ignores commands, so each failed attempt is followed by an ESC to cancel
/// the pending input.
async fn reset(engine: &EngineHandle) -> ModemResult<()> {
    let command = AtCommand::execute("Z");

    for attempt in 1..=RESET_ATTEMPTS {
        let e = match engine.exchange(&command).await {
            Ok(_) => return Ok(()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => e,
        };

        warn!("Reset attempt {attempt}/{RESET_ATTEMPTS} failed: {e}");
        if attempt < RESET_ATTEMPTS {
            let escape = engine
                .begin()
                .await
                .send_raw(Bytes::from_static(&[ESCAPE]), "escape")
                .await;
            if let Err(e) = escape {
                if e.is_fatal() {
                    return Err(e);
                }
            }
        }
    }

    Err(ModemError::InitFailed(format!(
        "no response to ATZ after {RESET_ATTEMPTS} attempts"
    )))
}
