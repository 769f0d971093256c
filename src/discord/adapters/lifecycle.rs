// Process lifecycle: wait for the host to ask the bot to stop.

use crate::core::control::ControlMessage;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `{"action":"STOP"}` arrived on stdin.
    HostRequest,
    /// Ctrl-C.
    Interrupt,
}

/// Resolve once a STOP control message or an interrupt arrives.
pub async fn wait_for_stop() -> StopReason {
    tokio::select! {
        reason = watch_stdin() => reason,
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!("Failed to listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
            StopReason::Interrupt
        }
    }
}

async fn watch_stdin() -> StopReason {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match ControlMessage::parse(&line) {
                Some(msg) if msg.is_stop() => {
                    tracing::info!("Host requested shutdown");
                    return StopReason::HostRequest;
                }
                Some(msg) => tracing::debug!(action = %msg.action, "Ignoring control message"),
                None => tracing::debug!(%line, "Ignoring non-control input"),
            },
            Ok(None) => {
                tracing::debug!("stdin closed; only ctrl-c can stop the bot now");
                return std::future::pending().await;
            }
            Err(e) => {
                tracing::warn!("Failed to read control input: {e}");
                return std::future::pending().await;
            }
        }
    }
}
