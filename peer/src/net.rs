//! WebSocket connection to the relay, run as its own task. The game loop
//! talks to it through channels and never blocks on the socket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use pong_shared::protocol::{ClientMsg, ServerMsg, PROTOCOL_VERSION};

#[derive(Debug, Clone)]
pub enum NetEvent {
    Connected,
    Disconnected,
    Message(ServerMsg),
    ProtocolMismatch { server: u32, client: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("protocol mismatch: server {server}, client {client}")]
    ProtocolMismatch { server: u32, client: u32 },
    #[error("connection closed by relay")]
    Closed,
}

const INITIAL_DELAY: Duration = Duration::from_millis(1000);
const MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Reconnect delay: starts at 1 s, grows 1.5x per failure, capped at 30 s.
#[derive(Debug, Clone)]
pub struct Backoff {
    delay: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            delay: INITIAL_DELAY,
        }
    }

    /// Delay to wait now; the next one grows.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.delay;
        self.delay = self.delay.mul_f32(1.5).min(MAX_DELAY);
        current
    }

    pub fn reset(&mut self) {
        self.delay = INITIAL_DELAY;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends client messages to the connection task. Messages sent while
/// disconnected are dropped.
#[derive(Debug, Clone)]
pub struct NetHandle {
    cmd_tx: mpsc::UnboundedSender<ClientMsg>,
}

impl NetHandle {
    pub fn send(&self, msg: ClientMsg) {
        if self.cmd_tx.send(msg).is_err() {
            tracing::debug!("connection task gone; dropping message");
        }
    }
}

/// Spawn the connection task. It reconnects until the event receiver is
/// dropped or the relay speaks a different protocol version.
pub fn spawn_connection(url: Url) -> (NetHandle, mpsc::UnboundedReceiver<NetEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMsg>();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<NetEvent>();
    tokio::spawn(run_connection(url, cmd_rx, event_tx));
    (NetHandle { cmd_tx }, event_rx)
}

async fn run_connection(
    url: Url,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientMsg>,
    event_tx: mpsc::UnboundedSender<NetEvent>,
) {
    let mut backoff = Backoff::new();

    loop {
        tracing::info!(url = %url, "connecting to relay");
        let result = connect_once(&url, &mut cmd_rx, &event_tx, &mut backoff).await;

        if event_tx.send(NetEvent::Disconnected).is_err() {
            return;
        }

        match result {
            Err(NetError::ProtocolMismatch { server, client }) => {
                tracing::error!(server, client, "protocol mismatch; not reconnecting");
                let _ = event_tx.send(NetEvent::ProtocolMismatch { server, client });
                return;
            }
            Err(err) => tracing::warn!(error = %err, "relay connection lost"),
            Ok(()) => tracing::info!("relay connection closed"),
        }

        // Stale commands belong to the old session
        while cmd_rx.try_recv().is_ok() {}

        let delay = backoff.next_delay();
        tracing::info!(delay_ms = delay.as_millis() as u64, "reconnecting");
        tokio::time::sleep(delay).await;
    }
}

async fn connect_once(
    url: &Url,
    cmd_rx: &mut mpsc::UnboundedReceiver<ClientMsg>,
    event_tx: &mpsc::UnboundedSender<NetEvent>,
    backoff: &mut Backoff,
) -> Result<(), NetError> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
    let _ = event_tx.send(NetEvent::Connected);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    // Game loop is gone
                    let _ = write.close().await;
                    return Ok(());
                };
                match serde_json::to_string(&cmd) {
                    Ok(text) => write.send(Message::Text(text.into())).await?,
                    Err(err) => tracing::error!(error = %err, "failed to encode client message"),
                }
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(txt))) => {
                        let server_msg = match serde_json::from_str::<ServerMsg>(&txt) {
                            Ok(m) => m,
                            Err(err) => {
                                tracing::debug!(error = %err, "ignoring malformed relay message");
                                continue;
                            }
                        };
                        if let ServerMsg::Welcome(welcome) = &server_msg {
                            if welcome.protocol_version != PROTOCOL_VERSION {
                                let _ = write.close().await;
                                return Err(NetError::ProtocolMismatch {
                                    server: welcome.protocol_version,
                                    client: PROTOCOL_VERSION,
                                });
                            }
                            // A rejected join also completes the handshake; only a welcome counts
                            backoff.reset();
                        }
                        if event_tx.send(NetEvent::Message(server_msg)).is_err() {
                            let _ = write.close().await;
                            return Ok(());
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Err(NetError::Closed),
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err.into()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let mut backoff = Backoff::new();
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1500));
        assert_eq!(backoff.next_delay(), Duration::from_millis(2250));
        for _ in 0..20 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), MAX_DELAY);
    }

    #[test]
    fn backoff_resets() {
        let mut backoff = Backoff::new();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), INITIAL_DELAY);
    }
}
