use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

use crate::error::SyncError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What the channel reports back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(String),
    /// Transport-level failure. Always followed by `Closed`.
    Error(String),
    Closed,
}

/// An open channel: text frames go out through `outbound`, everything the
/// server sends arrives on `inbound`. Dropping `outbound` closes the socket.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens document channels.
pub trait Connector: Send + Sync {
    fn connect(&self, url: Url) -> BoxFuture<'static, Result<TransportLink, SyncError>>;
}

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// WebSocket connector backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy)]
pub struct WsConnector {
    timeout: Duration,
}

impl WsConnector {
    /// `timeout` bounds the TCP connect plus the upgrade handshake.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl Connector for WsConnector {
    fn connect(&self, url: Url) -> BoxFuture<'static, Result<TransportLink, SyncError>> {
        let limit = self.timeout;
        Box::pin(async move {
            let (ws, _response) = tokio::time::timeout(limit, connect_async(url.as_str()))
                .await
                .map_err(|_| SyncError::Connect(format!("handshake timed out after {:?}", limit)))?
                .map_err(|e| SyncError::Connect(e.to_string()))?;
            let (mut writer, mut reader) = ws.split();

            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
            let (in_tx, in_rx) = mpsc::unbounded_channel();

            tokio::spawn(async move {
                while let Some(text) = out_rx.recv().await {
                    if let Err(e) = writer.send(Message::Text(text.into())).await {
                        warn!("Failed to send frame: {}", e);
                        break;
                    }
                }
                let _ = writer.close().await;
            });

            tokio::spawn(async move {
                while let Some(frame) = reader.next().await {
                    match frame {
                        Ok(Message::Text(text)) => {
                            if in_tx.send(TransportEvent::Message(text.as_str().to_string())).is_err() {
                                return;
                            }
                        }
                        Ok(Message::Close(frame)) => {
                            debug!("Server closed the channel: {:?}", frame);
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            let _ = in_tx.send(TransportEvent::Error(e.to_string()));
                            break;
                        }
                    }
                }
                let _ = in_tx.send(TransportEvent::Closed);
            });

            Ok(TransportLink { outbound: out_tx, inbound: in_rx })
        })
    }
}
