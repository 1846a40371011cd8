use std::sync::Arc;
use axum::{
    extract::{Path, State, ws::{Message, WebSocket, WebSocketUpgrade}},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::models::{ErrorResponse, SyncMessage, UserIdentity};
use crate::services::auth_service::get_auth_token_from;
use crate::ws::registry::{ChannelHandle, ConnectionRegistry};
use crate::ws::router::BroadcastRouter;

/// WebSocket handler for `/document/:doc_id?token=<jwt>`
///
/// The credential is checked before the upgrade; a missing or invalid one is
/// answered with 401 and nothing is attached.
pub async fn websocket_handler(
    Path(document_id): Path<String>,
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let token = match get_auth_token_from(&uri, &headers) {
        Ok(token) => token,
        Err(e) => {
            warn!("Rejecting WebSocket for document {}: {}", document_id, e);
            return ErrorResponse::reply(StatusCode::UNAUTHORIZED, e).into_response();
        }
    };

    let identity = match state.identities.resolve(&token) {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Rejecting WebSocket for document {}: {}", document_id, e);
            return ErrorResponse::reply(StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
    };

    info!("New WebSocket connection for document {} by {}", document_id, identity.user_id);
    ws.on_upgrade(move |socket| handle_socket(socket, document_id, identity, state))
}

// Detach the session when the socket handling ends, however it ends
struct DeferDetach {
    registry: Arc<ConnectionRegistry>,
    document_id: String,
    session_id: Uuid,
}

impl Drop for DeferDetach {
    fn drop(&mut self) {
        let registry = self.registry.clone();
        let document_id = std::mem::take(&mut self.document_id);
        let session_id = self.session_id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if !registry.detach(&document_id, session_id).await {
                        debug!("Session {} was already detached from {}", session_id, document_id);
                    }
                });
            }
            Err(_) => error!("No runtime to detach session {} from {}", session_id, document_id),
        }
    }
}

/// Handle an upgraded connection
async fn handle_socket(socket: WebSocket, document_id: String, identity: UserIdentity, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();

    let ChannelHandle { receiver: mut rbc, .. } = state.registry.attach(&document_id, session_id, identity).await;
    let _detach = DeferDetach {
        registry: state.registry.clone(),
        document_id: document_id.clone(),
        session_id,
    };

    let (mut sender, mut receiver) = socket.split();

    // Channel -> socket. Every envelope is forwarded, this session's own included.
    // The outbox closes when the session is detached.
    let mut send_task = tokio::spawn(async move {
        while let Some(envelope) = rbc.recv().await {
            if sender.send(Message::Text(envelope.payload.to_string())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Socket -> router
    let router = state.router.clone();
    let doc_for_recv = document_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    handle_client_frame(&router, &doc_for_recv, session_id, &text).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Transport error on session {} ({}): {}", session_id, doc_for_recv, e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };
    info!("WebSocket session {} on document {} terminated", session_id, document_id);
}

/// Route one inbound text frame. Malformed frames are dropped and the
/// connection stays open.
pub(crate) async fn handle_client_frame(router: &BroadcastRouter, document_id: &str, session_id: Uuid, text: &str) {
    let msg = match SyncMessage::decode(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Dropping malformed frame from session {} on {}: {}", session_id, document_id, e);
            return;
        }
    };

    match msg {
        SyncMessage::ContentUpdate(_) | SyncMessage::TitleUpdate(_) => {
            if let Err(e) = router.publish(document_id, session_id, &msg).await {
                warn!("Failed to relay {} from {}: {}", msg.kind(), session_id, e);
            }
        }
        SyncMessage::ActiveUsers(_) => {
            debug!("Ignoring client-sent active_users from {}", session_id);
        }
    }
}
