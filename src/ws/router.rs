//! Fan-out of update events to every session on a document.
//!
//! Delivery policy: the origin session is included in the fan-out. Echo
//! filtering is left to each client's reconciler, which expects to see its own
//! broadcasts come back.

use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::SyncMessage;
use crate::ws::registry::{ChannelMembers, ConnectionRegistry, DocumentChannel};

/// Origin used for envelopes the server authors itself (rosters).
pub const SERVER_ORIGIN: Uuid = Uuid::nil();

/// A pre-encoded message travelling through a document channel.
#[derive(Debug, Clone)]
pub struct BroadcastEnvelope {
    pub origin: Uuid,
    pub payload: Arc<str>,
}

/// Publishes events into document channels.
#[derive(Debug, Clone)]
pub struct BroadcastRouter {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastRouter {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver `event` to every session attached to `document_id`, origin included.
    ///
    /// Returns the number of attached sessions the event was queued for.
    /// Publishing from a session that is no longer attached is rejected.
    pub async fn publish(&self, document_id: &str, origin: Uuid, event: &SyncMessage) -> Result<usize, SyncError> {
        let channel = self
            .registry
            .channel(document_id)
            .await
            .ok_or(SyncError::ChannelClosed)?;

        let members = channel.members.lock().await;
        if !members.sessions.contains_key(&origin) {
            warn!("Dropping {} from detached session {} on document {}", event.kind(), origin, document_id);
            return Err(SyncError::ChannelClosed);
        }
        let delivered = fan_out(&channel, &members, origin, event)?;
        debug!("Relayed {} from {} to {} sessions on {}", event.kind(), origin, delivered, document_id);
        Ok(delivered)
    }

    /// Recompute the roster of `document_id` and publish it as `active_users`.
    pub async fn roster_changed(&self, document_id: &str) -> usize {
        match self.registry.channel(document_id).await {
            Some(channel) => {
                let members = channel.members.lock().await;
                announce_roster(&channel, &members)
            }
            None => 0,
        }
    }
}

/// Encode once and queue the envelope on every attached session's outbox.
///
/// A session whose outbox is full misses this envelope; a session whose socket
/// already went away is skipped until its detach lands.
pub(crate) fn fan_out(
    channel: &DocumentChannel,
    members: &ChannelMembers,
    origin: Uuid,
    event: &SyncMessage,
) -> Result<usize, SyncError> {
    let payload: Arc<str> = event.encode()?.into();
    let envelope = Arc::new(BroadcastEnvelope { origin, payload });

    let mut delivered = 0;
    for (session_id, member) in &members.sessions {
        match member.outbox.try_send(envelope.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => {
                warn!("Session {} on {} lagged, dropping {}", session_id, channel.document_id(), event.kind());
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Session {} on {} is closing", session_id, channel.document_id());
            }
        }
    }
    Ok(delivered)
}

/// Publish the live membership. Callers hold the members lock, which keeps the
/// announced roster in step with attach/detach order.
pub(crate) fn announce_roster(channel: &DocumentChannel, members: &ChannelMembers) -> usize {
    let event = SyncMessage::active_users(members.roster());
    match fan_out(channel, members, SERVER_ORIGIN, &event) {
        Ok(n) => n,
        Err(e) => {
            warn!("Failed to announce roster for {}: {}", channel.document_id(), e);
            0
        }
    }
}
