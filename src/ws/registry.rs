//! Per-document session membership.
//!
//! Each document gets its own [`DocumentChannel`] holding the live session set,
//! each member with its own bounded outbox. Membership changes and the roster announcement that
//! follows them happen under the channel's own lock, so two documents never
//! contend and the roster published for a document always matches its live set.
//!
//! Detaching drops the session's outbox, so its receiver drains what was queued
//! before the detach and then ends. A channel is torn down when its last
//! session detaches. A concurrent attach
//! that raced the teardown sees the channel marked retired and retries against
//! a fresh one.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{ActiveUser, UserIdentity};
use crate::ws::router::{self, BroadcastEnvelope};
use crate::ws::session::Session;

/// One attached session and the queue feeding its socket.
#[derive(Debug)]
pub(crate) struct Member {
    pub(crate) session: Session,
    pub(crate) outbox: mpsc::Sender<Arc<BroadcastEnvelope>>,
}

/// Live membership of one document channel.
#[derive(Debug, Default)]
pub(crate) struct ChannelMembers {
    pub(crate) sessions: HashMap<Uuid, Member>,
    retired: bool,
}

impl ChannelMembers {
    /// Roster in attach order.
    pub(crate) fn roster(&self) -> Vec<ActiveUser> {
        let mut sessions: Vec<&Session> = self.sessions.values().map(|m| &m.session).collect();
        sessions.sort_by(|a, b| a.attached_at.cmp(&b.attached_at).then(a.id.cmp(&b.id)));
        sessions.into_iter().map(Session::as_active_user).collect()
    }
}

/// Server-side group of sessions collaborating on one document.
#[derive(Debug)]
pub struct DocumentChannel {
    document_id: String,
    pub(crate) members: Mutex<ChannelMembers>,
}

impl DocumentChannel {
    fn new(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            members: Mutex::new(ChannelMembers::default()),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub async fn roster(&self) -> Vec<ActiveUser> {
        self.members.lock().await.roster()
    }

    pub async fn session_count(&self) -> usize {
        self.members.lock().await.sessions.len()
    }
}

/// What a session gets back from [`ConnectionRegistry::attach`].
#[derive(Debug)]
pub struct ChannelHandle {
    pub session: Session,
    pub channel: Arc<DocumentChannel>,
    /// Every envelope published on the channel while this session is attached,
    /// starting with the roster announcing the join itself. Ends on detach.
    pub receiver: mpsc::Receiver<Arc<BroadcastEnvelope>>,
}

/// Tracks, per document, the set of attached sessions.
#[derive(Debug)]
pub struct ConnectionRegistry {
    channels: RwLock<HashMap<String, Arc<DocumentChannel>>>,
    capacity: usize,
}

impl ConnectionRegistry {
    /// `capacity` is the number of envelopes queued per session before new ones
    /// are dropped for it.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Admit a session to a document, creating the channel on first attach.
    ///
    /// The updated roster is published to every session (the new one included)
    /// before this returns.
    pub async fn attach(&self, document_id: &str, session_id: Uuid, identity: UserIdentity) -> ChannelHandle {
        loop {
            let channel = self.get_or_create(document_id).await;
            let mut members = channel.members.lock().await;
            if members.retired {
                // Lost a race with the last detach; the next lookup replaces it.
                continue;
            }

            let session = Session::new(document_id, session_id, identity.clone());
            let (outbox, receiver) = mpsc::channel(self.capacity);
            members.sessions.insert(session_id, Member { session: session.clone(), outbox });
            info!(
                "Session {} ({}) attached to document {} ({} sessions)",
                session_id, session.identity.user_id, document_id, members.sessions.len()
            );
            router::announce_roster(&channel, &members);
            drop(members);

            return ChannelHandle { session, channel, receiver };
        }
    }

    /// Release a session. Detaching the last session tears the channel down.
    ///
    /// Returns false when the session was not attached.
    pub async fn detach(&self, document_id: &str, session_id: Uuid) -> bool {
        let Some(channel) = self.channel(document_id).await else {
            return false;
        };

        let emptied = {
            let mut members = channel.members.lock().await;
            if members.sessions.remove(&session_id).is_none() {
                return false;
            }
            info!(
                "Session {} detached from document {} ({} sessions left)",
                session_id, document_id, members.sessions.len()
            );
            if members.sessions.is_empty() {
                members.retired = true;
                true
            } else {
                router::announce_roster(&channel, &members);
                false
            }
        };

        if emptied {
            let mut channels = self.channels.write().await;
            if channels.get(document_id).is_some_and(|c| Arc::ptr_eq(c, &channel)) {
                channels.remove(document_id);
                debug!("Document channel {} torn down", document_id);
            }
        }
        true
    }

    pub async fn channel(&self, document_id: &str) -> Option<Arc<DocumentChannel>> {
        self.channels.read().await.get(document_id).cloned()
    }

    /// Current roster of a document, empty if no channel exists.
    pub async fn roster(&self, document_id: &str) -> Vec<ActiveUser> {
        match self.channel(document_id).await {
            Some(channel) => channel.roster().await,
            None => Vec::new(),
        }
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Sessions attached across all channels.
    pub async fn session_count(&self) -> usize {
        let channels: Vec<Arc<DocumentChannel>> = self.channels.read().await.values().cloned().collect();
        let mut total = 0;
        for channel in channels {
            total += channel.session_count().await;
        }
        total
    }

    async fn get_or_create(&self, document_id: &str) -> Arc<DocumentChannel> {
        {
            let channels = self.channels.read().await;
            if let Some(channel) = channels.get(document_id) {
                if !channel_retired(channel) {
                    return channel.clone();
                }
            }
        }

        let mut channels = self.channels.write().await;
        if let Some(channel) = channels.get(document_id) {
            if !channel_retired(channel) {
                return channel.clone();
            }
        }

        debug!("Creating document channel {}", document_id);
        let channel = Arc::new(DocumentChannel::new(document_id));
        channels.insert(document_id.to_string(), channel.clone());
        channel
    }
}

/// A channel whose lock is held is being mutated by someone else; only a
/// channel we can observe as retired is replaced.
fn channel_retired(channel: &DocumentChannel) -> bool {
    channel.members.try_lock().map(|m| m.retired).unwrap_or(false)
}
