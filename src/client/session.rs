//! One editing view bound to one document channel.
//!
//! [`CollabSession`] is a handle to a single actor task that owns the
//! reconciler, the debounced emitter and the reconnection supervisor. Socket
//! events, user commands, debounce deadlines and save completions are all
//! handled on that one task, one at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::client::emitter::DebouncedEmitter;
use crate::client::persistence::{DocumentPersistence, DocumentSnapshot};
use crate::client::reconciler::{EditorState, Reconciliation, UpdateReconciler};
use crate::client::supervisor::{ChannelState, ReconnectionSupervisor};
use crate::client::transport::{BoxFuture, Connector, TransportEvent, TransportLink};
use crate::config::SessionConfig;
use crate::error::SyncError;
use crate::models::{ActiveUser, SyncMessage};

pub const DEFAULT_TITLE: &str = "Untitled Document";

// An in-flight call the actor polls alongside its other inputs
type Pending<T> = Option<BoxFuture<'static, T>>;

/// Notifications for the embedding UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    ReconnectScheduled { delay: Duration },
    ContentChanged(String),
    TitleChanged(String),
    RosterChanged(Vec<ActiveUser>),
}

#[derive(Debug)]
enum Command {
    EditContent(String),
    EditTitle(String),
    SaveNow,
    UpdateCredentials(Option<String>),
    Close(oneshot::Sender<()>),
}

/// Handle to a running session. Dropping it stops the session.
pub struct CollabSession {
    document_id: String,
    commands: mpsc::UnboundedSender<Command>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    task: Option<JoinHandle<()>>,
}

impl CollabSession {
    /// Start a session for `document_id`. Fails without a credential; in that
    /// case nothing is spawned and no channel is attempted.
    pub fn open(
        document_id: impl Into<String>,
        token: Option<String>,
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        persistence: Arc<dyn DocumentPersistence>,
    ) -> Result<Self, SyncError> {
        let document_id = document_id.into();
        let token = token.filter(|t| !t.is_empty()).ok_or(SyncError::MissingCredential)?;
        ReconnectionSupervisor::connect_target(&config.server_url, &document_id, Some(&token))?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();

        let actor = SessionActor {
            document_id: document_id.clone(),
            token: Some(token),
            reconciler: UpdateReconciler::new(EditorState { title: DEFAULT_TITLE.to_string(), ..EditorState::default() }),
            emitter: DebouncedEmitter::new(&config),
            supervisor: ReconnectionSupervisor::new(config.reconnect_delay()),
            config,
            connector,
            persistence,
            link: None,
            loading: None,
            connecting: None,
            edited: false,
            unsent_content: None,
            events: event_tx,
            settled_tx,
            settled_rx,
        };
        let task = tokio::spawn(actor.run(cmd_rx));

        Ok(Self { document_id, commands: cmd_tx, events: Some(event_rx), task: Some(task) })
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Take the event receiver. Returns `None` after the first call.
    pub fn take_event_rx(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events.take()
    }

    pub fn edit_content(&self, content: impl Into<String>) -> Result<(), SyncError> {
        self.send(Command::EditContent(content.into()))
    }

    pub fn edit_title(&self, title: impl Into<String>) -> Result<(), SyncError> {
        self.send(Command::EditTitle(title.into()))
    }

    /// Persist the current content now, bypassing the autosave debounce.
    pub fn save_now(&self) -> Result<(), SyncError> {
        self.send(Command::SaveNow)
    }

    /// Replace the credential used for the next reopen. The open channel is
    /// left alone.
    pub fn update_credentials(&self, token: Option<String>) -> Result<(), SyncError> {
        self.send(Command::UpdateCredentials(token))
    }

    /// Close the channel for good and wait for the session to stop. Pending
    /// debounced work is discarded.
    pub async fn close(mut self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(Command::Close(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, command: Command) -> Result<(), SyncError> {
        self.commands.send(command).map_err(|_| SyncError::ChannelClosed)
    }
}

impl Drop for CollabSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct SessionActor {
    document_id: String,
    token: Option<String>,
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    persistence: Arc<dyn DocumentPersistence>,
    reconciler: UpdateReconciler,
    emitter: DebouncedEmitter,
    supervisor: ReconnectionSupervisor,
    link: Option<TransportLink>,
    loading: Pending<Result<Option<DocumentSnapshot>, SyncError>>,
    connecting: Pending<Result<TransportLink, SyncError>>,
    // Set by the first local edit; a snapshot loaded after that is not applied
    edited: bool,
    // Latest broadcast that fell due while the channel was down
    unsent_content: Option<String>,
    events: mpsc::UnboundedSender<SessionEvent>,
    settled_tx: mpsc::UnboundedSender<String>,
    settled_rx: mpsc::UnboundedReceiver<String>,
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        self.loading = Some(self.persistence.load());

        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                // Commands first, so close is never starved by other input
                biased;

                cmd = commands.recv() => match cmd {
                    Some(Command::Close(ack)) => {
                        self.shutdown();
                        let _ = ack.send(());
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        self.shutdown();
                        break;
                    }
                },
                loaded = next_pending(&mut self.loading) => {
                    self.apply_loaded(loaded);
                    self.start_connect();
                }
                result = next_pending(&mut self.connecting) => self.on_connect_result(result),
                event = next_transport_event(&mut self.link) => self.handle_transport(event),
                Some(content) = self.settled_rx.recv() => {
                    self.emitter.save_settled(&content);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.fire_due(Instant::now());
                }
            }
        }
        info!("Session for document {} stopped", self.document_id);
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (self.emitter.next_deadline(), self.supervisor.reopen_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn apply_loaded(&mut self, loaded: Result<Option<DocumentSnapshot>, SyncError>) {
        match loaded {
            Ok(Some(_)) if self.edited => {
                debug!("Edited before load finished, keeping local state for {}", self.document_id);
            }
            Ok(Some(snapshot)) => {
                self.reconciler.load(snapshot.content.clone(), snapshot.title.clone());
                self.emit(SessionEvent::TitleChanged(snapshot.title));
                self.emit(SessionEvent::ContentChanged(snapshot.content));
            }
            Ok(None) => debug!("No saved state for document {}", self.document_id),
            Err(e) => warn!("Failed to load document {}: {}", self.document_id, e),
        }
    }

    fn start_connect(&mut self) {
        let url = match ReconnectionSupervisor::connect_target(
            &self.config.server_url,
            &self.document_id,
            self.token.as_deref(),
        ) {
            Ok(url) => url,
            Err(e) => {
                warn!("Not opening channel for document {}: {}", self.document_id, e);
                return;
            }
        };
        if !self.supervisor.begin_connect() {
            return;
        }

        debug!("Opening channel for document {} (attempt {})", self.document_id, self.supervisor.attempts());
        self.connecting = Some(self.connector.connect(url));
    }

    fn on_connect_result(&mut self, result: Result<TransportLink, SyncError>) {
        if self.supervisor.state() != ChannelState::Connecting {
            debug!("Discarding channel attempt for {} that outlived its session", self.document_id);
            return;
        }
        match result {
            Ok(link) => {
                self.link = Some(link);
                self.supervisor.on_open();
                self.reconciler.reset();
                self.emit(SessionEvent::Connected);
                if let Some(content) = self.unsent_content.take() {
                    self.broadcast_content(content);
                }
            }
            Err(e) => {
                warn!("Failed to open channel for document {}: {}", self.document_id, e);
                self.schedule_reopen();
            }
        }
    }

    fn schedule_reopen(&mut self) {
        let now = Instant::now();
        if let Some(at) = self.supervisor.on_closed(now, self.token.is_some()) {
            let delay = at.saturating_duration_since(now);
            info!("Reopening channel for document {} in {:?}", self.document_id, delay);
            self.emit(SessionEvent::ReconnectScheduled { delay });
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::EditContent(content) => {
                self.edited = true;
                self.emitter.record_edit(&content, Instant::now());
                self.reconciler.record_local_edit(content);
            }
            Command::EditTitle(title) => {
                self.edited = true;
                self.reconciler.record_local_title(title.clone());
                self.send(&SyncMessage::title_update(title.clone()));
                let save = self.persistence.save_title(title);
                tokio::spawn(async move {
                    if let Err(e) = save.await {
                        warn!("Failed to save title: {}", e);
                    }
                });
            }
            Command::SaveNow => {
                let content = self.reconciler.editor().content.clone();
                self.reconciler.arm_skip();
                self.spawn_save(content.clone(), true);
                self.send(&SyncMessage::content_update(content));
            }
            Command::UpdateCredentials(token) => {
                self.token = token.filter(|t| !t.is_empty());
                let idle = self.supervisor.state() == ChannelState::Closed
                    && self.supervisor.reopen_deadline().is_none();
                if self.token.is_some() && idle {
                    self.schedule_reopen();
                }
            }
            Command::Close(_) => {}
        }
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Message(text) => {
                let msg = match SyncMessage::decode(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("Dropping malformed message on {}: {}", self.document_id, e);
                        return;
                    }
                };
                match self.reconciler.apply(msg) {
                    Reconciliation::ContentApplied(content) => self.emit(SessionEvent::ContentChanged(content)),
                    Reconciliation::TitleApplied(title) => self.emit(SessionEvent::TitleChanged(title)),
                    Reconciliation::RosterReplaced(users) => self.emit(SessionEvent::RosterChanged(users)),
                    Reconciliation::Unchanged | Reconciliation::Suppressed(_) => {}
                }
            }
            TransportEvent::Error(e) => {
                warn!("Channel error on document {}: {}", self.document_id, e);
            }
            TransportEvent::Closed => {
                info!("Channel for document {} closed", self.document_id);
                self.link = None;
                self.emit(SessionEvent::Disconnected);
                self.schedule_reopen();
            }
        }
    }

    fn fire_due(&mut self, now: Instant) {
        if let Some(content) = self.emitter.due_broadcast(now) {
            self.broadcast_content(content);
        }
        if let Some(content) = self.emitter.due_autosave(now) {
            self.spawn_save(content, false);
        }
        if self.supervisor.poll_reopen(now) {
            self.start_connect();
        }
    }

    fn broadcast_content(&mut self, content: String) {
        if !self.supervisor.is_open() {
            debug!("Channel down, holding broadcast for document {}", self.document_id);
            self.unsent_content = Some(content);
            return;
        }
        self.reconciler.mark_broadcast_sent();
        self.send(&SyncMessage::content_update(content));
    }

    fn spawn_save(&self, content: String, is_manual: bool) {
        let save = self.persistence.save(content.clone(), is_manual);
        let settled = self.settled_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = save.await {
                warn!("Failed to save document (manual: {}): {}", is_manual, e);
            }
            if !is_manual {
                let _ = settled.send(content);
            }
        });
    }

    // Sent only while the channel is open
    fn send(&self, msg: &SyncMessage) {
        let Some(link) = self.link.as_ref().filter(|_| self.supervisor.is_open()) else {
            debug!("Channel down, not sending {}", msg.kind());
            return;
        };
        match msg.encode() {
            Ok(text) => {
                if link.outbound.send(text).is_err() {
                    debug!("Channel writer gone, {} not sent", msg.kind());
                }
            }
            Err(e) => warn!("Failed to encode {}: {}", msg.kind(), e),
        }
    }

    fn shutdown(&mut self) {
        self.emitter.cancel();
        self.supervisor.shutdown();
        self.unsent_content = None;
        self.loading = None;
        self.connecting = None;
        self.link = None;
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

async fn next_pending<T>(slot: &mut Pending<T>) -> T {
    let Some(fut) = slot.as_mut() else {
        return std::future::pending().await;
    };
    let out = fut.await;
    *slot = None;
    out
}

async fn next_transport_event(link: &mut Option<TransportLink>) -> TransportEvent {
    match link {
        Some(link) => link.inbound.recv().await.unwrap_or(TransportEvent::Closed),
        None => std::future::pending().await,
    }
}
