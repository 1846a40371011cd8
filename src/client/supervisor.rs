use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

use crate::error::SyncError;

/// Lifecycle of the client's document channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
    /// Closed on purpose; nothing reopens it.
    ShutDown,
}

/// Keeps the document channel open across transient failures: after every
/// close that wasn't intentional, one reopen is scheduled after a fixed delay.
/// Attempts are unbounded.
#[derive(Debug)]
pub struct ReconnectionSupervisor {
    delay: Duration,
    state: ChannelState,
    reopen_at: Option<Instant>,
    attempts: u64,
}

impl ReconnectionSupervisor {
    pub fn new(delay: Duration) -> Self {
        Self { delay, state: ChannelState::Closed, reopen_at: None, attempts: 0 }
    }

    /// Channel endpoint for `document_id`, with the credential appended as the
    /// `token` query parameter. Fails without a non-empty credential.
    pub fn connect_target(server_url: &str, document_id: &str, token: Option<&str>) -> Result<Url, SyncError> {
        let token = token.filter(|t| !t.is_empty()).ok_or(SyncError::MissingCredential)?;

        let mut url = Url::parse(server_url)?;
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(format!("{} cannot be a base", server_url)))?
            .pop_if_empty()
            .push("document")
            .push(document_id);
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    pub fn reopen_deadline(&self) -> Option<Instant> {
        self.reopen_at
    }

    /// Start an attempt. Returns false once shut down or while an attempt is
    /// already underway.
    pub fn begin_connect(&mut self) -> bool {
        match self.state {
            ChannelState::Closed => {
                self.state = ChannelState::Connecting;
                self.reopen_at = None;
                self.attempts += 1;
                true
            }
            _ => false,
        }
    }

    pub fn on_open(&mut self) {
        if self.state == ChannelState::Connecting {
            info!("Document channel open after {} attempt(s)", self.attempts);
            self.state = ChannelState::Open;
            self.attempts = 0;
        }
    }

    /// The channel closed (or an attempt failed). Schedules one reopen when a
    /// credential is available and none is pending; returns the reopen
    /// deadline, if any.
    pub fn on_closed(&mut self, now: Instant, has_credential: bool) -> Option<Instant> {
        if self.state == ChannelState::ShutDown {
            return None;
        }
        self.state = ChannelState::Closed;
        if !has_credential {
            debug!("No credential, not scheduling a reopen");
            return None;
        }
        if self.reopen_at.is_none() {
            self.reopen_at = Some(now + self.delay);
        }
        self.reopen_at
    }

    /// Intentional close: cancel any pending reopen for good.
    pub fn shutdown(&mut self) {
        self.state = ChannelState::ShutDown;
        self.reopen_at = None;
    }

    /// Whether a scheduled reopen is due. Consumes the schedule.
    pub fn poll_reopen(&mut self, now: Instant) -> bool {
        match self.reopen_at {
            Some(at) if at <= now && self.state == ChannelState::Closed => {
                self.reopen_at = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(3000);

    #[test]
    fn test_connect_target() {
        let url = ReconnectionSupervisor::connect_target("ws://localhost:3000", "doc 1", Some("a.b.c")).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:3000/document/doc%201?token=a.b.c");

        let url = ReconnectionSupervisor::connect_target("wss://sync.example.com/", "d", Some("t")).unwrap();
        assert_eq!(url.as_str(), "wss://sync.example.com/document/d?token=t");
    }

    #[test]
    fn test_connect_target_requires_credential() {
        assert!(matches!(
            ReconnectionSupervisor::connect_target("ws://localhost:3000", "d", None),
            Err(SyncError::MissingCredential)
        ));
        assert!(matches!(
            ReconnectionSupervisor::connect_target("ws://localhost:3000", "d", Some("")),
            Err(SyncError::MissingCredential)
        ));
        assert!(matches!(
            ReconnectionSupervisor::connect_target("not a url", "d", Some("t")),
            Err(SyncError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_reopen_once_after_delay() {
        let t0 = Instant::now();
        let mut s = ReconnectionSupervisor::new(DELAY);
        assert!(s.begin_connect());
        s.on_open();
        assert!(s.is_open());

        assert_eq!(s.on_closed(t0, true), Some(t0 + DELAY));
        // A second close notification doesn't push the deadline
        assert_eq!(s.on_closed(t0 + Duration::from_millis(500), true), Some(t0 + DELAY));

        assert!(!s.poll_reopen(t0 + Duration::from_millis(2999)));
        assert!(s.poll_reopen(t0 + DELAY));
        assert!(!s.poll_reopen(t0 + DELAY * 2));
        assert!(s.begin_connect());
        assert_eq!(s.state(), ChannelState::Connecting);
    }

    #[test]
    fn test_failed_attempts_keep_retrying() {
        let t0 = Instant::now();
        let mut s = ReconnectionSupervisor::new(DELAY);
        for i in 0..5u32 {
            assert!(s.begin_connect());
            let now = t0 + DELAY * i;
            assert_eq!(s.on_closed(now, true), Some(now + DELAY));
            assert!(s.poll_reopen(now + DELAY));
        }
        assert_eq!(s.attempts(), 5);
    }

    #[test]
    fn test_no_reopen_without_credential() {
        let t0 = Instant::now();
        let mut s = ReconnectionSupervisor::new(DELAY);
        s.begin_connect();
        s.on_open();
        assert_eq!(s.on_closed(t0, false), None);
        assert_eq!(s.reopen_deadline(), None);
        assert_eq!(s.state(), ChannelState::Closed);
    }

    #[test]
    fn test_shutdown_cancels_pending_reopen() {
        let t0 = Instant::now();
        let mut s = ReconnectionSupervisor::new(DELAY);
        s.begin_connect();
        s.on_open();
        s.on_closed(t0, true);
        s.shutdown();

        assert!(!s.poll_reopen(t0 + DELAY * 10));
        assert_eq!(s.on_closed(t0, true), None);
        assert!(!s.begin_connect());
        assert_eq!(s.state(), ChannelState::ShutDown);
    }
}
