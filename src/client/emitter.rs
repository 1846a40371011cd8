//! Coalesces local edits into throttled broadcasts and throttled saves.
//!
//! The broadcast and autosave debouncers share no state; both observe the same
//! content value. Autosave additionally carries the pending-save marker: the
//! content of the save currently in flight. A due save whose content equals the
//! marker is skipped, and the marker is cleared when that save settles (success
//! or failure) unless a newer save has replaced it.

use tokio::time::Instant;
use tracing::debug;

use crate::client::debounce::Debouncer;
use crate::config::SessionConfig;

/// Work drained by [`DebouncedEmitter::flush_now`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Flushed {
    pub broadcast: Option<String>,
    pub autosave: Option<String>,
}

#[derive(Debug)]
pub struct DebouncedEmitter {
    broadcast: Debouncer<String>,
    autosave: Option<Debouncer<String>>,
    pending_save: Option<String>,
}

impl DebouncedEmitter {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            broadcast: Debouncer::new(config.broadcast_window()),
            autosave: config.autosave.then(|| Debouncer::new(config.autosave_window())),
            pending_save: None,
        }
    }

    /// Feed one local edit into both debouncers.
    pub fn record_edit(&mut self, content: &str, now: Instant) {
        self.broadcast.push(content.to_string(), now);
        if let Some(autosave) = self.autosave.as_mut() {
            autosave.push(content.to_string(), now);
        }
    }

    /// Earliest instant at which either debouncer fires.
    pub fn next_deadline(&self) -> Option<Instant> {
        let autosave = self.autosave.as_ref().and_then(Debouncer::deadline);
        match (self.broadcast.deadline(), autosave) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn due_broadcast(&mut self, now: Instant) -> Option<String> {
        self.broadcast.poll_due(now)
    }

    /// Content to persist now, if the autosave window elapsed and the same
    /// content isn't already in flight.
    pub fn due_autosave(&mut self, now: Instant) -> Option<String> {
        let content = self.autosave.as_mut()?.poll_due(now)?;
        self.admit_save(content)
    }

    /// A save for `content` settled. Returns whether the marker was cleared.
    pub fn save_settled(&mut self, content: &str) -> bool {
        if self.pending_save.as_deref() == Some(content) {
            self.pending_save = None;
            true
        } else {
            false
        }
    }

    pub fn pending_save(&self) -> Option<&str> {
        self.pending_save.as_deref()
    }

    /// Drain both debouncers now. The autosave half still goes through the
    /// pending-save dedupe.
    pub fn flush_now(&mut self) -> Flushed {
        let broadcast = self.broadcast.flush_now();
        let due = self.autosave.as_mut().and_then(Debouncer::flush_now);
        let autosave = due.and_then(|content| self.admit_save(content));
        Flushed { broadcast, autosave }
    }

    /// Discard pending broadcast and autosave work.
    pub fn cancel(&mut self) {
        let dropped_broadcast = self.broadcast.cancel();
        let dropped_save = self.autosave.as_mut().is_some_and(Debouncer::cancel);
        if dropped_broadcast || dropped_save {
            debug!("Cancelled pending work (broadcast: {}, autosave: {})", dropped_broadcast, dropped_save);
        }
    }

    fn admit_save(&mut self, content: String) -> Option<String> {
        if self.pending_save.as_deref() == Some(content.as_str()) {
            debug!("Skipping autosave, identical content already in flight");
            return None;
        }
        self.pending_save = Some(content.clone());
        Some(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn emitter() -> DebouncedEmitter {
        DebouncedEmitter::new(&SessionConfig::default())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_rapid_edits_emit_one_broadcast() {
        let t0 = Instant::now();
        let mut e = emitter();
        for (i, text) in ["H", "He", "Hel", "Hell", "Hello"].iter().enumerate() {
            e.record_edit(text, t0 + ms(i as u64 * 100));
        }

        assert_eq!(e.due_broadcast(t0 + ms(1000)), None);
        assert_eq!(e.due_broadcast(t0 + ms(1400)), Some("Hello".to_string()));
        assert_eq!(e.due_broadcast(t0 + ms(5000)), None);
    }

    #[test]
    fn test_windows_are_independent() {
        let t0 = Instant::now();
        let mut e = emitter();
        e.record_edit("draft", t0);
        assert_eq!(e.next_deadline(), Some(t0 + ms(1000)));

        assert_eq!(e.due_broadcast(t0 + ms(1000)), Some("draft".to_string()));
        assert_eq!(e.due_autosave(t0 + ms(1000)), None);
        assert_eq!(e.next_deadline(), Some(t0 + ms(2000)));
        assert_eq!(e.due_autosave(t0 + ms(2000)), Some("draft".to_string()));
        assert_eq!(e.next_deadline(), None);
    }

    #[test]
    fn test_autosave_dedupe_while_in_flight() {
        let t0 = Instant::now();
        let mut e = emitter();
        e.record_edit("same", t0);
        assert_eq!(e.due_autosave(t0 + ms(2000)), Some("same".to_string()));
        assert_eq!(e.pending_save(), Some("same"));

        // Converged content fires again before the first save settled
        e.record_edit("same", t0 + ms(2100));
        assert_eq!(e.due_autosave(t0 + ms(4100)), None);

        assert!(e.save_settled("same"));
        assert_eq!(e.pending_save(), None);
    }

    #[test]
    fn test_superseded_save_keeps_newer_marker() {
        let t0 = Instant::now();
        let mut e = emitter();
        e.record_edit("v1", t0);
        assert_eq!(e.due_autosave(t0 + ms(2000)), Some("v1".to_string()));
        e.record_edit("v2", t0 + ms(2100));
        assert_eq!(e.due_autosave(t0 + ms(4100)), Some("v2".to_string()));

        // v1 settles late: the marker belongs to v2 now
        assert!(!e.save_settled("v1"));
        assert_eq!(e.pending_save(), Some("v2"));
        assert!(e.save_settled("v2"));
    }

    #[test]
    fn test_autosave_disabled() {
        let t0 = Instant::now();
        let cfg = SessionConfig { autosave: false, ..SessionConfig::default() };
        let mut e = DebouncedEmitter::new(&cfg);
        e.record_edit("x", t0);
        assert_eq!(e.next_deadline(), Some(t0 + ms(1000)));
        assert_eq!(e.due_autosave(t0 + ms(10_000)), None);
        assert_eq!(e.due_broadcast(t0 + ms(10_000)), Some("x".to_string()));
    }

    #[test]
    fn test_flush_now_and_cancel() {
        let t0 = Instant::now();
        let mut e = emitter();
        e.record_edit("x", t0);
        assert_eq!(
            e.flush_now(),
            Flushed { broadcast: Some("x".to_string()), autosave: Some("x".to_string()) }
        );
        assert_eq!(e.next_deadline(), None);

        e.record_edit("y", t0);
        e.cancel();
        assert_eq!(e.next_deadline(), None);
        assert_eq!(e.flush_now(), Flushed::default());
    }
}
