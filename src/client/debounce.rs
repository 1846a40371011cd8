use std::time::Duration;
use tokio::time::Instant;

/// Trailing-edge debounce timer holding the latest pushed value.
///
/// The owner drives it: `push` on every input, sleep until [`deadline`],
/// then `poll_due`. `flush_now` and `cancel` drain or discard pending work
/// deterministically (unmount, shutdown).
///
/// [`deadline`]: Debouncer::deadline
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None, deadline: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace the pending value and restart the quiescence window.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(value);
        self.deadline = Some(now + self.window);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the value if the window has elapsed.
    pub fn poll_due(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(deadline) if deadline <= now => self.flush_now(),
            _ => None,
        }
    }

    /// Take the pending value immediately, whatever the deadline.
    pub fn flush_now(&mut self) -> Option<T> {
        self.deadline = None;
        self.pending.take()
    }

    /// Discard pending work. Returns whether anything was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline = None;
        self.pending.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(1000);

    #[test]
    fn test_trailing_edge_keeps_latest() {
        let start = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        d.push("a", start);
        d.push("ab", start + Duration::from_millis(300));
        d.push("abc", start + Duration::from_millis(600));

        // Window restarts on each push
        assert_eq!(d.poll_due(start + Duration::from_millis(1000)), None);
        assert_eq!(d.deadline(), Some(start + Duration::from_millis(1600)));
        assert_eq!(d.poll_due(start + Duration::from_millis(1600)), Some("abc"));
        assert!(!d.is_pending());
        assert_eq!(d.poll_due(start + Duration::from_millis(5000)), None);
    }

    #[test]
    fn test_flush_now_ignores_deadline() {
        let start = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        d.push(1, start);
        assert_eq!(d.flush_now(), Some(1));
        assert_eq!(d.deadline(), None);
        assert_eq!(d.flush_now(), None);
    }

    #[test]
    fn test_cancel_discards() {
        let start = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        assert!(!d.cancel());
        d.push(1, start);
        assert!(d.cancel());
        assert_eq!(d.poll_due(start + WINDOW), None);
        assert_eq!(d.window(), WINDOW);
    }
}
