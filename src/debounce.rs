use std::time::{Duration, Instant};

/// Deadline-based debouncer polled by the event loop. At most one firing is
/// pending at a time; re-scheduling pushes the deadline out, cancelling the
/// previous one.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True exactly once after the deadline passes.
    pub fn ready(&mut self) -> bool {
        self.fire(Instant::now())
    }

    fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(at) if now >= at => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_deadline() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let start = Instant::now();
        d.schedule();
        assert!(!d.fire(start));
        assert!(d.fire(start + Duration::from_millis(150)));
        // already consumed
        assert!(!d.fire(start + Duration::from_millis(200)));
    }

    #[test]
    fn reschedule_pushes_deadline_out() {
        let mut d = Debouncer::new(Duration::from_millis(100));
        let start = Instant::now();
        d.schedule();
        d.deadline = Some(start + Duration::from_millis(100));
        // rapid second keystroke at t=50 replaces the pending fire
        d.deadline = Some(start + Duration::from_millis(150));
        assert!(!d.fire(start + Duration::from_millis(120)));
        assert!(d.fire(start + Duration::from_millis(160)));
    }

    #[test]
    fn cancel_discards_pending_fire() {
        let mut d = Debouncer::new(Duration::from_millis(10));
        let start = Instant::now();
        d.schedule();
        d.cancel();
        assert!(!d.fire(start + Duration::from_secs(1)));
    }
}
