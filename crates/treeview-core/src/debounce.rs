//! Cancellable scheduled task.
//!
//! The engine has no timer of its own. The host passes the current [`Instant`] to
//! [`Debouncer::arm`] on every input and to [`Debouncer::poll`] from its event loop; a value is
//! released once it has been stable for the configured delay. Arming always replaces the pending
//! value, so only the latest input survives.

use std::time::{Duration, Instant};

/// Latest-value-wins delay line.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Create a debouncer releasing values after `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Change the delay. A pending value keeps its original arm time.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Schedule `value`, replacing anything pending. Returns `true` if a pending value was
    /// superseded.
    pub fn arm(&mut self, value: T, now: Instant) -> bool {
        self.pending.replace((value, now)).is_some()
    }

    /// Release the pending value if its delay has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|(_, armed)| now.saturating_duration_since(*armed) >= self.delay);
        if due {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// When the pending value becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, armed)| *armed + self.delay)
    }

    /// Release the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Drop the pending value. Returns `true` if there was one.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Returns `true` while a value is waiting.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_value_is_released() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        assert!(!debouncer.arm("a", start));
        assert!(debouncer.arm("ab", start + Duration::from_millis(100)));
        assert_eq!(debouncer.poll(start + Duration::from_millis(350)), None);
        assert_eq!(debouncer.poll(start + Duration::from_millis(400)), Some("ab"));
        assert_eq!(debouncer.poll(start + Duration::from_millis(900)), None);
    }

    #[test]
    fn test_cancel_and_flush() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        debouncer.arm(1, start);
        assert!(debouncer.cancel());
        assert!(!debouncer.is_pending());

        debouncer.arm(2, start);
        assert_eq!(debouncer.deadline(), Some(start + Duration::from_millis(50)));
        assert_eq!(debouncer.flush(), Some(2));
    }
}
