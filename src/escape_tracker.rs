use std::time::Duration;

/// How close together cancel gestures must land to count as one streak.
const PANIC_WINDOW: Duration = Duration::from_millis(1000);
/// Gestures within the window needed to fire the bypass.
const PANIC_THRESHOLD: u32 = 3;

/// Counts rapid cancel gestures and signals the emergency bypass.
///
/// A single Escape must never unlock anything by accident, but three rapid
/// presses are deliberate and must always work, even when the authentication
/// agent is unresponsive.
#[derive(Debug)]
pub struct EscapePanicTracker {
    count: u32,
    last: Option<Duration>,
}

impl EscapePanicTracker {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            count: 0,
            last: None,
        }
    }

    /// Registers a cancel gesture at `now` and returns whether the bypass fired.
    ///
    /// Timestamps come from the monotonic clock. A gap longer than the panic
    /// window restarts the streak at 1, not 0: the gesture that broke the
    /// streak is itself the first of the next one.
    pub fn on_cancel_gesture(&mut self, now: Duration) -> bool {
        let within_window = self
            .last
            .is_some_and(|last| now.saturating_sub(last) < PANIC_WINDOW);

        if within_window {
            self.count += 1;
        } else {
            self.count = 1;
        }
        self.last = Some(now);

        self.count >= PANIC_THRESHOLD
    }

    /// Zeroes the streak. Only session teardown does this.
    pub fn reset(&mut self) {
        self.count = 0;
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn three_rapid_gestures_trigger() {
        let mut tracker = EscapePanicTracker::new();
        assert!(!tracker.on_cancel_gesture(ms(0)));
        assert!(!tracker.on_cancel_gesture(ms(300)));
        assert!(tracker.on_cancel_gesture(ms(600)));
    }

    #[test]
    fn slow_gestures_do_not_trigger() {
        let mut tracker = EscapePanicTracker::new();
        assert!(!tracker.on_cancel_gesture(ms(0)));
        assert!(!tracker.on_cancel_gesture(ms(1500)));
        assert!(!tracker.on_cancel_gesture(ms(3000)));
    }

    #[test]
    fn gap_restarts_streak_at_one() {
        let mut tracker = EscapePanicTracker::new();
        assert!(!tracker.on_cancel_gesture(ms(0)));
        assert!(!tracker.on_cancel_gesture(ms(100)));
        // Long gap: the streak restarts counting from this gesture.
        assert!(!tracker.on_cancel_gesture(ms(5000)));
        assert!(!tracker.on_cancel_gesture(ms(5100)));
        assert!(tracker.on_cancel_gesture(ms(5200)));
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let mut tracker = EscapePanicTracker::new();
        assert!(!tracker.on_cancel_gesture(ms(0)));
        // A gap of exactly the window does not continue the streak.
        assert!(!tracker.on_cancel_gesture(ms(1000)));
        assert!(!tracker.on_cancel_gesture(ms(1999)));
        assert!(tracker.on_cancel_gesture(ms(2100)));
    }

    #[test]
    fn keeps_firing_while_rapid() {
        let mut tracker = EscapePanicTracker::new();
        assert!(!tracker.on_cancel_gesture(ms(0)));
        assert!(!tracker.on_cancel_gesture(ms(100)));
        assert!(tracker.on_cancel_gesture(ms(200)));
        assert!(tracker.on_cancel_gesture(ms(300)));
    }

    #[test]
    fn reset_clears_the_streak() {
        let mut tracker = EscapePanicTracker::new();
        assert!(!tracker.on_cancel_gesture(ms(0)));
        assert!(!tracker.on_cancel_gesture(ms(100)));
        tracker.reset();
        assert!(!tracker.on_cancel_gesture(ms(200)));
        assert!(!tracker.on_cancel_gesture(ms(300)));
        assert!(tracker.on_cancel_gesture(ms(400)));
    }
}
