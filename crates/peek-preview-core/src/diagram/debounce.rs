use std::time::Duration;

use web_time::Instant;

/// One re-armable deadline.
///
/// Every [`arm`](Debouncer::arm) pushes the deadline out by the full delay;
/// [`take_due`](Debouncer::take_due) fires at most once per arming.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and report `true` if the deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
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
    fn test_fires_after_quiet_interval() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(200));
        debounce.arm(start);
        assert!(!debounce.take_due(start + Duration::from_millis(199)));
        assert!(debounce.take_due(start + Duration::from_millis(200)));
        assert!(!debounce.take_due(start + Duration::from_millis(400)));
    }

    #[test]
    fn test_rearm_pushes_deadline() {
        let start = Instant::now();
        let mut debounce = Debouncer::new(Duration::from_millis(200));
        debounce.arm(start);
        debounce.arm(start + Duration::from_millis(150));
        assert!(!debounce.take_due(start + Duration::from_millis(250)));
        assert!(debounce.take_due(start + Duration::from_millis(350)));
    }
}
