use std::time::{Duration, Instant};

/// A cancellable repeating deadline.
///
/// The timer does not run on its own: the owner polls it with the current
/// time and applies however many periods have elapsed since the last poll.
#[derive(Debug, Clone)]
pub struct RepeatingTimer {
    period: Duration,
    next: Option<Instant>,
}

impl RepeatingTimer {
    pub fn new(period: Duration) -> Self {
        RepeatingTimer {
            period: period.max(Duration::from_millis(1)),
            next: None,
        }
    }

    /// Schedules the first tick one period after `now`
    pub fn start(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }

    /// Time of the next tick, if running
    pub fn deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Number of ticks that fell due at or before `now`, advancing the deadline past them
    pub fn due(&mut self, now: Instant) -> u64 {
        let Some(next) = self.next else {
            return 0;
        };
        if now < next {
            return 0;
        }
        let period = self.period.as_nanos();
        let ticks = (now - next).as_nanos() / period + 1;
        let advance = Duration::from_nanos(u64::try_from(ticks * period).unwrap_or(u64::MAX));
        self.next = next.checked_add(advance);
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }
}
