use std::time::{Duration, Instant};

/// Fires at most once per interval; used to pace the RTSI poll loop to its
/// configured frequency without drifting.
#[derive(Clone, Copy, Debug)]
pub struct Repeater {
    interval: Duration,
    last_fired: Instant,
}

impl Repeater {
    pub fn every(interval: Duration) -> Self {
        Self { interval, last_fired: Instant::now() - interval }
    }

    /// Returns the remaining time until the next fire, or `Duration::ZERO`
    /// if it has already elapsed.
    pub fn until_next(&self) -> Duration {
        self.interval.saturating_sub(self.last_fired.elapsed())
    }

    /// Marks "fired now" — call after completing one cycle of work.
    pub fn reset(&mut self) {
        self.last_fired = Instant::now();
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn until_next_counts_down() {
        let r = Repeater::every(Duration::from_millis(50));
        assert_eq!(r.until_next(), Duration::ZERO);

        let mut r = Repeater::every(Duration::from_secs(10));
        r.reset();
        assert!(r.until_next() > Duration::from_secs(9));
    }
}
