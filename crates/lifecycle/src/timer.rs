use std::time::Duration;

/// Rolling history of per-frame durations.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    history: Vec<Duration>,
    next: usize,
    len: usize,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(120)
    }
}

impl FrameTimer {
    /// Keep the last `capacity` samples (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            history: vec![Duration::ZERO; capacity.max(1)],
            next: 0,
            len: 0,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.next] = dt;
        self.next = (self.next + 1) % self.history.len();
        self.len = (self.len + 1).min(self.history.len());
    }

    fn samples(&self) -> &[Duration] {
        &self.history[..self.len]
    }

    /// Most recent sample, if any.
    pub fn last(&self) -> Option<Duration> {
        if self.len == 0 {
            return None;
        }
        let cap = self.history.len();
        Some(self.history[(self.next + cap - 1) % cap])
    }

    pub fn average(&self) -> Duration {
        if self.len == 0 {
            return Duration::ZERO;
        }
        self.samples().iter().sum::<Duration>() / self.len as u32
    }

    pub fn max(&self) -> Duration {
        self.samples().iter().copied().max().unwrap_or_default()
    }

    pub fn min(&self) -> Duration {
        self.samples().iter().copied().min().unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_timer_reports_zero() {
        let timer = FrameTimer::new(4);
        assert_eq!(timer.count(), 0);
        assert_eq!(timer.average(), Duration::ZERO);
        assert_eq!(timer.last(), None);
    }

    #[test]
    fn tracks_history() {
        let mut timer = FrameTimer::new(3);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 3);
        assert_eq!(timer.average(), Duration::from_millis(20));
        assert_eq!(timer.max(), Duration::from_millis(30));
        assert_eq!(timer.min(), Duration::from_millis(10));
        assert_eq!(timer.last(), Some(Duration::from_millis(30)));
    }

    #[test]
    fn oldest_sample_is_overwritten() {
        let mut timer = FrameTimer::new(2);
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(20));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.average(), Duration::from_millis(25));
        assert_eq!(timer.last(), Some(Duration::from_millis(30)));
    }

    #[test]
    fn zero_capacity_keeps_one_sample() {
        let mut timer = FrameTimer::new(0);
        timer.record(Duration::from_millis(5));
        timer.record(Duration::from_millis(7));
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.last(), Some(Duration::from_millis(7)));
    }
}
