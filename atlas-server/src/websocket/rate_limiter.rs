use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding-window cap on inbound messages for one connection.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window: Duration,
    max_in_window: usize,
    recent: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        // 40 messages per 10 seconds is generous for a guessing game
        Self::with_limits(Duration::from_secs(10), 40)
    }

    pub fn with_limits(window: Duration, max_in_window: usize) -> Self {
        Self {
            window,
            max_in_window,
            recent: VecDeque::with_capacity(max_in_window),
        }
    }

    /// Record one message attempt; false means the sender is over budget.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        while self
            .recent
            .front()
            .is_some_and(|t| now.duration_since(*t) > self.window)
        {
            self.recent.pop_front();
        }
        if self.recent.len() >= self.max_in_window {
            return false;
        }
        self.recent.push_back(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_up_to_limit_then_rejected() {
        let mut limiter = RateLimiter::with_limits(Duration::from_secs(60), 5);
        for _ in 0..5 {
            assert!(limiter.allow());
        }
        assert!(!limiter.allow());
    }

    #[test]
    fn budget_recovers_after_window() {
        let mut limiter = RateLimiter::with_limits(Duration::from_millis(20), 2);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow());
    }
}
