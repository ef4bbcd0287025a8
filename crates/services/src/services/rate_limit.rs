use std::{
    collections::HashMap,
    net::IpAddr,
    sync::Mutex,
    time::{Duration, Instant},
};

use db::types::IntegrationPlatform;

/// Fixed-window request counter keyed by (platform, caller address).
///
/// A coarse abuse guard, not a hard quota: state is in-process only and lost
/// on restart. Shared across all request tasks, so every access goes through
/// the mutex.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<(IntegrationPlatform, IpAddr), Window>>,
}

#[derive(Debug)]
struct Window {
    count: u32,
    reset_at: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns false when the caller has exhausted the current window.
    pub fn check(&self, platform: IntegrationPlatform, addr: IpAddr) -> bool {
        self.check_at(platform, addr, Instant::now())
    }

    fn check_at(&self, platform: IntegrationPlatform, addr: IpAddr, now: Instant) -> bool {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|err| err.into_inner());

        let window = windows
            .entry((platform, addr))
            .or_insert_with(|| Window {
                count: 0,
                reset_at: now + self.window,
            });

        if now >= window.reset_at {
            window.count = 1;
            window.reset_at = now + self.window;
            return true;
        }

        window.count += 1;
        if window.count > self.max_requests {
            tracing::warn!(
                %platform,
                %addr,
                count = window.count,
                max = self.max_requests,
                "Webhook rate limit exceeded"
            );
            return false;
        }
        true
    }

    /// Drop expired windows so one-off callers don't accumulate forever.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|err| err.into_inner());
        let before = windows.len();
        windows.retain(|_, window| now < window.reset_at);
        before - windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> IpAddr {
        "203.0.113.9".parse().unwrap()
    }

    fn limiter(max: u32) -> RateLimiter {
        RateLimiter::new(max, Duration::from_secs(60))
    }

    #[test]
    fn allows_up_to_the_maximum() {
        let limiter = limiter(3);
        let now = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at(IntegrationPlatform::Gofood, addr(), now));
        }
    }

    #[test]
    fn rejects_the_request_after_the_maximum() {
        let limiter = limiter(100);
        let now = Instant::now();
        for _ in 0..100 {
            assert!(limiter.check_at(IntegrationPlatform::Gofood, addr(), now));
        }
        assert!(!limiter.check_at(IntegrationPlatform::Gofood, addr(), now));
    }

    #[test]
    fn a_new_window_resets_the_count() {
        let limiter = limiter(1);
        let now = Instant::now();
        assert!(limiter.check_at(IntegrationPlatform::Qris, addr(), now));
        assert!(!limiter.check_at(IntegrationPlatform::Qris, addr(), now));

        let later = now + Duration::from_secs(61);
        assert!(limiter.check_at(IntegrationPlatform::Qris, addr(), later));
    }

    #[test]
    fn platforms_and_addresses_are_tracked_independently() {
        let limiter = limiter(1);
        let now = Instant::now();
        let other: IpAddr = "198.51.100.4".parse().unwrap();

        assert!(limiter.check_at(IntegrationPlatform::Gofood, addr(), now));
        assert!(!limiter.check_at(IntegrationPlatform::Gofood, addr(), now));
        // Different platform, same address.
        assert!(limiter.check_at(IntegrationPlatform::Grabfood, addr(), now));
        // Same platform, different address.
        assert!(limiter.check_at(IntegrationPlatform::Gofood, other, now));
    }

    #[test]
    fn sweep_removes_only_expired_windows() {
        let limiter = limiter(5);
        let now = Instant::now();
        limiter.check_at(IntegrationPlatform::Gofood, addr(), now);
        limiter.check_at(IntegrationPlatform::Qris, addr(), now + Duration::from_secs(30));

        assert_eq!(limiter.sweep_at(now + Duration::from_secs(65)), 1);
        assert_eq!(limiter.sweep_at(now + Duration::from_secs(120)), 1);
    }
}
