use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

/// Fixed one-minute window counter, keyed by whatever identifies the caller
/// (the normalized email for login attempts).
pub struct RateLimiter<K: Eq + Hash> {
    requests: DashMap<K, (AtomicU32, AtomicI64)>,
    max_requests_per_minute: u32,
}

impl<K: Eq + Hash> RateLimiter<K> {
    pub fn new(max_requests_per_minute: u32) -> Self {
        Self {
            requests: DashMap::new(),
            max_requests_per_minute,
        }
    }

    pub fn check_and_increment(&self, key: K, current_time: i64) -> bool {
        let entry = self.requests.entry(key).or_insert_with(|| {
            (AtomicU32::new(0), AtomicI64::new(current_time))
        });

        let (count, window_start) = entry.value();
        let window_start_time = window_start.load(Ordering::Relaxed);

        if current_time - window_start_time >= 60 {
            window_start.store(current_time, Ordering::Relaxed);
            count.store(1, Ordering::Relaxed);
            return true;
        }

        let current_count = count.fetch_add(1, Ordering::Relaxed) + 1;

        current_count <= self.max_requests_per_minute
    }

    /// Forget the counter for `key`, e.g. after a successful login
    pub fn reset(&self, key: &K) {
        self.requests.remove(key);
    }

    pub fn cleanup_old_entries(&self, current_time: i64) {
        self.requests.retain(|_, (_, window_start)| {
            current_time - window_start.load(Ordering::Relaxed) < 60
        });
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn test_blocks_over_limit() {
        let limiter = RateLimiter::new(3);
        let now = 1000;

        for _ in 0..3 {
            assert!(limiter.check_and_increment(key("alice@x.com"), now));
        }
        assert!(!limiter.check_and_increment(key("alice@x.com"), now));
    }

    #[test]
    fn test_resets_after_window() {
        let limiter = RateLimiter::new(2);
        let now = 1000;

        assert!(limiter.check_and_increment(key("alice@x.com"), now));
        assert!(limiter.check_and_increment(key("alice@x.com"), now));
        assert!(!limiter.check_and_increment(key("alice@x.com"), now + 59));
        assert!(limiter.check_and_increment(key("alice@x.com"), now + 60));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1);
        let now = 1000;

        assert!(limiter.check_and_increment(key("alice@x.com"), now));
        assert!(!limiter.check_and_increment(key("alice@x.com"), now));
        assert!(limiter.check_and_increment(key("bob@x.com"), now));
    }

    #[test]
    fn test_reset_clears_counter() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.check_and_increment(key("alice@x.com"), 1000));
        limiter.reset(&key("alice@x.com"));
        assert!(limiter.check_and_increment(key("alice@x.com"), 1000));
    }

    #[test]
    fn test_cleanup_old_entries() {
        let limiter = RateLimiter::new(10);
        limiter.check_and_increment(key("old@x.com"), 1000);
        limiter.check_and_increment(key("new@x.com"), 1050);

        limiter.cleanup_old_entries(1070);

        assert_eq!(limiter.len(), 1);
        assert!(!limiter.is_empty());
    }
}
