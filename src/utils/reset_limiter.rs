use moka::future::Cache;
use std::time::Duration;

/// Expiring per-account counter used to throttle password-reset requests.
///
/// Entries live for one window and evaporate on their own, so the limiter
/// never grows unbounded and needs no sweeping. The window restarts on each
/// counted request.
#[derive(Clone)]
pub struct ResetLimiter {
    counters: Cache<String, u32>,
    max_requests: u32,
}

impl ResetLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let counters = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(window)
            .build();
        Self {
            counters,
            max_requests,
        }
    }

    /// Records one request for `key` and reports whether it is allowed.
    pub async fn try_acquire(&self, key: &str) -> bool {
        let key = key.trim().to_lowercase();
        let used = self.counters.get(&key).await.unwrap_or(0);
        if used >= self.max_requests {
            return false;
        }
        self.counters.insert(key, used + 1).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn allows_up_to_the_limit_then_blocks() {
        let limiter = ResetLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.try_acquire("amina").await);
        assert!(limiter.try_acquire("amina").await);
        assert!(limiter.try_acquire("amina").await);
        assert!(!limiter.try_acquire("amina").await);
    }

    #[actix_web::test]
    async fn keys_are_independent() {
        let limiter = ResetLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.try_acquire("amina").await);
        assert!(!limiter.try_acquire("amina").await);
        assert!(limiter.try_acquire("rashid").await);
    }

    #[actix_web::test]
    async fn keys_are_normalized() {
        let limiter = ResetLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.try_acquire("Amina").await);
        assert!(!limiter.try_acquire(" amina ").await);
    }
}
