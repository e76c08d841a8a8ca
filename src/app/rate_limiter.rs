use anyhow::Result;

use crate::config::rate_limits::{current_window, RateWindow};
use crate::infra::cache::RedisCache;

#[derive(Clone)]
pub struct RateLimiter {
    cache: RedisCache,
}

impl RateLimiter {
    pub fn new(cache: RedisCache) -> Self {
        Self { cache }
    }

    /// Counts one attempt by IP address (for unauthenticated requests) and
    /// reports whether it went over `limit`. The counter is bumped before
    /// the comparison so concurrent attempts cannot all slip under it.
    pub async fn hit_ip(
        &self,
        ip: &str,
        action: &str,
        limit: u32,
        window: RateWindow,
    ) -> Result<bool> {
        let key = ip_key(ip, action, window);
        let count = self.cache.incr_with_expiry(&key, window.seconds()).await?;

        if count > limit {
            tracing::debug!(
                ip = ip,
                action = action,
                count = count,
                limit = limit,
                "IP rate limit exceeded"
            );
            return Ok(true);
        }

        Ok(false)
    }
}

fn ip_key(ip: &str, action: &str, window: RateWindow) -> String {
    let window_seconds = window.seconds();
    format!(
        "ratelimit:ip:{}:{}:{}",
        ip,
        action,
        current_window(window_seconds)
    )
}
