/// Per-IP limits for the unauthenticated credential endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RateLimits {
    pub login_attempts_per_hour: u32,
    pub signups_per_day: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login_attempts_per_hour: 10,
            signups_per_day: 20,
        }
    }
}

impl RateLimits {
    /// Limit and window for a throttled action, if any.
    pub fn for_action(&self, action: &str) -> Option<(u32, RateWindow)> {
        match action {
            "login" => Some((self.login_attempts_per_hour, RateWindow::Hour)),
            "signup" => Some((self.signups_per_day, RateWindow::Day)),
            _ => None,
        }
    }
}

/// Time window for rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateWindow {
    Hour,
    Day,
}

impl RateWindow {
    pub fn seconds(&self) -> u64 {
        match self {
            RateWindow::Hour => 3600,
            RateWindow::Day => 86400,
        }
    }
}

/// Calculate current window timestamp for rate limiting
pub fn current_window(window_seconds: u64) -> u64 {
    let now = time::OffsetDateTime::now_utc().unix_timestamp().max(0) as u64;
    now / window_seconds
}
