use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Retry policy for upstream generation calls: capped exponential backoff,
/// attempts counted from 1.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration, backoff_max: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff_base, backoff_max }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff duration before retry number `attempt` (1-based, doubling).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let backoff_ms = self.backoff_base.as_millis() as u64 * (2_u64.pow(attempt - 1));
        Duration::from_millis(backoff_ms.min(self.backoff_max.as_millis() as u64))
    }

    pub async fn wait_before_retry(&self, attempt: u32) {
        let backoff = self.backoff_for(attempt);
        if backoff.is_zero() {
            return;
        }
        debug!("retrying in {:?} (attempt {})", backoff, attempt);
        sleep(backoff).await;
    }

    pub fn should_retry(&self, attempt: u32, error: &GenerateError) -> bool {
        if attempt >= self.max_attempts {
            debug!("max retry attempts ({}) reached", self.max_attempts);
            return false;
        }
        error.is_retryable
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(16))
    }
}

/// Error from a single upstream attempt, tagged with retryability.
/// Timeouts, connect failures and 5xx responses are worth retrying;
/// 4xx responses and malformed bodies are not.
#[derive(Debug)]
pub struct GenerateError {
    pub message: String,
    pub is_retryable: bool,
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GenerateError {}

impl GenerateError {
    pub fn retryable(message: String) -> Self {
        Self { message, is_retryable: true }
    }

    pub fn non_retryable(message: String) -> Self {
        Self { message, is_retryable: false }
    }

    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            Self::retryable(e.to_string())
        } else {
            Self::non_retryable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy::new(5, Duration::from_secs(1), Duration::from_secs(4));
        assert_eq!(p.backoff_for(1), Duration::from_secs(1));
        assert_eq!(p.backoff_for(2), Duration::from_secs(2));
        assert_eq!(p.backoff_for(3), Duration::from_secs(4));
        assert_eq!(p.backoff_for(4), Duration::from_secs(4));
    }

    #[test]
    fn retry_respects_attempt_limit_and_class() {
        let p = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_secs(1));
        let transient = GenerateError::retryable("timeout".into());
        let fatal = GenerateError::non_retryable("400 bad request".into());
        assert!(p.should_retry(1, &transient));
        assert!(p.should_retry(2, &transient));
        assert!(!p.should_retry(3, &transient));
        assert!(!p.should_retry(1, &fatal));
    }

    #[test]
    fn zero_attempts_clamps_to_one() {
        let p = RetryPolicy::new(0, Duration::from_secs(1), Duration::from_secs(1));
        assert_eq!(p.max_attempts(), 1);
    }
}
