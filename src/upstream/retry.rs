//! Bounded retries with escalating timeouts and capped exponential backoff.
//!
//! The upstream lives on a host that sleeps when idle and can take around
//! thirty seconds to wake up. Only timeouts are retried; every other failure
//! is returned on the spot.

use std::time::Duration;

use super::{FetchError, FetchRequest, Transport, UpstreamResponse, BROWSER_USER_AGENT};

/// Retry parameters for [`fetch_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts. Zero behaves like one.
    pub max_retries: u32,
    /// Timeout of the first attempt; attempt `i` gets `initial_timeout * (i + 1)`.
    pub initial_timeout: Duration,
    /// Wait after the first timed-out attempt, doubled on each further one.
    pub backoff_base: Duration,
    /// Upper bound for the wait between attempts.
    pub backoff_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_timeout: Duration::from_secs(60),
            backoff_base: Duration::from_secs(5),
            backoff_cap: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Number of attempts actually made.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Timeout for the 0-based `attempt`.
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.initial_timeout.saturating_mul(attempt.saturating_add(1))
    }

    /// Wait after the 0-based `attempt` timed out.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor).min(self.backoff_cap)
    }
}

/// GET `url`, retrying timed-out attempts according to `policy`.
///
/// # Errors
/// Returns the last [`FetchError::Timeout`] once every attempt has timed
/// out, or the first non-timeout error as soon as it happens.
pub async fn fetch_with_retry(
    transport: &dyn Transport,
    url: &str,
    policy: &RetryPolicy,
) -> Result<UpstreamResponse, FetchError> {
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        let timeout = policy.timeout_for(attempt);
        tracing::info!(
            attempt = attempt + 1,
            max_attempts = attempts,
            timeout_ms = timeout.as_millis() as u64,
            "Sending upstream request"
        );

        let request = FetchRequest {
            url,
            timeout: Some(timeout),
            user_agent: Some(BROWSER_USER_AGENT),
        };

        let err = match transport.get(request).await {
            Ok(response) => {
                tracing::info!(
                    attempt = attempt + 1,
                    status = response.status,
                    "Upstream request succeeded"
                );
                return Ok(response);
            }
            Err(err) => err,
        };

        tracing::warn!(attempt = attempt + 1, error = %err, "Upstream request failed");

        if !err.is_timeout() || attempt + 1 >= attempts {
            return Err(err);
        }

        let delay = policy.backoff_for(attempt);
        tracing::info!(delay_ms = delay.as_millis() as u64, "Waiting before retry");
        tokio::time::sleep(delay).await;

        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::testing::MockTransport;
    use tokio::time::Instant;

    const URL: &str = "http://upstream.test/result/?query=x";

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_timeout: Duration::from_millis(100),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_timeouts_escalate_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.timeout_for(0), Duration::from_secs(60));
        assert_eq!(policy.timeout_for(1), Duration::from_secs(120));
        assert_eq!(policy.timeout_for(4), Duration::from_secs(300));
    }

    #[test]
    fn test_backoff_doubles_and_caps_at_thirty_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(0), Duration::from_secs(5));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(10));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(20));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(30));
        assert_eq!(policy.backoff_for(40), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_two_timeouts() {
        let transport = MockTransport::new()
            .then_timeout()
            .then_timeout()
            .then_json(r#"{"results":[]}"#);
        let started = Instant::now();

        let response = fetch_with_retry(&transport, URL, &policy(5)).await.unwrap();

        assert_eq!(response.body, br#"{"results":[]}"#);
        assert_eq!(transport.call_count(), 3);
        assert_eq!(
            transport.timeouts(),
            vec![
                Some(Duration::from_millis(100)),
                Some(Duration::from_millis(200)),
                Some(Duration::from_millis(300)),
            ]
        );
        // 5s after the first timeout, 10s after the second.
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_timeout_error_is_not_retried() {
        let transport = MockTransport::new()
            .then_error(FetchError::Network("dns error".into()))
            .then_json("{}");

        let err = fetch_with_retry(&transport, URL, &policy(5)).await.unwrap_err();

        assert!(matches!(err, FetchError::Network(_)));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_status_error_is_not_retried() {
        let transport = MockTransport::new().then_error(FetchError::Status(503));

        let err = fetch_with_retry(&transport, URL, &policy(5)).await.unwrap_err();

        assert!(matches!(err, FetchError::Status(503)));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_retries() {
        let transport = MockTransport::new().always_timeout();

        let err = fetch_with_retry(&transport, URL, &policy(5)).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(transport.call_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_still_attempts_once() {
        let transport = MockTransport::new().always_timeout();

        let err = fetch_with_retry(&transport, URL, &policy(0)).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_browser_user_agent() {
        let transport = MockTransport::new().then_json("{}");

        fetch_with_retry(&transport, URL, &policy(1)).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].url, URL);
        assert_eq!(calls[0].user_agent.as_deref(), Some(BROWSER_USER_AGENT));
    }
}
