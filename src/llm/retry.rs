//! Bounded retry with composite backoff around any LLM client
//!
//! [`RetryingLLMClient`] wraps an `Arc<dyn LLMClient>` and retries transient
//! failures. The wait before attempt `n + 1` is a fixed delay plus an
//! exponential term `multiplier * 2^(n - 1)` clamped to `[floor, ceiling]`.
//! With the defaults (3 attempts, 2s fixed, multiplier 1s, floor 4s,
//! ceiling 10s) a failing call is tried three times with 6s between tries.

use super::client::LLMClient;
use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_FIXED_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_EXP_MULTIPLIER: Duration = Duration::from_secs(1);
pub const DEFAULT_EXP_FLOOR: Duration = Duration::from_secs(4);
pub const DEFAULT_EXP_CEILING: Duration = Duration::from_secs(10);

/// Retry schedule for text-generation calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Constant part of every wait
    pub fixed_delay: Duration,
    /// Base of the exponential part
    pub exp_multiplier: Duration,
    /// Lower clamp of the exponential part
    pub exp_floor: Duration,
    /// Upper clamp of the exponential part
    pub exp_ceiling: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            fixed_delay: DEFAULT_FIXED_DELAY,
            exp_multiplier: DEFAULT_EXP_MULTIPLIER,
            exp_floor: DEFAULT_EXP_FLOOR,
            exp_ceiling: DEFAULT_EXP_CEILING,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt count and no waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            fixed_delay: Duration::ZERO,
            exp_multiplier: Duration::ZERO,
            exp_floor: Duration::ZERO,
            exp_ceiling: Duration::ZERO,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = 2u32.saturating_pow(attempt.saturating_sub(1));
        let raw = self.exp_multiplier.saturating_mul(exp);
        let clamped = raw.max(self.exp_floor).min(self.exp_ceiling.max(self.exp_floor));
        self.fixed_delay + clamped
    }
}

/// Client decorator that retries transient backend errors
pub struct RetryingLLMClient {
    inner: Arc<dyn LLMClient>,
    policy: RetryPolicy,
}

impl RetryingLLMClient {
    pub fn new(inner: Arc<dyn LLMClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl LLMClient for RetryingLLMClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.inner.chat(request.clone()).await {
                Ok(response) => {
                    if attempt > 1 {
                        debug!(
                            client = %self.inner.name(),
                            attempt,
                            "request succeeded after retry"
                        );
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if !err.is_transient() || attempt >= max_attempts {
                        if attempt > 1 {
                            warn!(
                                client = %self.inner.name(),
                                attempts = attempt,
                                error = %err,
                                "giving up after retries"
                            );
                        }
                        return Err(err);
                    }

                    let mut delay = self.policy.delay_after(attempt);
                    if let BackendError::RateLimitError {
                        retry_after: Some(seconds),
                    } = &err
                    {
                        delay = delay.max(Duration::from_secs(*seconds));
                    }

                    warn!(
                        client = %self.inner.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model_info(&self) -> Option<String> {
        self.inner.model_info()
    }
}

impl std::fmt::Debug for RetryingLLMClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingLLMClient")
            .field("inner", &self.inner.name())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLLMClient, MockResponse};

    fn retrying(mock: Arc<MockLLMClient>, attempts: u32) -> RetryingLLMClient {
        RetryingLLMClient::new(mock, RetryPolicy::immediate(attempts))
    }

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        // 2s fixed + max(4s, 1s * 2^0)
        assert_eq!(policy.delay_after(1), Duration::from_secs(6));
        // 2s fixed + max(4s, 1s * 2^1)
        assert_eq!(policy.delay_after(2), Duration::from_secs(6));
        // 2s fixed + 8s
        assert_eq!(policy.delay_after(4), Duration::from_secs(10));
        // ceiling
        assert_eq!(policy.delay_after(6), Duration::from_secs(12));
        assert_eq!(policy.delay_after(30), Duration::from_secs(12));
    }

    #[test]
    fn test_immediate_policy_has_no_delay() {
        let policy = RetryPolicy::immediate(5);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_after(3), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_responses(vec![
            MockResponse::error(BackendError::TimeoutError { seconds: 1 }),
            MockResponse::error(BackendError::NetworkError {
                message: "reset".to_string(),
            }),
            MockResponse::text("ok"),
        ]);

        let client = retrying(mock.clone(), 3);
        let response = client.chat(LLMRequest::new(vec![])).await.unwrap();

        assert_eq!(response.content_text(), "ok");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_propagates_last_error() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_responses(vec![
            MockResponse::error(BackendError::TimeoutError { seconds: 1 }),
            MockResponse::error(BackendError::TimeoutError { seconds: 2 }),
            MockResponse::error(BackendError::TimeoutError { seconds: 3 }),
            MockResponse::text("never reached"),
        ]);

        let client = retrying(mock.clone(), 3);
        let err = client.chat(LLMRequest::new(vec![])).await.unwrap_err();

        assert_eq!(err, BackendError::TimeoutError { seconds: 3 });
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.remaining_responses(), 1);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_responses(vec![
            MockResponse::error(BackendError::AuthenticationError {
                message: "invalid key".to_string(),
            }),
            MockResponse::text("unused"),
        ]);

        let client = retrying(mock.clone(), 3);
        let result = client.chat(LLMRequest::new(vec![])).await;

        assert!(matches!(
            result,
            Err(BackendError::AuthenticationError { .. })
        ));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_delegates_identity() {
        let mock = Arc::new(MockLLMClient::with_name("Scripted"));
        let client = retrying(mock, 3);
        assert_eq!(client.name(), "Scripted");
        assert_eq!(client.model_info(), Some("mock-model".to_string()));
    }
}
