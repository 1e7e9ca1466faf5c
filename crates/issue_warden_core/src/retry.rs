//! Timeout and retry for host platform calls.

use std::future::Future;

use tracing::{info, warn};

use crate::{configuration::RetryPolicy, errors::PlatformApiError};

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;

/// Runs `call` under the retry policy.
///
/// Every attempt is bounded by `policy.timeout`. Transient failures (timeouts,
/// 5xx responses, rate limiting, transport errors) are retried up to
/// `policy.max_retries` times after a fixed `policy.backoff` pause. Other failures
/// are returned immediately.
pub async fn call_with_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, PlatformApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, github_client::Error>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match attempt_once(policy, operation, call()).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_transient() || attempt > policy.max_retries {
            return Err(error);
        }
        back_off(policy, operation, attempt, &error).await;
    }
}

/// Runs a call that must not take effect twice, such as posting a comment.
///
/// Behaves like [`call_with_retry`], except that a timed out attempt may have
/// been applied by the platform. Before repeating it, `applied` is asked whether
/// the effect is already visible; if so the call is not repeated and `Ok(None)`
/// is returned.
pub async fn call_with_retry_checked<T, F, Fut, A, AFut>(
    policy: RetryPolicy,
    operation: &str,
    mut call: F,
    mut applied: A,
) -> Result<Option<T>, PlatformApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, github_client::Error>>,
    A: FnMut() -> AFut,
    AFut: Future<Output = Result<bool, PlatformApiError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let error = match attempt_once(policy, operation, call()).await {
            Ok(value) => return Ok(Some(value)),
            Err(error) => error,
        };

        if !error.is_transient() || attempt > policy.max_retries {
            return Err(error);
        }
        back_off(policy, operation, attempt, &error).await;

        if error.is_timeout() && applied().await? {
            info!(operation, "Timed out call was applied by the platform, not repeating it");
            return Ok(None);
        }
    }
}

async fn attempt_once<T, Fut>(
    policy: RetryPolicy,
    operation: &str,
    call: Fut,
) -> Result<T, PlatformApiError>
where
    Fut: Future<Output = Result<T, github_client::Error>>,
{
    match tokio::time::timeout(policy.timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(PlatformApiError::Api {
            operation: operation.to_string(),
            source,
        }),
        Err(_) => Err(PlatformApiError::Timeout {
            operation: operation.to_string(),
            timeout: policy.timeout,
        }),
    }
}

async fn back_off(policy: RetryPolicy, operation: &str, attempt: u32, error: &PlatformApiError) {
    warn!(
        operation,
        attempt,
        backoff_ms = policy.backoff.as_millis() as u64,
        error = %error,
        "Transient platform failure, retrying"
    );
    tokio::time::sleep(policy.backoff).await;
}
