use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::credentials::{CredentialPool, PooledCredential};
use crate::error::{GatewayError, Result};

/// States of one logical generation across credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting,
    Success,
    RotateAndRetry,
    FailedTerminal,
    Exhausted,
}

/// Decide where an attempt leads. `attempt` is 1-based.
pub fn next_state(
    error: Option<&GatewayError>,
    attempt: usize,
    max_attempts: usize,
    retry_timeouts: bool,
) -> RetryState {
    let Some(error) = error else {
        return RetryState::Success;
    };

    let rotatable =
        error.is_quota() || (retry_timeouts && matches!(error, GatewayError::Timeout(_)));

    if !rotatable {
        RetryState::FailedTerminal
    } else if attempt >= max_attempts {
        RetryState::Exhausted
    } else {
        RetryState::RotateAndRetry
    }
}

/// Sender half of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

/// Receiver half of a cancellation signal, cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once cancellation is requested. Never resolves if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            let cancelled = *self.0.borrow_and_update();
            if cancelled {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a linked cancellation handle and signal.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

/// Tunables for the retry loop.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    /// Attempts per call; `None` means one per pooled credential.
    pub max_attempts: Option<usize>,
    pub attempt_timeout: Option<Duration>,
    /// Rotate on timeout instead of failing the call.
    pub retry_timeouts: bool,
}

/// Runs one logical generation across the credential pool.
///
/// Only quota rejections rotate to the next credential. There is no backoff.
#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    pool: Arc<CredentialPool>,
    policy: RetryPolicy,
}

impl RetryCoordinator {
    pub fn new(pool: Arc<CredentialPool>) -> Self {
        Self {
            pool,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn max_attempts(&self) -> usize {
        self.policy.max_attempts.unwrap_or(self.pool.len()).max(1)
    }

    pub async fn run<T, F, Fut>(&self, attempt: F) -> Result<T>
    where
        F: FnMut(PooledCredential) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_with_cancel(attempt, None).await
    }

    pub async fn run_with_cancel<T, F, Fut>(
        &self,
        mut attempt: F,
        cancel: Option<&CancelSignal>,
    ) -> Result<T>
    where
        F: FnMut(PooledCredential) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt_number = 0;

        loop {
            attempt_number += 1;

            if cancel.is_some_and(CancelSignal::is_cancelled) {
                return Err(GatewayError::Cancelled);
            }

            let pooled = self.pool.next();
            let credential_index = pooled.index;
            debug!(
                target: "wanderai::retry",
                state = ?RetryState::Attempting,
                attempt = attempt_number,
                max_attempts,
                credential_index
            );

            let outcome = self.drive(attempt(pooled), cancel).await;
            let state = next_state(
                outcome.as_ref().err(),
                attempt_number,
                max_attempts,
                self.policy.retry_timeouts,
            );

            match (state, outcome) {
                (RetryState::Success, Ok(value)) => {
                    debug!(target: "wanderai::retry", state = ?state, attempt = attempt_number, credential_index);
                    return Ok(value);
                }
                (RetryState::RotateAndRetry, Err(err)) => {
                    warn!(
                        target: "wanderai::retry",
                        state = ?state,
                        attempt = attempt_number,
                        credential_index,
                        error = %err,
                        "rotating to next credential"
                    );
                }
                (RetryState::Exhausted, Err(err)) => {
                    warn!(
                        target: "wanderai::retry",
                        state = ?state,
                        attempts = attempt_number,
                        credential_index,
                        error = %err
                    );
                    return Err(match err {
                        GatewayError::Quota { message, .. } => GatewayError::QuotaExhausted {
                            attempts: attempt_number,
                            last_message: message,
                        },
                        other => other,
                    });
                }
                (_, Err(err)) => {
                    warn!(
                        target: "wanderai::retry",
                        state = ?RetryState::FailedTerminal,
                        attempt = attempt_number,
                        credential_index,
                        error = %err
                    );
                    return Err(err);
                }
                (_, Ok(value)) => return Ok(value),
            }
        }
    }

    async fn drive<T, Fut>(&self, fut: Fut, cancel: Option<&CancelSignal>) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let limit = self.policy.attempt_timeout;
        let timed = async move {
            match limit {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(GatewayError::Timeout(format!(
                        "model call exceeded {}ms",
                        limit.as_millis()
                    ))),
                },
                None => fut.await,
            }
        };

        match cancel {
            Some(signal) => {
                let mut signal = signal.clone();
                tokio::select! {
                    result = timed => result,
                    _ = signal.cancelled() => Err(GatewayError::Cancelled),
                }
            }
            None => timed.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quota(index: usize) -> GatewayError {
        GatewayError::Quota {
            credential_index: index,
            message: "RESOURCE_EXHAUSTED".to_string(),
        }
    }

    fn coordinator(size: usize) -> RetryCoordinator {
        let tokens: Vec<String> = (0..size).map(|idx| format!("key-{idx}")).collect();
        RetryCoordinator::new(Arc::new(CredentialPool::new(tokens).unwrap()))
    }

    #[test]
    fn test_state_transitions() {
        let timeout = GatewayError::Timeout("slow".to_string());
        let upstream = GatewayError::Upstream("500".to_string());

        assert_eq!(next_state(None, 1, 3, false), RetryState::Success);
        assert_eq!(next_state(Some(&quota(0)), 1, 3, false), RetryState::RotateAndRetry);
        assert_eq!(next_state(Some(&quota(2)), 3, 3, false), RetryState::Exhausted);
        assert_eq!(next_state(Some(&upstream), 1, 3, false), RetryState::FailedTerminal);
        assert_eq!(next_state(Some(&timeout), 1, 3, false), RetryState::FailedTerminal);
        assert_eq!(next_state(Some(&timeout), 1, 3, true), RetryState::RotateAndRetry);
    }

    #[tokio::test]
    async fn test_all_quota_failures_exhaust_after_pool_size_attempts() {
        let coordinator = coordinator(3);
        let calls = AtomicUsize::new(0);

        let result: Result<String> = coordinator
            .run(|pooled| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(quota(pooled.index)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(GatewayError::QuotaExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_non_quota_failure_fails_fast() {
        let coordinator = coordinator(4);
        let calls = AtomicUsize::new(0);

        let result: Result<String> = coordinator
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::Upstream("bad request".to_string())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(GatewayError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_success_after_rotation_stops_immediately() {
        let coordinator = coordinator(3);
        let seen = std::sync::Mutex::new(Vec::new());

        let result = coordinator
            .run(|pooled| {
                seen.lock().unwrap().push(pooled.index);
                async move {
                    if pooled.index == 0 {
                        Err(quota(0))
                    } else {
                        Ok(format!("ok from {}", pooled.index))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, "ok from 1");
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_max_attempts_override() {
        let coordinator = coordinator(2).with_policy(RetryPolicy {
            max_attempts: Some(5),
            ..RetryPolicy::default()
        });
        let calls = AtomicUsize::new(0);

        let result: Result<()> = coordinator
            .run(|pooled| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(quota(pooled.index)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(matches!(result, Err(GatewayError::QuotaExhausted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_terminal_by_default() {
        let coordinator = coordinator(3).with_policy(RetryPolicy {
            attempt_timeout: Some(Duration::from_millis(50)),
            ..RetryPolicy::default()
        });
        let calls = AtomicUsize::new(0);

        let result: Result<()> = coordinator
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Ok(())
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(GatewayError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_rotates_when_enabled() {
        let coordinator = coordinator(2).with_policy(RetryPolicy {
            attempt_timeout: Some(Duration::from_millis(50)),
            retry_timeouts: true,
            ..RetryPolicy::default()
        });

        let result = coordinator
            .run(|pooled| async move {
                if pooled.index == 0 {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
                Ok(pooled.index)
            })
            .await
            .unwrap();

        assert_eq!(result, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_makes_no_attempt() {
        let coordinator = coordinator(2);
        let (handle, signal) = cancellation();
        handle.cancel();
        let calls = AtomicUsize::new(0);

        let result: Result<()> = coordinator
            .run_with_cancel(
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                Some(&signal),
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(result, Err(GatewayError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_in_flight_attempt() {
        let coordinator = coordinator(2);
        let (handle, signal) = cancellation();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.cancel();
        });

        let result: Result<()> = coordinator
            .run_with_cancel(
                |_| async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                },
                Some(&signal),
            )
            .await;

        assert!(matches!(result, Err(GatewayError::Cancelled)));
    }
}
