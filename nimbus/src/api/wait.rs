//! Polling helpers for eventually-consistent Nimbus operations
//!
//! Create/update/delete calls return before the backend reaches its
//! terminal state; resources poll through these helpers until the state
//! machine settles or the deadline passes.

use super::error::ApiError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl WaitConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Defaults for provisioning waits
    pub fn create() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(1800))
    }

    /// Defaults for in-place change waits
    pub fn update() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(900))
    }

    /// Defaults for teardown waits
    pub fn delete() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(900))
    }
}

/// One poll observation.
pub enum WaitOutcome<T> {
    /// Terminal success, carries the final object
    Done(T),
    /// Not there yet, poll again
    Pending,
    /// Terminal failure state reported by the backend
    Failed(String),
}

/// Polls until the closure reports a terminal outcome or the deadline
/// passes. `what` names the operation in timeout and failure errors.
pub async fn wait_until<T, F, Fut>(
    config: WaitConfig,
    what: &str,
    mut poll: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<WaitOutcome<T>, ApiError>>,
{
    let deadline = Instant::now() + config.timeout;

    loop {
        match poll().await? {
            WaitOutcome::Done(value) => return Ok(value),
            WaitOutcome::Failed(state) => {
                return Err(ApiError::WaitFailed {
                    what: what.to_string(),
                    state,
                })
            }
            WaitOutcome::Pending => {}
        }

        if Instant::now() + config.interval > deadline {
            return Err(ApiError::WaitTimeout {
                what: what.to_string(),
                secs: config.timeout.as_secs(),
            });
        }
        tokio::time::sleep(config.interval).await;
    }
}

/// Deletion wait: polls until the closure returns NotFound, which is the
/// terminal success for a teardown.
pub async fn wait_until_gone<T, F, Fut>(
    config: WaitConfig,
    what: &str,
    mut poll: F,
) -> Result<(), ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let deadline = Instant::now() + config.timeout;

    loop {
        match poll().await {
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
            Ok(_) => {}
        }

        if Instant::now() + config.interval > deadline {
            return Err(ApiError::WaitTimeout {
                what: what.to_string(),
                secs: config.timeout.as_secs(),
            });
        }
        tokio::time::sleep(config.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> WaitConfig {
        WaitConfig::new(Duration::from_millis(1), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn returns_value_once_done() {
        let polls = AtomicU32::new(0);
        let result = wait_until(fast(), "instance create", || async {
            if polls.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(WaitOutcome::Pending)
            } else {
                Ok(WaitOutcome::Done("ACTIVE"))
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "ACTIVE");
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_state_is_terminal() {
        let result: Result<(), _> = wait_until(fast(), "instance create", || async {
            Ok(WaitOutcome::Failed("FAILED".to_string()))
        })
        .await;

        match result {
            Err(ApiError::WaitFailed { what, state }) => {
                assert_eq!(what, "instance create");
                assert_eq!(state, "FAILED");
            }
            other => panic!("expected WaitFailed, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn times_out_when_never_terminal() {
        let result: Result<(), _> =
            wait_until(fast(), "instance create", || async { Ok(WaitOutcome::Pending) }).await;

        assert!(matches!(result, Err(ApiError::WaitTimeout { .. })));
    }

    #[tokio::test]
    async fn poll_errors_propagate() {
        let result: Result<(), _> = wait_until(fast(), "instance create", || async {
            Err(ApiError::AuthError)
        })
        .await;

        assert!(matches!(result, Err(ApiError::AuthError)));
    }

    #[tokio::test]
    async fn gone_treats_not_found_as_success() {
        let polls = AtomicU32::new(0);
        wait_until_gone(fast(), "instance delete", || async {
            if polls.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok("DELETING")
            } else {
                Err(ApiError::NotFound {
                    resource: "instance".to_string(),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gone_surfaces_other_errors() {
        let result = wait_until_gone(fast(), "instance delete", || async {
            Err::<(), _>(ApiError::RateLimited)
        })
        .await;

        assert!(matches!(result, Err(ApiError::RateLimited)));
    }

    #[tokio::test]
    async fn gone_times_out_when_object_persists() {
        let result = wait_until_gone(fast(), "instance delete", || async { Ok("ACTIVE") }).await;

        assert!(matches!(result, Err(ApiError::WaitTimeout { .. })));
    }
}
