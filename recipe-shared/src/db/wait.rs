/// Startup readiness gate
///
/// The server may start before its database is reachable (for example when
/// both come up together under a process supervisor). `wait_for_db` polls a
/// probe on a fixed interval until it succeeds.
///
/// # Example
///
/// ```no_run
/// use recipe_shared::db::pool::{create_pool, DatabaseConfig};
/// use recipe_shared::db::wait::{wait_for_db, WaitPolicy};
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let config = DatabaseConfig::default();
/// let pool = wait_for_db(WaitPolicy::default(), || create_pool(config.clone())).await?;
/// # Ok(())
/// # }
/// ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// How often, and how many times, to poll the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay between two failed attempts
    pub interval: Duration,

    /// Total attempts before giving up (None = retry forever)
    pub max_attempts: Option<u32>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

/// Polls `probe` until it succeeds
///
/// Returns the probe's value on the first success. When `max_attempts` is
/// reached, the last error is returned.
pub async fn wait_for_db<T, E, F, Fut>(policy: WaitPolicy, mut probe: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    info!("Waiting for database...");
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        match probe().await {
            Ok(value) => {
                info!(attempt, "Database available");
                return Ok(value);
            }
            Err(e) => {
                if policy.max_attempts.is_some_and(|max| attempt >= max) {
                    warn!(attempt, error = %e, "Database unavailable, giving up");
                    return Err(e);
                }

                warn!(
                    attempt,
                    error = %e,
                    retry_in_ms = policy.interval.as_millis() as u64,
                    "Database unavailable, waiting"
                );
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_ready_database_is_probed_once() {
        let calls = Cell::new(0);

        let result: Result<&str, String> = wait_for_db(WaitPolicy::default(), || {
            calls.set(calls.get() + 1);
            async { Ok("ready") }
        })
        .await;

        assert_eq!(result.unwrap(), "ready");
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_database_answers() {
        let calls = Cell::new(0);

        let result: Result<(), String> = wait_for_db(WaitPolicy::default(), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n <= 5 {
                    Err("connection refused".to_string())
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.get(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let policy = WaitPolicy {
            interval: Duration::from_millis(250),
            max_attempts: Some(3),
        };

        let result: Result<(), String> = wait_for_db(policy, || {
            calls.set(calls.get() + 1);
            async { Err("connection refused".to_string()) }
        })
        .await;

        assert_eq!(result.unwrap_err(), "connection refused");
        assert_eq!(calls.get(), 3);
    }
}
