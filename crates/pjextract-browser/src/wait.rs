//! Bounded waiting on page conditions.

use std::future::Future;
use std::time::Duration;

use pjextract_core::AuthError;
use tokio::time::Instant;

/// Delay between two probes of a polled condition.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Run `fut` with a deadline; `step` names what was being waited for.
pub async fn within<T>(step: &'static str, timeout: Duration, fut: impl Future<Output = T>) -> Result<T, AuthError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| AuthError::Timeout {
            step,
            secs: timeout.as_secs(),
        })
}

/// Re-run `probe` every `interval` until it yields a value or `timeout`
/// elapses. The probe is always tried at least once.
pub async fn poll_until<T, F, Fut>(
    step: &'static str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<T, AuthError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(AuthError::Timeout {
                step,
                secs: timeout.as_secs(),
            });
        }
        tokio::time::sleep(interval).await;
    }
}
