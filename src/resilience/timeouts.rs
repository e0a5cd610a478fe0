//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound every external call with `request_timeout`
//! - Report the deadline that was exceeded
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - A timed-out call fails fast so neither loop hangs

use std::future::Future;
use std::time::Duration;

use tokio::time;

/// Deadline exceeded while waiting on an external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

/// Run `fut` with a deadline, flattening its result.
///
/// `on_timeout` maps the exceeded deadline into the caller's error type.
pub async fn with_deadline<T, E, F>(
    limit: Duration,
    fut: F,
    on_timeout: impl FnOnce(Elapsed) -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(Elapsed(limit))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let result: Result<(), String> = with_deadline(
            Duration::from_secs(1),
            async {
                time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            |Elapsed(d)| format!("timed out after {:?}", d),
        )
        .await;

        assert_eq!(result.unwrap_err(), "timed out after 1s");
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: Result<u32, &str> =
            with_deadline(Duration::from_secs(1), async { Err("boom") }, |_| "timeout").await;
        assert_eq!(result.unwrap_err(), "boom");
    }
}
