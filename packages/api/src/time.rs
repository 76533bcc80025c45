//! Platform timers.
//!
//! Native builds sleep on the tokio timer, web builds on `gloo-timers`
//! (`setTimeout`). Both are driven by whatever executor polls the future.

use std::future::Future;
use std::time::Duration;

use futures::future::{self, Either};

use crate::ApiError;

pub async fn sleep(duration: Duration) {
    #[cfg(target_arch = "wasm32")]
    gloo_timers::future::sleep(duration).await;
    #[cfg(not(target_arch = "wasm32"))]
    tokio::time::sleep(duration).await;
}

/// Resolve `fut`, or fail with [`ApiError::Timeout`] once `duration` elapses.
/// The inner future is dropped on timeout.
pub async fn with_timeout<F: Future>(duration: Duration, fut: F) -> Result<F::Output, ApiError> {
    let timer = std::pin::pin!(sleep(duration));
    let fut = std::pin::pin!(fut);
    match future::select(fut, timer).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(((), _)) => Err(ApiError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ready_future_wins() {
        let out = with_timeout(Duration::from_secs(1), async { 7 }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_future_times_out() {
        let out = with_timeout(Duration::from_secs(5), future::pending::<()>()).await;
        assert!(matches!(out, Err(ApiError::Timeout(d)) if d == Duration::from_secs(5)));
    }
}
