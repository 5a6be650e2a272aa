//! Deadline wrapper for calls to external services.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::metrics::record_external_call;

/// Run an external call under an explicit deadline and record its outcome.
///
/// Hitting the deadline yields `on_timeout()`; callers map that to their
/// transport error so a slow service is never mistaken for an empty answer.
pub(crate) async fn with_deadline<T, E, F>(
    service: &str,
    operation: &str,
    limit: Duration,
    call: F,
    on_timeout: impl FnOnce() -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => {
            record_external_call(service, operation, started, "success");
            Ok(value)
        }
        Ok(Err(e)) => {
            record_external_call(service, operation, started, "error");
            Err(e)
        }
        Err(_) => {
            warn!(service, operation, timeout_secs = limit.as_secs(), "External call timed out");
            record_external_call(service, operation, started, "timeout");
            Err(on_timeout())
        }
    }
}
