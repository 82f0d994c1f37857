//! Wall-clock bound on LLM calls.

use super::{CompletionRequest, LlmProvider};
use crate::{Error, Result};
use std::sync::{Arc, mpsc};
use std::time::Duration;

/// Runs a completion on a worker thread and waits at most `timeout`.
///
/// # Thread Lifecycle
///
/// If the bound is exceeded the result is discarded and the worker runs to
/// completion on its own; the HTTP client's request timeout caps how long
/// that takes. A zero `timeout` calls the provider inline.
///
/// # Errors
///
/// Returns the provider's error, [`Error::Timeout`] when the bound is hit, or
/// an operation failure if the worker disappears without answering.
pub fn complete_with_deadline(
    provider: &Arc<dyn LlmProvider>,
    request: CompletionRequest,
    timeout: Duration,
    operation: &'static str,
) -> Result<String> {
    if timeout.is_zero() {
        return provider.complete(&request);
    }

    let (tx, rx) = mpsc::channel();
    let parent_span = tracing::Span::current();
    let worker_provider = Arc::clone(provider);

    metrics::counter!("llm_calls_started_total", "operation" => operation).increment(1);

    std::thread::spawn(move || {
        let _parent = parent_span.enter();
        let span = tracing::debug_span!("llm.call", operation);
        let _guard = span.enter();
        let result = worker_provider.complete(&request);
        // Receiver is gone after a timeout; nothing to report.
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            let status = if result.is_ok() { "success" } else { "error" };
            metrics::counter!("llm_calls_completed_total", "operation" => operation, "status" => status)
                .increment(1);
            result
        },
        Err(mpsc::RecvTimeoutError::Timeout) => {
            metrics::counter!("llm_calls_completed_total", "operation" => operation, "status" => "timeout")
                .increment(1);
            tracing::debug!(operation, "LLM call timed out, worker will finish in background");
            Err(Error::Timeout {
                operation: operation.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        },
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            metrics::counter!("llm_calls_completed_total", "operation" => operation, "status" => "disconnected")
                .increment(1);
            Err(Error::failed(operation, "worker exited without a result"))
        },
    }
}
