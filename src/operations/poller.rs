use std::time::Duration;

use bytes::Bytes;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    GenerationRequest, Operation, OperationOutcome, OperationsApi, ProgressMessages,
};
use crate::errors::{LabError, Result};

#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Wall-clock bound across every poll of one request.
    pub timeout: Duration,
    /// Consecutive transient status failures tolerated before giving up.
    pub poll_retries: u32,
    pub fetch_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 60,
            timeout: Duration::from_secs(15 * 60),
            poll_retries: 3,
            fetch_retries: 1,
        }
    }
}

/// Caller-side bookkeeping for one in-flight operation.
#[derive(Debug)]
struct PollState {
    operation: Operation,
    attempts: u32,
    consecutive_failures: u32,
    started: Instant,
}

impl PollState {
    fn new(operation: Operation) -> Self {
        Self {
            operation,
            attempts: 0,
            consecutive_failures: 0,
            started: Instant::now(),
        }
    }

    fn timeout_error(&self) -> LabError {
        LabError::Timeout {
            attempts: self.attempts,
            elapsed: self.started.elapsed(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollProgress<'a> {
    /// Number of the poll about to be issued, starting at 1.
    pub attempt: u32,
    pub message: &'a str,
}

pub struct Poller<A> {
    api: A,
    policy: PollPolicy,
    messages: ProgressMessages,
}

impl<A: OperationsApi> Poller<A> {
    pub fn new(api: A, policy: PollPolicy, messages: ProgressMessages) -> Self {
        Self {
            api,
            policy,
            messages,
        }
    }

    /// Sends the request once. Rejections are returned as-is, never retried.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<Operation> {
        request.validate()?;
        let operation = self.api.submit(request).await?;
        info!(
            target: "poller",
            operation = %operation.handle,
            done = operation.done,
            model = %request.model,
            "generation submitted"
        );
        Ok(operation)
    }

    /// Refreshes an operation. Finished operations come back unchanged without a remote call.
    pub async fn poll(&self, operation: &Operation) -> Result<Operation> {
        if operation.done {
            return Ok(operation.clone());
        }
        self.api.fetch_status(&operation.handle).await
    }

    pub async fn await_completion<F>(
        &self,
        operation: Operation,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<Operation>
    where
        F: FnMut(PollProgress<'_>) + Send,
    {
        let mut state = PollState::new(operation);
        // A timeout too large to represent leaves only the attempt limit.
        let deadline = state.started.checked_add(self.policy.timeout);

        while !state.operation.done {
            if cancel.is_cancelled() {
                return Err(LabError::Cancelled);
            }
            if state.attempts >= self.policy.max_attempts {
                warn!(target: "poller", operation = %state.operation.handle, attempts = state.attempts, "poll budget exhausted");
                return Err(state.timeout_error());
            }

            on_progress(PollProgress {
                attempt: state.attempts + 1,
                message: self.messages.phrase(state.attempts as usize),
            });

            let next = Instant::now() + self.policy.interval;
            let wake = deadline.map_or(next, |deadline| next.min(deadline));
            tokio::select! {
                _ = cancel.cancelled() => return Err(LabError::Cancelled),
                _ = sleep_until(wake) => {}
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(target: "poller", operation = %state.operation.handle, attempts = state.attempts, "operation deadline reached");
                return Err(state.timeout_error());
            }
            if cancel.is_cancelled() {
                return Err(LabError::Cancelled);
            }

            state.attempts += 1;
            let polled = tokio::select! {
                _ = cancel.cancelled() => return Err(LabError::Cancelled),
                polled = self.poll(&state.operation) => polled,
            };

            match polled {
                Ok(updated) => {
                    state.consecutive_failures = 0;
                    debug!(target: "poller", operation = %updated.handle, attempt = state.attempts, done = updated.done, "status polled");
                    state.operation = updated;
                }
                Err(err) if err.is_transient() => {
                    state.consecutive_failures += 1;
                    if state.consecutive_failures > self.policy.poll_retries {
                        return Err(LabError::OperationFailed(format!(
                            "status of {} unavailable after {} consecutive failures: {err}",
                            state.operation.handle, state.consecutive_failures
                        )));
                    }
                    warn!(target: "poller", operation = %state.operation.handle, error = %err, "transient poll failure, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        if let Some(OperationOutcome::Fault(fault)) = &state.operation.outcome {
            warn!(target: "poller", operation = %state.operation.handle, code = ?fault.code, message = %fault.message, "operation finished with an error");
            return Err(LabError::OperationFailed(fault.message.clone()));
        }

        info!(target: "poller", operation = %state.operation.handle, attempts = state.attempts, "operation completed");
        Ok(state.operation)
    }

    /// Downloads the first locator of a finished operation and returns the body untouched.
    pub async fn resolve_artifact(
        &self,
        operation: &Operation,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        if !operation.done {
            return Err(LabError::ArtifactMissing(format!(
                "{} has not completed",
                operation.handle
            )));
        }
        if let Some(OperationOutcome::Fault(fault)) = &operation.outcome {
            return Err(LabError::OperationFailed(fault.message.clone()));
        }
        let locator = operation.first_locator().ok_or_else(|| {
            LabError::ArtifactMissing(format!("{} returned no output locator", operation.handle))
        })?;

        let mut last_error = None;
        for attempt in 0..=self.policy.fetch_retries {
            if cancel.is_cancelled() {
                return Err(LabError::Cancelled);
            }
            match self.api.fetch_artifact(locator).await {
                Ok(bytes) => {
                    debug!(target: "poller", operation = %operation.handle, size = bytes.len(), "artifact downloaded");
                    return Ok(bytes);
                }
                Err(err @ LabError::ArtifactFetch(_)) => {
                    warn!(target: "poller", operation = %operation.handle, attempt, error = %err, "artifact download failed");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error
            .unwrap_or_else(|| LabError::ArtifactFetch("no download attempted".to_string())))
    }

    /// Submit, wait and download in one call.
    pub async fn generate<F>(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<Bytes>
    where
        F: FnMut(PollProgress<'_>) + Send,
    {
        if cancel.is_cancelled() {
            return Err(LabError::Cancelled);
        }
        let submitted = self.submit(request).await?;
        let completed = self.await_completion(submitted, cancel, on_progress).await?;
        self.resolve_artifact(&completed, cancel).await
    }
}
