//! Request correlation table
//!
//! Maps an in-flight request id to the completion of the caller awaiting it.
//! An entry leaves the table exactly once: when a matching frame arrives,
//! when its deadline passes, or when the awaiting future is dropped. The
//! losing path finds the entry gone and does nothing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::protocol::Message;
use crate::utils::error::{Result, SessionError};

type Completion = oneshot::Sender<Result<Message>>;

// Deadline used when `now + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug)]
struct PendingRequest {
    topic: String,
    deadline: Instant,
    completion: Completion,
}

#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    entries: Mutex<HashMap<String, PendingRequest>>,
}

impl PendingRequests {
    /// Registers `request_id` with a deadline of now + `timeout`.
    pub(crate) fn register(
        self: &Arc<Self>,
        request_id: String,
        topic: &str,
        timeout: Duration,
    ) -> PendingHandle {
        let (completion, receiver) = oneshot::channel();
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now + FAR_FUTURE);
        self.entries.lock().insert(
            request_id.clone(),
            PendingRequest {
                topic: topic.to_string(),
                deadline,
                completion,
            },
        );
        PendingHandle {
            table: Arc::clone(self),
            request_id,
            topic: topic.to_string(),
            deadline,
            timeout,
            receiver: Some(receiver),
        }
    }

    /// Resolves the request `message` answers, if it is still pending.
    ///
    /// A payload with an `error` field fails the request with that error.
    /// Returns false if no entry matched.
    pub(crate) fn complete(&self, message: &Message) -> bool {
        let Some(request_id) = message.request_id() else {
            return false;
        };
        let Some(entry) = self.entries.lock().remove(request_id) else {
            return false;
        };

        let outcome = match message.error_message() {
            Some(remote) => Err(SessionError::remote(remote)),
            None => Ok(message.clone()),
        };
        debug!(
            "Completing request {request_id} on {} ({:?} before deadline)",
            entry.topic,
            entry.deadline.saturating_duration_since(Instant::now())
        );
        // The awaiting side may already be gone; nothing to deliver then.
        let _ = entry.completion.send(outcome);
        true
    }

    pub(crate) fn remove(&self, request_id: &str) -> bool {
        self.entries.lock().remove(request_id).is_some()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, request_id: &str) -> bool {
        self.entries.lock().contains_key(request_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Fails every pending request with the error built by `make_error`.
    pub(crate) fn fail_all(&self, make_error: impl Fn() -> SessionError) -> usize {
        let drained: Vec<PendingRequest> = self.entries.lock().drain().map(|(_, e)| e).collect();
        let count = drained.len();
        for entry in drained {
            let _ = entry.completion.send(Err(make_error()));
        }
        count
    }
}

/// The awaiting side of a pending request. Dropping it removes the entry.
#[derive(Debug)]
pub(crate) struct PendingHandle {
    table: Arc<PendingRequests>,
    request_id: String,
    topic: String,
    deadline: Instant,
    timeout: Duration,
    receiver: Option<oneshot::Receiver<Result<Message>>>,
}

impl PendingHandle {
    pub(crate) fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Waits for the response, a remote error, or the deadline.
    pub(crate) async fn wait(mut self) -> Result<Message> {
        let Some(mut receiver) = self.receiver.take() else {
            return Err(SessionError::NotConnected);
        };

        match timeout_at(self.deadline, &mut receiver).await {
            Ok(Ok(outcome)) => outcome,
            // Entry dropped without an answer.
            Ok(Err(_)) => Err(SessionError::NotConnected),
            Err(_) => {
                if self.table.remove(&self.request_id) {
                    debug!("Request {} on {} timed out", self.request_id, self.topic);
                    return Err(self.timeout_error());
                }
                // The response won the race after the timer fired.
                receiver.try_recv().unwrap_or_else(|_| Err(self.timeout_error()))
            }
        }
    }

    fn timeout_error(&self) -> SessionError {
        SessionError::RequestTimeout {
            topic: self.topic.clone(),
            request_id: self.request_id.clone(),
            timeout_ms: saturating_millis(self.timeout),
        }
    }
}

impl Drop for PendingHandle {
    fn drop(&mut self) {
        self.table.remove(&self.request_id);
    }
}
