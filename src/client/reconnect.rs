//! Reconnection controller
//!
//! Owns the attempt counter and the retry task. Each run of the task is an
//! explicit loop: check the cap, bump the counter, announce the attempt,
//! sleep the fixed delay, try to connect. The counter is reset by a
//! successful connect; a cancelled task never touches the session again.
//!
//! A failed attempt emits only `error` and moves on to the next attempt.
//! `disconnected` fires once per lost link, from disconnect handling, not
//! once per failed retry. An explicit `Client::connect` that fails runs the
//! full disconnect handling instead, so it emits both and may start this
//! loop.

use std::sync::Weak;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::events::ReconnectAttempt;
use super::session::{Inner, SessionState};
use crate::utils::error::SessionError;

#[derive(Debug, Default)]
pub(crate) struct ReconnectController {
    attempts: AtomicU32,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReconnectController {
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.attempts.store(0, Ordering::SeqCst);
    }

    /// Claims the next attempt number, or `None` once `max` is reached.
    fn next_attempt(&self, max: Option<u32>) -> Option<u32> {
        let current = self.attempts();
        if max.is_some_and(|max| current >= max) {
            return None;
        }
        Some(self.attempts.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Aborts the scheduled retry, if any.
    pub(crate) fn cancel(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Replaces any running retry task with a fresh one.
    pub(crate) fn start(&self, session: Weak<Inner>) {
        let task = tokio::spawn(run(session));
        if let Some(previous) = self.task.lock().replace(task) {
            previous.abort();
        }
    }
}

async fn run(session: Weak<Inner>) {
    loop {
        let Some(inner) = session.upgrade() else {
            return;
        };
        let max_attempts = inner.settings.reconnect.max_attempts;

        let Some(attempt) = inner.reconnect.next_attempt(max_attempts) else {
            let err = SessionError::ReconnectExhausted {
                attempts: inner.reconnect.attempts(),
            };
            error!("{err}; giving up on {}", inner.settings.url);
            inner.set_state(SessionState::Disconnected);
            inner.events.error.emit(&err);
            return;
        };

        inner.set_state(SessionState::Reconnecting);
        match max_attempts {
            Some(max) => info!("Reconnecting to {} (attempt {attempt}/{max})", inner.settings.url),
            None => info!("Reconnecting to {} (attempt {attempt})", inner.settings.url),
        }
        inner.events.reconnecting.emit(&ReconnectAttempt {
            attempt,
            max_attempts,
        });

        let delay = inner.settings.reconnect_delay();
        drop(inner);
        tokio::time::sleep(delay).await;

        let Some(inner) = session.upgrade() else {
            return;
        };
        if inner.is_closed() {
            return;
        }

        match inner.establish().await {
            Ok(()) => return,
            // Lost again mid-replay; disconnect handling already restarted us.
            Err(SessionError::NotConnected) => return,
            Err(e) => {
                warn!("Reconnect attempt {attempt} failed: {e}");
                inner.set_state(SessionState::Disconnected);
                inner.events.error.emit(&e);
            }
        }
    }
}
