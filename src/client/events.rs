//! Lifecycle notifications
//!
//! Each notification kind owns a [`Listeners`] set. Listeners are plain
//! closures; adding one returns a [`ListenerId`] that removes it again.
//! Emission snapshots the set first, so a listener may add or remove
//! listeners without deadlocking. A panicking listener is logged and does
//! not stop delivery to the others.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::error;

use crate::protocol::Message;
use crate::utils::error::SessionError;

pub type ListenerId = u64;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

pub struct Listeners<E: ?Sized> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(ListenerId, Listener<E>)>>,
}

impl<E: ?Sized> Listeners<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn add<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, Arc::new(listener)));
        id
    }

    /// Returns false if no listener had this id.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Calls every listener in registration order.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .entries
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!("Event listener panicked");
            }
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: ?Sized> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.len())
            .finish()
    }
}

/// Carried by the `reconnecting` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectAttempt {
    /// 1-based attempt number.
    pub attempt: u32,
    /// `None` when attempts are unbounded.
    pub max_attempts: Option<u32>,
}

/// Notifications a session exposes to application code.
#[derive(Debug, Default)]
pub struct SessionEvents {
    pub connected: Listeners<()>,
    pub disconnected: Listeners<()>,
    pub error: Listeners<SessionError>,
    pub reconnecting: Listeners<ReconnectAttempt>,
    /// Every successfully decoded inbound frame.
    pub message: Listeners<Message>,
}

impl SessionEvents {
    pub fn clear(&self) {
        self.connected.clear();
        self.disconnected.clear();
        self.error.clear();
        self.reconnecting.clear();
        self.message.clear();
    }
}
