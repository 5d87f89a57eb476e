use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::models::Event;

const SUBSCRIBER_CAPACITY: usize = 256;

struct LogState {
    events: Vec<Event>,
    closed: bool,
}

struct EventLogInner {
    state: Mutex<LogState>,
    notify: broadcast::Sender<Event>,
}

/// Append-only, session-scoped record of every emitted event.
///
/// Cloning yields another handle to the same log. Appends are serialized
/// behind one lock, and subscribers receive events in append order because
/// the broadcast happens while that lock is held.
#[derive(Clone)]
pub struct EventLog {
    inner: Arc<EventLogInner>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self {
            inner: Arc::new(EventLogInner {
                state: Mutex::new(LogState {
                    events: Vec::new(),
                    closed: false,
                }),
                notify,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Appends `event`; returns `false` once the log has been closed.
    pub fn append(&self, event: Event) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        // No receivers is fine; the log itself is the record.
        let _ = self.inner.notify.send(event.clone());
        state.events.push(event);
        true
    }

    /// Copy of the current contents, in append order.
    pub fn snapshot(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    /// The last `n` events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Event> {
        let state = self.lock();
        let start = state.events.len().saturating_sub(n);
        state.events[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live feed of events appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.notify.subscribe()
    }

    /// Refuses all further appends. Existing contents stay readable.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
