//! Native collaborator seams: the platform permission store and the SMS
//! broadcast source.
//!
//! This module is intentionally small and policy-light:
//! - no permission policy (lives in `gate`)
//! - no subscription lifetime rules (lives in `listener`)
//!
//! Hosts implement [`PermissionStore`] and [`SmsBroadcastSource`] over their
//! platform bridge. [`SmsEventHub`] is a ready-made listener registry that a
//! source can delegate `add_listener`/`remove_listener`/emit to.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

use sms_otp_core::{PermissionStatus, SmsEvent, SmsPermission};

/// Shown when the host never wired the native module in.
pub const NOT_LINKED_MESSAGE: &str = "The native SMS reader doesn't seem to be linked. Make sure:\n\n\
     - You rebuilt the app after installing the package\n\
     - The host registered its native bridge before fetching";

/// Faults raised by the platform permission store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("permission store fault: {0}")]
    Fault(String),
    #[error("{}", NOT_LINKED_MESSAGE)]
    Unavailable,
}

/// Faults raised while arming the native SMS receiver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    /// The source answered through its error callback.
    #[error("native source refused to start: {0}")]
    Rejected(String),
    /// Starting the source threw before any callback fired.
    #[error("native source faulted while starting: {0}")]
    Fault(String),
    #[error("{}", NOT_LINKED_MESSAGE)]
    Unavailable,
}

/// Platform permission store.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn check(&self, permission: SmsPermission) -> Result<bool, PermissionError>;

    /// Show one combined prompt for `permissions` and report each answer.
    async fn request_many(
        &self,
        permissions: &[SmsPermission],
    ) -> Result<HashMap<SmsPermission, PermissionStatus>, PermissionError>;
}

/// Native SMS broadcast source.
///
/// `start_listening` arms the platform receiver; once it returns `Ok`, every
/// received SMS is emitted to the registered listeners for the named event.
#[async_trait]
pub trait SmsBroadcastSource: Send + Sync {
    async fn start_listening(&self) -> Result<(), NativeError>;

    fn add_listener(&self, event_name: &str, sink: SmsSink) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// Registration handle returned by `add_listener`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Single-use delivery slot handed to the broadcast source.
///
/// Clones share the slot: whichever clone delivers first wins, later
/// deliveries are dropped.
#[derive(Clone, Debug)]
pub struct SmsSink {
    slot: Arc<Mutex<Option<oneshot::Sender<SmsEvent>>>>,
}

impl SmsSink {
    pub fn channel() -> (SmsSink, oneshot::Receiver<SmsEvent>) {
        let (tx, rx) = oneshot::channel();
        let sink = SmsSink {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (sink, rx)
    }

    /// Hand one SMS to the waiting listener. Returns `false` when the slot was
    /// already used or the listener has gone away.
    pub fn deliver(&self, event: SmsEvent) -> bool {
        let tx = self
            .slot
            .lock()
            .expect("sms sink mutex poisoned")
            .take();
        match tx {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.slot
            .lock()
            .expect("sms sink mutex poisoned")
            .as_ref()
            .map_or(true, |tx| tx.is_closed())
    }
}

#[derive(Debug)]
struct Registered {
    id: ListenerId,
    event_name: String,
    sink: SmsSink,
}

/// In-memory listener registry for a broadcast source.
///
/// Emission order is registration order.
#[derive(Debug, Default)]
pub struct SmsEventHub {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Registered>>,
}

impl SmsEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, event_name: &str, sink: SmsSink) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .expect("sms event hub mutex poisoned")
            .push(Registered {
                id,
                event_name: event_name.to_string(),
                sink,
            });
        id
    }

    /// Returns `true` if `id` was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut guard = self.listeners.lock().expect("sms event hub mutex poisoned");
        let before = guard.len();
        guard.retain(|r| r.id != id);
        guard.len() != before
    }

    /// Emit one SMS to every listener of `event_name`. Returns how many
    /// listeners accepted it.
    pub fn emit(&self, event_name: &str, event: SmsEvent) -> usize {
        // Deliver outside the lock: a woken listener may unregister right away.
        let sinks: Vec<SmsSink> = self
            .listeners
            .lock()
            .expect("sms event hub mutex poisoned")
            .iter()
            .filter(|r| r.event_name == event_name)
            .map(|r| r.sink.clone())
            .collect();

        sinks
            .into_iter()
            .filter(|sink| sink.deliver(event.clone()))
            .count()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .expect("sms event hub mutex poisoned")
            .len()
    }
}
