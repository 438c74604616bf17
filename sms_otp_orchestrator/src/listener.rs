//! One-shot SMS subscription over the native broadcast source.
//!
//! Lifecycle: Idle -> Listening -> Resolved. The registration made while
//! Listening is owned by a [`Subscription`] guard and is removed on every exit
//! path, including the waiting future being dropped.

use std::sync::Arc;

use thiserror::Error;

use sms_otp_core::{SmsEvent, SMS_RECEIVED_EVENT};

use crate::adapter::{ListenerId, NativeError, SmsBroadcastSource, SmsSink};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerFailure {
    #[error("could not start listening: {0}")]
    Initiation(#[from] NativeError),
    /// The source dropped our sink without delivering anything.
    #[error("native source closed the subscription before an SMS arrived")]
    SourceClosed,
}

/// Live registration with the broadcast source. Dropping it unregisters.
struct Subscription {
    source: Arc<dyn SmsBroadcastSource>,
    id: Option<ListenerId>,
}

impl Subscription {
    fn register(source: Arc<dyn SmsBroadcastSource>, event_name: &str, sink: SmsSink) -> Self {
        let id = source.add_listener(event_name, sink);
        tracing::debug!(listener_id = id.0, event_name, "sms listener registered");
        Self {
            source,
            id: Some(id),
        }
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.source.remove_listener(id);
            tracing::debug!(listener_id = id.0, "sms listener released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct SmsListener {
    source: Arc<dyn SmsBroadcastSource>,
    event_name: String,
}

impl SmsListener {
    pub fn new(source: Arc<dyn SmsBroadcastSource>) -> Self {
        Self::with_event_name(source, SMS_RECEIVED_EVENT)
    }

    pub fn with_event_name(source: Arc<dyn SmsBroadcastSource>, event_name: impl Into<String>) -> Self {
        Self {
            source,
            event_name: event_name.into(),
        }
    }

    /// Arm the native receiver and wait for exactly one SMS.
    ///
    /// The listener is only registered once the source reports ready, and is
    /// removed before this returns.
    pub async fn await_one_message(&self) -> Result<SmsEvent, ListenerFailure> {
        if let Err(err) = self.source.start_listening().await {
            tracing::warn!("sms listener failed to start: {err}");
            return Err(err.into());
        }

        let (sink, rx) = SmsSink::channel();
        let mut subscription = Subscription::register(Arc::clone(&self.source), &self.event_name, sink);

        let received = rx.await;
        subscription.release();

        match received {
            Ok(event) => {
                tracing::debug!(len = event.raw_text.len(), "sms received");
                Ok(event)
            }
            Err(_) => {
                tracing::warn!("sms source closed without delivering");
                Err(ListenerFailure::SourceClosed)
            }
        }
    }
}
