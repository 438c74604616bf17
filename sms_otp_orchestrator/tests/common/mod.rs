#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use sms_otp_core::{PermissionStatus, SmsEvent, SmsPermission, SMS_RECEIVED_EVENT};
use sms_otp_orchestrator::{
    ListenerId, NativeError, PermissionError, PermissionStore, SmsBroadcastSource, SmsEventHub,
    SmsSink,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Permission store with scripted answers and call counters.
#[derive(Default)]
pub struct FakePermissions {
    pub receive: AtomicBool,
    pub read: AtomicBool,
    /// What the prompt answers for both permissions.
    pub grant_on_request: AtomicBool,
    pub check_fault: AtomicBool,
    pub request_fault: AtomicBool,
    pub checks: AtomicUsize,
    pub requests: AtomicUsize,
}

impl FakePermissions {
    pub fn granted() -> Arc<Self> {
        let p = Self::default();
        p.receive.store(true, Ordering::SeqCst);
        p.read.store(true, Ordering::SeqCst);
        Arc::new(p)
    }

    /// Nothing granted yet; the prompt answers `grant`.
    pub fn prompting(grant: bool) -> Arc<Self> {
        let p = Self::default();
        p.grant_on_request.store(grant, Ordering::SeqCst);
        Arc::new(p)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionStore for FakePermissions {
    async fn check(&self, permission: SmsPermission) -> Result<bool, PermissionError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.check_fault.load(Ordering::SeqCst) {
            return Err(PermissionError::Fault("check blew up".into()));
        }
        Ok(match permission {
            SmsPermission::ReceiveSms => self.receive.load(Ordering::SeqCst),
            SmsPermission::ReadSms => self.read.load(Ordering::SeqCst),
        })
    }

    async fn request_many(
        &self,
        permissions: &[SmsPermission],
    ) -> Result<HashMap<SmsPermission, PermissionStatus>, PermissionError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.request_fault.load(Ordering::SeqCst) {
            return Err(PermissionError::Fault("dialog crashed".into()));
        }
        let grant = self.grant_on_request.load(Ordering::SeqCst);
        if grant {
            self.receive.store(true, Ordering::SeqCst);
            self.read.store(true, Ordering::SeqCst);
        }
        let status = if grant { PermissionStatus::Granted } else { PermissionStatus::Denied };
        Ok(permissions.iter().map(|p| (*p, status)).collect())
    }
}

/// Broadcast source backed by an [`SmsEventHub`], counting registrations.
pub struct FakeSource {
    pub hub: SmsEventHub,
    pub start_error: Mutex<Option<NativeError>>,
    pub starts: AtomicUsize,
    pub adds: AtomicUsize,
    pub removes: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hub: SmsEventHub::new(),
            start_error: Mutex::new(None),
            starts: AtomicUsize::new(0),
            adds: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
        })
    }

    pub fn failing(err: NativeError) -> Arc<Self> {
        let s = Self::new();
        *s.start_error.lock().unwrap() = Some(err);
        s
    }

    pub fn adds(&self) -> usize {
        self.adds.load(Ordering::SeqCst)
    }

    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn emit(&self, text: &str) -> usize {
        self.hub.emit(SMS_RECEIVED_EVENT, SmsEvent::new(text))
    }

    /// Yield until someone is listening, then emit `text`.
    pub async fn emit_when_listening(&self, text: &str) -> usize {
        while self.hub.listener_count() == 0 {
            tokio::task::yield_now().await;
        }
        self.emit(text)
    }
}

#[async_trait]
impl SmsBroadcastSource for FakeSource {
    async fn start_listening(&self) -> Result<(), NativeError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        match self.start_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn add_listener(&self, event_name: &str, sink: SmsSink) -> ListenerId {
        self.adds.fetch_add(1, Ordering::SeqCst);
        self.hub.add_listener(event_name, sink)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.hub.remove_listener(id);
    }
}
