//! Fetch orchestration: permission gate, one-shot listen, extraction.
//!
//! One orchestrator owns at most one fetch at a time. Concurrent callers join
//! the flight already in progress instead of starting another, so the native
//! source never sees two registrations from the same orchestrator.
//!
//! The slot only keeps a weak handle: once every caller has dropped its
//! future, the flight is dropped with them and its registration released.

use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};

use sms_otp_core::{extract_otp, FetchOutcome, OtpCfg, OtpResult, PermissionState};

use crate::adapter::{PermissionStore, SmsBroadcastSource};
use crate::gate::PermissionGate;
use crate::listener::SmsListener;

type FetchFuture = BoxFuture<'static, FetchOutcome>;
type Flight = Shared<FetchFuture>;

struct InFlight {
    generation: u64,
    otp_length: usize,
    flight: WeakShared<FetchFuture>,
}

#[derive(Default)]
struct FlightSlot {
    next_generation: u64,
    current: Option<InFlight>,
}

pub struct FetchOtpOrchestrator {
    gate: Arc<PermissionGate>,
    listener: Arc<SmsListener>,
    // Never held across an await.
    slot: Mutex<FlightSlot>,
}

impl FetchOtpOrchestrator {
    pub fn new(permissions: Arc<dyn PermissionStore>, source: Arc<dyn SmsBroadcastSource>) -> Self {
        Self::from_parts(PermissionGate::new(permissions), SmsListener::new(source))
    }

    pub fn with_cfg(
        permissions: Arc<dyn PermissionStore>,
        source: Arc<dyn SmsBroadcastSource>,
        cfg: &OtpCfg,
    ) -> Self {
        Self::from_parts(
            PermissionGate::new(permissions),
            SmsListener::with_event_name(source, cfg.sms_event_name.clone()),
        )
    }

    pub fn from_parts(gate: PermissionGate, listener: SmsListener) -> Self {
        Self {
            gate: Arc::new(gate),
            listener: Arc::new(listener),
            slot: Mutex::new(FlightSlot::default()),
        }
    }

    /// Whether both SMS permissions are currently granted. Never prompts.
    pub async fn checking_sms_permission(&self) -> bool {
        self.gate.check_authorization().await == PermissionState::Granted
    }

    /// Prompt for the SMS permissions unless already granted.
    pub async fn request_sms_permission(&self) -> bool {
        self.gate.ensure_authorization().await
    }

    pub fn is_fetch_pending(&self) -> bool {
        self.slot
            .lock()
            .expect("fetch slot mutex poisoned")
            .current
            .as_ref()
            .is_some_and(|c| c.flight.upgrade().is_some())
    }

    /// Fetch one OTP of `otp_length` digits from the next incoming SMS.
    ///
    /// Every failure (permission denied, native failure, no code in the text)
    /// comes back as an absent OTP.
    pub async fn fetch_otp(&self, otp_length: usize) -> OtpResult {
        self.fetch_outcome(otp_length).await.into_result()
    }

    /// Same as [`fetch_otp`](Self::fetch_otp) but keeps the failure cause.
    pub async fn fetch_outcome(&self, otp_length: usize) -> FetchOutcome {
        let (generation, flight) = self.join_or_start(otp_length);
        let outcome = flight.await;
        self.finish(generation);
        outcome
    }

    fn join_or_start(&self, otp_length: usize) -> (u64, Flight) {
        let mut slot = self.slot.lock().expect("fetch slot mutex poisoned");

        if let Some((cur, flight)) = slot
            .current
            .as_ref()
            .and_then(|c| c.flight.upgrade().map(|f| (c, f)))
        {
            if cur.otp_length != otp_length {
                tracing::debug!(
                    pending_len = cur.otp_length,
                    requested_len = otp_length,
                    "joining in-flight fetch with a different otp length"
                );
            } else {
                tracing::debug!(generation = cur.generation, "joining in-flight fetch");
            }
            return (cur.generation, flight);
        }

        let generation = slot.next_generation;
        slot.next_generation += 1;

        let flight = run_fetch(Arc::clone(&self.gate), Arc::clone(&self.listener), otp_length)
            .boxed()
            .shared();
        slot.current = flight.downgrade().map(|weak| InFlight {
            generation,
            otp_length,
            flight: weak,
        });
        tracing::debug!(generation, otp_length, "fetch started");
        (generation, flight)
    }

    fn finish(&self, generation: u64) {
        let mut slot = self.slot.lock().expect("fetch slot mutex poisoned");
        // Only the first caller to settle clears the slot; a newer flight stays.
        if slot.current.as_ref().is_some_and(|c| c.generation == generation) {
            slot.current = None;
        }
    }
}

async fn run_fetch(gate: Arc<PermissionGate>, listener: Arc<SmsListener>, otp_length: usize) -> FetchOutcome {
    let outcome = if !gate.ensure_authorization().await {
        FetchOutcome::PermissionDenied
    } else {
        match listener.await_one_message().await {
            Ok(event) => FetchOutcome::from_extracted(extract_otp(&event.raw_text, otp_length)),
            Err(err) => FetchOutcome::NativeFailure {
                reason: err.to_string(),
            },
        }
    };

    tracing::info!(otp_length, outcome = outcome.kind(), "fetch settled");
    outcome
}
