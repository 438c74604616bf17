//! Caller-side polling: keep fetching until an OTP shows up.
//!
//! Retry policy stays out of `fetch_otp`; a UI that wants "wait for the code"
//! drives this loop itself.

use std::time::Duration;

use sms_otp_core::{FetchOutcome, OtpCfg, OtpResult};

use crate::orchestrator::FetchOtpOrchestrator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` keeps polling until an OTP arrives.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_cfg(&OtpCfg::default())
    }
}

impl PollPolicy {
    pub fn from_cfg(cfg: &OtpCfg) -> Self {
        Self {
            interval: Duration::from_millis(cfg.poll_interval_ms),
            max_attempts: cfg.max_poll_attempts,
        }
    }
}

/// Re-invoke `fetch_otp` every `policy.interval` until it yields an OTP or the
/// attempt budget runs out. `Some(0)` still makes one attempt.
pub async fn poll_until_otp(
    orchestrator: &FetchOtpOrchestrator,
    otp_length: usize,
    policy: PollPolicy,
) -> OtpResult {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let outcome = orchestrator.fetch_outcome(otp_length).await;
        if let FetchOutcome::Otp { .. } = outcome {
            tracing::info!(attempt, "otp received");
            return outcome.into_result();
        }

        tracing::debug!(attempt, outcome = outcome.kind(), "no otp yet");
        if policy.max_attempts.is_some_and(|max| attempt >= max.max(1)) {
            return OtpResult::absent();
        }
        tokio::time::sleep(policy.interval).await;
    }
}
