//! sms_otp_orchestrator
//!
//! Async orchestration layer around `sms_otp_core`:
//! - gate SMS access behind the receive/read permissions
//! - arm the native receiver and wait for exactly one SMS
//! - extract the OTP and collapse every failure into an absent result
//!
//! Non-goals:
//! - no runtime: futures are driven by the host (or the FFI layer); only
//!   `poll_until_otp` needs a tokio timer
//! - no retry policy inside `fetch_otp` (see `poll`)

pub mod adapter;
pub mod gate;
pub mod listener;
pub mod orchestrator;
pub mod poll;

pub use adapter::{
    ListenerId,
    NativeError,
    PermissionError,
    PermissionStore,
    SmsBroadcastSource,
    SmsEventHub,
    SmsSink,
    NOT_LINKED_MESSAGE,
};

pub use gate::PermissionGate;
pub use listener::{ListenerFailure, SmsListener};
pub use orchestrator::FetchOtpOrchestrator;
pub use poll::{poll_until_otp, PollPolicy};
