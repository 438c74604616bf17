//! Public result of one fetch, plus the internal outcome kind that keeps the
//! failure cause around for logging.

use serde::{Deserialize, Serialize};

/// What `fetch_otp` hands back to callers.
///
/// `otp: None` means "no OTP recovered this call", whatever the cause.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

impl OtpResult {
    pub fn absent() -> Self {
        Self { otp: None }
    }

    pub fn found(otp: impl Into<String>) -> Self {
        Self {
            otp: Some(otp.into()),
        }
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        self.otp.is_none()
    }
}

/// Internal outcome of one fetch. Every variant but `Otp` collapses to
/// [`OtpResult::absent`] at the public boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchOutcome {
    Otp { otp: String },
    PermissionDenied,
    NativeFailure { reason: String },
    NoOtpInText,
}

impl FetchOutcome {
    /// Apply the extraction result for a received message.
    pub fn from_extracted(otp: Option<String>) -> Self {
        match otp {
            Some(otp) => FetchOutcome::Otp { otp },
            None => FetchOutcome::NoOtpInText,
        }
    }

    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchOutcome::Otp { .. } => "otp",
            FetchOutcome::PermissionDenied => "permission_denied",
            FetchOutcome::NativeFailure { .. } => "native_failure",
            FetchOutcome::NoOtpInText => "no_otp_in_text",
        }
    }

    pub fn into_result(self) -> OtpResult {
        match self {
            FetchOutcome::Otp { otp } => OtpResult::found(otp),
            _ => OtpResult::absent(),
        }
    }
}

impl From<FetchOutcome> for OtpResult {
    fn from(outcome: FetchOutcome) -> Self {
        outcome.into_result()
    }
}
