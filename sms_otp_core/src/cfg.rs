use serde::{Deserialize, Serialize};

/// Name of the native event carrying a received SMS.
pub const SMS_RECEIVED_EVENT: &str = "on_sms_received";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpCfg {
    pub otp_length: usize,
    pub poll_interval_ms: u64,
    /// `None` polls until an OTP shows up.
    pub max_poll_attempts: Option<u32>,
    pub sms_event_name: String,
}

impl Default for OtpCfg {
    fn default() -> Self {
        Self {
            otp_length: 6,
            poll_interval_ms: 1000,
            max_poll_attempts: None,
            sms_event_name: SMS_RECEIVED_EVENT.to_string(),
        }
    }
}
