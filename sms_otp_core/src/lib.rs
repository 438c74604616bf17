pub mod extract;
pub mod event;
pub mod outcome;
pub mod state;
pub mod cfg;

pub use extract::extract_otp;
pub use event::SmsEvent;
pub use outcome::{FetchOutcome, OtpResult};
pub use state::{PermissionState, PermissionStatus, SmsPermission};
pub use cfg::{OtpCfg, SMS_RECEIVED_EVENT};
