//! Collaborator impls over the host's C callbacks.

use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Arc;

use async_trait::async_trait;

use sms_otp_core::{PermissionStatus, SmsPermission};
use sms_otp_orchestrator::{
    ListenerId, NativeError, PermissionError, PermissionStore, SmsBroadcastSource, SmsEventHub,
    SmsSink,
};

pub const SMS_OTP_PERMISSION_RECEIVE_SMS: u32 = 0;
pub const SMS_OTP_PERMISSION_READ_SMS: u32 = 1;

pub const SMS_OTP_STATUS_GRANTED: u32 = 0;
pub const SMS_OTP_STATUS_DENIED: u32 = 1;
pub const SMS_OTP_STATUS_NEVER_ASK_AGAIN: u32 = 2;

/// `start_listening` rc when the receiver refused because a permission is missing.
pub const SMS_OTP_START_MISSING_PERMISSION: i32 = 1;

const MISSING_PERMISSION_REASON: &str =
    "Required RECEIVE_SMS and READ_SMS permission. Please grant permission in the settings.";

/// Native callbacks supplied by the host app.
///
/// Return codes:
/// - `check_permission`: 1 granted, 0 denied, < 0 fault
/// - `request_permissions`: 0 ok (one status per permission written to
///   `out_status`), < 0 fault
/// - `start_listening`: 0 ready, > 0 refused (see `SMS_OTP_START_*`), < 0 fault
///
/// A null callback means the native module is not linked. Callbacks may be
/// invoked from whichever host thread is blocked in an `sms_otp_*` call, so
/// they and `ctx` must be thread-safe.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SmsOtpHostBridge {
    pub ctx: *mut c_void,
    pub check_permission: Option<unsafe extern "C" fn(ctx: *mut c_void, permission: u32) -> i32>,
    pub request_permissions: Option<
        unsafe extern "C" fn(
            ctx: *mut c_void,
            permissions: *const u32,
            len: usize,
            out_status: *mut u32,
        ) -> i32,
    >,
    pub start_listening: Option<unsafe extern "C" fn(ctx: *mut c_void) -> i32>,
}

// SAFETY: the host contract above requires `ctx` and the callbacks to be usable
// from any thread.
unsafe impl Send for SmsOtpHostBridge {}
unsafe impl Sync for SmsOtpHostBridge {}

impl SmsOtpHostBridge {
    pub const fn unlinked() -> Self {
        Self {
            ctx: std::ptr::null_mut(),
            check_permission: None,
            request_permissions: None,
            start_listening: None,
        }
    }
}

pub(crate) fn permission_to_ffi(p: SmsPermission) -> u32 {
    match p {
        SmsPermission::ReceiveSms => SMS_OTP_PERMISSION_RECEIVE_SMS,
        SmsPermission::ReadSms => SMS_OTP_PERMISSION_READ_SMS,
    }
}

fn status_from_ffi(v: u32) -> PermissionStatus {
    match v {
        SMS_OTP_STATUS_GRANTED => PermissionStatus::Granted,
        SMS_OTP_STATUS_NEVER_ASK_AGAIN => PermissionStatus::NeverAskAgain,
        _ => PermissionStatus::Denied,
    }
}

pub(crate) struct HostPermissions {
    pub(crate) bridge: SmsOtpHostBridge,
}

#[async_trait]
impl PermissionStore for HostPermissions {
    async fn check(&self, permission: SmsPermission) -> Result<bool, PermissionError> {
        let Some(check) = self.bridge.check_permission else {
            return Err(PermissionError::Unavailable);
        };
        let rc = unsafe { check(self.bridge.ctx, permission_to_ffi(permission)) };
        match rc {
            1 => Ok(true),
            0 => Ok(false),
            rc => Err(PermissionError::Fault(format!(
                "check {} failed with rc {rc}",
                permission.platform_id()
            ))),
        }
    }

    async fn request_many(
        &self,
        permissions: &[SmsPermission],
    ) -> Result<HashMap<SmsPermission, PermissionStatus>, PermissionError> {
        let Some(request) = self.bridge.request_permissions else {
            return Err(PermissionError::Unavailable);
        };
        let ids: Vec<u32> = permissions.iter().map(|p| permission_to_ffi(*p)).collect();
        let mut out = vec![SMS_OTP_STATUS_DENIED; ids.len()];
        let rc = unsafe { request(self.bridge.ctx, ids.as_ptr(), ids.len(), out.as_mut_ptr()) };
        if rc < 0 {
            return Err(PermissionError::Fault(format!("permission request failed with rc {rc}")));
        }
        Ok(permissions
            .iter()
            .zip(out)
            .map(|(p, s)| (*p, status_from_ffi(s)))
            .collect())
    }
}

pub(crate) struct HostSmsSource {
    pub(crate) bridge: SmsOtpHostBridge,
    pub(crate) hub: Arc<SmsEventHub>,
}

#[async_trait]
impl SmsBroadcastSource for HostSmsSource {
    async fn start_listening(&self) -> Result<(), NativeError> {
        let Some(start) = self.bridge.start_listening else {
            return Err(NativeError::Unavailable);
        };
        match unsafe { start(self.bridge.ctx) } {
            0 => Ok(()),
            SMS_OTP_START_MISSING_PERMISSION => {
                Err(NativeError::Rejected(MISSING_PERMISSION_REASON.to_string()))
            }
            rc if rc > 0 => Err(NativeError::Rejected(format!("receiver refused with rc {rc}"))),
            rc => Err(NativeError::Fault(format!("receiver faulted with rc {rc}"))),
        }
    }

    fn add_listener(&self, event_name: &str, sink: SmsSink) -> ListenerId {
        self.hub.add_listener(event_name, sink)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.hub.remove_listener(id);
    }
}
