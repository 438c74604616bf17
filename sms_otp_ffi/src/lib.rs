#![allow(clippy::missing_safety_doc)]

use std::ptr;
use std::sync::Arc;

use sms_otp_core::{extract_otp, OtpCfg, OtpResult, SmsEvent, SMS_RECEIVED_EVENT};
use sms_otp_orchestrator::{poll_until_otp, FetchOtpOrchestrator, PollPolicy, SmsEventHub};

mod host;

pub use host::{
    SmsOtpHostBridge, SMS_OTP_PERMISSION_READ_SMS, SMS_OTP_PERMISSION_RECEIVE_SMS,
    SMS_OTP_START_MISSING_PERMISSION, SMS_OTP_STATUS_DENIED, SMS_OTP_STATUS_GRANTED,
    SMS_OTP_STATUS_NEVER_ASK_AGAIN,
};

use host::{HostPermissions, HostSmsSource};

/// FFI ABI version for sms_otp_ffi.
///
/// Bump this when any `#[repr(C)]` struct layout or exported function signature changes.
pub const SMS_OTP_FFI_VERSION: u32 = 1;

#[no_mangle]
pub extern "C" fn sms_otp_ffi_version() -> u32 {
    SMS_OTP_FFI_VERSION
}

/// Opaque handle exposed over FFI.
#[repr(C)]
pub struct SmsOtpHandle {
    orchestrator: FetchOtpOrchestrator,
    hub: Arc<SmsEventHub>,
    cfg: OtpCfg,
}

/// FFI string view (UTF-8 bytes).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SmsStr {
    pub ptr: *const u8,
    pub len: usize,
}

impl SmsStr {
    fn as_str(&self) -> Option<&str> {
        if self.ptr.is_null() {
            return None;
        }
        let bytes = unsafe { std::slice::from_raw_parts(self.ptr, self.len) };
        std::str::from_utf8(bytes).ok()
    }
}

/// Owned byte buffer returned to the host. Null `ptr` means "absent".
#[repr(C)]
pub struct SmsBytes {
    pub ptr: *mut u8,
    pub len: usize,
}

impl SmsBytes {
    fn null() -> Self {
        SmsBytes { ptr: ptr::null_mut(), len: 0 }
    }

    fn from_vec(buf: Vec<u8>) -> Self {
        let mut boxed = buf.into_boxed_slice();
        let ptr = boxed.as_mut_ptr();
        let len = boxed.len();
        // Leak to caller; freed by sms_otp_bytes_free
        std::mem::forget(boxed);
        SmsBytes { ptr, len }
    }

    fn from_otp(res: OtpResult) -> Self {
        match res.otp {
            Some(otp) => Self::from_vec(otp.into_bytes()),
            None => Self::null(),
        }
    }
}

/// Fetch cfg for FFI (keep it minimal).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SmsOtpCfg {
    pub otp_length: u32,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: i32, // -1 means None
}

#[no_mangle]
pub extern "C" fn sms_otp_cfg_default() -> SmsOtpCfg {
    let d = OtpCfg::default();
    SmsOtpCfg {
        otp_length: d.otp_length as u32,
        poll_interval_ms: d.poll_interval_ms,
        max_poll_attempts: d.max_poll_attempts.map(|v| v as i32).unwrap_or(-1),
    }
}

fn cfg_from_ffi(c: SmsOtpCfg) -> OtpCfg {
    OtpCfg {
        otp_length: c.otp_length as usize,
        poll_interval_ms: c.poll_interval_ms,
        max_poll_attempts: if c.max_poll_attempts < 0 { None } else { Some(c.max_poll_attempts as u32) },
        sms_event_name: SMS_RECEIVED_EVENT.to_string(),
    }
}

impl SmsOtpHandle {
    fn otp_length(&self, requested: u32) -> usize {
        if requested == 0 {
            self.cfg.otp_length
        } else {
            requested as usize
        }
    }
}

/// Create a new handle over the host's native callbacks.
///
/// Notes:
/// - Null callbacks are allowed; calls that need them degrade to "denied" /
///   "absent" and log that the native module is not linked.
/// - This library does not spawn threads. Blocking calls run on the caller's thread.
#[no_mangle]
pub extern "C" fn sms_otp_new(bridge: SmsOtpHostBridge, cfg: SmsOtpCfg) -> *mut SmsOtpHandle {
    let cfg = cfg_from_ffi(cfg);
    let hub = Arc::new(SmsEventHub::new());
    let permissions = Arc::new(HostPermissions { bridge });
    let source = Arc::new(HostSmsSource {
        bridge,
        hub: Arc::clone(&hub),
    });

    let handle = SmsOtpHandle {
        orchestrator: FetchOtpOrchestrator::with_cfg(permissions, source, &cfg),
        hub,
        cfg,
    };
    Box::into_raw(Box::new(handle))
}

#[no_mangle]
pub unsafe extern "C" fn sms_otp_free(h: *mut SmsOtpHandle) {
    if !h.is_null() {
        drop(Box::from_raw(h));
    }
}

/// Pure extraction. Returns null bytes when no standalone code of `otp_length` digits exists.
#[no_mangle]
pub unsafe extern "C" fn sms_otp_extract(text: SmsStr, otp_length: u32) -> SmsBytes {
    match text.as_str() {
        Some(t) => SmsBytes::from_otp(OtpResult { otp: extract_otp(t, otp_length as usize) }),
        None => SmsBytes::null(),
    }
}

/// 1 if both SMS permissions are granted, 0 otherwise, -1 on a null handle. Never prompts.
#[no_mangle]
pub unsafe extern "C" fn sms_otp_check_permission(h: *const SmsOtpHandle) -> i32 {
    if h.is_null() {
        return -1;
    }
    let handle = &*h;
    futures::executor::block_on(handle.orchestrator.checking_sms_permission()) as i32
}

/// Prompt for the SMS permissions unless already granted. Blocks until the host answers.
#[no_mangle]
pub unsafe extern "C" fn sms_otp_request_permission(h: *const SmsOtpHandle) -> i32 {
    if h.is_null() {
        return -1;
    }
    let handle = &*h;
    futures::executor::block_on(handle.orchestrator.request_sms_permission()) as i32
}

/// Fetch one OTP, blocking the calling thread until an SMS arrives or the
/// fetch fails. `otp_length == 0` uses the cfg length.
///
/// Call from a background thread: the SMS itself must be pushed from another
/// thread with `sms_otp_deliver_sms`. Concurrent calls on one handle share a
/// single native registration. Returns null bytes when no OTP was recovered.
#[no_mangle]
pub unsafe extern "C" fn sms_otp_fetch(h: *const SmsOtpHandle, otp_length: u32) -> SmsBytes {
    if h.is_null() {
        return SmsBytes::null();
    }
    let handle = &*h;
    let len = handle.otp_length(otp_length);
    SmsBytes::from_otp(futures::executor::block_on(handle.orchestrator.fetch_otp(len)))
}

/// Like `sms_otp_fetch` but returns the result as JSON: `{"otp":"482913"}` or `{}`.
#[no_mangle]
pub unsafe extern "C" fn sms_otp_fetch_json(h: *const SmsOtpHandle, otp_length: u32) -> SmsBytes {
    if h.is_null() {
        return SmsBytes::null();
    }
    let handle = &*h;
    let len = handle.otp_length(otp_length);
    let res = futures::executor::block_on(handle.orchestrator.fetch_otp(len));
    match serde_json::to_vec(&res) {
        Ok(buf) => SmsBytes::from_vec(buf),
        Err(err) => {
            tracing::warn!("failed to encode fetch result: {err}");
            SmsBytes::null()
        }
    }
}

/// Fetch repeatedly, sleeping `poll_interval_ms` between absent results,
/// until an OTP arrives or `max_poll_attempts` is used up.
#[no_mangle]
pub unsafe extern "C" fn sms_otp_poll(h: *const SmsOtpHandle, otp_length: u32) -> SmsBytes {
    if h.is_null() {
        return SmsBytes::null();
    }
    let handle = &*h;
    let len = handle.otp_length(otp_length);
    let rt = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(rt) => rt,
        Err(err) => {
            tracing::warn!("failed to build poll runtime: {err}");
            return SmsBytes::null();
        }
    };
    let policy = PollPolicy::from_cfg(&handle.cfg);
    SmsBytes::from_otp(rt.block_on(poll_until_otp(&handle.orchestrator, len, policy)))
}

/// Push one received SMS into the handle.
///
/// Returns the number of listeners that took it (0 when no fetch is
/// listening), or -1 on a null handle / invalid UTF-8.
#[no_mangle]
pub unsafe extern "C" fn sms_otp_deliver_sms(h: *const SmsOtpHandle, text: SmsStr) -> i32 {
    if h.is_null() {
        return -1;
    }
    let handle = &*h;
    match text.as_str() {
        Some(t) => handle.hub.emit(&handle.cfg.sms_event_name, SmsEvent::new(t)) as i32,
        None => -1,
    }
}

/// Push a multipart SMS: bodies are joined in order, unreadable parts skipped.
#[no_mangle]
pub unsafe extern "C" fn sms_otp_deliver_sms_parts(
    h: *const SmsOtpHandle,
    parts_ptr: *const SmsStr,
    parts_len: usize,
) -> i32 {
    if h.is_null() || parts_ptr.is_null() {
        return -1;
    }
    let handle = &*h;
    let parts = std::slice::from_raw_parts(parts_ptr, parts_len);
    let event = SmsEvent::from_parts(parts.iter().map(|p| p.as_str().unwrap_or("")));
    handle.hub.emit(&handle.cfg.sms_event_name, event) as i32
}

/// 1 while a fetch on this handle is waiting, 0 otherwise.
#[no_mangle]
pub unsafe extern "C" fn sms_otp_fetch_pending(h: *const SmsOtpHandle) -> u8 {
    if h.is_null() {
        return 0;
    }
    let handle = &*h;
    handle.orchestrator.is_fetch_pending() as u8
}

#[no_mangle]
pub unsafe extern "C" fn sms_otp_bytes_free(b: SmsBytes) {
    if !b.ptr.is_null() {
        let slice_ptr = std::ptr::slice_from_raw_parts_mut(b.ptr, b.len);
        drop(Box::from_raw(slice_ptr));
    }
}
