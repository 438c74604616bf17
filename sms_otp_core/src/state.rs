use serde::{Deserialize, Serialize};

/// Combined authorization state for the two SMS permissions.
///
/// Derived on every check, never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionState {
    /// The permission store could not answer.
    #[default]
    Unknown,
    Denied,
    Granted,
}

impl PermissionState {
    /// Collapse the two independent checks into one decision.
    #[inline]
    pub fn from_checks(receive_sms: bool, read_sms: bool) -> Self {
        if receive_sms && read_sms {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    #[inline]
    pub fn is_granted(self) -> bool {
        self == PermissionState::Granted
    }
}

/// The two platform permissions guarding SMS content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SmsPermission {
    ReceiveSms,
    ReadSms,
}

impl SmsPermission {
    /// Both permissions, in the order they are requested.
    pub const REQUIRED: [SmsPermission; 2] = [SmsPermission::ReceiveSms, SmsPermission::ReadSms];

    /// Platform identifier as understood by the Android permission store.
    pub fn platform_id(self) -> &'static str {
        match self {
            SmsPermission::ReceiveSms => "android.permission.RECEIVE_SMS",
            SmsPermission::ReadSms => "android.permission.READ_SMS",
        }
    }

    pub fn from_platform_id(id: &str) -> Option<Self> {
        match id {
            "android.permission.RECEIVE_SMS" => Some(SmsPermission::ReceiveSms),
            "android.permission.READ_SMS" => Some(SmsPermission::ReadSms),
            _ => None,
        }
    }
}

/// Per-permission answer from a permission request dialog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// Denied and the platform will no longer show the prompt.
    NeverAskAgain,
}

impl PermissionStatus {
    #[inline]
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}
