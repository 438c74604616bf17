//! Permission gate: folds the receive-SMS and read-SMS permissions into one
//! authorization decision, prompting at most once per call.

use std::sync::Arc;

use sms_otp_core::{PermissionState, SmsPermission};

use crate::adapter::PermissionStore;

pub struct PermissionGate {
    store: Arc<dyn PermissionStore>,
}

impl PermissionGate {
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    /// Check both permissions without prompting.
    ///
    /// A store fault on either check yields `Unknown`.
    pub async fn check_authorization(&self) -> PermissionState {
        let receive = self.store.check(SmsPermission::ReceiveSms).await;
        let read = self.store.check(SmsPermission::ReadSms).await;

        match (receive, read) {
            (Ok(receive), Ok(read)) => {
                let state = PermissionState::from_checks(receive, read);
                tracing::debug!(receive, read, ?state, "sms permission check");
                state
            }
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!("sms permission check failed: {err}");
                PermissionState::Unknown
            }
        }
    }

    /// Make sure both permissions are granted, prompting once if needed.
    ///
    /// Never prompts when already granted. Store faults count as a denial.
    pub async fn ensure_authorization(&self) -> bool {
        match self.check_authorization().await {
            PermissionState::Granted => return true,
            PermissionState::Unknown => return false,
            PermissionState::Denied => {}
        }

        let statuses = match self.store.request_many(&SmsPermission::REQUIRED).await {
            Ok(statuses) => statuses,
            Err(err) => {
                tracing::warn!("sms permission request failed: {err}");
                return false;
            }
        };

        let granted = SmsPermission::REQUIRED
            .iter()
            .all(|p| statuses.get(p).is_some_and(|s| s.is_granted()));
        if granted {
            tracing::info!(?statuses, "sms permissions granted");
        } else {
            tracing::info!(?statuses, "sms permissions denied");
        }
        granted
    }
}
