mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use sms_otp_core::{FetchOutcome, OtpCfg, OtpResult};
use sms_otp_orchestrator::{poll_until_otp, FetchOtpOrchestrator, NativeError, PollPolicy};

use common::{init_tracing, FakePermissions, FakeSource};

#[tokio::test]
async fn fetch_returns_otp_and_releases_listener() {
    init_tracing();
    let perms = FakePermissions::granted();
    let source = FakeSource::new();
    let orch = FetchOtpOrchestrator::new(perms.clone(), source.clone());

    let (res, _) = tokio::join!(orch.fetch_otp(6), source.emit_when_listening("OTP: 739201"));

    assert_eq!(res, OtpResult::found("739201"));
    assert_eq!(source.adds(), 1);
    assert_eq!(source.removes(), 1);
    assert!(!orch.is_fetch_pending());
}

#[tokio::test]
async fn denied_permission_never_registers() {
    let perms = FakePermissions::prompting(false);
    let source = FakeSource::new();
    let orch = FetchOtpOrchestrator::new(perms.clone(), source.clone());

    assert_eq!(orch.fetch_outcome(6).await, FetchOutcome::PermissionDenied);
    assert_eq!(orch.fetch_otp(6).await, OtpResult::absent());
    assert_eq!(source.starts.load(Ordering::SeqCst), 0);
    assert_eq!(source.adds(), 0);
}

#[tokio::test]
async fn prompt_then_listen() {
    let perms = FakePermissions::prompting(true);
    let source = FakeSource::new();
    let orch = FetchOtpOrchestrator::new(perms.clone(), source.clone());

    let (res, _) = tokio::join!(
        orch.fetch_otp(4),
        source.emit_when_listening("Use 4821 to sign in"),
    );
    assert_eq!(res.otp.as_deref(), Some("4821"));
    assert_eq!(perms.requests(), 1);
}

#[tokio::test]
async fn native_failure_is_absent() {
    let source = FakeSource::failing(NativeError::Rejected("no receiver".into()));
    let orch = FetchOtpOrchestrator::new(FakePermissions::granted(), source.clone());

    let outcome = orch.fetch_outcome(6).await;
    assert!(matches!(outcome, FetchOutcome::NativeFailure { .. }));
    assert!(outcome.into_result().is_absent());
    assert_eq!(source.adds(), 0);
}

#[tokio::test]
async fn message_without_code_is_absent() {
    let source = FakeSource::new();
    let orch = FetchOtpOrchestrator::new(FakePermissions::granted(), source.clone());

    let (outcome, _) = tokio::join!(
        orch.fetch_outcome(6),
        source.emit_when_listening("Your code is 4829, expires soon"),
    );
    assert_eq!(outcome, FetchOutcome::NoOtpInText);
    assert_eq!(source.removes(), 1);
}

#[tokio::test]
async fn concurrent_fetches_share_one_registration() {
    let perms = FakePermissions::prompting(true);
    let source = FakeSource::new();
    let orch = FetchOtpOrchestrator::new(perms.clone(), source.clone());

    let (a, b, delivered) = tokio::join!(
        orch.fetch_otp(6),
        orch.fetch_otp(6),
        source.emit_when_listening("482913 is your code"),
    );

    assert_eq!(a, OtpResult::found("482913"));
    assert_eq!(a, b);
    assert_eq!(delivered, 1);
    assert_eq!(source.adds(), 1);
    assert_eq!(source.removes(), 1);
    assert_eq!(perms.requests(), 1);
}

#[tokio::test]
async fn next_fetch_after_settle_registers_again() {
    let source = FakeSource::new();
    let orch = FetchOtpOrchestrator::new(FakePermissions::granted(), source.clone());

    let (first, _) = tokio::join!(orch.fetch_otp(6), source.emit_when_listening("111111"));
    let (second, _) = tokio::join!(orch.fetch_otp(6), source.emit_when_listening("222222"));

    assert_eq!(first.otp.as_deref(), Some("111111"));
    assert_eq!(second.otp.as_deref(), Some("222222"));
    assert_eq!(source.adds(), 2);
    assert_eq!(source.removes(), 2);
}

#[tokio::test(start_paused = true)]
async fn abandoned_fetch_releases_and_restarts() {
    let source = FakeSource::new();
    let orch = FetchOtpOrchestrator::new(FakePermissions::granted(), source.clone());

    let res = tokio::time::timeout(Duration::from_secs(1), orch.fetch_otp(6)).await;
    assert!(res.is_err());
    assert!(!orch.is_fetch_pending());
    assert_eq!(source.removes(), 1);
    assert_eq!(source.hub.listener_count(), 0);

    let (res, _) = tokio::join!(orch.fetch_otp(6), source.emit_when_listening("OTP 739201"));
    assert_eq!(res.otp.as_deref(), Some("739201"));
    assert_eq!(source.adds(), 2);
}

#[tokio::test]
async fn custom_event_name_from_cfg() {
    let source = FakeSource::new();
    let cfg = OtpCfg {
        sms_event_name: "sms_in".to_string(),
        ..OtpCfg::default()
    };
    let orch = FetchOtpOrchestrator::with_cfg(FakePermissions::granted(), source.clone(), &cfg);

    let emit = async {
        while source.hub.listener_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(source.emit("ignored 000000"), 0);
        source.hub.emit("sms_in", sms_otp_core::SmsEvent::new("code 654321"))
    };
    let (res, delivered) = tokio::join!(orch.fetch_otp(6), emit);
    assert_eq!(res.otp.as_deref(), Some("654321"));
    assert_eq!(delivered, 1);
}

#[tokio::test]
async fn permission_helpers() {
    let perms = FakePermissions::prompting(true);
    let orch = FetchOtpOrchestrator::new(perms.clone(), FakeSource::new());

    assert!(!orch.checking_sms_permission().await);
    assert!(orch.request_sms_permission().await);
    assert!(orch.checking_sms_permission().await);
    assert!(orch.request_sms_permission().await);
    assert_eq!(perms.requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn polling_retries_until_granted() {
    let perms = FakePermissions::prompting(false);
    let source = FakeSource::new();
    let orch = FetchOtpOrchestrator::new(perms.clone(), source.clone());

    // Sleep instead of yielding so the paused clock can advance.
    let user = async {
        // The user grants on the third prompt.
        while perms.requests() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        perms.grant_on_request.store(true, Ordering::SeqCst);
        while source.hub.listener_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        source.emit("OTP: 739201")
    };

    let (res, _) = tokio::join!(poll_until_otp(&orch, 6, PollPolicy::default()), user);
    assert_eq!(res, OtpResult::found("739201"));
    assert_eq!(perms.requests(), 3);
    assert_eq!(source.adds(), 1);
}

#[tokio::test(start_paused = true)]
async fn polling_gives_up_after_budget() {
    let perms = FakePermissions::prompting(false);
    let orch = FetchOtpOrchestrator::new(perms.clone(), FakeSource::new());
    let policy = PollPolicy {
        interval: Duration::from_millis(250),
        max_attempts: Some(3),
    };

    let started = tokio::time::Instant::now();
    assert!(poll_until_otp(&orch, 6, policy).await.is_absent());
    assert_eq!(perms.requests(), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(500));
}

#[test]
fn poll_policy_follows_cfg() {
    let policy = PollPolicy::default();
    assert_eq!(policy.interval, Duration::from_millis(1000));
    assert_eq!(policy.max_attempts, None);
}
