//! End-to-end tests for the webhook event service against in-memory stores.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use bytes::Bytes;
use mailhook_core::{
    ErrorCategory, IntegrationId, MailhookError, MessageEvent, ProviderKind, WebhookEventType,
    WorkspaceId,
};
use mailhook_testing::{
    fixtures::{self, mailjet, postmark, ses, smtp, sparkpost},
    http::{unreachable_url, MockSnsEndpoint},
    test_start_time, TestEnv,
};
use serde_json::json;

#[tokio::test]
async fn ses_hard_bounce_is_stored_and_projected() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Ses).await;
    let payload = ses::notification_envelope(&ses::bounce(
        "Permanent",
        "General",
        "test@example.com",
        "message1",
    ));

    let summary = env.process(&integration, &payload).await.unwrap();

    assert_eq!(summary.events_stored, 1);
    assert_eq!(summary.updates_submitted, 1);
    assert!(summary.confirmation.is_none());

    let stored = env.event_store.stored_events(&TestEnv::workspace()).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].event_type(), WebhookEventType::Bounce);
    assert_eq!(stored[0].recipient_email.as_deref(), Some("test@example.com"));
    assert_eq!(stored[0].message_id.as_deref(), Some("message1"));

    let bounced = env
        .history_store
        .status(&TestEnv::workspace(), "message1", MessageEvent::Bounced)
        .await
        .expect("bounce should be recorded");
    assert_eq!(
        bounced.status_info.as_deref(),
        Some("Permanent General smtp; 550 5.1.1 user unknown")
    );
}

#[tokio::test]
async fn sparkpost_batch_projects_each_settling_event() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::SparkPost).await;
    let payload = sparkpost::batch(&[
        sparkpost::message_event("delivery", "a@example.com", "sp-1"),
        sparkpost::bounce("21", "b@example.com", "sp-2"),
    ]);

    let summary = env.process(&integration, &payload).await.unwrap();

    assert_eq!(summary.events_stored, 2);
    assert_eq!(summary.updates_submitted, 2);

    let batches = env.history_store.submitted_batches().await;
    assert_eq!(batches.len(), 1, "updates go out in one call");
    let ws = TestEnv::workspace();
    assert!(env.history_store.status(&ws, "sp-1", MessageEvent::Delivered).await.is_some());
    assert!(env.history_store.status(&ws, "sp-2", MessageEvent::Bounced).await.is_some());
}

#[tokio::test]
async fn soft_bounce_is_stored_but_not_projected() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Ses).await;
    let payload =
        ses::notification_envelope(&ses::bounce("Transient", "MailboxFull", "a@example.com", "m-1"));

    let summary = env.process(&integration, &payload).await.unwrap();

    assert_eq!(summary.events_stored, 1);
    assert_eq!(summary.updates_submitted, 0);
    assert_eq!(env.event_store.call_count(), 1);
    assert_eq!(env.history_store.status_count().await, 0);
}

#[tokio::test]
async fn postmark_unknown_record_type_touches_no_store() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Postmark).await;
    let mut payload = postmark::delivery("a@example.com", "pm-1");
    payload["RecordType"] = json!("Unknown");

    let err = env.process(&integration, &payload).await.unwrap_err();

    assert!(matches!(err, MailhookError::UnsupportedEventType { .. }));
    assert_eq!(err.category(), ErrorCategory::MalformedPayload);
    assert_eq!(env.event_store.call_count(), 0);
    assert_eq!(env.history_store.call_count(), 0);
}

#[tokio::test]
async fn ses_unrecognized_body_succeeds_with_no_store_calls() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Ses).await;
    let payload = ses::notification_envelope(&json!({"notificationType": "Open", "mail": {}}));

    let summary = env.process(&integration, &payload).await.unwrap();

    assert_eq!(summary.events_stored, 0);
    assert_eq!(env.event_store.call_count(), 0);
    assert_eq!(env.history_store.call_count(), 0);
}

#[tokio::test]
async fn unknown_workspace_and_integration_are_configuration_errors() {
    let env = TestEnv::new().await;

    let err = env
        .service
        .process_webhook(&WorkspaceId::from("nope"), &IntegrationId::from("i-1"), Bytes::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MailhookError::WorkspaceNotFound { .. }));

    let err = env.process_bytes(&IntegrationId::from("missing"), Bytes::new()).await.unwrap_err();
    assert!(matches!(err, MailhookError::IntegrationNotFound { .. }));
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert_eq!(env.event_store.call_count(), 0);
}

#[tokio::test]
async fn unsupported_provider_kind_is_rejected() {
    let env = TestEnv::new().await;
    let integration = IntegrationId::from("sendgrid-1");
    env.directory
        .add_raw_integration(TestEnv::workspace(), integration.clone(), "sendgrid")
        .await;

    let err = env.process(&integration, &json!({})).await.unwrap_err();

    assert!(matches!(err, MailhookError::UnsupportedProvider { ref kind } if kind == "sendgrid"));
    assert_eq!(err.code(), "E1003");
}

#[tokio::test]
async fn provider_kind_lookup_is_case_insensitive() {
    let env = TestEnv::new().await;
    let integration = IntegrationId::from("smtp-upper");
    env.directory.add_raw_integration(TestEnv::workspace(), integration.clone(), "SMTP").await;

    let summary = env
        .process(&integration, &smtp::event("delivered", "a@example.com", "smtp-1"))
        .await
        .unwrap();
    assert_eq!(summary.events_stored, 1);
}

#[tokio::test]
async fn event_store_failure_skips_status_updates() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Smtp).await;
    env.event_store.inject_error("connection refused").await;

    let err = env
        .process(&integration, &smtp::event("delivered", "a@example.com", "smtp-1"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "E4001");
    assert!(err.is_retryable_by_provider());
    assert_eq!(env.history_store.call_count(), 0);
}

#[tokio::test]
async fn history_store_failure_fails_the_call() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Smtp).await;
    env.history_store.inject_error("deadlock detected").await;

    let err = env
        .process(&integration, &smtp::event("delivered", "a@example.com", "smtp-1"))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Persistence);
    assert_eq!(env.event_store.stored_events(&TestEnv::workspace()).await.len(), 1);
}

#[tokio::test]
async fn late_delivery_does_not_clobber_recorded_bounce() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Smtp).await;

    let bounce = smtp::bounce("permanent", "mailbox", "a@example.com", "smtp-9");
    env.process(&integration, &bounce).await.unwrap();
    env.process(&integration, &bounce).await.unwrap();
    env.process(&integration, &smtp::event("delivered", "a@example.com", "smtp-9")).await.unwrap();

    let ws = TestEnv::workspace();
    let bounced = env.history_store.status(&ws, "smtp-9", MessageEvent::Bounced).await.unwrap();
    assert_eq!(bounced.status_info.as_deref(), Some("permanent mailbox 550 5.1.1 mailbox unavailable"));
    assert_eq!(env.history_store.submitted_batches().await.len(), 3);
    assert_eq!(env.event_store.stored_events(&ws).await.len(), 3, "no deduplication of events");
}

#[tokio::test]
async fn correlation_id_keys_the_history_record() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Postmark).await;
    let payload = postmark::with_correlation(postmark::delivery("a@example.com", "pm-native"), "internal-1");

    env.process(&integration, &payload).await.unwrap();

    let ws = TestEnv::workspace();
    assert!(env.history_store.status(&ws, "internal-1", MessageEvent::Delivered).await.is_some());
    assert!(env.history_store.status(&ws, "pm-native", MessageEvent::Delivered).await.is_none());
}

#[tokio::test]
async fn mailjet_complaints_record_feedback_type() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Mailjet).await;
    let payload = json!([
        mailjet::event("spam", "a@example.com", 11),
        mailjet::event("unsub", "b@example.com", 12),
    ]);

    let summary = env.process(&integration, &payload).await.unwrap();
    assert_eq!(summary.updates_submitted, 2);

    let ws = TestEnv::workspace();
    let spam = env.history_store.status(&ws, "11", MessageEvent::Complained).await.unwrap();
    assert_eq!(spam.status_info.as_deref(), Some("spam"));
    let unsub = env.history_store.status(&ws, "12", MessageEvent::Complained).await.unwrap();
    assert_eq!(unsub.status_info.as_deref(), Some("unsub"));
}

#[tokio::test]
async fn missing_timestamp_uses_test_clock() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Smtp).await;
    let mut payload = smtp::event("delivered", "a@example.com", "smtp-2");
    payload.as_object_mut().unwrap().remove("timestamp");

    env.process(&integration, &payload).await.unwrap();

    let stored = env.event_store.stored_events(&TestEnv::workspace()).await;
    assert_eq!(stored[0].timestamp, test_start_time());
}

// ---------------------------------------------------------------------------
// SNS subscription handshake
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscription_confirmation_is_fetched_once() {
    let env = TestEnv::with_http_confirmer().await;
    let integration = env.add_integration(ProviderKind::Ses).await;
    let sns = MockSnsEndpoint::start().await;
    sns.expect_token("tok-1").await;

    let summary = env
        .process(&integration, &ses::subscription_confirmation(&sns.subscribe_url("tok-1")))
        .await
        .unwrap();

    assert_eq!(summary.confirmation.map(|c| c.status), Some(200));
    assert_eq!(summary.events_stored, 0);
    sns.assert_request_count(1).await;

    // Data notifications never re-trigger the handshake.
    let bounce =
        ses::notification_envelope(&ses::bounce("Permanent", "General", "a@example.com", "m-1"));
    env.process(&integration, &bounce).await.unwrap();
    env.process(&integration, &bounce).await.unwrap();
    sns.assert_request_count(1).await;
    assert_eq!(env.event_store.call_count(), 2);
}

#[tokio::test]
async fn rejected_confirmation_is_not_an_error() {
    let env = TestEnv::with_http_confirmer().await;
    let integration = env.add_integration(ProviderKind::Ses).await;
    let sns = MockSnsEndpoint::start().await;
    sns.respond_with_status(403).await;

    let summary = env
        .process(&integration, &ses::subscription_confirmation(&sns.subscribe_url("tok-2")))
        .await
        .unwrap();

    assert_eq!(summary.confirmation.map(|c| c.is_success()), Some(false));
    assert_eq!(env.event_store.call_count(), 0);
}

#[tokio::test]
async fn confirmation_transport_failure_fails_the_call() {
    let env = TestEnv::with_http_confirmer().await;
    let integration = env.add_integration(ProviderKind::Ses).await;

    let err = env
        .process(&integration, &ses::subscription_confirmation(&unreachable_url()))
        .await
        .unwrap_err();

    assert!(matches!(err, MailhookError::SubscriptionConfirmation { .. }));
    assert_eq!(err.category(), ErrorCategory::Handshake);
}

#[tokio::test]
async fn recording_confirmer_sees_subscribe_url() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Ses).await;
    let url = "https://sns.us-east-1.amazonaws.com/?Action=ConfirmSubscription&Token=xyz";

    env.process(&integration, &ses::subscription_confirmation(url)).await.unwrap();

    assert_eq!(env.confirmer.confirmed_urls().await, vec![url.to_string()]);
}

#[tokio::test]
async fn disabled_confirmation_skips_the_fetch() {
    let env = TestEnv::new().await.without_confirmation();
    let integration = env.add_integration(ProviderKind::Ses).await;

    let summary = env
        .process(&integration, &ses::subscription_confirmation("https://sns.example.com/c"))
        .await
        .unwrap();

    assert!(summary.confirmation.is_none());
    assert!(env.confirmer.confirmed_urls().await.is_empty());
}

#[tokio::test]
async fn failing_confirmer_surfaces_handshake_error() {
    let env = TestEnv::with_failing_confirmer("connection reset by peer").await;
    let integration = env.add_integration(ProviderKind::Ses).await;

    let err = env
        .process(&integration, &ses::subscription_confirmation("https://sns.example.com/c"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "[E3001] Subscription confirmation failed: connection reset by peer");
}

#[tokio::test]
async fn control_messages_yield_nothing() {
    let env = TestEnv::new().await;
    let integration = env.add_integration(ProviderKind::Ses).await;

    for payload in [ses::unsubscribe_confirmation(), ses::topic_validation()] {
        let summary = env.process(&integration, &payload).await.unwrap();
        assert_eq!(summary, Default::default());
    }
    assert!(env.confirmer.confirmed_urls().await.is_empty());
    assert_eq!(env.event_store.call_count(), 0);
}

#[tokio::test]
async fn normalize_only_persists_nothing() {
    let env = TestEnv::new().await;
    let payload = fixtures::to_bytes(&ses::subscription_confirmation("https://sns.example.com/c"));

    let normalized = env
        .service
        .normalize_only(ProviderKind::Ses, &IntegrationId::from("replay"), &payload)
        .unwrap();

    assert!(normalized.action.is_some());
    assert!(env.confirmer.confirmed_urls().await.is_empty());
    assert_eq!(env.directory.lookup_count(), 0);
}
