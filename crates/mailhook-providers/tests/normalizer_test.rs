//! Integration tests for the provider normalizers.
//!
//! Drives each provider through the dispatcher with realistic payloads and
//! checks the canonical events it produces.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use mailhook_core::{
    EventKind, IntegrationId, MailhookError, ProviderKind, TestClock, WebhookEventType,
};
use mailhook_providers::{Normalized, Normalizers, SnsAction};
use mailhook_testing::fixtures::{self, mailgun, mailjet, postmark, ses, smtp, sparkpost};
use serde_json::{json, Value};

fn ingestion_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap()
}

fn normalizers() -> Normalizers {
    Normalizers::new(Arc::new(TestClock::with_start_time(ingestion_time())))
}

fn integration() -> IntegrationId {
    IntegrationId::from("integration-1")
}

fn normalize(provider: ProviderKind, payload: &Value) -> mailhook_core::Result<Normalized> {
    normalizers().normalize(provider, &integration(), &fixtures::to_bytes(payload))
}

// ---------------------------------------------------------------------------
// SES
// ---------------------------------------------------------------------------

#[test]
fn ses_hard_bounce_scenario() {
    let message = ses::bounce("Permanent", "General", "test@example.com", "message1");
    let payload = ses::notification_envelope(&message);

    let normalized = normalize(ProviderKind::Ses, &payload).unwrap();

    assert!(normalized.action.is_none());
    assert_eq!(normalized.events.len(), 1);
    let event = &normalized.events[0];
    assert_eq!(event.event_type(), WebhookEventType::Bounce);
    assert_eq!(event.provider, ProviderKind::Ses);
    assert_eq!(event.integration_id, integration());
    assert_eq!(event.recipient_email.as_deref(), Some("test@example.com"));
    assert_eq!(event.message_id.as_deref(), Some("message1"));
    let bounce = event.bounce().unwrap();
    assert_eq!(bounce.bounce_type, "Permanent");
    assert_eq!(bounce.bounce_category, "General");
    assert_eq!(bounce.bounce_diagnostic, "smtp; 550 5.1.1 user unknown");
    assert_eq!(event.timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    assert_eq!(event.raw_payload, fixtures::to_bytes(&payload));
}

#[test]
fn ses_complaint_and_delivery() {
    let complaint = ses::notification_envelope(&ses::complaint("a@example.com", "m-2"));
    let events = normalize(ProviderKind::Ses, &complaint).unwrap().events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::complaint("abuse"));
    assert_eq!(events[0].recipient_email.as_deref(), Some("a@example.com"));

    let delivery =
        ses::notification_envelope(&ses::delivery(&["a@example.com", "b@example.com"], "m-3"));
    let events = normalize(ProviderKind::Ses, &delivery).unwrap().events;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.kind == EventKind::Delivered));
    assert!(events.iter().all(|e| e.message_id.as_deref() == Some("m-3")));
    assert_eq!(events[1].recipient_email.as_deref(), Some("b@example.com"));
}

#[test]
fn ses_subscription_confirmation_requests_handshake() {
    let payload = ses::subscription_confirmation("https://sns.example.com/confirm?token=abc");

    let normalized = normalize(ProviderKind::Ses, &payload).unwrap();

    assert!(normalized.events.is_empty());
    assert_eq!(
        normalized.action,
        Some(SnsAction::ConfirmSubscription {
            url: "https://sns.example.com/confirm?token=abc".to_string(),
            topic_arn: Some("arn:aws:sns:us-east-1:123456789012:ses-events".to_string()),
        })
    );
}

#[test]
fn ses_subscription_confirmation_without_url_is_malformed() {
    let mut payload = ses::subscription_confirmation("");
    payload.as_object_mut().unwrap().remove("SubscribeURL");

    let err = normalize(ProviderKind::Ses, &payload).unwrap_err();
    assert!(matches!(err, MailhookError::MalformedPayload { provider: ProviderKind::Ses, .. }));
}

#[test]
fn ses_control_messages_are_no_ops() {
    for payload in [ses::unsubscribe_confirmation(), ses::topic_validation()] {
        let normalized = normalize(ProviderKind::Ses, &payload).unwrap();
        assert_eq!(normalized, Normalized::empty());
    }
}

#[test]
fn ses_unrecognized_bodies_yield_nothing_without_error() {
    let bodies = [
        ses::raw_envelope("not json at all"),
        ses::notification_envelope(&json!({"notificationType": "Open", "mail": {}})),
        ses::notification_envelope(&json!({"mail": {"messageId": "x"}})),
        // Discriminant matches but the body does not decode.
        ses::notification_envelope(&json!({"notificationType": "Bounce", "bounce": "oops"})),
    ];

    for payload in bodies {
        let normalized = normalize(ProviderKind::Ses, &payload).unwrap();
        assert!(normalized.events.is_empty());
        assert!(normalized.action.is_none());
    }
}

#[test]
fn ses_invalid_envelope_is_malformed() {
    let err = normalizers()
        .normalize(ProviderKind::Ses, &integration(), &Bytes::from_static(b"<xml/>"))
        .unwrap_err();
    assert_eq!(err.code(), "E2001");
}

#[test]
fn ses_unparsable_timestamp_defaults_to_ingestion_time() {
    let mut message = ses::bounce("Transient", "General", "a@example.com", "m-1");
    message["bounce"]["timestamp"] = json!("garbage");
    message["mail"]["timestamp"] = json!("also garbage");

    let events = normalize(ProviderKind::Ses, &ses::notification_envelope(&message)).unwrap().events;
    assert_eq!(events[0].timestamp, ingestion_time());
}

// ---------------------------------------------------------------------------
// Postmark
// ---------------------------------------------------------------------------

#[test]
fn postmark_bounce_uses_type_for_type_and_category() {
    let payload = postmark::bounce("HardBounce", "a@example.com", "pm-1");
    let events = normalize(ProviderKind::Postmark, &payload).unwrap();
    let event = &events.events[0];

    let bounce = event.bounce().unwrap();
    assert_eq!(bounce.bounce_type, "HardBounce");
    assert_eq!(bounce.bounce_category, "HardBounce");
    assert!(bounce.bounce_diagnostic.starts_with("smtp;550"));
    assert_eq!(event.recipient_email.as_deref(), Some("a@example.com"));
    assert_eq!(event.message_id.as_deref(), Some("pm-1"));
}

#[test]
fn postmark_delivery_and_spam_complaint() {
    let delivery = normalize(ProviderKind::Postmark, &postmark::delivery("a@example.com", "pm-2"))
        .unwrap()
        .events;
    assert_eq!(delivery[0].kind, EventKind::Delivered);
    assert_eq!(delivery[0].recipient_email.as_deref(), Some("a@example.com"));

    let complaint =
        normalize(ProviderKind::Postmark, &postmark::spam_complaint("a@example.com", "pm-3"))
            .unwrap()
            .events;
    assert_eq!(complaint[0].kind, EventKind::complaint("SpamComplaint"));
}

#[test]
fn postmark_unknown_record_type_is_rejected() {
    let mut payload = postmark::delivery("a@example.com", "pm-4");
    payload["RecordType"] = json!("Unknown");

    let err = normalize(ProviderKind::Postmark, &payload).unwrap_err();
    assert!(matches!(
        err,
        MailhookError::UnsupportedEventType { provider: ProviderKind::Postmark, ref event_type }
            if event_type == "Unknown"
    ));
}

// ---------------------------------------------------------------------------
// Mailgun
// ---------------------------------------------------------------------------

#[test]
fn mailgun_severity_drives_bounce_category() {
    let permanent = normalize(ProviderKind::Mailgun, &mailgun::failed("permanent", "a@example.com", "mg-1"))
        .unwrap()
        .events;
    let bounce = permanent[0].bounce().unwrap();
    assert_eq!(bounce.bounce_category, "HardBounce");
    assert!(bounce.bounce_diagnostic.starts_with("550 5.1.1"));

    let temporary = normalize(ProviderKind::Mailgun, &mailgun::failed("temporary", "a@example.com", "mg-1"))
        .unwrap()
        .events;
    assert_eq!(temporary[0].bounce().unwrap().bounce_category, "SoftBounce");
}

#[test]
fn mailgun_epoch_timestamp_and_complaint() {
    let events = normalize(ProviderKind::Mailgun, &mailgun::event("complained", "a@example.com", "mg-2"))
        .unwrap()
        .events;
    assert_eq!(events[0].kind, EventKind::complaint("abuse"));
    assert_eq!(events[0].timestamp.timestamp(), 1_714_564_800);
    assert_eq!(events[0].timestamp.timestamp_subsec_millis(), 500);
}

#[test]
fn mailgun_rejects_missing_envelope_and_unknown_events() {
    let err = normalize(ProviderKind::Mailgun, &json!({"event": "delivered"})).unwrap_err();
    assert_eq!(err.code(), "E2001");

    let err = normalize(ProviderKind::Mailgun, &mailgun::event("opened", "a@example.com", "mg-3"))
        .unwrap_err();
    assert_eq!(err.code(), "E2002");
}

// ---------------------------------------------------------------------------
// SparkPost
// ---------------------------------------------------------------------------

#[test]
fn sparkpost_batch_normalizes_each_element() {
    let payload = sparkpost::batch(&[
        sparkpost::message_event("delivery", "a@example.com", "sp-1"),
        sparkpost::bounce("21", "b@example.com", "sp-2"),
    ]);

    let events = normalize(ProviderKind::SparkPost, &payload).unwrap().events;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, EventKind::Delivered);
    assert_eq!(events[0].message_id.as_deref(), Some("sp-1"));
    let bounce = events[1].bounce().unwrap();
    assert_eq!(bounce.bounce_type, "bounce");
    assert_eq!(bounce.bounce_category, "21");
    assert!(bounce.bounce_diagnostic.contains("User unknown"));
    assert_eq!(events[1].timestamp, Utc.timestamp_opt(1_714_564_800, 0).unwrap());
}

#[test]
fn sparkpost_skips_engagement_and_empty_wrappers() {
    let payload = sparkpost::batch(&[
        sparkpost::track_event("open", "a@example.com", "sp-3"),
        json!({"msys": {}}),
        sparkpost::message_event("spam_complaint", "a@example.com", "sp-3"),
    ]);

    let events = normalize(ProviderKind::SparkPost, &payload).unwrap().events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::complaint("abuse"));
}

#[test]
fn sparkpost_rfc3339_timestamp_is_tried_first() {
    let mut wrapper = sparkpost::message_event("delivery", "a@example.com", "sp-4");
    wrapper["msys"]["message_event"]["timestamp"] = json!("2024-05-01T12:00:00.000Z");

    let events = normalize(ProviderKind::SparkPost, &sparkpost::batch(&[wrapper])).unwrap().events;
    assert_eq!(events[0].timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
}

#[test]
fn sparkpost_requires_an_array() {
    let payload = sparkpost::message_event("delivery", "a@example.com", "sp-5");
    let err = normalize(ProviderKind::SparkPost, &payload).unwrap_err();
    assert_eq!(err.code(), "E2001");
}

// ---------------------------------------------------------------------------
// Mailjet
// ---------------------------------------------------------------------------

#[test]
fn mailjet_single_object_and_array_normalize_equally() {
    let single = mailjet::bounce(true, "a@example.com", 19_421_777_835_146_490);
    let batch = json!([single.clone()]);

    let from_single = normalize(ProviderKind::Mailjet, &single).unwrap().events;
    let from_batch = normalize(ProviderKind::Mailjet, &batch).unwrap().events;

    assert_eq!(from_single.len(), 1);
    assert_eq!(from_batch.len(), 1);
    let (a, b) = (&from_single[0], &from_batch[0]);
    assert_eq!(a.kind, b.kind);
    assert_eq!(a.provider, b.provider);
    assert_eq!(a.integration_id, b.integration_id);
    assert_eq!(a.recipient_email, b.recipient_email);
    assert_eq!(a.message_id, b.message_id);
    assert_eq!(a.timestamp, b.timestamp);
    assert_ne!(a.id, b.id);
}

#[test]
fn mailjet_event_mapping() {
    let hard = normalize(ProviderKind::Mailjet, &mailjet::bounce(true, "a@example.com", 1)).unwrap();
    assert_eq!(hard.events[0].kind, EventKind::bounce("HardBounce", "recipient", "user unknown"));
    assert_eq!(hard.events[0].message_id.as_deref(), Some("1"));

    let soft = normalize(ProviderKind::Mailjet, &mailjet::bounce(false, "a@example.com", 1)).unwrap();
    assert_eq!(soft.events[0].bounce().unwrap().bounce_type, "SoftBounce");

    let blocked = normalize(ProviderKind::Mailjet, &mailjet::blocked("a@example.com", 1)).unwrap();
    assert_eq!(blocked.events[0].bounce().unwrap().bounce_type, "Blocked");

    let sent = normalize(ProviderKind::Mailjet, &mailjet::event("sent", "a@example.com", 1)).unwrap();
    assert_eq!(sent.events[0].kind, EventKind::Delivered);

    for name in ["spam", "unsub"] {
        let complaint =
            normalize(ProviderKind::Mailjet, &mailjet::event(name, "a@example.com", 1)).unwrap();
        assert_eq!(complaint.events[0].kind, EventKind::complaint(name));
    }
}

#[test]
fn mailjet_unknown_event_and_scalar_body_are_rejected() {
    let err = normalize(ProviderKind::Mailjet, &mailjet::event("open", "a@example.com", 1)).unwrap_err();
    assert_eq!(err.code(), "E2002");

    let err = normalize(ProviderKind::Mailjet, &json!("sent")).unwrap_err();
    assert_eq!(err.code(), "E2001");
}

#[test]
fn mailjet_payload_metadata_is_a_correlation_fallback() {
    let mut value = mailjet::event("sent", "a@example.com", 7);
    value["Payload"] = json!(json!({"notifuse_message_id": "internal-7"}).to_string());

    let events = normalize(ProviderKind::Mailjet, &value).unwrap().events;
    assert_eq!(events[0].message_id.as_deref(), Some("internal-7"));
}

// ---------------------------------------------------------------------------
// SMTP relay
// ---------------------------------------------------------------------------

#[test]
fn smtp_relay_fixed_schema() {
    let events = normalize(
        ProviderKind::Smtp,
        &smtp::bounce("permanent", "mailbox", "a@example.com", "smtp-1"),
    )
    .unwrap()
    .events;

    assert_eq!(
        events[0].kind,
        EventKind::bounce("permanent", "mailbox", "550 5.1.1 mailbox unavailable")
    );
    assert_eq!(events[0].message_id.as_deref(), Some("smtp-1"));
    assert_eq!(events[0].timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

    let mut complaint = smtp::event("complaint", "a@example.com", "smtp-2");
    complaint["complaint_type"] = json!("fraud");
    let events = normalize(ProviderKind::Smtp, &complaint).unwrap().events;
    assert_eq!(events[0].kind, EventKind::complaint("fraud"));
}

#[test]
fn smtp_relay_rejects_unknown_events_and_garbage() {
    let err = normalize(ProviderKind::Smtp, &smtp::event("deferred", "a@example.com", "smtp-3"))
        .unwrap_err();
    assert_eq!(err.code(), "E2002");

    let err = normalizers()
        .normalize(ProviderKind::Smtp, &integration(), &Bytes::from_static(b"{\"event\":"))
        .unwrap_err();
    assert_eq!(err.code(), "E2001");
}

// ---------------------------------------------------------------------------
// Cross-provider properties
// ---------------------------------------------------------------------------

/// One payload per provider carrying native id `native` and internal id
/// `internal`.
fn correlated_payloads(native: &str, internal: &str) -> Vec<(ProviderKind, Value)> {
    vec![
        (
            ProviderKind::Ses,
            ses::notification_envelope(&ses::with_correlation(
                ses::bounce("Permanent", "General", "a@example.com", native),
                internal,
            )),
        ),
        (
            ProviderKind::Postmark,
            postmark::with_correlation(postmark::delivery("a@example.com", native), internal),
        ),
        (
            ProviderKind::Mailgun,
            mailgun::with_correlation(mailgun::event("delivered", "a@example.com", native), internal),
        ),
        (
            ProviderKind::SparkPost,
            sparkpost::batch(&[sparkpost::with_correlation(
                sparkpost::message_event("delivery", "a@example.com", native),
                internal,
            )]),
        ),
        (
            ProviderKind::Mailjet,
            mailjet::with_correlation(mailjet::event("sent", "a@example.com", 99), internal),
        ),
        (
            ProviderKind::Smtp,
            smtp::with_correlation(smtp::event("delivered", "a@example.com", native), internal),
        ),
    ]
}

#[test]
fn correlation_id_overrides_native_id_for_every_provider() {
    for (provider, payload) in correlated_payloads("native-id", "internal-id") {
        let events = normalize(provider, &payload).unwrap().events;
        assert_eq!(events.len(), 1, "{provider}");
        assert_eq!(events[0].message_id.as_deref(), Some("internal-id"), "{provider}");
    }
}

#[test]
fn renormalizing_a_payload_differs_only_in_id() {
    for (provider, payload) in correlated_payloads("native-id", "internal-id") {
        let first = normalize(provider, &payload).unwrap().events;
        let second = normalize(provider, &payload).unwrap().events;
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert!(a.eq_ignoring_id(b), "{provider} events differ beyond id");
            assert_ne!(a.id, b.id);
        }
    }
}
