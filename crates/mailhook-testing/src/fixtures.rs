//! Provider payload fixtures.
//!
//! Builders return `serde_json::Value` so tests can tweak a field before
//! converting with [`to_bytes`]. Shapes follow what each provider actually
//! posts, trimmed to the fields the normalizers read plus a few they ignore.

use bytes::Bytes;
use mailhook_core::CORRELATION_METADATA_KEY;
use serde_json::{json, Value};

/// Serializes a fixture into a request body.
pub fn to_bytes(value: &Value) -> Bytes {
    Bytes::from(value.to_string())
}

/// Amazon SES notifications and SNS envelopes.
pub mod ses {
    use super::*;

    /// Wraps an SES notification in an SNS `Notification` envelope.
    pub fn notification_envelope(message: &Value) -> Value {
        json!({
            "Type": "Notification",
            "MessageId": "22b80b92-fdea-4c2c-8f9d-bdfb0c7bf324",
            "TopicArn": "arn:aws:sns:us-east-1:123456789012:ses-events",
            "Message": message.to_string(),
            "Timestamp": "2024-05-01T12:00:01.000Z",
            "SignatureVersion": "1",
        })
    }

    /// SNS envelope whose `Message` is an arbitrary string.
    pub fn raw_envelope(message: &str) -> Value {
        json!({
            "Type": "Notification",
            "MessageId": "0c2b0b0c-1d9e-4b70-a1d2-5c8a0f5e4c11",
            "TopicArn": "arn:aws:sns:us-east-1:123456789012:ses-events",
            "Message": message,
            "Timestamp": "2024-05-01T12:00:01.000Z",
        })
    }

    /// SNS subscription handshake pointing at `subscribe_url`.
    pub fn subscription_confirmation(subscribe_url: &str) -> Value {
        json!({
            "Type": "SubscriptionConfirmation",
            "MessageId": "165545c9-2a5c-472c-8df2-7ff2be2b3b1b",
            "Token": "2336412f37fb687f5d51e6e241d09c805a5a57b30d712f794cc5f6a988666d92768dd60a747ba6f3beb71854e285d6ad02428b09ceece29417f1f02d609c582afbacc99c583a916b9981dd2728f4ae6fdb82efd087cc3b7849e05798d2d2785c03b0879594eeac82c01f235d0e717736",
            "TopicArn": "arn:aws:sns:us-east-1:123456789012:ses-events",
            "Message": "You have chosen to subscribe to the topic arn:aws:sns:us-east-1:123456789012:ses-events.",
            "SubscribeURL": subscribe_url,
            "Timestamp": "2024-05-01T12:00:00.000Z",
        })
    }

    /// SNS unsubscribe confirmation.
    pub fn unsubscribe_confirmation() -> Value {
        json!({
            "Type": "UnsubscribeConfirmation",
            "MessageId": "47138184-6831-46b8-8f7c-afc488602d7d",
            "TopicArn": "arn:aws:sns:us-east-1:123456789012:ses-events",
            "Message": "You have chosen to deactivate subscription.",
            "SubscribeURL": "https://sns.us-east-1.amazonaws.com/?Action=ConfirmSubscription",
            "Timestamp": "2024-05-01T12:00:00.000Z",
        })
    }

    /// Topic validation heartbeat sent when a configuration set is wired up.
    pub fn topic_validation() -> Value {
        raw_envelope("Successfully validated SNS topic for Amazon SES event publishing.")
    }

    fn mail(message_id: &str, recipients: &[&str]) -> Value {
        json!({
            "timestamp": "2024-05-01T11:59:58.000Z",
            "source": "sender@example.com",
            "sourceArn": "arn:aws:ses:us-east-1:123456789012:identity/example.com",
            "messageId": message_id,
            "destination": recipients,
        })
    }

    /// SES bounce notification for one recipient.
    pub fn bounce(bounce_type: &str, sub_type: &str, recipient: &str, message_id: &str) -> Value {
        json!({
            "notificationType": "Bounce",
            "bounce": {
                "feedbackId": "0100018f2a1b3c4d-bounce",
                "bounceType": bounce_type,
                "bounceSubType": sub_type,
                "bouncedRecipients": [{
                    "emailAddress": recipient,
                    "action": "failed",
                    "status": "5.1.1",
                    "diagnosticCode": "smtp; 550 5.1.1 user unknown",
                }],
                "timestamp": "2024-05-01T12:00:00.000Z",
                "reportingMTA": "dsn; a8-70.smtp-out.amazonses.com",
            },
            "mail": mail(message_id, &[recipient]),
        })
    }

    /// SES complaint notification for one recipient.
    pub fn complaint(recipient: &str, message_id: &str) -> Value {
        json!({
            "notificationType": "Complaint",
            "complaint": {
                "feedbackId": "0100018f2a1b3c4d-complaint",
                "complainedRecipients": [{ "emailAddress": recipient }],
                "complaintFeedbackType": "abuse",
                "timestamp": "2024-05-01T12:00:00.000Z",
                "userAgent": "ExampleCorp Feedback Loop (V0.01)",
            },
            "mail": mail(message_id, &[recipient]),
        })
    }

    /// SES delivery notification.
    pub fn delivery(recipients: &[&str], message_id: &str) -> Value {
        json!({
            "notificationType": "Delivery",
            "delivery": {
                "timestamp": "2024-05-01T12:00:00.000Z",
                "processingTimeMillis": 546,
                "recipients": recipients,
                "smtpResponse": "250 ok: Message 64111812 accepted",
                "reportingMTA": "a8-70.smtp-out.amazonses.com",
            },
            "mail": mail(message_id, recipients),
        })
    }

    /// Adds the internal message id as an SES message tag.
    pub fn with_correlation(mut notification: Value, internal_id: &str) -> Value {
        notification["mail"]["tags"] = json!({ CORRELATION_METADATA_KEY: [internal_id] });
        notification
    }
}

/// Postmark webhooks.
pub mod postmark {
    use super::*;

    /// Postmark delivery record.
    pub fn delivery(recipient: &str, message_id: &str) -> Value {
        json!({
            "RecordType": "Delivery",
            "ServerID": 23,
            "MessageStream": "outbound",
            "MessageID": message_id,
            "Recipient": recipient,
            "Tag": "welcome",
            "DeliveredAt": "2024-05-01T12:00:00Z",
            "Details": "Test delivery webhook details",
            "Metadata": {},
        })
    }

    /// Postmark bounce record with the given `Type`.
    pub fn bounce(bounce_type: &str, email: &str, message_id: &str) -> Value {
        json!({
            "RecordType": "Bounce",
            "ID": 4_323_372_036_u64,
            "Type": bounce_type,
            "TypeCode": 1,
            "Name": "Hard bounce",
            "MessageID": message_id,
            "ServerID": 23,
            "MessageStream": "outbound",
            "Description": "The server was unable to deliver your message (ex: unknown user, mailbox not found).",
            "Details": "smtp;550 5.1.1 The email account that you tried to reach does not exist.",
            "Email": email,
            "From": "sender@example.com",
            "BouncedAt": "2024-05-01T12:00:00Z",
            "Inactive": true,
            "CanActivate": true,
            "Subject": "Test subject",
            "Metadata": {},
        })
    }

    /// Postmark spam complaint record.
    pub fn spam_complaint(email: &str, message_id: &str) -> Value {
        json!({
            "RecordType": "SpamComplaint",
            "ID": 42,
            "Type": "SpamComplaint",
            "TypeCode": 512,
            "MessageID": message_id,
            "Email": email,
            "BouncedAt": "2024-05-01T12:00:00Z",
            "Metadata": {},
        })
    }

    /// Adds the internal message id to `Metadata`.
    pub fn with_correlation(mut record: Value, internal_id: &str) -> Value {
        record["Metadata"] = json!({ CORRELATION_METADATA_KEY: internal_id });
        record
    }
}

/// Mailgun webhooks.
pub mod mailgun {
    use super::*;

    /// Mailgun event with the given `event` name.
    pub fn event(event: &str, recipient: &str, message_id: &str) -> Value {
        json!({
            "signature": {
                "timestamp": "1714564800",
                "token": "a8ce0edb2dd8301dee6c2405235584e45aa91d1e9f979f3de0",
                "signature": "d2271d12299f6592d9d44cd9d250f0704e4674c30d79d07c47a66f95ce71cf55",
            },
            "event-data": {
                "id": "CPgfbmQMTCKtHW6uIWtuVe",
                "event": event,
                "timestamp": 1_714_564_800.5,
                "recipient": recipient,
                "message": {
                    "headers": {
                        "message-id": message_id,
                        "to": recipient,
                        "from": "sender@example.com",
                    },
                },
                "user-variables": {},
            },
        })
    }

    /// Mailgun `failed` event with the given severity.
    pub fn failed(severity: &str, recipient: &str, message_id: &str) -> Value {
        let mut value = event("failed", recipient, message_id);
        value["event-data"]["severity"] = json!(severity);
        value["event-data"]["reason"] = json!("bounce");
        value["event-data"]["delivery-status"] = json!({
            "code": 550,
            "message": "No such user",
            "description": "550 5.1.1 The email account that you tried to reach does not exist.",
        });
        value
    }

    /// Adds the internal message id to `user-variables`.
    pub fn with_correlation(mut value: Value, internal_id: &str) -> Value {
        value["event-data"]["user-variables"] = json!({ CORRELATION_METADATA_KEY: internal_id });
        value
    }
}

/// SparkPost webhooks.
pub mod sparkpost {
    use super::*;

    /// `message_event` wrapper of the given type.
    pub fn message_event(event_type: &str, recipient: &str, message_id: &str) -> Value {
        json!({
            "msys": {
                "message_event": {
                    "type": event_type,
                    "timestamp": "1714564800",
                    "rcpt_to": recipient,
                    "message_id": message_id,
                    "transmission_id": "65832150921904138",
                    "rcpt_meta": {},
                },
            },
        })
    }

    /// `message_event` bounce wrapper with a bounce class.
    pub fn bounce(bounce_class: &str, recipient: &str, message_id: &str) -> Value {
        let mut value = message_event("bounce", recipient, message_id);
        value["msys"]["message_event"]["bounce_class"] = json!(bounce_class);
        value["msys"]["message_event"]["reason"] = json!("550 5.1.1 <recipient>... User unknown");
        value["msys"]["message_event"]["raw_reason"] =
            json!("550 5.1.1 <recipient@example.com>... User unknown");
        value
    }

    /// `track_event` wrapper, e.g. an open.
    pub fn track_event(event_type: &str, recipient: &str, message_id: &str) -> Value {
        json!({
            "msys": {
                "track_event": {
                    "type": event_type,
                    "timestamp": "2024-05-01T12:00:00.000Z",
                    "rcpt_to": recipient,
                    "message_id": message_id,
                },
            },
        })
    }

    /// Adds the internal message id to the event's `rcpt_meta`.
    pub fn with_correlation(mut wrapper: Value, internal_id: &str) -> Value {
        if let Some(msys) = wrapper["msys"].as_object_mut() {
            for event in msys.values_mut() {
                event["rcpt_meta"] = json!({ CORRELATION_METADATA_KEY: internal_id });
            }
        }
        wrapper
    }

    /// Wraps events into a batch payload.
    pub fn batch(events: &[Value]) -> Value {
        Value::Array(events.to_vec())
    }
}

/// Mailjet webhooks.
pub mod mailjet {
    use super::*;

    /// Mailjet event with the given name.
    pub fn event(event: &str, email: &str, message_id: u64) -> Value {
        json!({
            "event": event,
            "time": 1_714_564_800,
            "MessageID": message_id,
            "Message_GUID": "1ab23cd4-e567-8901-2345-6789f0gh1i2j",
            "email": email,
            "mj_campaign_id": 0,
            "mj_contact_id": 0,
            "customcampaign": "",
            "CustomID": "",
            "Payload": "",
        })
    }

    /// Mailjet `bounce` event.
    pub fn bounce(hard: bool, email: &str, message_id: u64) -> Value {
        let mut value = event("bounce", email, message_id);
        value["blocked"] = json!(false);
        value["hard_bounce"] = json!(hard);
        value["error_related_to"] = json!("recipient");
        value["error"] = json!("user unknown");
        value["comment"] = json!("Host or domain name not found.");
        value
    }

    /// Mailjet `blocked` event.
    pub fn blocked(email: &str, message_id: u64) -> Value {
        let mut value = event("blocked", email, message_id);
        value["error_related_to"] = json!("recipient");
        value["error"] = json!("user unknown");
        value
    }

    /// Sets `CustomID` to the internal message id.
    pub fn with_correlation(mut value: Value, internal_id: &str) -> Value {
        value["CustomID"] = json!(internal_id);
        value
    }
}

/// Generic SMTP relay webhooks.
pub mod smtp {
    use super::*;

    /// SMTP relay event.
    pub fn event(event: &str, recipient: &str, message_id: &str) -> Value {
        json!({
            "event": event,
            "timestamp": "2024-05-01T12:00:00Z",
            "recipient": recipient,
            "messageId": message_id,
        })
    }

    /// SMTP relay bounce.
    pub fn bounce(bounce_type: &str, category: &str, recipient: &str, message_id: &str) -> Value {
        let mut value = event("bounce", recipient, message_id);
        value["bounce_type"] = json!(bounce_type);
        value["bounce_category"] = json!(category);
        value["diagnostic"] = json!("550 5.1.1 mailbox unavailable");
        value
    }

    /// Adds the internal message id to `metadata`.
    pub fn with_correlation(mut value: Value, internal_id: &str) -> Value {
        value["metadata"] = json!({ CORRELATION_METADATA_KEY: internal_id });
        value
    }
}
