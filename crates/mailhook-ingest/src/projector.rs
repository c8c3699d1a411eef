//! Message status projection.
//!
//! Derives delivery-history transitions from canonical events. Only
//! outcomes that settle a message's status are projected: soft bounces stay
//! visible as stored events and never touch the history record.

use mailhook_core::{
    is_hard_bounce, CanonicalWebhookEvent, EventKind, MessageEvent, MessageEventUpdate,
};

/// Projects events into status updates, preserving event order.
///
/// Events without a message id are skipped, as are soft bounces.
pub fn project(events: &[CanonicalWebhookEvent]) -> Vec<MessageEventUpdate> {
    events.iter().filter_map(project_event).collect()
}

/// Projects one event, if it settles a status.
pub fn project_event(event: &CanonicalWebhookEvent) -> Option<MessageEventUpdate> {
    let message_id = event.message_id.as_deref().filter(|id| !id.is_empty())?;

    match &event.kind {
        EventKind::Delivered => {
            Some(MessageEventUpdate::new(message_id, MessageEvent::Delivered, event.timestamp))
        },
        EventKind::Bounce(bounce) => {
            if !is_hard_bounce(&bounce.bounce_type, &bounce.bounce_category) {
                return None;
            }
            let info = format!(
                "{} {} {}",
                bounce.bounce_type, bounce.bounce_category, bounce.bounce_diagnostic
            );
            Some(
                MessageEventUpdate::new(message_id, MessageEvent::Bounced, event.timestamp)
                    .with_status_info(&info),
            )
        },
        EventKind::Complaint(complaint) => Some(
            MessageEventUpdate::new(message_id, MessageEvent::Complained, event.timestamp)
                .with_status_info(&complaint.complaint_feedback_type),
        ),
    }
}
