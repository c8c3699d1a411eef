//! Message id correlation.
//!
//! Outbound sends attach the internal message id through each provider's
//! free-form metadata channel under [`CORRELATION_METADATA_KEY`]. The
//! delivery-history store is keyed by that id, so when present it replaces
//! whatever identifier the provider assigned.

use std::collections::HashMap;

use mailhook_core::CORRELATION_METADATA_KEY;
use serde_json::Value;

/// Identifier sources of a decoded provider notification.
///
/// Providers implement the two lookups; [`Correlated::message_id`] applies
/// the override rule in one place for all of them.
pub trait Correlated {
    /// Internal message id found in the provider's metadata channel.
    fn metadata_message_id(&self) -> Option<String>;

    /// Identifier assigned by the provider.
    fn native_message_id(&self) -> Option<String>;

    /// Correlation key for the delivery-history record.
    fn message_id(&self) -> Option<String> {
        resolve_message_id(self.metadata_message_id(), self.native_message_id())
    }
}

/// Picks the internal id when present, else the provider id.
pub fn resolve_message_id(metadata: Option<String>, native: Option<String>) -> Option<String> {
    non_empty(metadata).or_else(|| non_empty(native))
}

/// Reads the internal id from a flat metadata map.
///
/// Accepts string and numeric values, and the first element of an array.
pub fn from_metadata(metadata: &HashMap<String, Value>) -> Option<String> {
    metadata.get(CORRELATION_METADATA_KEY).and_then(scalar_to_string)
}

/// Reads the internal id from a map of tag lists, as SES reports tags.
pub fn from_tag_lists(tags: &HashMap<String, Vec<String>>) -> Option<String> {
    tags.get(CORRELATION_METADATA_KEY).and_then(|values| values.first()).cloned()
}

/// Renders a JSON scalar as a string.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => items.first().and_then(scalar_to_string),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
