//! Change envelope types.
//!
//! A change envelope is the notification published on the resource-changed stream
//! whenever a disqualified officer record is changed or deleted upstream.

use serde::{Deserialize, Serialize};

/// The kind of change an envelope describes.
///
/// Only the two known variants are accepted. Any other value fails deserialization
/// so that unknown events are rejected before they reach the transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// The resource was created or updated; the envelope carries its payload.
    Changed,
    /// The resource was removed; only the identifier is meaningful.
    Deleted,
}

impl EventKind {
    /// Returns the wire name of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Changed => "changed",
            EventKind::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields_changed: Option<Vec<String>>,
}

/// A decoded resource-changed notification.
///
/// `attempt_count` is not part of the message body. It travels in the record
/// headers and is attached after decoding with [`ChangeEnvelope::with_attempt_count`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEnvelope {
    /// Correlation id used for logging and request tracing.
    pub context_id: String,
    /// Stable identifier of the underlying record; used as the index key.
    pub resource_id: String,
    /// Resource kind, e.g. `disqualified-officers`.
    pub resource_kind: String,
    /// Resource URI, e.g. `/disqualified-officers/natural/1234567890`.
    pub resource_uri: String,
    pub event: EventRecord,
    /// Raw JSON payload of the changed resource. Ignored for deleted events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip)]
    pub attempt_count: u32,
}

impl ChangeEnvelope {
    /// Attach the attempt count read from the record metadata.
    pub fn with_attempt_count(mut self, attempt_count: u32) -> Self {
        self.attempt_count = attempt_count;
        self
    }

    /// The kind of change this envelope describes.
    pub fn event_kind(&self) -> EventKind {
        self.event.kind
    }

    /// The payload, if present and not blank.
    pub fn payload(&self) -> Option<&str> {
        self.data
            .as_deref()
            .filter(|data| !data.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANGED_ENVELOPE: &str = r#"{
        "context_id": "context_id",
        "resource_id": "1234567890",
        "resource_kind": "disqualified-officers",
        "resource_uri": "/disqualified-officers/natural/1234567890",
        "event": { "type": "changed", "published_at": "2022010351" },
        "data": "{\"surname\":\"SMITH\"}"
    }"#;

    #[test]
    fn test_deserialize_changed_envelope() {
        let envelope: ChangeEnvelope = serde_json::from_str(CHANGED_ENVELOPE).unwrap();

        assert_eq!(envelope.context_id, "context_id");
        assert_eq!(envelope.resource_id, "1234567890");
        assert_eq!(envelope.event_kind(), EventKind::Changed);
        assert_eq!(envelope.event.published_at.as_deref(), Some("2022010351"));
        assert_eq!(envelope.payload(), Some("{\"surname\":\"SMITH\"}"));
        assert_eq!(envelope.attempt_count, 0);
    }

    #[test]
    fn test_deleted_envelope_without_data() {
        let json = r#"{
            "context_id": "ctx",
            "resource_id": "42",
            "resource_kind": "disqualified-officers",
            "resource_uri": "/disqualified-officers/natural/42",
            "event": { "type": "deleted" }
        }"#;

        let envelope: ChangeEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.event_kind(), EventKind::Deleted);
        assert!(envelope.payload().is_none());
    }

    #[test]
    fn test_unknown_event_kind_is_rejected() {
        let json = CHANGED_ENVELOPE.replace("\"changed\"", "\"archived\"");
        assert!(serde_json::from_str::<ChangeEnvelope>(&json).is_err());
    }

    #[test]
    fn test_blank_payload_is_absent() {
        let mut envelope: ChangeEnvelope = serde_json::from_str(CHANGED_ENVELOPE).unwrap();
        envelope.data = Some("   ".to_string());
        assert!(envelope.payload().is_none());
    }

    #[test]
    fn test_attempt_count_is_not_serialized() {
        let envelope: ChangeEnvelope = serde_json::from_str(CHANGED_ENVELOPE).unwrap();
        let envelope = envelope.with_attempt_count(3);

        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("attempt_count").is_none());
        assert_eq!(envelope.attempt_count, 3);
    }
}
