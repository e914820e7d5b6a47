use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope for a change notification.
///
/// Notes:
/// - `sequence` is assigned by the publisher and increases by one per publish.
///   Consumers may use it for logging/correlation; nothing requires gap-free delivery.
/// - `payload` is whatever the publisher pushes (for inventory: a full snapshot, never a diff).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification<P> {
    sequence: u64,
    source: String,
    published_at: DateTime<Utc>,
    payload: P,
}

impl<P> Notification<P> {
    pub fn new(sequence: u64, source: impl Into<String>, published_at: DateTime<Utc>, payload: P) -> Self {
        Self {
            sequence,
            source: source.into(),
            published_at,
            payload,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Name of the collection/stream the notification came from (e.g. `"products"`).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }
}
