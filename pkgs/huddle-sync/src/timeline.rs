//! Common projection of human and AI messages for "last message" tracking

use chrono::{DateTime, Utc};
use huddle_store::{AiMessageRecord, MessageRecord};
use serde::{Deserialize, Serialize};

/// Which stream an entry came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimelineSource {
    Human,
    Ai,
}

/// A message reduced to what the session directory shows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEntry {
    pub id: String,
    pub session_id: String,
    pub author_id: String,
    pub preview: String,
    pub timestamp: DateTime<Utc>,
    pub is_deleted: bool,
    pub source: TimelineSource,
}

impl TimelineEntry {
    pub fn from_message(message: &MessageRecord) -> Self {
        Self {
            id: message.id.clone(),
            session_id: message.session_id.clone(),
            author_id: message.user_id.clone(),
            preview: message.content.clone(),
            timestamp: message.created_at,
            is_deleted: message.is_deleted,
            source: TimelineSource::Human,
        }
    }

    /// AI messages written before their session existed have no slot to fill
    pub fn from_ai(message: &AiMessageRecord) -> Option<Self> {
        Some(Self {
            id: message.id.clone(),
            session_id: message.session_id.clone()?,
            author_id: message.user_id.clone(),
            preview: message.content.clone(),
            timestamp: message.timestamp,
            is_deleted: false,
            source: TimelineSource::Ai,
        })
    }

    /// Whether this entry should take `current`'s place as the last message.
    ///
    /// The greatest timestamp wins. A newer copy of the same message replaces
    /// the old one, but never un-deletes it.
    pub fn supersedes(&self, current: &TimelineEntry) -> bool {
        if self.id == current.id {
            return self.is_deleted || !current.is_deleted;
        }
        self.timestamp > current.timestamp
    }
}

/// The later of two candidate last messages
pub fn latest(a: Option<TimelineEntry>, b: Option<TimelineEntry>) -> Option<TimelineEntry> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b.supersedes(&a) { b } else { a }),
        (a, b) => a.or(b),
    }
}
