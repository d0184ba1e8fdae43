//! Engine configuration

use std::time::Duration;

/// Configuration for a chat client
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Wait before re-fetching a just-sent message for late attachments (default: 1.5s)
    pub attachment_refetch_delay: Duration,

    /// How long a self-sent message id suppresses its own echo (default: 30s)
    pub self_echo_ttl: Duration,

    /// Maximum number of remembered self-sent ids (default: 1024)
    pub self_echo_capacity: usize,

    /// How long a routed message id blocks a second unread bump (default: 10min)
    pub ingest_dedupe_ttl: Duration,

    /// Maximum number of remembered routed ids (default: 16384)
    pub ingest_dedupe_capacity: usize,

    /// Content written in place of a soft-deleted message
    pub tombstone: String,

    /// Maximum length of a fallback session title, in characters (default: 30)
    pub title_fallback_len: usize,

    /// Number of recent messages sent to the title service (default: 4)
    pub title_transcript_size: u64,

    /// Base URL of the title-generation service
    pub title_service_url: String,

    /// Request timeout for the title-generation service (default: 10s)
    pub title_request_timeout: Duration,

    /// Capacity of the client event channel (default: 256)
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            attachment_refetch_delay: Duration::from_millis(1500),
            self_echo_ttl: Duration::from_secs(30),
            self_echo_capacity: 1024,
            ingest_dedupe_ttl: Duration::from_secs(600),
            ingest_dedupe_capacity: 16384,
            tombstone: "This message was deleted".to_string(),
            title_fallback_len: 30,
            title_transcript_size: 4,
            title_service_url: "http://localhost:3000/api".to_string(),
            title_request_timeout: Duration::from_secs(10),
            event_capacity: 256,
        }
    }
}
