//! The row store seam consumed by the sync engine

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::StoreResult;
use crate::feed::{Subscription, SubscriptionSpec};
use crate::records::*;

/// Typed CRUD over the chat tables plus the change-feed subscription primitive.
///
/// Every method is a single round trip; callers decide which failures are fatal.
#[async_trait]
pub trait ChatStore: Send + Sync {
    // Sessions

    async fn session(&self, id: &str) -> StoreResult<Option<SessionRecord>>;

    /// Sessions in which `user_id` has a participant row
    async fn sessions_for_user(&self, user_id: &str) -> StoreResult<Vec<SessionRecord>>;

    /// The AI session owned by `owner_id`, if one was ever created
    async fn ai_session_for(&self, owner_id: &str) -> StoreResult<Option<SessionRecord>>;

    async fn insert_session(&self, session: NewSession) -> StoreResult<SessionRecord>;

    async fn rename_session(&self, id: &str, name: &str) -> StoreResult<()>;

    async fn delete_session(&self, id: &str) -> StoreResult<()>;

    // Participants

    async fn participants(&self, session_id: &str) -> StoreResult<Vec<ParticipantRecord>>;

    async fn insert_participant(&self, participant: ParticipantRecord) -> StoreResult<()>;

    async fn delete_participant(&self, session_id: &str, user_id: &str) -> StoreResult<()>;

    async fn delete_participants(&self, session_id: &str) -> StoreResult<()>;

    async fn profiles(&self, user_ids: &[String]) -> StoreResult<Vec<UserProfile>>;

    // Messages

    /// A single message joined with sender, attachments and reply preview
    async fn message(&self, id: &str) -> StoreResult<Option<MessageView>>;

    /// All messages of a session, oldest first
    async fn messages(&self, session_id: &str) -> StoreResult<Vec<MessageView>>;

    async fn latest_message(&self, session_id: &str) -> StoreResult<Option<MessageRecord>>;

    /// Persist a message; the store stamps `created_at`
    async fn insert_message(&self, message: NewMessage) -> StoreResult<MessageRecord>;

    /// Mark a message deleted and replace its content; the row is kept
    async fn soft_delete_message(&self, id: &str, tombstone: &str) -> StoreResult<()>;

    async fn message_ids(&self, session_id: &str) -> StoreResult<Vec<String>>;

    async fn delete_messages(&self, session_id: &str) -> StoreResult<()>;

    // Attachments

    async fn insert_attachment(&self, attachment: NewAttachment) -> StoreResult<AttachmentRecord>;

    async fn delete_attachments(&self, message_ids: &[String]) -> StoreResult<()>;

    // Read receipts

    async fn insert_read_status(&self, message_id: &str, session_id: &str, user_id: &str)
        -> StoreResult<()>;

    /// Receipts of `user_id` in `session_id` that are still unread
    async fn unread_rows(&self, session_id: &str, user_id: &str)
        -> StoreResult<Vec<ReadStatusRecord>>;

    /// Set `read_at` on one receipt if it is still unread; returns whether it changed
    async fn mark_read_row(&self, message_id: &str, user_id: &str, at: DateTime<Utc>)
        -> StoreResult<bool>;

    async fn unread_count(&self, session_id: &str, user_id: &str) -> StoreResult<u32>;

    /// Unread receipts of `user_id` grouped by session
    async fn unread_counts(&self, user_id: &str) -> StoreResult<HashMap<String, u32>>;

    async fn delete_read_status(&self, message_ids: &[String]) -> StoreResult<()>;

    // AI messages

    /// Persist an AI stream message; the store stamps `timestamp`
    async fn insert_ai_message(&self, message: NewAiMessage) -> StoreResult<AiMessageRecord>;

    async fn latest_ai_message(&self, session_id: &str) -> StoreResult<Option<AiMessageRecord>>;

    async fn count_assistant_messages(&self, session_id: &str) -> StoreResult<u64>;

    /// Up to `limit` most recent messages of a conversation, oldest first
    async fn recent_ai_messages(
        &self,
        session_id: &str,
        conversation_id: &str,
        limit: u64,
    ) -> StoreResult<Vec<AiMessageRecord>>;

    async fn delete_ai_messages(&self, session_id: &str) -> StoreResult<()>;

    // Side channels

    async fn insert_notification(&self, notification: NewNotification) -> StoreResult<()>;

    async fn batch_lookup_relationships(
        &self,
        viewer_id: &str,
        other_user_ids: &[String],
    ) -> StoreResult<HashMap<String, Relationship>>;

    // Change feed

    fn subscribe(&self, spec: SubscriptionSpec) -> Subscription;
}
