// Shared fixtures for huddle-sync integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use huddle_store::{
    AiMessageRecord, AttachmentRecord, ChatStore, MessageRecord, MessageView, NewAiMessage,
    NewAttachment, NewMessage, NewNotification, NewSession, ParticipantRecord, ParticipantRole,
    ReadStatusRecord, Relationship, SessionKind, SessionRecord, SqliteChatStore, StoreError,
    StoreResult, Subscription, SubscriptionSpec, UserProfile,
};
use huddle_sync::{ChatClient, SyncConfig, TitleError, TitleGenerator};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

pub async fn open_store(temp_file: &NamedTempFile) -> Arc<SqliteChatStore> {
    Arc::new(
        SqliteChatStore::open(temp_file.path().to_path_buf())
            .await
            .expect("Failed to open chat store"),
    )
}

pub fn test_config() -> SyncConfig {
    SyncConfig {
        attachment_refetch_delay: Duration::from_millis(50),
        ..Default::default()
    }
}

pub fn client(store: Arc<dyn ChatStore>, viewer: &str) -> ChatClient {
    client_with_titles(store, viewer, FakeTitles::failing(500))
}

pub fn client_with_titles(
    store: Arc<dyn ChatStore>,
    viewer: &str,
    titles: Arc<FakeTitles>,
) -> ChatClient {
    ChatClient::with_title_generator(store, Some(viewer.to_string()), test_config(), titles)
}

/// Create a session with `creator` as admin and `members` as members
pub async fn seed_session(
    store: &SqliteChatStore,
    kind: SessionKind,
    creator: &str,
    members: &[&str],
) -> SessionRecord {
    let session = store
        .insert_session(NewSession {
            kind,
            name: None,
            created_by: creator.to_string(),
        })
        .await
        .expect("Failed to create session");

    store
        .insert_participant(ParticipantRecord {
            session_id: session.id.clone(),
            user_id: creator.to_string(),
            role: ParticipantRole::Admin,
        })
        .await
        .expect("Failed to add creator");
    for member in members {
        store
            .insert_participant(ParticipantRecord {
                session_id: session.id.clone(),
                user_id: member.to_string(),
                role: ParticipantRole::Member,
            })
            .await
            .expect("Failed to add member");
    }
    session
}

/// Title generator with a canned answer
pub struct FakeTitles {
    reply: Result<String, u16>,
    pub conversations: Mutex<Vec<String>>,
}

impl FakeTitles {
    pub fn answering(title: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(title.to_string()),
            conversations: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(status),
            conversations: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TitleGenerator for FakeTitles {
    async fn generate(&self, conversation: &str, _session_id: &str) -> Result<String, TitleError> {
        self.conversations.lock().push(conversation.to_string());
        match &self.reply {
            Ok(title) => Ok(title.clone()),
            Err(status) => Err(TitleError::Status(*status)),
        }
    }
}

/// Store wrapper that fails selected operations on demand
pub struct FlakyStore {
    inner: Arc<SqliteChatStore>,
    pub fail_message_inserts: AtomicBool,
    pub fail_attachment_deletes: AtomicBool,
    pub fail_read_status_inserts: AtomicBool,
    pub fail_notifications: AtomicBool,
    /// Message whose read transition fails
    pub fail_mark_read_for: Mutex<Option<String>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteChatStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_message_inserts: AtomicBool::new(false),
            fail_attachment_deletes: AtomicBool::new(false),
            fail_read_status_inserts: AtomicBool::new(false),
            fail_notifications: AtomicBool::new(false),
            fail_mark_read_for: Mutex::new(None),
        })
    }

    fn check(flag: &AtomicBool, what: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("injected failure: {}", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatStore for FlakyStore {
    async fn session(&self, id: &str) -> StoreResult<Option<SessionRecord>> {
        self.inner.session(id).await
    }

    async fn sessions_for_user(&self, user_id: &str) -> StoreResult<Vec<SessionRecord>> {
        self.inner.sessions_for_user(user_id).await
    }

    async fn ai_session_for(&self, owner_id: &str) -> StoreResult<Option<SessionRecord>> {
        self.inner.ai_session_for(owner_id).await
    }

    async fn insert_session(&self, session: NewSession) -> StoreResult<SessionRecord> {
        self.inner.insert_session(session).await
    }

    async fn rename_session(&self, id: &str, name: &str) -> StoreResult<()> {
        self.inner.rename_session(id, name).await
    }

    async fn delete_session(&self, id: &str) -> StoreResult<()> {
        self.inner.delete_session(id).await
    }

    async fn participants(&self, session_id: &str) -> StoreResult<Vec<ParticipantRecord>> {
        self.inner.participants(session_id).await
    }

    async fn insert_participant(&self, participant: ParticipantRecord) -> StoreResult<()> {
        self.inner.insert_participant(participant).await
    }

    async fn delete_participant(&self, session_id: &str, user_id: &str) -> StoreResult<()> {
        self.inner.delete_participant(session_id, user_id).await
    }

    async fn delete_participants(&self, session_id: &str) -> StoreResult<()> {
        self.inner.delete_participants(session_id).await
    }

    async fn profiles(&self, user_ids: &[String]) -> StoreResult<Vec<UserProfile>> {
        self.inner.profiles(user_ids).await
    }

    async fn message(&self, id: &str) -> StoreResult<Option<MessageView>> {
        self.inner.message(id).await
    }

    async fn messages(&self, session_id: &str) -> StoreResult<Vec<MessageView>> {
        self.inner.messages(session_id).await
    }

    async fn latest_message(&self, session_id: &str) -> StoreResult<Option<MessageRecord>> {
        self.inner.latest_message(session_id).await
    }

    async fn insert_message(&self, message: NewMessage) -> StoreResult<MessageRecord> {
        Self::check(&self.fail_message_inserts, "insert_message")?;
        self.inner.insert_message(message).await
    }

    async fn soft_delete_message(&self, id: &str, tombstone: &str) -> StoreResult<()> {
        self.inner.soft_delete_message(id, tombstone).await
    }

    async fn message_ids(&self, session_id: &str) -> StoreResult<Vec<String>> {
        self.inner.message_ids(session_id).await
    }

    async fn delete_messages(&self, session_id: &str) -> StoreResult<()> {
        self.inner.delete_messages(session_id).await
    }

    async fn insert_attachment(&self, attachment: NewAttachment) -> StoreResult<AttachmentRecord> {
        self.inner.insert_attachment(attachment).await
    }

    async fn delete_attachments(&self, message_ids: &[String]) -> StoreResult<()> {
        Self::check(&self.fail_attachment_deletes, "delete_attachments")?;
        self.inner.delete_attachments(message_ids).await
    }

    async fn insert_read_status(
        &self,
        message_id: &str,
        session_id: &str,
        user_id: &str,
    ) -> StoreResult<()> {
        Self::check(&self.fail_read_status_inserts, "insert_read_status")?;
        self.inner
            .insert_read_status(message_id, session_id, user_id)
            .await
    }

    async fn unread_rows(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> StoreResult<Vec<ReadStatusRecord>> {
        self.inner.unread_rows(session_id, user_id).await
    }

    async fn mark_read_row(
        &self,
        message_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        if self.fail_mark_read_for.lock().as_deref() == Some(message_id) {
            return Err(StoreError::Unavailable(format!(
                "injected failure: mark_read_row {}",
                message_id
            )));
        }
        self.inner.mark_read_row(message_id, user_id, at).await
    }

    async fn unread_count(&self, session_id: &str, user_id: &str) -> StoreResult<u32> {
        self.inner.unread_count(session_id, user_id).await
    }

    async fn unread_counts(&self, user_id: &str) -> StoreResult<HashMap<String, u32>> {
        self.inner.unread_counts(user_id).await
    }

    async fn delete_read_status(&self, message_ids: &[String]) -> StoreResult<()> {
        self.inner.delete_read_status(message_ids).await
    }

    async fn insert_ai_message(&self, message: NewAiMessage) -> StoreResult<AiMessageRecord> {
        self.inner.insert_ai_message(message).await
    }

    async fn latest_ai_message(&self, session_id: &str) -> StoreResult<Option<AiMessageRecord>> {
        self.inner.latest_ai_message(session_id).await
    }

    async fn count_assistant_messages(&self, session_id: &str) -> StoreResult<u64> {
        self.inner.count_assistant_messages(session_id).await
    }

    async fn recent_ai_messages(
        &self,
        session_id: &str,
        conversation_id: &str,
        limit: u64,
    ) -> StoreResult<Vec<AiMessageRecord>> {
        self.inner
            .recent_ai_messages(session_id, conversation_id, limit)
            .await
    }

    async fn delete_ai_messages(&self, session_id: &str) -> StoreResult<()> {
        self.inner.delete_ai_messages(session_id).await
    }

    async fn insert_notification(&self, notification: NewNotification) -> StoreResult<()> {
        Self::check(&self.fail_notifications, "insert_notification")?;
        self.inner.insert_notification(notification).await
    }

    async fn batch_lookup_relationships(
        &self,
        viewer_id: &str,
        other_user_ids: &[String],
    ) -> StoreResult<HashMap<String, Relationship>> {
        self.inner
            .batch_lookup_relationships(viewer_id, other_user_ids)
            .await
    }

    fn subscribe(&self, spec: SubscriptionSpec) -> Subscription {
        self.inner.subscribe(spec)
    }
}
