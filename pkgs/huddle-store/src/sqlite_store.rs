//! SQLite chat store - sea-orm implementation of [`ChatStore`] that publishes
//! every insert and update on its change feed

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use sea_orm_migration::MigratorTrait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::{
    ai_messages, attachments, messages, notifications, participants, read_status, relationships,
    sessions, users,
};
use crate::error::{StoreError, StoreResult};
use crate::feed::{ChangeEvent, ChangeFeed, Row, Subscription, SubscriptionSpec};
use crate::records::*;
use crate::store::ChatStore;

/// Issues millisecond timestamps that never repeat or go backwards
#[derive(Debug, Default)]
struct ServerClock {
    last: AtomicI64,
}

impl ServerClock {
    fn now(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|prev| prev);
        now.max(prev + 1)
    }
}

/// SQLite chat store
pub struct SqliteChatStore {
    db: DatabaseConnection,
    feed: ChangeFeed,
    clock: ServerClock,
}

impl SqliteChatStore {
    /// Open (or create) the database file and run migrations
    pub async fn open(db_path: PathBuf) -> StoreResult<Self> {
        let db_path_str = db_path
            .to_str()
            .ok_or_else(|| StoreError::InvalidPath(db_path.display().to_string()))?
            .replace("\\", "/");

        let db_url = format!("sqlite:{}?mode=rwc", db_path_str);
        let db = Database::connect(db_url.as_str()).await?;

        let store = Self::with_connection(db).await?;
        info!("Chat store initialized at {}", db_path.display());
        Ok(store)
    }

    /// Create a chat store over an existing connection
    pub async fn with_connection(db: DatabaseConnection) -> StoreResult<Self> {
        crate::migration::Migrator::up(&db, None).await?;

        Ok(Self {
            db,
            feed: ChangeFeed::default(),
            clock: ServerClock::default(),
        })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Create or update a user profile
    pub async fn upsert_user(&self, profile: &UserProfile) -> StoreResult<()> {
        let model = users::ActiveModel {
            id: Set(profile.id.clone()),
            display_name: Set(profile.display_name.clone()),
            avatar_url: Set(profile.avatar_url.clone()),
        };

        users::Entity::insert(model)
            .on_conflict(
                OnConflict::column(users::Column::Id)
                    .update_columns([users::Column::DisplayName, users::Column::AvatarUrl])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        debug!("Upserted user {}", profile.id);
        Ok(())
    }

    /// Record how `user_id` relates to `other_user_id`
    pub async fn set_relationship(
        &self,
        user_id: &str,
        other_user_id: &str,
        relationship: Relationship,
    ) -> StoreResult<()> {
        let model = relationships::ActiveModel {
            user_id: Set(user_id.to_string()),
            other_user_id: Set(other_user_id.to_string()),
            status: Set(relationship.as_str().to_string()),
        };

        relationships::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    relationships::Column::UserId,
                    relationships::Column::OtherUserId,
                ])
                .update_column(relationships::Column::Status)
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    /// Join sender profiles, attachments and reply previews onto message rows
    async fn hydrate(&self, models: Vec<messages::Model>) -> StoreResult<Vec<MessageView>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let mut sender_ids: Vec<String> = models.iter().map(|m| m.user_id.clone()).collect();
        sender_ids.sort();
        sender_ids.dedup();
        let reply_ids: Vec<String> = models
            .iter()
            .filter_map(|m| m.reply_to_message_id.clone())
            .collect();

        let mut attachments_by_message: HashMap<String, Vec<AttachmentRecord>> = HashMap::new();
        for model in attachments::Entity::find()
            .filter(attachments::Column::MessageId.is_in(ids))
            .all(&self.db)
            .await?
        {
            attachments_by_message
                .entry(model.message_id.clone())
                .or_default()
                .push(model.into());
        }

        let profiles: HashMap<String, UserProfile> = self
            .profiles(&sender_ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let replies: HashMap<String, ReplyPreview> = if reply_ids.is_empty() {
            HashMap::new()
        } else {
            messages::Entity::find()
                .filter(messages::Column::Id.is_in(reply_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|m| {
                    (
                        m.id.clone(),
                        ReplyPreview {
                            message_id: m.id,
                            user_id: m.user_id,
                            content: m.content,
                            is_deleted: m.is_deleted,
                        },
                    )
                })
                .collect()
        };

        models
            .into_iter()
            .map(|model| {
                let sender = profiles.get(&model.user_id).cloned();
                let attachments = attachments_by_message.remove(&model.id).unwrap_or_default();
                let reply_to = model
                    .reply_to_message_id
                    .as_ref()
                    .and_then(|id| replies.get(id).cloned());

                Ok(MessageView {
                    message: MessageRecord::try_from(model)?,
                    sender,
                    attachments,
                    reply_to,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn session(&self, id: &str) -> StoreResult<Option<SessionRecord>> {
        sessions::Entity::find_by_id(id.to_owned())
            .one(&self.db)
            .await?
            .map(SessionRecord::try_from)
            .transpose()
    }

    async fn sessions_for_user(&self, user_id: &str) -> StoreResult<Vec<SessionRecord>> {
        let session_ids: Vec<String> = participants::Entity::find()
            .filter(participants::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| p.session_id)
            .collect();

        if session_ids.is_empty() {
            return Ok(Vec::new());
        }

        sessions::Entity::find()
            .filter(sessions::Column::Id.is_in(session_ids))
            .order_by_desc(sessions::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(SessionRecord::try_from)
            .collect()
    }

    async fn ai_session_for(&self, owner_id: &str) -> StoreResult<Option<SessionRecord>> {
        sessions::Entity::find()
            .filter(sessions::Column::CreatedBy.eq(owner_id))
            .filter(sessions::Column::Kind.eq(SessionKind::Ai.as_str()))
            .order_by_asc(sessions::Column::CreatedAt)
            .one(&self.db)
            .await?
            .map(SessionRecord::try_from)
            .transpose()
    }

    async fn insert_session(&self, session: NewSession) -> StoreResult<SessionRecord> {
        let id = Uuid::new_v4().to_string();
        let created_at = self.clock.now();

        let model = sessions::ActiveModel {
            id: Set(id.clone()),
            kind: Set(session.kind.as_str().to_string()),
            name: Set(session.name.clone()),
            created_by: Set(session.created_by.clone()),
            created_at: Set(created_at),
        };
        sessions::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;

        info!("Created {} session {} for {}", session.kind, id, session.created_by);

        Ok(SessionRecord {
            id,
            kind: session.kind,
            name: session.name,
            created_by: session.created_by,
            created_at: millis(created_at, "sessions")?,
        })
    }

    async fn rename_session(&self, id: &str, name: &str) -> StoreResult<()> {
        sessions::Entity::update_many()
            .col_expr(sessions::Column::Name, Expr::value(name))
            .filter(sessions::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        debug!("Renamed session {} to {:?}", id, name);
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> StoreResult<()> {
        sessions::Entity::delete_by_id(id.to_owned())
            .exec(&self.db)
            .await?;

        info!("Deleted session {}", id);
        Ok(())
    }

    async fn participants(&self, session_id: &str) -> StoreResult<Vec<ParticipantRecord>> {
        participants::Entity::find()
            .filter(participants::Column::SessionId.eq(session_id))
            .order_by_asc(participants::Column::JoinedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ParticipantRecord::try_from)
            .collect()
    }

    async fn insert_participant(&self, participant: ParticipantRecord) -> StoreResult<()> {
        let model = participants::ActiveModel {
            session_id: Set(participant.session_id.clone()),
            user_id: Set(participant.user_id.clone()),
            role: Set(participant.role.as_str().to_string()),
            joined_at: Set(self.clock.now()),
        };
        participants::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;

        debug!(
            "Added {} to session {} as {:?}",
            participant.user_id, participant.session_id, participant.role
        );
        self.feed
            .publish(ChangeEvent::insert(Row::Participant(participant)));
        Ok(())
    }

    async fn delete_participant(&self, session_id: &str, user_id: &str) -> StoreResult<()> {
        participants::Entity::delete_many()
            .filter(participants::Column::SessionId.eq(session_id))
            .filter(participants::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        debug!("Removed {} from session {}", user_id, session_id);
        Ok(())
    }

    async fn delete_participants(&self, session_id: &str) -> StoreResult<()> {
        participants::Entity::delete_many()
            .filter(participants::Column::SessionId.eq(session_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn profiles(&self, user_ids: &[String]) -> StoreResult<Vec<UserProfile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids.iter().map(String::as_str)))
            .all(&self.db)
            .await?
            .into_iter()
            .map(UserProfile::from)
            .collect())
    }

    async fn message(&self, id: &str) -> StoreResult<Option<MessageView>> {
        let Some(model) = messages::Entity::find_by_id(id.to_owned())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        Ok(self.hydrate(vec![model]).await?.pop())
    }

    async fn messages(&self, session_id: &str) -> StoreResult<Vec<MessageView>> {
        let models = messages::Entity::find()
            .filter(messages::Column::SessionId.eq(session_id))
            .order_by_asc(messages::Column::CreatedAt)
            .all(&self.db)
            .await?;

        debug!("Loaded {} messages for session {}", models.len(), session_id);
        self.hydrate(models).await
    }

    async fn latest_message(&self, session_id: &str) -> StoreResult<Option<MessageRecord>> {
        messages::Entity::find()
            .filter(messages::Column::SessionId.eq(session_id))
            .order_by_desc(messages::Column::CreatedAt)
            .one(&self.db)
            .await?
            .map(MessageRecord::try_from)
            .transpose()
    }

    async fn insert_message(&self, message: NewMessage) -> StoreResult<MessageRecord> {
        let created_at = self.clock.now();
        let mentions_json = serde_json::to_string(&message.mentions)?;

        let model = messages::ActiveModel {
            id: Set(message.id.clone()),
            session_id: Set(message.session_id.clone()),
            user_id: Set(message.user_id.clone()),
            content: Set(message.content.clone()),
            reply_to_message_id: Set(message.reply_to_message_id.clone()),
            mentions_json: Set(mentions_json),
            is_deleted: Set(false),
            created_at: Set(created_at),
        };
        messages::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;

        let record = MessageRecord {
            id: message.id,
            session_id: message.session_id,
            user_id: message.user_id,
            content: message.content,
            reply_to_message_id: message.reply_to_message_id,
            mentions: message.mentions,
            is_deleted: false,
            created_at: millis(created_at, "messages")?,
        };

        debug!("Stored message {} in session {}", record.id, record.session_id);
        self.feed
            .publish(ChangeEvent::insert(Row::Message(record.clone())));
        Ok(record)
    }

    async fn soft_delete_message(&self, id: &str, tombstone: &str) -> StoreResult<()> {
        let Some(existing) = messages::Entity::find_by_id(id.to_owned())
            .one(&self.db)
            .await?
        else {
            return Ok(());
        };

        messages::Entity::update_many()
            .col_expr(messages::Column::IsDeleted, Expr::value(true))
            .col_expr(messages::Column::Content, Expr::value(tombstone))
            .filter(messages::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        let old = MessageRecord::try_from(existing)?;
        let new = MessageRecord {
            content: tombstone.to_string(),
            is_deleted: true,
            ..old.clone()
        };

        debug!("Soft-deleted message {}", id);
        self.feed
            .publish(ChangeEvent::update(Row::Message(old), Row::Message(new)));
        Ok(())
    }

    async fn message_ids(&self, session_id: &str) -> StoreResult<Vec<String>> {
        Ok(messages::Entity::find()
            .filter(messages::Column::SessionId.eq(session_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect())
    }

    async fn delete_messages(&self, session_id: &str) -> StoreResult<()> {
        let result = messages::Entity::delete_many()
            .filter(messages::Column::SessionId.eq(session_id))
            .exec(&self.db)
            .await?;

        debug!(
            "Deleted {} messages of session {}",
            result.rows_affected, session_id
        );
        Ok(())
    }

    async fn insert_attachment(&self, attachment: NewAttachment) -> StoreResult<AttachmentRecord> {
        let record = AttachmentRecord {
            id: Uuid::new_v4().to_string(),
            message_id: attachment.message_id,
            file_url: attachment.file_url,
            file_name: attachment.file_name,
            is_image: attachment.is_image,
        };

        let model = attachments::ActiveModel {
            id: Set(record.id.clone()),
            message_id: Set(record.message_id.clone()),
            file_url: Set(record.file_url.clone()),
            file_name: Set(record.file_name.clone()),
            is_image: Set(record.is_image),
        };
        attachments::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;

        debug!("Attached {} to message {}", record.file_name, record.message_id);
        Ok(record)
    }

    async fn delete_attachments(&self, message_ids: &[String]) -> StoreResult<()> {
        if message_ids.is_empty() {
            return Ok(());
        }

        attachments::Entity::delete_many()
            .filter(attachments::Column::MessageId.is_in(message_ids.iter().map(String::as_str)))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn insert_read_status(
        &self,
        message_id: &str,
        session_id: &str,
        user_id: &str,
    ) -> StoreResult<()> {
        let model = read_status::ActiveModel {
            message_id: Set(message_id.to_string()),
            user_id: Set(user_id.to_string()),
            session_id: Set(session_id.to_string()),
            read_at: Set(None),
        };
        read_status::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;

        self.feed
            .publish(ChangeEvent::insert(Row::ReadStatus(ReadStatusRecord {
                message_id: message_id.to_string(),
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
                read_at: None,
            })));
        Ok(())
    }

    async fn unread_rows(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> StoreResult<Vec<ReadStatusRecord>> {
        read_status::Entity::find()
            .filter(read_status::Column::SessionId.eq(session_id))
            .filter(read_status::Column::UserId.eq(user_id))
            .filter(read_status::Column::ReadAt.is_null())
            .all(&self.db)
            .await?
            .into_iter()
            .map(ReadStatusRecord::try_from)
            .collect()
    }

    async fn mark_read_row(
        &self,
        message_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = read_status::Entity::update_many()
            .col_expr(read_status::Column::ReadAt, Expr::value(at.timestamp_millis()))
            .filter(read_status::Column::MessageId.eq(message_id))
            .filter(read_status::Column::UserId.eq(user_id))
            .filter(read_status::Column::ReadAt.is_null())
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Ok(false);
        }

        if let Some(model) = read_status::Entity::find_by_id((message_id.to_owned(), user_id.to_owned()))
            .one(&self.db)
            .await?
        {
            let new = ReadStatusRecord::try_from(model)?;
            let old = ReadStatusRecord {
                read_at: None,
                ..new.clone()
            };
            self.feed
                .publish(ChangeEvent::update(Row::ReadStatus(old), Row::ReadStatus(new)));
        }

        debug!("Message {} read by {}", message_id, user_id);
        Ok(true)
    }

    async fn unread_count(&self, session_id: &str, user_id: &str) -> StoreResult<u32> {
        let count = read_status::Entity::find()
            .filter(read_status::Column::SessionId.eq(session_id))
            .filter(read_status::Column::UserId.eq(user_id))
            .filter(read_status::Column::ReadAt.is_null())
            .count(&self.db)
            .await?;

        Ok(count as u32)
    }

    async fn unread_counts(&self, user_id: &str) -> StoreResult<HashMap<String, u32>> {
        let rows: Vec<(String, i64)> = read_status::Entity::find()
            .select_only()
            .column(read_status::Column::SessionId)
            .column_as(read_status::Column::MessageId.count(), "unread")
            .filter(read_status::Column::UserId.eq(user_id))
            .filter(read_status::Column::ReadAt.is_null())
            .group_by(read_status::Column::SessionId)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(session_id, unread)| (session_id, unread.max(0) as u32))
            .collect())
    }

    async fn delete_read_status(&self, message_ids: &[String]) -> StoreResult<()> {
        if message_ids.is_empty() {
            return Ok(());
        }

        read_status::Entity::delete_many()
            .filter(read_status::Column::MessageId.is_in(message_ids.iter().map(String::as_str)))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn insert_ai_message(&self, message: NewAiMessage) -> StoreResult<AiMessageRecord> {
        let id = Uuid::new_v4().to_string();
        let timestamp = self.clock.now();

        let model = ai_messages::ActiveModel {
            id: Set(id.clone()),
            session_id: Set(message.session_id.clone()),
            user_id: Set(message.user_id.clone()),
            conversation_id: Set(message.conversation_id.clone()),
            role: Set(message.role.as_str().to_string()),
            content: Set(message.content.clone()),
            timestamp: Set(timestamp),
        };
        ai_messages::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;

        let record = AiMessageRecord {
            id,
            session_id: message.session_id,
            user_id: message.user_id,
            conversation_id: message.conversation_id,
            role: message.role,
            content: message.content,
            timestamp: millis(timestamp, "ai_messages")?,
        };

        debug!(
            "Stored {} AI message {} in conversation {}",
            record.role.as_str(),
            record.id,
            record.conversation_id
        );
        self.feed
            .publish(ChangeEvent::insert(Row::AiMessage(record.clone())));
        Ok(record)
    }

    async fn latest_ai_message(&self, session_id: &str) -> StoreResult<Option<AiMessageRecord>> {
        ai_messages::Entity::find()
            .filter(ai_messages::Column::SessionId.eq(session_id))
            .order_by_desc(ai_messages::Column::Timestamp)
            .one(&self.db)
            .await?
            .map(AiMessageRecord::try_from)
            .transpose()
    }

    async fn count_assistant_messages(&self, session_id: &str) -> StoreResult<u64> {
        Ok(ai_messages::Entity::find()
            .filter(ai_messages::Column::SessionId.eq(session_id))
            .filter(ai_messages::Column::Role.eq(AiRole::Assistant.as_str()))
            .count(&self.db)
            .await?)
    }

    async fn recent_ai_messages(
        &self,
        session_id: &str,
        conversation_id: &str,
        limit: u64,
    ) -> StoreResult<Vec<AiMessageRecord>> {
        let mut records = ai_messages::Entity::find()
            .filter(ai_messages::Column::SessionId.eq(session_id))
            .filter(ai_messages::Column::ConversationId.eq(conversation_id))
            .order_by_desc(ai_messages::Column::Timestamp)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(AiMessageRecord::try_from)
            .collect::<StoreResult<Vec<_>>>()?;

        records.reverse();
        Ok(records)
    }

    async fn delete_ai_messages(&self, session_id: &str) -> StoreResult<()> {
        ai_messages::Entity::delete_many()
            .filter(ai_messages::Column::SessionId.eq(session_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn insert_notification(&self, notification: NewNotification) -> StoreResult<()> {
        let model = notifications::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(notification.user_id.clone()),
            actor_id: Set(notification.actor_id),
            session_id: Set(notification.session_id),
            message_id: Set(notification.message_id),
            kind: Set(notification.kind),
            is_read: Set(false),
            created_at: Set(self.clock.now()),
        };
        notifications::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;

        debug!("Queued notification for {}", notification.user_id);
        Ok(())
    }

    async fn batch_lookup_relationships(
        &self,
        viewer_id: &str,
        other_user_ids: &[String],
    ) -> StoreResult<HashMap<String, Relationship>> {
        if other_user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        relationships::Entity::find()
            .filter(relationships::Column::UserId.eq(viewer_id))
            .filter(
                relationships::Column::OtherUserId
                    .is_in(other_user_ids.iter().map(String::as_str)),
            )
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| Ok((m.other_user_id, m.status.parse::<Relationship>()?)))
            .collect()
    }

    fn subscribe(&self, spec: SubscriptionSpec) -> Subscription {
        self.feed.subscribe(spec)
    }
}

fn millis(ms: i64, table: &'static str) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::corrupt(table, format!("invalid timestamp {ms}")))
}

impl TryFrom<sessions::Model> for SessionRecord {
    type Error = StoreError;

    fn try_from(model: sessions::Model) -> StoreResult<Self> {
        Ok(Self {
            kind: model.kind.parse()?,
            created_at: millis(model.created_at, "sessions")?,
            id: model.id,
            name: model.name,
            created_by: model.created_by,
        })
    }
}

impl TryFrom<participants::Model> for ParticipantRecord {
    type Error = StoreError;

    fn try_from(model: participants::Model) -> StoreResult<Self> {
        Ok(Self {
            role: model.role.parse()?,
            session_id: model.session_id,
            user_id: model.user_id,
        })
    }
}

impl TryFrom<messages::Model> for MessageRecord {
    type Error = StoreError;

    fn try_from(model: messages::Model) -> StoreResult<Self> {
        Ok(Self {
            mentions: serde_json::from_str(&model.mentions_json)?,
            created_at: millis(model.created_at, "messages")?,
            id: model.id,
            session_id: model.session_id,
            user_id: model.user_id,
            content: model.content,
            reply_to_message_id: model.reply_to_message_id,
            is_deleted: model.is_deleted,
        })
    }
}

impl From<attachments::Model> for AttachmentRecord {
    fn from(model: attachments::Model) -> Self {
        Self {
            id: model.id,
            message_id: model.message_id,
            file_url: model.file_url,
            file_name: model.file_name,
            is_image: model.is_image,
        }
    }
}

impl TryFrom<read_status::Model> for ReadStatusRecord {
    type Error = StoreError;

    fn try_from(model: read_status::Model) -> StoreResult<Self> {
        Ok(Self {
            read_at: model
                .read_at
                .map(|t| millis(t, "read_status"))
                .transpose()?,
            message_id: model.message_id,
            user_id: model.user_id,
            session_id: model.session_id,
        })
    }
}

impl TryFrom<ai_messages::Model> for AiMessageRecord {
    type Error = StoreError;

    fn try_from(model: ai_messages::Model) -> StoreResult<Self> {
        Ok(Self {
            role: model.role.parse()?,
            timestamp: millis(model.timestamp, "ai_messages")?,
            id: model.id,
            session_id: model.session_id,
            user_id: model.user_id,
            conversation_id: model.conversation_id,
            content: model.content,
        })
    }
}

impl From<users::Model> for UserProfile {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            display_name: model.display_name,
            avatar_url: model.avatar_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_clock_is_strictly_monotonic() {
        let clock = ServerClock::default();
        let mut last = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > last);
            last = next;
        }
    }
}
