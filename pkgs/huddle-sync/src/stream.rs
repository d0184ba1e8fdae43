//! Message stream - the open session's ordered messages, send and soft delete

use chrono::Utc;
use futures::future::join_all;
use huddle_store::{Mention, MessageRecord, MessageView, NewMessage, NewNotification};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::events::{ClientEvent, Delivery, LocalMessage};
use crate::ledger::Ledger;
use crate::state::{Context, OpenSession};
use crate::timeline::TimelineEntry;

/// A message about to be sent
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub session_id: String,
    pub content: String,
    pub reply_to_message_id: Option<String>,
    pub mentions: Vec<Mention>,
}

impl OutgoingMessage {
    pub fn text(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            content: content.into(),
            ..Default::default()
        }
    }
}

pub(crate) struct MessageStream<'a> {
    ctx: &'a Arc<Context>,
}

impl<'a> MessageStream<'a> {
    pub fn new(ctx: &'a Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Load a session's messages and treat them as read
    pub async fn open(&self, session_id: &str, viewer: &str) -> SyncResult<Vec<LocalMessage>> {
        let store = &self.ctx.store;

        if store.session(session_id).await?.is_none() {
            return Err(SyncError::NotFound(format!("session {}", session_id)));
        }
        let participants = store.participants(session_id).await?;
        if !participants.iter().any(|p| p.user_id == viewer) {
            return Err(SyncError::Unauthorized(session_id.to_string()));
        }

        self.ctx.state.lock().open = Some(OpenSession {
            session_id: session_id.to_string(),
            messages: Vec::new(),
        });

        let views = store.messages(session_id).await?;
        {
            let mut state = self.ctx.state.lock();
            for view in views {
                state.insert_open_message(LocalMessage::confirmed(view));
            }
        }
        info!("Opened session {} for {}", session_id, viewer);

        if let Err(e) = Ledger::new(self.ctx).mark_read(session_id, viewer).await {
            warn!("Failed to mark session {} read: {}", session_id, e);
        }

        self.ctx.emit(ClientEvent::MessagesChanged {
            session_id: session_id.to_string(),
        });
        Ok(self.ctx.state.lock().open_messages())
    }

    /// Re-read the open session's messages, keeping local-only entries
    pub async fn reload(&self, viewer: &str) -> SyncResult<()> {
        let Some(session_id) = self.ctx.state.lock().open_session_id().map(str::to_string) else {
            return Ok(());
        };

        let views = self.ctx.store.messages(&session_id).await?;
        {
            let mut state = self.ctx.state.lock();
            if !state.is_open(&session_id) {
                return Ok(());
            }
            for view in views {
                if !state.replace_view(view.clone()) {
                    state.insert_open_message(LocalMessage::confirmed(view));
                }
            }
        }
        debug!("Reloaded session {}", session_id);

        if let Err(e) = Ledger::new(self.ctx).mark_read(&session_id, viewer).await {
            warn!("Failed to mark session {} read: {}", session_id, e);
        }
        self.ctx.emit(ClientEvent::MessagesChanged { session_id });
        Ok(())
    }

    /// Send a message, rendering it before the persist completes.
    ///
    /// Receipt rows and mention notifications are best-effort once the
    /// message row itself is stored.
    pub async fn send(
        &self,
        viewer: Option<&str>,
        outgoing: OutgoingMessage,
    ) -> SyncResult<MessageRecord> {
        let viewer = viewer.ok_or(SyncError::Unauthenticated)?;
        let store = &self.ctx.store;

        let participants = store.participants(&outgoing.session_id).await?;
        if !participants.iter().any(|p| p.user_id == viewer) {
            return Err(SyncError::Unauthorized(outgoing.session_id));
        }

        let optimistic = MessageRecord {
            id: Uuid::new_v4().to_string(),
            session_id: outgoing.session_id,
            user_id: viewer.to_string(),
            content: outgoing.content,
            reply_to_message_id: outgoing.reply_to_message_id,
            mentions: outgoing.mentions,
            is_deleted: false,
            created_at: Utc::now(),
        };
        let id = optimistic.id.clone();
        let session_id = optimistic.session_id.clone();

        {
            let mut state = self.ctx.state.lock();
            state.self_sent.insert(id.clone());
            state.insert_open_message(LocalMessage {
                view: MessageView::bare(optimistic.clone()),
                delivery: Delivery::Pending,
            });
        }
        self.ctx.emit(ClientEvent::MessagesChanged {
            session_id: session_id.clone(),
        });

        let record = match store
            .insert_message(NewMessage {
                id: optimistic.id,
                session_id: optimistic.session_id,
                user_id: optimistic.user_id,
                content: optimistic.content,
                reply_to_message_id: optimistic.reply_to_message_id,
                mentions: optimistic.mentions,
            })
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to persist message {}: {}", id, e);
                self.ctx.state.lock().set_delivery(&id, Delivery::Failed);
                self.ctx.emit(ClientEvent::MessagesChanged { session_id });
                return Err(e.into());
            }
        };

        {
            let mut state = self.ctx.state.lock();
            state.confirm(&record);
            state.offer_last_message(TimelineEntry::from_message(&record));
        }
        debug!("Message {} confirmed", record.id);

        let receipts = participants.iter().filter(|p| p.user_id != viewer);
        let results = join_all(receipts.clone().map(|p| {
            store.insert_read_status(&record.id, &record.session_id, &p.user_id)
        }))
        .await;
        for (participant, result) in receipts.zip(results) {
            if let Err(e) = result {
                warn!(
                    "Failed to create receipt of {} for {}: {}",
                    record.id, participant.user_id, e
                );
            }
        }

        self.notify_mentions(&record).await;
        self.schedule_attachment_refetch(record.id.clone());

        self.ctx.emit(ClientEvent::MessagesChanged {
            session_id: record.session_id.clone(),
        });
        self.ctx.emit(ClientEvent::DirectoryChanged);
        Ok(record)
    }

    async fn notify_mentions(&self, record: &MessageRecord) {
        for mention in &record.mentions {
            let Mention::User { id, .. } = mention else {
                continue;
            };

            let notification = NewNotification {
                user_id: id.clone(),
                actor_id: record.user_id.clone(),
                session_id: record.session_id.clone(),
                message_id: record.id.clone(),
                kind: "mention".to_string(),
            };
            if let Err(e) = self.ctx.store.insert_notification(notification).await {
                debug!("Dropped mention notification for {}: {}", id, e);
            }
        }
    }

    /// Attachments are uploaded separately and may land shortly after the message row
    fn schedule_attachment_refetch(&self, message_id: String) {
        let ctx = Arc::clone(self.ctx);

        tokio::spawn(async move {
            tokio::time::sleep(ctx.config.attachment_refetch_delay).await;

            match ctx.store.message(&message_id).await {
                Ok(Some(view)) if !view.attachments.is_empty() => {
                    let session_id = view.message.session_id.clone();
                    if ctx.state.lock().replace_view(view) {
                        debug!("Picked up attachments of message {}", message_id);
                        ctx.emit(ClientEvent::MessagesChanged { session_id });
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Failed to re-fetch message {}: {}", message_id, e),
            }
        });
    }

    /// Soft-delete one of the viewer's own messages
    pub async fn delete(&self, viewer: Option<&str>, message_id: &str) -> SyncResult<()> {
        let viewer = viewer.ok_or(SyncError::Unauthenticated)?;
        let store = &self.ctx.store;

        let view = store
            .message(message_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("message {}", message_id)))?;
        if view.message.user_id != viewer {
            return Err(SyncError::Forbidden(format!(
                "message {} belongs to another user",
                message_id
            )));
        }

        let tombstone = &self.ctx.config.tombstone;
        store.soft_delete_message(message_id, tombstone).await?;

        let deleted = MessageRecord {
            content: tombstone.clone(),
            is_deleted: true,
            ..view.message
        };
        self.ctx.state.lock().apply_message_update(&deleted);

        info!("Deleted message {}", message_id);
        self.ctx.emit(ClientEvent::MessagesChanged {
            session_id: deleted.session_id,
        });
        self.ctx.emit(ClientEvent::DirectoryChanged);
        Ok(())
    }
}
