//! Change ingestion router - reconciles local state with change-feed events

use huddle_store::{
    AiMessageRecord, ChangeEvent, ChangeKind, MessageRecord, MessageView, ParticipantRecord,
    ReadStatusRecord, Row,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::SyncResult;
use crate::events::{ClientEvent, LocalMessage};
use crate::ledger::Ledger;
use crate::state::Context;
use crate::timeline::TimelineEntry;

/// Which subscription an event arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FeedScope {
    /// Process-wide feeds for last-message, unread and membership tracking
    Directory,
    /// The open session's message feed
    OpenSession,
}

pub(crate) struct ChangeRouter<'a> {
    ctx: &'a Arc<Context>,
    viewer: &'a str,
}

impl<'a> ChangeRouter<'a> {
    pub fn new(ctx: &'a Arc<Context>, viewer: &'a str) -> Self {
        Self { ctx, viewer }
    }

    /// Apply a single change; every branch is safe to re-apply
    pub async fn route(&self, scope: FeedScope, event: ChangeEvent) -> SyncResult<()> {
        match (scope, event.kind, event.old, event.new) {
            (FeedScope::OpenSession, ChangeKind::Insert, _, Row::Message(message)) => {
                self.append_to_open(message).await
            }
            (FeedScope::Directory, ChangeKind::Insert, _, Row::Message(message)) => {
                self.track_message(message).await
            }
            (_, ChangeKind::Update, _, Row::Message(message)) => {
                self.patch_message(&message);
                Ok(())
            }
            (_, ChangeKind::Insert, _, Row::ReadStatus(receipt)) => {
                self.receipt_created(receipt).await
            }
            (_, ChangeKind::Update, Some(Row::ReadStatus(old)), Row::ReadStatus(new)) => {
                self.receipt_read(old, new).await
            }
            (_, ChangeKind::Insert, _, Row::AiMessage(message)) => {
                self.track_ai_message(&message);
                Ok(())
            }
            (_, ChangeKind::Insert, _, Row::Participant(participant)) => {
                self.participant_added(&participant);
                Ok(())
            }
            (scope, kind, _, row) => {
                debug!("Ignoring {:?} on {:?} ({:?})", kind, row.table(), scope);
                Ok(())
            }
        }
    }

    async fn append_to_open(&self, message: MessageRecord) -> SyncResult<()> {
        {
            let state = self.ctx.state.lock();
            if !state.is_open(&message.session_id) || state.open_contains(&message.id) {
                return Ok(());
            }
            if state.self_sent.contains(&message.id) {
                debug!("Skipping echo of own message {}", message.id);
                return Ok(());
            }
        }

        let view = self
            .ctx
            .store
            .message(&message.id)
            .await?
            .unwrap_or_else(|| MessageView::bare(message));
        let session_id = view.message.session_id.clone();

        if self
            .ctx
            .state
            .lock()
            .insert_open_message(LocalMessage::confirmed(view))
        {
            self.ctx
                .emit(ClientEvent::MessagesChanged { session_id });
        }
        Ok(())
    }

    async fn track_message(&self, message: MessageRecord) -> SyncResult<()> {
        let (first_sight, is_open) = {
            let mut state = self.ctx.state.lock();
            if !state.knows(&message.session_id) {
                debug!(
                    "Message {} in unknown session {}",
                    message.id, message.session_id
                );
                return Ok(());
            }
            // Already the latest known message: counted by the last directory load
            let already_latest = state
                .last_messages
                .get(&message.session_id)
                .is_some_and(|slot| slot.id == message.id);
            state.offer_last_message(TimelineEntry::from_message(&message));
            (
                state.ingested.insert(message.id.clone()) && !already_latest,
                state.is_open(&message.session_id),
            )
        };
        self.ctx.emit(ClientEvent::DirectoryChanged);

        if message.user_id == self.viewer || !first_sight {
            return Ok(());
        }

        let ledger = Ledger::new(self.ctx);
        if is_open {
            ledger
                .mark_message_read(&message.session_id, &message.id, self.viewer)
                .await?;
        } else {
            let count = ledger.bump(&message.session_id);
            debug!("Session {} now has {} unread", message.session_id, count);
        }
        Ok(())
    }

    fn patch_message(&self, message: &MessageRecord) {
        if self.ctx.state.lock().apply_message_update(message) {
            debug!("Patched message {}", message.id);
            self.ctx.emit(ClientEvent::MessagesChanged {
                session_id: message.session_id.clone(),
            });
            self.ctx.emit(ClientEvent::DirectoryChanged);
        }
    }

    /// A receipt for the open session can land after its message was routed
    async fn receipt_created(&self, receipt: ReadStatusRecord) -> SyncResult<()> {
        if receipt.user_id != self.viewer || receipt.read_at.is_some() {
            return Ok(());
        }
        if !self.ctx.state.lock().is_open(&receipt.session_id) {
            return Ok(());
        }

        Ledger::new(self.ctx)
            .mark_message_read(&receipt.session_id, &receipt.message_id, self.viewer)
            .await?;
        Ok(())
    }

    async fn receipt_read(&self, old: ReadStatusRecord, new: ReadStatusRecord) -> SyncResult<()> {
        if new.user_id != self.viewer || old.read_at.is_some() || new.read_at.is_none() {
            return Ok(());
        }

        Ledger::new(self.ctx)
            .refresh_session(&new.session_id, self.viewer)
            .await?;
        Ok(())
    }

    fn track_ai_message(&self, message: &AiMessageRecord) {
        let Some(entry) = TimelineEntry::from_ai(message) else {
            return;
        };

        let changed = {
            let mut state = self.ctx.state.lock();
            if !state.knows(&entry.session_id) {
                state.needs_refresh = true;
                return;
            }
            state.offer_last_message(entry)
        };
        if changed {
            self.ctx.emit(ClientEvent::DirectoryChanged);
        }
    }

    fn participant_added(&self, participant: &ParticipantRecord) {
        if participant.user_id == self.viewer {
            debug!(
                "{} joined session {}, directory refresh pending",
                self.viewer, participant.session_id
            );
            self.ctx.state.lock().needs_refresh = true;
        }
    }
}
