//! Read-receipt ledger - read transitions and unread counts

use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::SyncResult;
use crate::events::ClientEvent;
use crate::state::Context;

pub(crate) struct Ledger<'a> {
    ctx: &'a Context,
}

impl<'a> Ledger<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Mark every unread receipt of `viewer` in the session as read.
    ///
    /// Rows are updated independently; a failed row is logged and the rest
    /// still go through. Returns the session's unread count afterwards.
    pub async fn mark_read(&self, session_id: &str, viewer: &str) -> SyncResult<u32> {
        let rows = self.ctx.store.unread_rows(session_id, viewer).await?;
        let now = Utc::now();

        let results = join_all(
            rows.iter()
                .map(|row| self.ctx.store.mark_read_row(&row.message_id, viewer, now)),
        )
        .await;

        for (row, result) in rows.iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    "Failed to mark message {} read for {}: {}",
                    row.message_id, viewer, e
                );
            }
        }

        debug!("Marked {} receipts read in session {}", rows.len(), session_id);
        self.refresh_session(session_id, viewer).await
    }

    /// Mark a single message read, then re-derive its session's count
    pub async fn mark_message_read(
        &self,
        session_id: &str,
        message_id: &str,
        viewer: &str,
    ) -> SyncResult<u32> {
        if let Err(e) = self
            .ctx
            .store
            .mark_read_row(message_id, viewer, Utc::now())
            .await
        {
            warn!("Failed to mark message {} read for {}: {}", message_id, viewer, e);
        }
        self.refresh_session(session_id, viewer).await
    }

    /// Re-query one session's unread count and publish it
    pub async fn refresh_session(&self, session_id: &str, viewer: &str) -> SyncResult<u32> {
        let count = self.ctx.store.unread_count(session_id, viewer).await?;

        let effective = {
            let mut state = self.ctx.state.lock();
            state.unread.insert(session_id.to_string(), count);
            state.effective_unread(session_id)
        };

        self.ctx.emit(ClientEvent::UnreadChanged {
            session_id: session_id.to_string(),
            count: effective,
        });
        Ok(effective)
    }

    /// Unread counts for every session, with the open-session override applied
    pub async fn unread_counts(&self, viewer: &str) -> SyncResult<HashMap<String, u32>> {
        let counts = self.ctx.store.unread_counts(viewer).await?;

        let mut state = self.ctx.state.lock();
        state.unread = counts;
        Ok(state.effective_unread_counts())
    }

    /// Count one more unread message without asking the ledger
    pub fn bump(&self, session_id: &str) -> u32 {
        let effective = {
            let mut state = self.ctx.state.lock();
            *state.unread.entry(session_id.to_string()).or_insert(0) += 1;
            state.effective_unread(session_id)
        };

        self.ctx.emit(ClientEvent::UnreadChanged {
            session_id: session_id.to_string(),
            count: effective,
        });
        effective
    }
}
