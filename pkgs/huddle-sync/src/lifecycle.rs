//! Lifecycle operations - session creation, cascading delete and leaving a group

use huddle_store::{
    NewSession, ParticipantRecord, ParticipantRole, SessionKind, SessionRecord, StoreResult,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::directory::SessionDirectory;
use crate::error::{SyncError, SyncResult};
use crate::events::ClientEvent;
use crate::state::Context;

pub(crate) struct Lifecycle<'a> {
    ctx: &'a Arc<Context>,
}

impl<'a> Lifecycle<'a> {
    pub fn new(ctx: &'a Arc<Context>) -> Self {
        Self { ctx }
    }

    /// The private session between `viewer` and `other`, created if missing
    pub async fn create_private_session(
        &self,
        viewer: Option<&str>,
        other: &str,
    ) -> SyncResult<SessionRecord> {
        let viewer = viewer.ok_or(SyncError::Unauthenticated)?;
        let store = &self.ctx.store;

        for session in store.sessions_for_user(viewer).await? {
            if session.kind != SessionKind::Private {
                continue;
            }
            let participants = store.participants(&session.id).await?;
            if participants.len() == 2 && participants.iter().any(|p| p.user_id == other) {
                debug!("Reusing private session {} with {}", session.id, other);
                return Ok(session);
            }
        }

        let session = store
            .insert_session(NewSession {
                kind: SessionKind::Private,
                name: None,
                created_by: viewer.to_string(),
            })
            .await?;
        self.add_members(&session, viewer, &[other.to_string()])
            .await?;

        self.refresh(viewer).await;
        Ok(session)
    }

    pub async fn create_group_session(
        &self,
        viewer: Option<&str>,
        name: &str,
        members: &[String],
    ) -> SyncResult<SessionRecord> {
        let viewer = viewer.ok_or(SyncError::Unauthenticated)?;

        let session = self
            .ctx
            .store
            .insert_session(NewSession {
                kind: SessionKind::Group,
                name: Some(name.to_string()),
                created_by: viewer.to_string(),
            })
            .await?;
        self.add_members(&session, viewer, members).await?;

        self.refresh(viewer).await;
        Ok(session)
    }

    /// Creator joins as admin, everyone else as member
    async fn add_members(
        &self,
        session: &SessionRecord,
        creator: &str,
        members: &[String],
    ) -> SyncResult<()> {
        let store = &self.ctx.store;

        store
            .insert_participant(ParticipantRecord {
                session_id: session.id.clone(),
                user_id: creator.to_string(),
                role: ParticipantRole::Admin,
            })
            .await?;

        let mut added: Vec<&str> = vec![creator];
        for member in members {
            if added.contains(&member.as_str()) {
                continue;
            }
            store
                .insert_participant(ParticipantRecord {
                    session_id: session.id.clone(),
                    user_id: member.clone(),
                    role: ParticipantRole::Member,
                })
                .await?;
            added.push(member.as_str());
        }

        info!(
            "Created {} session {} with {} participants",
            session.kind,
            session.id,
            added.len()
        );
        Ok(())
    }

    /// Delete a session and everything that depends on it.
    ///
    /// Dependent rows go first, in a fixed order, and a failed step does not
    /// stop the next one. Only the final removal of the session row is fatal.
    pub async fn delete_session(&self, viewer: Option<&str>, session_id: &str) -> SyncResult<()> {
        let viewer = viewer.ok_or(SyncError::Unauthenticated)?;
        let store = &self.ctx.store;

        let session = store
            .session(session_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("session {}", session_id)))?;
        if session.created_by != viewer {
            return Err(SyncError::Forbidden(format!(
                "only the creator may delete session {}",
                session_id
            )));
        }

        let message_ids = match store.message_ids(session_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not list messages of session {}: {}", session_id, e);
                Vec::new()
            }
        };

        log_step("attachments", session_id, store.delete_attachments(&message_ids).await);
        log_step("read receipts", session_id, store.delete_read_status(&message_ids).await);
        log_step("messages", session_id, store.delete_messages(session_id).await);
        log_step("AI messages", session_id, store.delete_ai_messages(session_id).await);
        log_step("participants", session_id, store.delete_participants(session_id).await);

        store.delete_session(session_id).await?;
        info!("Session {} deleted by {}", session_id, viewer);

        self.forget(session_id);
        Ok(())
    }

    /// Leave a group the viewer did not create
    pub async fn leave_group(&self, viewer: Option<&str>, session_id: &str) -> SyncResult<()> {
        let viewer = viewer.ok_or(SyncError::Unauthenticated)?;
        let store = &self.ctx.store;

        let session = store
            .session(session_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("session {}", session_id)))?;
        if session.kind != SessionKind::Group {
            return Err(SyncError::Forbidden(format!(
                "session {} is not a group",
                session_id
            )));
        }
        if session.created_by == viewer {
            return Err(SyncError::Forbidden(format!(
                "the creator cannot leave group {}",
                session_id
            )));
        }
        let participants = store.participants(session_id).await?;
        if !participants.iter().any(|p| p.user_id == viewer) {
            return Err(SyncError::Unauthorized(session_id.to_string()));
        }

        store.delete_participant(session_id, viewer).await?;
        info!("{} left group {}", viewer, session_id);

        self.forget(session_id);
        self.refresh(viewer).await;
        Ok(())
    }

    fn forget(&self, session_id: &str) {
        let closed = {
            let mut state = self.ctx.state.lock();
            state.forget_session(session_id);
            if state.is_open(session_id) {
                state.close()
            } else {
                None
            }
        };

        if let Some(session_id) = closed {
            self.ctx.emit(ClientEvent::SessionClosed { session_id });
        }
        self.ctx.emit(ClientEvent::DirectoryChanged);
    }

    async fn refresh(&self, viewer: &str) {
        if let Err(e) = SessionDirectory::new(self.ctx).list(viewer).await {
            warn!("Directory refresh failed: {}", e);
        }
    }
}

fn log_step(step: &str, session_id: &str, result: StoreResult<()>) {
    match result {
        Ok(()) => debug!("Deleted {} of session {}", step, session_id),
        Err(e) => warn!("Failed to delete {} of session {}: {}", step, session_id, e),
    }
}
