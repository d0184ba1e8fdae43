//! Session directory - the viewer's sessions with members, last message and unread count

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use huddle_store::{ParticipantRole, SessionKind, SessionRecord, UserProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::SyncResult;
use crate::events::ClientEvent;
use crate::state::{Context, DirectorySession};
use crate::timeline::{latest, TimelineEntry};

/// Another participant of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub user_id: String,
    pub role: ParticipantRole,
    pub profile: Option<UserProfile>,
}

/// One row of the session directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryEntry {
    pub session: SessionRecord,
    /// Participants other than the viewer
    pub members: Vec<Member>,
    pub last_message: Option<TimelineEntry>,
    pub unread_count: u32,
}

impl DirectoryEntry {
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|m| m.timestamp)
            .unwrap_or(self.session.created_at)
    }

    /// The sole other member of a private session
    pub fn counterpart(&self) -> Option<&Member> {
        match (self.session.kind, self.members.as_slice()) {
            (SessionKind::Private, [other]) => Some(other),
            _ => None,
        }
    }
}

pub(crate) struct SessionDirectory<'a> {
    ctx: &'a Context,
}

impl<'a> SessionDirectory<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Fetch the viewer's sessions and rebuild the directory.
    ///
    /// Hidden sessions stay tracked so they keep their counts and last
    /// message; only the returned entries leave them out.
    pub async fn list(&self, viewer: &str) -> SyncResult<Vec<DirectoryEntry>> {
        let sessions = self.ctx.store.sessions_for_user(viewer).await?;

        let loaded = try_join_all(sessions.into_iter().map(|s| self.load(s, viewer))).await?;
        let counts = self.ctx.store.unread_counts(viewer).await?;

        let counterparts: Vec<String> = loaded
            .iter()
            .filter(|(s, _)| s.session.kind == SessionKind::Private && s.members.len() == 1)
            .map(|(s, _)| s.members[0].user_id.clone())
            .collect();
        let relationships = if counterparts.is_empty() {
            HashMap::new()
        } else {
            match self
                .ctx
                .store
                .batch_lookup_relationships(viewer, &counterparts)
                .await
            {
                Ok(found) => found,
                Err(e) => {
                    warn!("Relationship lookup for {} failed: {}", viewer, e);
                    HashMap::new()
                }
            }
        };

        let entries = {
            let mut state = self.ctx.state.lock();
            state.last_messages.clear();
            state.sessions.clear();
            for (session, last) in loaded {
                if let Some(last) = last {
                    state.last_messages.insert(session.session.id.clone(), last);
                }
                state.sessions.push(session);
            }
            state.unread = counts;
            state.relationships.extend(relationships);
            state.needs_refresh = false;
            state.directory_entries()
        };

        debug!("Directory for {} has {} sessions", viewer, entries.len());
        self.ctx.emit(ClientEvent::DirectoryChanged);
        Ok(entries)
    }

    async fn load(
        &self,
        session: SessionRecord,
        viewer: &str,
    ) -> SyncResult<(DirectorySession, Option<TimelineEntry>)> {
        let store = &self.ctx.store;

        let participants = store.participants(&session.id).await?;
        let others: Vec<String> = participants
            .iter()
            .filter(|p| p.user_id != viewer)
            .map(|p| p.user_id.clone())
            .collect();
        let profiles: HashMap<String, UserProfile> = store
            .profiles(&others)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let members = participants
            .into_iter()
            .filter(|p| p.user_id != viewer)
            .map(|p| Member {
                profile: profiles.get(&p.user_id).cloned(),
                user_id: p.user_id,
                role: p.role,
            })
            .collect();

        let human = store
            .latest_message(&session.id)
            .await?
            .map(|m| TimelineEntry::from_message(&m));
        let ai = store
            .latest_ai_message(&session.id)
            .await?
            .and_then(|m| TimelineEntry::from_ai(&m));

        Ok((DirectorySession { session, members }, latest(human, ai)))
    }
}
