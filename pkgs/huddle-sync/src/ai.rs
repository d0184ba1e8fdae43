//! AI conversation manager - conversation identity, AI message recording and titles

use huddle_store::{
    AiMessageRecord, AiRole, NewAiMessage, NewSession, ParticipantRecord, ParticipantRole,
    SessionKind,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::directory::SessionDirectory;
use crate::error::{SyncError, SyncResult};
use crate::events::ClientEvent;
use crate::state::Context;
use crate::timeline::TimelineEntry;
use crate::title::fallback_title;

/// Assistant replies up to this count in a session trigger title synthesis
const TITLED_REPLIES: u64 = 2;

/// Result of recording an AI message
#[derive(Debug)]
pub struct AiReply {
    pub record: AiMessageRecord,
    /// Background title synthesis, when this reply triggered one
    pub title_task: Option<JoinHandle<Option<String>>>,
}

pub(crate) struct AiConversations<'a> {
    ctx: &'a Arc<Context>,
}

impl<'a> AiConversations<'a> {
    pub fn new(ctx: &'a Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Current conversation id, minted on first entry into AI mode
    pub fn enter(&self) -> String {
        self.ctx
            .state
            .lock()
            .conversation_id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .clone()
    }

    /// Start a new conversation within the same AI session
    pub fn reset(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.ctx.state.lock().conversation_id = Some(id.clone());
        debug!("Started AI conversation {}", id);
        id
    }

    pub fn current(&self) -> Option<String> {
        self.ctx.state.lock().conversation_id.clone()
    }

    /// Persist an AI message, creating the viewer's AI session on their first message
    pub async fn record(
        &self,
        viewer: Option<&str>,
        role: AiRole,
        content: &str,
        conversation_id: &str,
        session_id: Option<&str>,
    ) -> SyncResult<AiReply> {
        let viewer = viewer.ok_or(SyncError::Unauthenticated)?;
        let store = &self.ctx.store;

        let session_id = match session_id {
            Some(id) => Some(id.to_string()),
            None => match store.ai_session_for(viewer).await? {
                Some(session) => Some(session.id),
                None if role == AiRole::User => Some(self.create_session(viewer).await?),
                None => None,
            },
        };

        let record = store
            .insert_ai_message(NewAiMessage {
                session_id: session_id.clone(),
                user_id: viewer.to_string(),
                conversation_id: conversation_id.to_string(),
                role,
                content: content.to_string(),
            })
            .await?;

        if let Some(entry) = TimelineEntry::from_ai(&record) {
            if self.ctx.state.lock().offer_last_message(entry) {
                self.ctx.emit(ClientEvent::DirectoryChanged);
            }
        }

        let title_task = match (role, session_id) {
            (AiRole::Assistant, Some(session_id)) => {
                match store.count_assistant_messages(&session_id).await {
                    Ok(count) if count <= TITLED_REPLIES => Some(self.spawn_title(
                        viewer.to_string(),
                        session_id,
                        conversation_id.to_string(),
                        content.to_string(),
                    )),
                    Ok(_) => None,
                    Err(e) => {
                        warn!("Could not count replies in session {}: {}", session_id, e);
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(AiReply { record, title_task })
    }

    async fn create_session(&self, viewer: &str) -> SyncResult<String> {
        let session = self
            .ctx
            .store
            .insert_session(NewSession {
                kind: SessionKind::Ai,
                name: None,
                created_by: viewer.to_string(),
            })
            .await?;

        self.ctx
            .store
            .insert_participant(ParticipantRecord {
                session_id: session.id.clone(),
                user_id: viewer.to_string(),
                role: ParticipantRole::Admin,
            })
            .await?;

        info!("Created AI session {} for {}", session.id, viewer);
        Ok(session.id)
    }

    fn spawn_title(
        &self,
        viewer: String,
        session_id: String,
        conversation_id: String,
        trigger: String,
    ) -> JoinHandle<Option<String>> {
        let ctx = Arc::clone(self.ctx);

        tokio::spawn(async move {
            match synthesize_title(&ctx, &viewer, &session_id, &conversation_id, &trigger).await {
                Ok(title) => Some(title),
                Err(e) => {
                    warn!("Title synthesis for session {} failed: {}", session_id, e);
                    None
                }
            }
        })
    }
}

async fn synthesize_title(
    ctx: &Context,
    viewer: &str,
    session_id: &str,
    conversation_id: &str,
    trigger: &str,
) -> SyncResult<String> {
    let transcript = ctx
        .store
        .recent_ai_messages(session_id, conversation_id, ctx.config.title_transcript_size)
        .await?;
    let conversation = transcript
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n");

    let title = match ctx.titles.generate(&conversation, session_id).await {
        Ok(title) => title,
        Err(e) => {
            warn!("Title service failed for session {}, using fallback: {}", session_id, e);
            fallback_title(trigger, ctx.config.title_fallback_len)
        }
    };
    if title.is_empty() {
        debug!("No usable title for session {}", session_id);
        return Ok(title);
    }

    ctx.store.rename_session(session_id, &title).await?;
    ctx.state.lock().rename_session(session_id, &title);
    info!("Session {} titled {:?}", session_id, title);

    if let Err(e) = SessionDirectory::new(ctx).list(viewer).await {
        warn!("Directory refresh after titling failed: {}", e);
    }
    Ok(title)
}
