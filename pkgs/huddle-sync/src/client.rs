//! Chat client - one logical actor per connected user
//!
//! The client owns the change-feed subscriptions and hands every operation to
//! the component that implements it. Directory-level subscriptions live as
//! long as the client; the open session's feed is swapped on every open.

use futures::future::select_all;
use huddle_store::{
    AiRole, ChatStore, ColumnFilter, EventFilter, MessageRecord, Relationship, SessionRecord,
    Subscription, SubscriptionSpec, Table,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ai::{AiConversations, AiReply};
use crate::config::SyncConfig;
use crate::directory::{DirectoryEntry, SessionDirectory};
use crate::error::{SyncError, SyncResult};
use crate::events::{ClientEvent, LocalMessage};
use crate::ledger::Ledger;
use crate::lifecycle::Lifecycle;
use crate::router::{ChangeRouter, FeedScope};
use crate::state::Context;
use crate::stream::{MessageStream, OutgoingMessage};
use crate::title::{HttpTitleGenerator, TitleGenerator};

#[derive(Default)]
struct Feeds {
    directory: Vec<Subscription>,
    open: Option<Subscription>,
}

/// Feeds every client keeps for its viewer
fn directory_specs(viewer: &str) -> Vec<SubscriptionSpec> {
    let mine = || ColumnFilter::UserId(viewer.to_string());
    vec![
        SubscriptionSpec::new(Table::Participant, EventFilter::Insert).with_filter(mine()),
        SubscriptionSpec::new(Table::Message, EventFilter::Any),
        SubscriptionSpec::new(Table::ReadStatus, EventFilter::Any).with_filter(mine()),
        SubscriptionSpec::new(Table::AiMessage, EventFilter::Insert).with_filter(mine()),
    ]
}

pub struct ChatClient {
    ctx: Arc<Context>,
    feeds: Mutex<Feeds>,
    shutdown: watch::Sender<bool>,
}

impl ChatClient {
    /// Create a client that titles AI sessions through the configured HTTP service
    pub fn new(
        store: Arc<dyn ChatStore>,
        viewer: Option<String>,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        let titles = Arc::new(HttpTitleGenerator::new(&config)?);
        Ok(Self::with_title_generator(store, viewer, config, titles))
    }

    pub fn with_title_generator(
        store: Arc<dyn ChatStore>,
        viewer: Option<String>,
        config: SyncConfig,
        titles: Arc<dyn TitleGenerator>,
    ) -> Self {
        let directory = viewer
            .as_deref()
            .map(|v| {
                directory_specs(v)
                    .into_iter()
                    .map(|spec| store.subscribe(spec))
                    .collect()
            })
            .unwrap_or_default();
        let (shutdown, _) = watch::channel(false);

        Self {
            ctx: Arc::new(Context::new(store, titles, config, viewer)),
            feeds: Mutex::new(Feeds {
                directory,
                open: None,
            }),
            shutdown,
        }
    }

    pub fn viewer(&self) -> Option<&str> {
        self.ctx.viewer.as_deref()
    }

    fn require_viewer(&self) -> SyncResult<&str> {
        self.viewer().ok_or(SyncError::Unauthenticated)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.ctx.config
    }

    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.ctx.subscribe_events()
    }

    // Snapshots of local state

    pub fn open_session_id(&self) -> Option<String> {
        self.ctx.state.lock().open_session_id().map(str::to_string)
    }

    /// Messages of the open session, oldest first
    pub fn messages(&self) -> Vec<LocalMessage> {
        self.ctx.state.lock().open_messages()
    }

    pub fn directory(&self) -> Vec<DirectoryEntry> {
        self.ctx.state.lock().directory_entries()
    }

    pub fn unread_count(&self, session_id: &str) -> u32 {
        self.ctx.state.lock().effective_unread(session_id)
    }

    pub fn relationship(&self, user_id: &str) -> Option<Relationship> {
        self.ctx.state.lock().relationships.get(user_id).copied()
    }

    // Session directory

    pub async fn list_sessions(&self) -> SyncResult<Vec<DirectoryEntry>> {
        let viewer = self.require_viewer()?;
        self.drain().await;
        SessionDirectory::new(&self.ctx).list(viewer).await
    }

    pub fn hide_session(&self, session_id: &str) {
        self.ctx.state.lock().hidden.insert(session_id.to_string());
        self.ctx.emit(ClientEvent::DirectoryChanged);
    }

    pub fn unhide_session(&self, session_id: &str) {
        self.ctx.state.lock().hidden.remove(session_id);
        self.ctx.emit(ClientEvent::DirectoryChanged);
    }

    // Message stream

    pub async fn open_session(&self, session_id: &str) -> SyncResult<Vec<LocalMessage>> {
        let viewer = self.require_viewer()?;
        self.drain().await;

        // Subscribe before fetching so nothing falls between the two
        let subscription = self.ctx.store.subscribe(
            SubscriptionSpec::new(Table::Message, EventFilter::Any)
                .with_filter(ColumnFilter::SessionId(session_id.to_string())),
        );
        let messages = MessageStream::new(&self.ctx).open(session_id, viewer).await?;

        let previous = self.feeds.lock().await.open.replace(subscription);
        if let Some(previous) = previous {
            previous.unsubscribe();
        }
        Ok(messages)
    }

    pub async fn close_session(&self) {
        let previous = self.feeds.lock().await.open.take();
        if let Some(previous) = previous {
            previous.unsubscribe();
        }

        let closed = self.ctx.state.lock().close();
        if let Some(session_id) = closed {
            debug!("Closed session {}", session_id);
            self.ctx.emit(ClientEvent::SessionClosed { session_id });
        }
    }

    pub async fn send(&self, outgoing: OutgoingMessage) -> SyncResult<MessageRecord> {
        MessageStream::new(&self.ctx)
            .send(self.viewer(), outgoing)
            .await
    }

    pub async fn delete_message(&self, message_id: &str) -> SyncResult<()> {
        MessageStream::new(&self.ctx)
            .delete(self.viewer(), message_id)
            .await
    }

    // Read receipts

    pub async fn mark_read(&self, session_id: &str) -> SyncResult<u32> {
        let viewer = self.require_viewer()?;
        Ledger::new(&self.ctx).mark_read(session_id, viewer).await
    }

    pub async fn unread_counts(&self) -> SyncResult<HashMap<String, u32>> {
        let viewer = self.require_viewer()?;
        self.drain().await;
        Ledger::new(&self.ctx).unread_counts(viewer).await
    }

    // AI conversations

    /// Conversation id for AI mode, minted on first use
    pub fn enter_ai_mode(&self) -> String {
        AiConversations::new(&self.ctx).enter()
    }

    pub fn reset_ai_conversation(&self) -> String {
        AiConversations::new(&self.ctx).reset()
    }

    pub fn conversation_id(&self) -> Option<String> {
        AiConversations::new(&self.ctx).current()
    }

    pub async fn record_ai_message(
        &self,
        role: AiRole,
        content: &str,
        conversation_id: &str,
        session_id: Option<&str>,
    ) -> SyncResult<AiReply> {
        AiConversations::new(&self.ctx)
            .record(self.viewer(), role, content, conversation_id, session_id)
            .await
    }

    // Lifecycle

    pub async fn create_private_session(&self, other: &str) -> SyncResult<SessionRecord> {
        Lifecycle::new(&self.ctx)
            .create_private_session(self.viewer(), other)
            .await
    }

    pub async fn create_group_session(
        &self,
        name: &str,
        members: &[String],
    ) -> SyncResult<SessionRecord> {
        Lifecycle::new(&self.ctx)
            .create_group_session(self.viewer(), name, members)
            .await
    }

    pub async fn delete_session(&self, session_id: &str) -> SyncResult<()> {
        Lifecycle::new(&self.ctx)
            .delete_session(self.viewer(), session_id)
            .await?;
        self.release_open_feed_if_closed().await;
        Ok(())
    }

    pub async fn leave_group(&self, session_id: &str) -> SyncResult<()> {
        Lifecycle::new(&self.ctx)
            .leave_group(self.viewer(), session_id)
            .await?;
        self.release_open_feed_if_closed().await;
        Ok(())
    }

    async fn release_open_feed_if_closed(&self) {
        if self.open_session_id().is_some() {
            return;
        }
        let previous = self.feeds.lock().await.open.take();
        if let Some(previous) = previous {
            previous.unsubscribe();
        }
    }

    // Change ingestion

    /// Route every change already queued on this client's feeds.
    ///
    /// Returns the number of changes routed. Routing can write (implicit reads),
    /// so the queues are polled until they stay empty.
    pub async fn drain(&self) -> usize {
        let Some(viewer) = self.viewer() else {
            return 0;
        };
        let router = ChangeRouter::new(&self.ctx, viewer);
        let mut routed = 0;
        let mut lagged = false;

        loop {
            let batch = {
                let mut feeds = self.feeds.lock().await;
                let mut batch = Vec::new();
                for subscription in feeds.directory.iter_mut() {
                    while let Some(event) = subscription.try_next() {
                        batch.push((FeedScope::Directory, event));
                    }
                    lagged |= subscription.take_lagged();
                }
                if let Some(subscription) = feeds.open.as_mut() {
                    while let Some(event) = subscription.try_next() {
                        batch.push((FeedScope::OpenSession, event));
                    }
                    lagged |= subscription.take_lagged();
                }
                batch
            };
            if batch.is_empty() {
                break;
            }

            for (scope, event) in batch {
                let table = event.table();
                if let Err(e) = router.route(scope, event).await {
                    warn!("Failed to route {:?} change: {}", table, e);
                }
                routed += 1;
            }
        }

        // Dropped changes leave derived state stale; re-read it from the store
        if lagged {
            warn!("Change feed overflowed for {}, reloading", viewer);
            if let Err(e) = MessageStream::new(&self.ctx).reload(viewer).await {
                warn!("Open session reload failed: {}", e);
            }
        }

        let refresh = std::mem::take(&mut self.ctx.state.lock().needs_refresh);
        if refresh || lagged {
            if let Err(e) = SessionDirectory::new(&self.ctx).list(viewer).await {
                warn!("Directory refresh failed: {}", e);
            }
        }
        routed
    }

    /// Route changes in the background as they arrive, until shutdown
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let client = Arc::clone(self);
        let mut stop = self.shutdown.subscribe();
        let mut wakes: Vec<Subscription> = self
            .viewer()
            .map(|v| {
                directory_specs(v)
                    .into_iter()
                    .map(|spec| self.ctx.store.subscribe(spec))
                    .collect()
            })
            .unwrap_or_default();

        tokio::spawn(async move {
            if wakes.is_empty() {
                return;
            }
            info!("Listening for changes");

            loop {
                let woke = {
                    let pending = wakes.iter_mut().map(|w| Box::pin(w.next()));
                    tokio::select! {
                        _ = stop.changed() => false,
                        (event, _, _) = select_all(pending) => event.is_some(),
                    }
                };
                if !woke {
                    break;
                }
                client.drain().await;
            }
            debug!("Change listener stopped");
        })
    }

    /// Stop listening and drop every subscription
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);

        {
            let mut feeds = self.feeds.lock().await;
            for subscription in feeds.directory.drain(..) {
                subscription.unsubscribe();
            }
            if let Some(subscription) = feeds.open.take() {
                subscription.unsubscribe();
            }
        }

        let closed = self.ctx.state.lock().close();
        if let Some(session_id) = closed {
            self.ctx.emit(ClientEvent::SessionClosed { session_id });
        }
        info!("Chat client for {:?} shut down", self.viewer());
    }
}
