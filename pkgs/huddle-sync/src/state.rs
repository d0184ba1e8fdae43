//! Client-local state shared by the engine components

use huddle_store::{ChatStore, MessageRecord, MessageView, Relationship, SessionRecord};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::SyncConfig;
use crate::directory::{DirectoryEntry, Member};
use crate::echo::RecentIds;
use crate::events::{ClientEvent, Delivery, LocalMessage};
use crate::timeline::TimelineEntry;
use crate::title::TitleGenerator;

/// The session whose message list is loaded
#[derive(Debug)]
pub(crate) struct OpenSession {
    pub session_id: String,
    pub messages: Vec<LocalMessage>,
}

/// A directory row as last fetched from the store
#[derive(Debug, Clone)]
pub(crate) struct DirectorySession {
    pub session: SessionRecord,
    pub members: Vec<Member>,
}

#[derive(Debug)]
pub(crate) struct ClientState {
    pub open: Option<OpenSession>,
    pub sessions: Vec<DirectorySession>,
    pub last_messages: HashMap<String, TimelineEntry>,
    /// Ledger counts as last derived; the open session is overridden on read
    pub unread: HashMap<String, u32>,
    pub hidden: HashSet<String>,
    pub relationships: HashMap<String, Relationship>,
    pub conversation_id: Option<String>,
    pub self_sent: RecentIds,
    pub ingested: RecentIds,
    pub needs_refresh: bool,
}

impl ClientState {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            open: None,
            sessions: Vec::new(),
            last_messages: HashMap::new(),
            unread: HashMap::new(),
            hidden: HashSet::new(),
            relationships: HashMap::new(),
            conversation_id: None,
            self_sent: RecentIds::new(config.self_echo_ttl, config.self_echo_capacity),
            ingested: RecentIds::new(config.ingest_dedupe_ttl, config.ingest_dedupe_capacity),
            needs_refresh: false,
        }
    }

    pub fn open_session_id(&self) -> Option<&str> {
        self.open.as_ref().map(|o| o.session_id.as_str())
    }

    pub fn is_open(&self, session_id: &str) -> bool {
        self.open_session_id() == Some(session_id)
    }

    pub fn knows(&self, session_id: &str) -> bool {
        self.sessions.iter().any(|s| s.session.id == session_id)
    }

    /// Unread count as shown: the open session always reads zero
    pub fn effective_unread(&self, session_id: &str) -> u32 {
        if self.is_open(session_id) {
            return 0;
        }
        self.unread.get(session_id).copied().unwrap_or(0)
    }

    pub fn effective_unread_counts(&self) -> HashMap<String, u32> {
        let mut counts = self.unread.clone();
        if let Some(open) = self.open_session_id() {
            counts.insert(open.to_string(), 0);
        }
        counts
    }

    pub fn open_contains(&self, message_id: &str) -> bool {
        self.open
            .as_ref()
            .is_some_and(|o| o.messages.iter().any(|m| m.id() == message_id))
    }

    pub fn open_messages(&self) -> Vec<LocalMessage> {
        self.open
            .as_ref()
            .map(|o| o.messages.clone())
            .unwrap_or_default()
    }

    /// Insert into the open list in `created_at` order; no-op for known ids
    pub fn insert_open_message(&mut self, message: LocalMessage) -> bool {
        let Some(open) = self.open.as_mut() else {
            return false;
        };
        if open.session_id != message.view.message.session_id
            || open.messages.iter().any(|m| m.id() == message.id())
        {
            return false;
        }

        let created_at = message.view.message.created_at;
        let position = open
            .messages
            .iter()
            .position(|m| m.view.message.created_at > created_at)
            .unwrap_or(open.messages.len());
        open.messages.insert(position, message);
        true
    }

    fn open_message_mut(&mut self, message_id: &str) -> Option<&mut LocalMessage> {
        self.open
            .as_mut()?
            .messages
            .iter_mut()
            .find(|m| m.id() == message_id)
    }

    pub fn set_delivery(&mut self, message_id: &str, delivery: Delivery) {
        if let Some(local) = self.open_message_mut(message_id) {
            local.delivery = delivery;
        }
    }

    /// Swap the optimistic copy for the persisted row
    pub fn confirm(&mut self, record: &MessageRecord) {
        if let Some(local) = self.open_message_mut(&record.id) {
            local.view.message = record.clone();
            local.delivery = Delivery::Confirmed;
        }
    }

    /// Replace a held message in place, keeping its delivery state
    pub fn replace_view(&mut self, view: MessageView) -> bool {
        match self.open_message_mut(&view.message.id) {
            Some(local) => {
                local.view = view;
                true
            }
            None => false,
        }
    }

    /// Propagate a content or deletion change into every local copy
    pub fn apply_message_update(&mut self, record: &MessageRecord) -> bool {
        let mut changed = false;

        if let Some(local) = self.open_message_mut(&record.id) {
            if local.view.message.content != record.content
                || local.view.message.is_deleted != record.is_deleted
            {
                local.view.message.content = record.content.clone();
                local.view.message.is_deleted = record.is_deleted;
                changed = true;
            }
        }

        if let Some(slot) = self.last_messages.get_mut(&record.session_id) {
            if slot.id == record.id
                && (slot.preview != record.content || slot.is_deleted != record.is_deleted)
            {
                slot.preview = record.content.clone();
                slot.is_deleted = record.is_deleted;
                changed = true;
            }
        }

        changed
    }

    /// Offer a candidate last message; returns whether the slot changed
    pub fn offer_last_message(&mut self, entry: TimelineEntry) -> bool {
        match self.last_messages.get(&entry.session_id) {
            Some(current) if !entry.supersedes(current) || *current == entry => false,
            _ => {
                self.last_messages.insert(entry.session_id.clone(), entry);
                true
            }
        }
    }

    /// Drop the open session; returns its id if one was open
    pub fn close(&mut self) -> Option<String> {
        self.open.take().map(|o| o.session_id)
    }

    pub fn forget_session(&mut self, session_id: &str) {
        self.sessions.retain(|s| s.session.id != session_id);
        self.last_messages.remove(session_id);
        self.unread.remove(session_id);
    }

    pub fn rename_session(&mut self, session_id: &str, name: &str) {
        if let Some(entry) = self.sessions.iter_mut().find(|s| s.session.id == session_id) {
            entry.session.name = Some(name.to_string());
        }
    }

    /// Visible directory, most recent activity first
    pub fn directory_entries(&self) -> Vec<DirectoryEntry> {
        let mut entries: Vec<DirectoryEntry> = self
            .sessions
            .iter()
            .filter(|s| !self.hidden.contains(&s.session.id))
            .map(|s| DirectoryEntry {
                session: s.session.clone(),
                members: s.members.clone(),
                last_message: self.last_messages.get(&s.session.id).cloned(),
                unread_count: self.effective_unread(&s.session.id),
            })
            .collect();

        entries.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then_with(|| a.session.id.cmp(&b.session.id))
        });
        entries
    }
}

/// Everything the engine components share for one client
pub(crate) struct Context {
    pub store: Arc<dyn ChatStore>,
    pub titles: Arc<dyn TitleGenerator>,
    pub config: SyncConfig,
    pub viewer: Option<String>,
    /// Never held across an await
    pub state: Mutex<ClientState>,
    events: broadcast::Sender<ClientEvent>,
}

impl Context {
    pub fn new(
        store: Arc<dyn ChatStore>,
        titles: Arc<dyn TitleGenerator>,
        config: SyncConfig,
        viewer: Option<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            store,
            titles,
            state: Mutex::new(ClientState::new(&config)),
            config,
            viewer,
            events,
        }
    }

    pub fn emit(&self, event: ClientEvent) {
        // No listeners is fine
        let _ = self.events.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}
