//! Change feed - row-level INSERT/UPDATE notifications for subscribers

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{debug, warn};

use crate::records::{AiMessageRecord, MessageRecord, ParticipantRecord, ReadStatusRecord};

/// Tables that publish on the change feed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Participant,
    Message,
    ReadStatus,
    AiMessage,
}

/// Kind of row change
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
}

/// Which change kinds a subscription wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    Insert,
    Update,
    Any,
}

impl EventFilter {
    fn accepts(&self, kind: ChangeKind) -> bool {
        matches!(
            (self, kind),
            (EventFilter::Any, _)
                | (EventFilter::Insert, ChangeKind::Insert)
                | (EventFilter::Update, ChangeKind::Update)
        )
    }
}

/// Column predicate applied to the new row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnFilter {
    SessionId(String),
    UserId(String),
}

/// Row payload of a change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
pub enum Row {
    Participant(ParticipantRecord),
    Message(MessageRecord),
    ReadStatus(ReadStatusRecord),
    AiMessage(AiMessageRecord),
}

impl Row {
    pub fn table(&self) -> Table {
        match self {
            Row::Participant(_) => Table::Participant,
            Row::Message(_) => Table::Message,
            Row::ReadStatus(_) => Table::ReadStatus,
            Row::AiMessage(_) => Table::AiMessage,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Row::Participant(p) => Some(&p.session_id),
            Row::Message(m) => Some(&m.session_id),
            Row::ReadStatus(r) => Some(&r.session_id),
            Row::AiMessage(a) => a.session_id.as_deref(),
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Row::Participant(p) => &p.user_id,
            Row::Message(m) => &m.user_id,
            Row::ReadStatus(r) => &r.user_id,
            Row::AiMessage(a) => &a.user_id,
        }
    }
}

/// A single change delivered to subscribers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub old: Option<Row>,
    pub new: Row,
}

impl ChangeEvent {
    pub fn insert(row: Row) -> Self {
        Self {
            kind: ChangeKind::Insert,
            old: None,
            new: row,
        }
    }

    pub fn update(old: Row, new: Row) -> Self {
        Self {
            kind: ChangeKind::Update,
            old: Some(old),
            new,
        }
    }

    pub fn table(&self) -> Table {
        self.new.table()
    }
}

/// What a subscriber listens to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSpec {
    pub table: Table,
    pub event: EventFilter,
    pub filter: Option<ColumnFilter>,
}

impl SubscriptionSpec {
    pub fn new(table: Table, event: EventFilter) -> Self {
        Self {
            table,
            event,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: ColumnFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table() != self.table || !self.event.accepts(event.kind) {
            return false;
        }
        match &self.filter {
            None => true,
            Some(ColumnFilter::SessionId(id)) => event.new.session_id() == Some(id.as_str()),
            Some(ColumnFilter::UserId(id)) => event.new.user_id() == id,
        }
    }
}

/// Publisher side of the change feed
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a change; having no subscribers is not an error
    pub fn publish(&self, event: ChangeEvent) {
        debug!("Publishing {:?} on {:?}", event.kind, event.table());
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self, spec: SubscriptionSpec) -> Subscription {
        debug!("New subscription: {:?}", spec);
        Subscription {
            spec,
            rx: self.tx.subscribe(),
            lagged: false,
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Subscriber handle; dropping it unsubscribes
#[derive(Debug)]
pub struct Subscription {
    spec: SubscriptionSpec,
    rx: broadcast::Receiver<ChangeEvent>,
    /// Set when the receiver fell behind and changes were dropped
    lagged: bool,
}

impl Subscription {
    pub fn spec(&self) -> &SubscriptionSpec {
        &self.spec
    }

    /// Wait for the next matching change, or `None` once the feed is closed
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.spec.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Subscription {:?} lagged, {} changes dropped", self.spec, skipped);
                    self.lagged = true;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching change that is already queued, without waiting
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.spec.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Subscription {:?} lagged, {} changes dropped", self.spec, skipped);
                    self.lagged = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Whether changes were dropped since the last call; clears the flag.
    ///
    /// A lagged subscriber has to re-read whatever state it derives from
    /// the feed.
    pub fn take_lagged(&mut self) -> bool {
        std::mem::take(&mut self.lagged)
    }

    pub fn unsubscribe(self) {
        debug!("Unsubscribed: {:?}", self.spec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ReadStatusRecord;

    fn read_row(session: &str, user: &str) -> Row {
        Row::ReadStatus(ReadStatusRecord {
            message_id: "m1".to_string(),
            user_id: user.to_string(),
            session_id: session.to_string(),
            read_at: None,
        })
    }

    #[test]
    fn test_spec_matches_table_kind_and_filter() {
        let spec = SubscriptionSpec::new(Table::ReadStatus, EventFilter::Update)
            .with_filter(ColumnFilter::UserId("bob".to_string()));

        let update = ChangeEvent::update(read_row("s1", "bob"), read_row("s1", "bob"));
        assert!(spec.matches(&update));
        assert!(!spec.matches(&ChangeEvent::insert(read_row("s1", "bob"))));
        assert!(!spec.matches(&ChangeEvent::update(
            read_row("s1", "alice"),
            read_row("s1", "alice")
        )));
    }

    #[tokio::test]
    async fn test_subscription_skips_unmatched_changes() {
        let feed = ChangeFeed::new(16);
        let mut sub = feed.subscribe(
            SubscriptionSpec::new(Table::ReadStatus, EventFilter::Any)
                .with_filter(ColumnFilter::SessionId("s2".to_string())),
        );

        feed.publish(ChangeEvent::insert(read_row("s1", "bob")));
        feed.publish(ChangeEvent::insert(read_row("s2", "bob")));

        let event = sub.try_next().expect("expected a matching change");
        assert_eq!(event.new.session_id(), Some("s2"));
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn test_overflow_is_reported_once() {
        let feed = ChangeFeed::new(2);
        let mut sub = feed.subscribe(SubscriptionSpec::new(Table::ReadStatus, EventFilter::Any));

        for session in ["s1", "s2", "s3", "s4"] {
            feed.publish(ChangeEvent::insert(read_row(session, "bob")));
        }

        assert!(!sub.take_lagged());
        let event = sub.try_next().expect("newest changes are still queued");
        assert_eq!(event.new.session_id(), Some("s3"));
        assert!(sub.take_lagged());
        assert!(!sub.take_lagged());
    }
}
