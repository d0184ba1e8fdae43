//! Events published by a chat client, and the locally held message type

use huddle_store::MessageView;
use serde::{Deserialize, Serialize};

/// Persistence state of a locally held message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Rendered optimistically, persist in flight
    Pending,
    Confirmed,
    /// Persist failed; the entry stays visible so the user can see it
    Failed,
}

/// A message in the open session's list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalMessage {
    pub view: MessageView,
    pub delivery: Delivery,
}

impl LocalMessage {
    pub fn confirmed(view: MessageView) -> Self {
        Self {
            view,
            delivery: Delivery::Confirmed,
        }
    }

    pub fn id(&self) -> &str {
        &self.view.message.id
    }
}

/// Change notifications for UI layers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    MessagesChanged { session_id: String },
    DirectoryChanged,
    UnreadChanged { session_id: String, count: u32 },
    SessionClosed { session_id: String },
}
