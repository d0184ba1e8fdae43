//! Row types exchanged with the store and carried on the change feed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Session kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Private,
    Group,
    Ai,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Private => "private",
            SessionKind::Group => "group",
            SessionKind::Ai => "ai",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(SessionKind::Private),
            "group" => Ok(SessionKind::Group),
            "ai" => Ok(SessionKind::Ai),
            other => Err(StoreError::corrupt("sessions", format!("unknown kind {other}"))),
        }
    }
}

/// Participant role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Admin,
    Member,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Admin => "admin",
            ParticipantRole::Member => "member",
        }
    }
}

impl FromStr for ParticipantRole {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ParticipantRole::Admin),
            "member" => Ok(ParticipantRole::Member),
            other => Err(StoreError::corrupt("participants", format!("unknown role {other}"))),
        }
    }
}

/// Author role of an AI conversation message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiRole {
    User,
    Assistant,
}

impl AiRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiRole::User => "user",
            AiRole::Assistant => "assistant",
        }
    }
}

impl FromStr for AiRole {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(AiRole::User),
            "assistant" => Ok(AiRole::Assistant),
            other => Err(StoreError::corrupt("ai_messages", format!("unknown role {other}"))),
        }
    }
}

/// A mention embedded in a message, in the order it appears in the text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mention {
    User { id: String, name: String },
    Ai { name: String },
    All,
}

/// Chat session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub kind: SessionKind,
    pub name: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Membership of a user in a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantRecord {
    pub session_id: String,
    pub user_id: String,
    pub role: ParticipantRole,
}

/// Human-authored chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub content: String,
    pub reply_to_message_id: Option<String>,
    pub mentions: Vec<Mention>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// File attached to a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachmentRecord {
    pub id: String,
    pub message_id: String,
    pub file_url: String,
    pub file_name: String,
    pub is_image: bool,
}

/// Per-(message, user) read receipt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadStatusRecord {
    pub message_id: String,
    pub user_id: String,
    /// Session of the message, kept on the row so receipts can be counted per session
    pub session_id: String,
    pub read_at: Option<DateTime<Utc>>,
}

/// Message of the AI assistant stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiMessageRecord {
    pub id: String,
    pub session_id: Option<String>,
    pub user_id: String,
    pub conversation_id: String,
    pub role: AiRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Public profile of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Relationship between the viewer and another user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Friend,
    Requested,
    Blocked,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Friend => "friend",
            Relationship::Requested => "requested",
            Relationship::Blocked => "blocked",
        }
    }
}

impl FromStr for Relationship {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "friend" => Ok(Relationship::Friend),
            "requested" => Ok(Relationship::Requested),
            "blocked" => Ok(Relationship::Blocked),
            other => Err(StoreError::corrupt("relationships", format!("unknown status {other}"))),
        }
    }
}

/// Preview of the message being replied to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyPreview {
    pub message_id: String,
    pub user_id: String,
    pub content: String,
    pub is_deleted: bool,
}

/// Message joined with its sender, attachments and replied-message preview
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageView {
    pub message: MessageRecord,
    pub sender: Option<UserProfile>,
    pub attachments: Vec<AttachmentRecord>,
    pub reply_to: Option<ReplyPreview>,
}

impl MessageView {
    /// View with nothing joined yet
    pub fn bare(message: MessageRecord) -> Self {
        Self {
            message,
            sender: None,
            attachments: Vec::new(),
            reply_to: None,
        }
    }
}

/// Session to create; id and creation time are assigned by the store
#[derive(Debug, Clone)]
pub struct NewSession {
    pub kind: SessionKind,
    pub name: Option<String>,
    pub created_by: String,
}

/// Message to persist; the id is minted by the sender so it can render optimistically
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub content: String,
    pub reply_to_message_id: Option<String>,
    pub mentions: Vec<Mention>,
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub message_id: String,
    pub file_url: String,
    pub file_name: String,
    pub is_image: bool,
}

#[derive(Debug, Clone)]
pub struct NewAiMessage {
    pub session_id: Option<String>,
    pub user_id: String,
    pub conversation_id: String,
    pub role: AiRole,
    pub content: String,
}

/// Mention notification addressed to `user_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewNotification {
    pub user_id: String,
    pub actor_id: String,
    pub session_id: String,
    pub message_id: String,
    pub kind: String,
}
