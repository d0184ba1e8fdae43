//! Huddle Store - Row store and change feed for chat sessions
//!
//! This crate provides SQLite-based persistence for chat sessions using Sea-ORM,
//! together with an in-process change feed that reports every row insert and update.
//!
//! # Architecture
//!
//! - **ChatStore**: the typed row-store seam consumed by the sync engine
//! - **SqliteChatStore**: Sea-ORM implementation over a single SQLite file
//! - **ChangeFeed**: broadcast of INSERT/UPDATE events, filtered per subscription
//!
//! # Database Schema
//!
//! - `sessions`: private, group and AI chat sessions
//! - `participants`: session membership with ADMIN/MEMBER roles
//! - `messages`: human messages, soft-deleted in place
//! - `attachments`: files owned by a message
//! - `read_status`: one receipt per (message, non-sender participant)
//! - `ai_messages`: assistant stream, grouped by conversation id
//! - `notifications`: mention notifications
//! - `users`, `relationships`: profiles and viewer-to-user relationships
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use huddle_store::{ChatStore, NewSession, SessionKind, SqliteChatStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteChatStore::open("huddle.db".into()).await?;
//!
//! let session = store
//!     .insert_session(NewSession {
//!         kind: SessionKind::Group,
//!         name: Some("Design".to_string()),
//!         created_by: "alice".to_string(),
//!     })
//!     .await?;
//! println!("created {}", session.id);
//! # Ok(())
//! # }
//! ```

pub mod entities;
pub mod error;
pub mod feed;
pub mod migration;
pub mod records;
pub mod sqlite_store;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use feed::{
    ChangeEvent, ChangeFeed, ChangeKind, ColumnFilter, EventFilter, Row, Subscription,
    SubscriptionSpec, Table,
};
pub use records::{
    AiMessageRecord, AiRole, AttachmentRecord, Mention, MessageRecord, MessageView, NewAiMessage,
    NewAttachment, NewMessage, NewNotification, NewSession, ParticipantRecord, ParticipantRole,
    ReadStatusRecord, Relationship, ReplyPreview, SessionKind, SessionRecord, UserProfile,
};
pub use sqlite_store::SqliteChatStore;
pub use store::ChatStore;
