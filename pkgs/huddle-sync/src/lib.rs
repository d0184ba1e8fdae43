//! Huddle Sync - Real-time chat synchronization engine
//!
//! Keeps a client's view of chat sessions, messages, read receipts and unread
//! counts consistent with a [`huddle_store::ChatStore`] while local actions,
//! store confirmations and change-feed events arrive concurrently.
//!
//! # Components
//!
//! - **Session Directory**: the viewer's sessions with members, last message and unread count
//! - **Message Stream**: the open session's messages, optimistic send and soft delete
//! - **Read-Receipt Ledger**: read transitions and per-session unread counts
//! - **Change Ingestion Router**: applies change-feed events, suppressing self-echoes
//! - **AI Conversation Manager**: conversation identity and session title synthesis
//! - **Lifecycle Operations**: session creation, cascading delete and leaving a group
//!
//! All of them are driven through [`ChatClient`], one per connected user.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use huddle_store::SqliteChatStore;
//! use huddle_sync::{ChatClient, OutgoingMessage, SyncConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteChatStore::open("huddle.db".into()).await?);
//! let alice = Arc::new(ChatClient::new(store, Some("alice".into()), SyncConfig::default())?);
//! let _listener = alice.listen();
//!
//! let session = alice.create_private_session("bob").await?;
//! alice.send(OutgoingMessage::text(&session.id, "hello")).await?;
//! for entry in alice.list_sessions().await? {
//!     println!("{} unread in {}", entry.unread_count, entry.session.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod timeline;
pub mod title;

mod echo;
mod ledger;
mod lifecycle;
mod router;
mod state;
mod stream;

pub use ai::AiReply;
pub use client::ChatClient;
pub use config::SyncConfig;
pub use directory::{DirectoryEntry, Member};
pub use error::{SyncError, SyncResult};
pub use events::{ClientEvent, Delivery, LocalMessage};
pub use stream::OutgoingMessage;
pub use timeline::{TimelineEntry, TimelineSource};
pub use title::{fallback_title, HttpTitleGenerator, TitleError, TitleGenerator};
