use anyhow::Result;
use clap::Parser;
use huddle_store::{AiRole, SqliteChatStore, UserProfile};
use huddle_sync::{ChatClient, ClientEvent, OutgoingMessage, SyncConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Two chat clients sharing one store", long_about = None)]
struct Args {
    /// SQLite database file
    #[arg(short, long, default_value = "huddle-demo.db")]
    db: PathBuf,

    /// Title-generation service base URL
    #[arg(long, default_value = "http://localhost:3000/api")]
    title_url: String,
}

fn print_directory(who: &str, client: &ChatClient) {
    println!("--- {}'s sessions ---", who);
    for entry in client.directory() {
        let name = entry
            .session
            .name
            .clone()
            .or_else(|| entry.counterpart().map(|m| m.user_id.clone()))
            .unwrap_or_else(|| entry.session.id.clone());
        let last = entry
            .last_message
            .as_ref()
            .map(|m| m.preview.as_str())
            .unwrap_or("");
        println!(
            "  [{}] {:<32} unread={} last={:?}",
            entry.session.kind, name, entry.unread_count, last
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let args = Args::parse();

    let store = Arc::new(SqliteChatStore::open(args.db.clone()).await?);
    for (id, name) in [("alice", "Alice"), ("bob", "Bob")] {
        store
            .upsert_user(&UserProfile {
                id: id.to_string(),
                display_name: name.to_string(),
                avatar_url: None,
            })
            .await?;
    }

    let config = SyncConfig {
        title_service_url: args.title_url,
        attachment_refetch_delay: Duration::from_millis(200),
        ..Default::default()
    };
    let alice = Arc::new(ChatClient::new(
        store.clone(),
        Some("alice".to_string()),
        config.clone(),
    )?);
    let bob = Arc::new(ChatClient::new(store.clone(), Some("bob".to_string()), config)?);

    let mut bob_events = bob.events();
    let alice_listener = alice.listen();
    let bob_listener = bob.listen();

    // Send and receive
    let session = alice.create_private_session("bob").await?;
    alice
        .send(OutgoingMessage::text(&session.id, "hello"))
        .await?;
    bob.list_sessions().await?;
    print_directory("bob", &bob);

    // Read on open
    let messages = bob.open_session(&session.id).await?;
    println!("bob opened {} with {} message(s)", session.id, messages.len());
    bob.send(OutgoingMessage::text(&session.id, "hi alice"))
        .await?;
    alice.list_sessions().await?;
    print_directory("alice", &alice);

    // Soft delete
    if let Some(first) = messages.first() {
        alice.delete_message(&first.view.message.id).await?;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    for message in bob.messages() {
        println!(
            "  {} ({:?}): {}",
            message.view.message.user_id, message.delivery, message.view.message.content
        );
    }

    // AI conversation with title synthesis
    let conversation = alice.enter_ai_mode();
    alice
        .record_ai_message(AiRole::User, "Plan a team offsite", &conversation, None)
        .await?;
    let reply = alice
        .record_ai_message(
            AiRole::Assistant,
            "# Offsite plan\n**Day one** starts with a hike and ends with a retro",
            &conversation,
            None,
        )
        .await?;
    if let Some(task) = reply.title_task {
        println!("AI session titled {:?}", task.await?);
    }
    alice.list_sessions().await?;
    print_directory("alice", &alice);

    let mut seen = 0;
    while let Ok(event) = bob_events.try_recv() {
        if matches!(event, ClientEvent::UnreadChanged { .. }) {
            seen += 1;
        }
    }
    println!("bob saw {} unread updates", seen);

    alice.shutdown().await;
    bob.shutdown().await;
    alice_listener.await?;
    bob_listener.await?;
    Ok(())
}
