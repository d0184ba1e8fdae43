// Tests for SqliteChatStore and its change feed

use chrono::Utc;
use huddle_store::{
    AiRole, ChangeKind, ChatStore, ColumnFilter, EventFilter, Mention, NewAiMessage,
    NewAttachment, NewMessage, NewSession, ParticipantRecord, ParticipantRole, Relationship, Row,
    SessionKind, SqliteChatStore, SubscriptionSpec, Table, UserProfile,
};
use tempfile::NamedTempFile;
use uuid::Uuid;

async fn open_store(temp_file: &NamedTempFile) -> SqliteChatStore {
    SqliteChatStore::open(temp_file.path().to_path_buf())
        .await
        .expect("Failed to open chat store")
}

async fn group_with(store: &SqliteChatStore, members: &[&str]) -> String {
    let session = store
        .insert_session(NewSession {
            kind: SessionKind::Group,
            name: Some("Team".to_string()),
            created_by: members[0].to_string(),
        })
        .await
        .expect("Failed to create session");

    for (i, member) in members.iter().enumerate() {
        store
            .insert_participant(ParticipantRecord {
                session_id: session.id.clone(),
                user_id: member.to_string(),
                role: if i == 0 {
                    ParticipantRole::Admin
                } else {
                    ParticipantRole::Member
                },
            })
            .await
            .expect("Failed to add participant");
    }
    session.id
}

fn text(session_id: &str, user_id: &str, content: &str) -> NewMessage {
    NewMessage {
        id: Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        user_id: user_id.to_string(),
        content: content.to_string(),
        reply_to_message_id: None,
        mentions: Vec::new(),
    }
}

#[tokio::test]
async fn test_store_initialization_is_repeatable() {
    let temp_file = NamedTempFile::new().unwrap();
    let _first = open_store(&temp_file).await;
    // Migrations must be safe to run against an existing schema
    let _second = open_store(&temp_file).await;
}

#[tokio::test]
async fn test_messages_are_ordered_and_joined() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;

    store
        .upsert_user(&UserProfile {
            id: "alice".to_string(),
            display_name: "Alice".to_string(),
            avatar_url: None,
        })
        .await
        .unwrap();
    let session_id = group_with(&store, &["alice", "bob"]).await;

    let first = store
        .insert_message(text(&session_id, "alice", "first"))
        .await
        .unwrap();
    let mut reply = text(&session_id, "bob", "second");
    reply.reply_to_message_id = Some(first.id.clone());
    reply.mentions = vec![Mention::User {
        id: "alice".to_string(),
        name: "Alice".to_string(),
    }];
    let second = store.insert_message(reply).await.unwrap();

    store
        .insert_attachment(NewAttachment {
            message_id: first.id.clone(),
            file_url: "https://files.example/a.png".to_string(),
            file_name: "a.png".to_string(),
            is_image: true,
        })
        .await
        .unwrap();

    let messages = store.messages(&session_id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message.id, first.id);
    assert_eq!(messages[1].message.id, second.id);
    assert!(messages[0].message.created_at < messages[1].message.created_at);

    assert_eq!(messages[0].attachments.len(), 1);
    assert_eq!(
        messages[0].sender.as_ref().map(|s| s.display_name.as_str()),
        Some("Alice")
    );
    assert!(messages[1].sender.is_none());
    assert_eq!(
        messages[1].reply_to.as_ref().map(|r| r.content.as_str()),
        Some("first")
    );
    assert_eq!(messages[1].message.mentions.len(), 1);

    let latest = store.latest_message(&session_id).await.unwrap().unwrap();
    assert_eq!(latest.id, second.id);
}

#[tokio::test]
async fn test_read_status_transitions_once() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;
    let session_id = group_with(&store, &["alice", "bob"]).await;

    let message = store
        .insert_message(text(&session_id, "alice", "hello"))
        .await
        .unwrap();
    store
        .insert_read_status(&message.id, &session_id, "bob")
        .await
        .unwrap();

    assert_eq!(store.unread_count(&session_id, "bob").await.unwrap(), 1);
    assert_eq!(store.unread_count(&session_id, "alice").await.unwrap(), 0);

    let counts = store.unread_counts("bob").await.unwrap();
    assert_eq!(counts.get(&session_id), Some(&1));

    assert!(store
        .mark_read_row(&message.id, "bob", Utc::now())
        .await
        .unwrap());
    // Already read: no second transition
    assert!(!store
        .mark_read_row(&message.id, "bob", Utc::now())
        .await
        .unwrap());

    assert_eq!(store.unread_count(&session_id, "bob").await.unwrap(), 0);
    assert!(store.unread_rows(&session_id, "bob").await.unwrap().is_empty());
    assert!(store.unread_counts("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_soft_delete_keeps_row() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;
    let session_id = group_with(&store, &["alice", "bob"]).await;

    let message = store
        .insert_message(text(&session_id, "alice", "oops"))
        .await
        .unwrap();
    store
        .soft_delete_message(&message.id, "This message was deleted")
        .await
        .unwrap();

    let view = store.message(&message.id).await.unwrap().unwrap();
    assert!(view.message.is_deleted);
    assert_eq!(view.message.content, "This message was deleted");
    assert_eq!(store.message_ids(&session_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ai_messages_window_and_counts() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;

    let session = store
        .insert_session(NewSession {
            kind: SessionKind::Ai,
            name: None,
            created_by: "alice".to_string(),
        })
        .await
        .unwrap();

    for (i, role) in [AiRole::User, AiRole::Assistant, AiRole::User, AiRole::Assistant, AiRole::User]
        .into_iter()
        .enumerate()
    {
        store
            .insert_ai_message(NewAiMessage {
                session_id: Some(session.id.clone()),
                user_id: "alice".to_string(),
                conversation_id: "conv-1".to_string(),
                role,
                content: format!("turn {i}"),
            })
            .await
            .unwrap();
    }

    assert_eq!(store.count_assistant_messages(&session.id).await.unwrap(), 2);

    let recent = store
        .recent_ai_messages(&session.id, "conv-1", 4)
        .await
        .unwrap();
    let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["turn 1", "turn 2", "turn 3", "turn 4"]);

    let latest = store.latest_ai_message(&session.id).await.unwrap().unwrap();
    assert_eq!(latest.content, "turn 4");

    let found = store.ai_session_for("alice").await.unwrap().unwrap();
    assert_eq!(found.id, session.id);
    assert!(store.ai_session_for("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_change_feed_reports_inserts_and_updates() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;
    let session_id = group_with(&store, &["alice", "bob"]).await;

    let mut messages = store.subscribe(SubscriptionSpec::new(Table::Message, EventFilter::Any));
    let mut bob_receipts = store.subscribe(
        SubscriptionSpec::new(Table::ReadStatus, EventFilter::Update)
            .with_filter(ColumnFilter::UserId("bob".to_string())),
    );

    let message = store
        .insert_message(text(&session_id, "alice", "hello"))
        .await
        .unwrap();
    store
        .insert_read_status(&message.id, &session_id, "bob")
        .await
        .unwrap();
    store
        .mark_read_row(&message.id, "bob", Utc::now())
        .await
        .unwrap();
    store
        .soft_delete_message(&message.id, "gone")
        .await
        .unwrap();

    let insert = messages.try_next().expect("message insert");
    assert_eq!(insert.kind, ChangeKind::Insert);
    assert!(insert.old.is_none());

    let update = messages.try_next().expect("message update");
    assert_eq!(update.kind, ChangeKind::Update);
    match (update.old, update.new) {
        (Some(Row::Message(old)), Row::Message(new)) => {
            assert!(!old.is_deleted);
            assert!(new.is_deleted);
            assert_eq!(new.content, "gone");
        }
        other => panic!("unexpected payload: {:?}", other),
    }
    assert!(messages.try_next().is_none());

    let read = bob_receipts.try_next().expect("receipt update");
    match (read.old, read.new) {
        (Some(Row::ReadStatus(old)), Row::ReadStatus(new)) => {
            assert!(old.read_at.is_none());
            assert!(new.read_at.is_some());
        }
        other => panic!("unexpected payload: {:?}", other),
    }
    assert!(bob_receipts.try_next().is_none());
}

#[tokio::test]
async fn test_session_deletion_removes_dependents() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;
    let session_id = group_with(&store, &["alice", "bob", "carol"]).await;

    let message = store
        .insert_message(text(&session_id, "alice", "bye"))
        .await
        .unwrap();
    store
        .insert_read_status(&message.id, &session_id, "bob")
        .await
        .unwrap();

    store.delete_session(&session_id).await.unwrap();

    assert!(store.session(&session_id).await.unwrap().is_none());
    assert!(store.participants(&session_id).await.unwrap().is_empty());
    assert!(store.message_ids(&session_id).await.unwrap().is_empty());
    assert_eq!(store.unread_count(&session_id, "bob").await.unwrap(), 0);
}

#[tokio::test]
async fn test_relationship_lookup() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;

    store
        .set_relationship("alice", "bob", Relationship::Requested)
        .await
        .unwrap();
    store
        .set_relationship("alice", "bob", Relationship::Friend)
        .await
        .unwrap();
    store
        .set_relationship("alice", "carol", Relationship::Blocked)
        .await
        .unwrap();

    let found = store
        .batch_lookup_relationships("alice", &["bob".to_string(), "dave".to_string()])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found.get("bob"), Some(&Relationship::Friend));
    assert!(store
        .batch_lookup_relationships("alice", &[])
        .await
        .unwrap()
        .is_empty());
}
