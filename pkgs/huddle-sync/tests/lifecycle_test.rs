// Session creation, cascading delete, leaving groups and the directory view

mod common;

use common::{client, open_store, seed_session, FlakyStore};
use huddle_store::{
    entities::attachments, AiRole, ChatStore, NewAiMessage, NewAttachment, Relationship,
    SessionKind,
};
use huddle_sync::{ClientEvent, OutgoingMessage, SyncError};
use sea_orm::EntityTrait;
use std::sync::atomic::Ordering;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_delete_session_survives_failed_step() {
    let temp_file = NamedTempFile::new().unwrap();
    let sqlite = open_store(&temp_file).await;
    let session = seed_session(&sqlite, SessionKind::Group, "alice", &["bob", "carol"]).await;
    let flaky = FlakyStore::new(sqlite.clone());

    let alice = client(flaky.clone(), "alice");
    alice.list_sessions().await.unwrap();
    alice.open_session(&session.id).await.unwrap();

    for i in 0..3 {
        let sent = alice
            .send(OutgoingMessage::text(&session.id, format!("message {i}")))
            .await
            .unwrap();
        sqlite
            .insert_attachment(NewAttachment {
                message_id: sent.id,
                file_url: format!("https://files.example/{i}.png"),
                file_name: format!("{i}.png"),
                is_image: true,
            })
            .await
            .unwrap();
    }
    sqlite
        .insert_ai_message(NewAiMessage {
            session_id: Some(session.id.clone()),
            user_id: "alice".to_string(),
            conversation_id: "conv".to_string(),
            role: AiRole::User,
            content: "summarize".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(sqlite.unread_rows(&session.id, "bob").await.unwrap().len(), 3);
    assert_eq!(sqlite.unread_rows(&session.id, "carol").await.unwrap().len(), 3);

    let mut events = alice.events();
    flaky.fail_attachment_deletes.store(true, Ordering::SeqCst);
    alice
        .delete_session(&session.id)
        .await
        .expect("session row deletion should still succeed");

    assert!(sqlite.session(&session.id).await.unwrap().is_none());
    assert!(sqlite.participants(&session.id).await.unwrap().is_empty());
    assert!(sqlite.message_ids(&session.id).await.unwrap().is_empty());
    assert!(sqlite.unread_rows(&session.id, "bob").await.unwrap().is_empty());
    assert!(sqlite.unread_rows(&session.id, "carol").await.unwrap().is_empty());
    assert!(sqlite.latest_ai_message(&session.id).await.unwrap().is_none());
    let remaining = attachments::Entity::find()
        .all(sqlite.connection())
        .await
        .unwrap();
    assert!(remaining.is_empty());

    assert!(alice.open_session_id().is_none());
    assert!(alice.directory().is_empty());

    let mut closed = false;
    while let Ok(event) = events.try_recv() {
        if event == (ClientEvent::SessionClosed {
            session_id: session.id.clone(),
        }) {
            closed = true;
        }
    }
    assert!(closed);
}

#[tokio::test]
async fn test_only_creator_deletes() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;
    let session = seed_session(&store, SessionKind::Group, "alice", &["bob"]).await;

    let bob = client(store.clone(), "bob");
    let err = bob.delete_session(&session.id).await.unwrap_err();
    assert!(matches!(err, SyncError::Forbidden(_)));
    assert!(store.session(&session.id).await.unwrap().is_some());

    let err = bob.delete_session("missing").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
}

#[tokio::test]
async fn test_leave_versus_delete() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;
    let group = seed_session(&store, SessionKind::Group, "alice", &["bob", "carol"]).await;
    let private = seed_session(&store, SessionKind::Private, "alice", &["bob"]).await;

    let alice = client(store.clone(), "alice");
    let bob = client(store.clone(), "bob");
    bob.list_sessions().await.unwrap();
    bob.open_session(&group.id).await.unwrap();

    let err = alice.leave_group(&group.id).await.unwrap_err();
    assert!(matches!(err, SyncError::Forbidden(_)));

    let err = bob.leave_group(&private.id).await.unwrap_err();
    assert!(matches!(err, SyncError::Forbidden(_)));

    let dave = client(store.clone(), "dave");
    let err = dave.leave_group(&group.id).await.unwrap_err();
    assert!(matches!(err, SyncError::Unauthorized(_)));

    bob.leave_group(&group.id).await.unwrap();

    assert!(store.session(&group.id).await.unwrap().is_some());
    let remaining: Vec<_> = store
        .participants(&group.id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.user_id)
        .collect();
    assert_eq!(remaining, vec!["alice", "carol"]);

    assert!(bob.open_session_id().is_none());
    let listed: Vec<_> = bob.directory().into_iter().map(|e| e.session.id).collect();
    assert_eq!(listed, vec![private.id.clone()]);
}

#[tokio::test]
async fn test_private_session_is_reused() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;

    let alice = client(store.clone(), "alice");
    let bob = client(store.clone(), "bob");

    let first = alice.create_private_session("bob").await.unwrap();
    let second = alice.create_private_session("bob").await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.kind, SessionKind::Private);

    let group = alice
        .create_group_session("Launch", &["bob".to_string(), "carol".to_string()])
        .await
        .unwrap();
    assert_eq!(store.participants(&group.id).await.unwrap().len(), 3);

    // Bob learns about both sessions from the feed
    bob.drain().await;
    let mut listed: Vec<_> = bob.directory().into_iter().map(|e| e.session.id).collect();
    listed.sort();
    let mut expected = vec![first.id.clone(), group.id.clone()];
    expected.sort();
    assert_eq!(listed, expected);

    let entry = bob
        .directory()
        .into_iter()
        .find(|e| e.session.id == first.id)
        .unwrap();
    assert_eq!(entry.counterpart().map(|m| m.user_id.as_str()), Some("alice"));
}

#[tokio::test]
async fn test_directory_order_hiding_and_relationships() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;
    let older = seed_session(&store, SessionKind::Private, "alice", &["bob"]).await;
    let newer = seed_session(&store, SessionKind::Group, "alice", &["carol"]).await;
    store
        .set_relationship("alice", "bob", Relationship::Friend)
        .await
        .unwrap();

    let alice = client(store.clone(), "alice");
    let listed: Vec<_> = alice
        .list_sessions()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.session.id)
        .collect();
    assert_eq!(listed, vec![newer.id.clone(), older.id.clone()]);
    assert_eq!(alice.relationship("bob"), Some(Relationship::Friend));

    // Activity moves the older session to the top
    alice
        .send(OutgoingMessage::text(&older.id, "bump"))
        .await
        .unwrap();
    let listed: Vec<_> = alice
        .list_sessions()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.session.id)
        .collect();
    assert_eq!(listed, vec![older.id.clone(), newer.id.clone()]);

    // Listing twice without writes gives the same result
    assert_eq!(
        alice.list_sessions().await.unwrap(),
        alice.list_sessions().await.unwrap()
    );

    alice.hide_session(&older.id);
    assert_eq!(alice.directory().len(), 1);
    assert_eq!(alice.list_sessions().await.unwrap().len(), 1);
    assert!(store.session(&older.id).await.unwrap().is_some());

    alice.unhide_session(&older.id);
    assert_eq!(alice.list_sessions().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_hidden_session_keeps_tracking_activity() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = open_store(&temp_file).await;
    let session = seed_session(&store, SessionKind::Private, "alice", &["bob"]).await;

    let alice = client(store.clone(), "alice");
    let bob = client(store.clone(), "bob");
    bob.list_sessions().await.unwrap();
    bob.hide_session(&session.id);
    assert!(bob.list_sessions().await.unwrap().is_empty());

    alice
        .send(OutgoingMessage::text(&session.id, "still there?"))
        .await
        .unwrap();
    bob.drain().await;
    assert!(bob.directory().is_empty());
    assert_eq!(bob.unread_count(&session.id), 1);

    bob.unhide_session(&session.id);
    let entries = bob.directory();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].unread_count, 1);
    assert_eq!(
        entries[0].last_message.as_ref().map(|m| m.preview.as_str()),
        Some("still there?")
    );
}
