use hushroom::{
    AppError, MediaStore, MessageService, MessageStore, PRIVATE_ROOM, RoomRegistry,
    auth::SessionGate,
    service::RawUpload,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

struct Fixture {
    gate: SessionGate,
    registry: RoomRegistry,
    service: MessageService,
    _dir: TempDir,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("chat.db"))
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .unwrap();

    let gate = SessionGate::new(pool.clone());
    gate.init().await.unwrap();
    let store = MessageStore::new(pool.clone());
    store.init().await.unwrap();
    let media = MediaStore::new(dir.path().join("uploads")).unwrap();
    let registry = RoomRegistry::new();
    let service = MessageService::new(store, media, registry.clone());

    Fixture {
        gate,
        registry,
        service,
        _dir: dir,
    }
}

#[tokio::test]
async fn post_persists_then_broadcasts_matching_fields() {
    let fx = fixture().await;
    let alice = fx.gate.register("A", "hunter2hunter2").await.unwrap();

    // B is joined to the room but has not pulled history yet
    let (tx, mut rx) = mpsc::unbounded_channel();
    fx.registry.join(PRIVATE_ROOM, Uuid::now_v7(), tx);

    let message = fx.service.post_message(&alice, "hi", None).await.unwrap();

    let event = rx.recv().await.unwrap();
    assert_eq!(event.sender, "A");
    assert_eq!(event.text, "hi");
    assert_eq!(event.filename, None);
    assert_eq!(event.timestamp, message.timestamp);
    assert!(rx.try_recv().is_err(), "exactly one event per post");

    let history = fx.service.history().await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.id, message.id);
    assert_eq!(last.text, "hi");
}

#[tokio::test]
async fn history_replays_posts_in_order() {
    let fx = fixture().await;
    let alice = fx.gate.register("A", "hunter2hunter2").await.unwrap();

    let mut posted = Vec::new();
    for i in 0..4 {
        posted.push(
            fx.service
                .post_message(&alice, &format!("msg {i}"), None)
                .await
                .unwrap(),
        );
    }

    let history = fx.service.history().await.unwrap();
    assert_eq!(history.len(), 4);
    for (a, b) in posted.iter().zip(&history) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.text, b.text);
    }
}

#[tokio::test]
async fn rejected_media_leaves_no_row_and_no_event() {
    let fx = fixture().await;
    let alice = fx.gate.register("A", "hunter2hunter2").await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    fx.registry.join(PRIVATE_ROOM, Uuid::now_v7(), tx);

    let err = fx
        .service
        .post_message(
            &alice,
            "look at this",
            Some(RawUpload {
                original_name: "virus.exe".to_owned(),
                bytes: b"mz".to_vec(),
            }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidMediaType));
    assert!(fx.service.history().await.unwrap().is_empty());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn media_posts_carry_a_resolvable_reference() {
    let fx = fixture().await;
    let alice = fx.gate.register("A", "hunter2hunter2").await.unwrap();

    let upload = |bytes: &[u8]| RawUpload {
        original_name: "cat.jpg".to_owned(),
        bytes: bytes.to_vec(),
    };

    let first = fx
        .service
        .post_message(&alice, "", Some(upload(b"one")))
        .await
        .unwrap();
    let second = fx
        .service
        .post_message(&alice, "", Some(upload(b"two")))
        .await
        .unwrap();

    let first_name = first.filename.unwrap();
    let second_name = second.filename.unwrap();
    assert_ne!(first_name, second_name, "same original name, distinct files");

    let dir = fx._dir.path().join("uploads");
    assert_eq!(std::fs::read(dir.join(&first_name)).unwrap(), b"one");
    assert_eq!(std::fs::read(dir.join(&second_name)).unwrap(), b"two");
}

#[tokio::test]
async fn broadcast_happens_even_if_the_poster_hangs_up() {
    let fx = fixture().await;
    let alice = fx.gate.register("A", "hunter2hunter2").await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    fx.registry.join(PRIVATE_ROOM, Uuid::now_v7(), tx);

    // Poll the post once to get the pipeline moving, then drop the future,
    // the way hyper drops a handler when the client disconnects.
    {
        let post = fx.service.post_message(&alice, "parting words", None);
        tokio::pin!(post);
        let _ = futures_util::poll!(post.as_mut());
    }

    let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
        .await
        .expect("broadcast still goes out after the poster is gone")
        .unwrap();
    assert_eq!(event.text, "parting words");
    assert!(rx.try_recv().is_err(), "and only once");

    let history = fx.service.history().await.unwrap();
    assert_eq!(history.last().unwrap().text, "parting words");
}

#[tokio::test]
async fn empty_posts_are_rejected() {
    let fx = fixture().await;
    let alice = fx.gate.register("A", "hunter2hunter2").await.unwrap();

    let err = fx.service.post_message(&alice, "", None).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyMessage));
    assert!(fx.service.history().await.unwrap().is_empty());
}
