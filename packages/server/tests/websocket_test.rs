//! Integration tests running the server in-process with real WebSocket clients.
//!
//! External services are replaced by in-memory fakes so that generation and
//! storage cleanup can be observed end to end.

use std::{
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::oneshot, time::timeout};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use tsudoi_server::{
    domain::{
        BlobStorage, GenerationError, ImageGenerator, ImageUrl, Prompt, StorageError,
        StorageHandle, StoredImage,
    },
    infrastructure::{
        dto::{
            http::RoomDetailDto,
            websocket::{GenerationStatusKind, ServerEvent},
        },
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryConnectionRepository, InMemoryRoomRepository},
    },
    ui::{AppState, Dependencies, Server},
};
use tsudoi_shared::time::SystemClock;

// ========================================
// Fakes
// ========================================

struct FakeGenerator;

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<Vec<u8>, GenerationError> {
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }
}

#[derive(Default)]
struct FakeStorage {
    uploads: AtomicUsize,
    deleted: Mutex<Vec<String>>,
}

impl FakeStorage {
    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStorage for FakeStorage {
    async fn upload(&self, _image: Vec<u8>) -> Result<StoredImage, StorageError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StoredImage {
            url: ImageUrl::new(format!("https://img.example/{}.png", n)).unwrap(),
            handle: StorageHandle::new(format!("handle-{}", n)).unwrap(),
        })
    }

    async fn delete_many(&self, handles: Vec<StorageHandle>) -> Result<(), StorageError> {
        let mut deleted = self.deleted.lock().unwrap();
        deleted.extend(handles.iter().map(|h| h.as_str().to_string()));
        Ok(())
    }
}

// ========================================
// Harness
// ========================================

struct TestServer {
    addr: SocketAddr,
    storage: Arc<FakeStorage>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storage = Arc::new(FakeStorage::default());

        let app_state = AppState::from_dependencies(Dependencies {
            rooms: Arc::new(InMemoryRoomRepository::new()),
            connections: Arc::new(InMemoryConnectionRepository::new()),
            message_pusher: Arc::new(WebSocketMessagePusher::new()),
            image_generator: Arc::new(FakeGenerator),
            blob_storage: storage.clone(),
            clock: Arc::new(SystemClock),
            generation_timeout: Duration::from_secs(5),
        });

        let (tx, rx) = oneshot::channel::<()>();
        let server = Server::new(app_state);
        tokio::spawn(async move {
            let _ = server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            addr,
            storage,
            shutdown: Some(tx),
        }
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn client(&self) -> TestClient {
        let (ws, _) = connect_async(format!("ws://{}/ws", self.addr))
            .await
            .expect("Failed to connect");
        TestClient { ws }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl TestClient {
    async fn send(&mut self, event: &str, data: Value) {
        let frame = json!({ "event": event, "data": data }).to_string();
        self.ws.send(Message::text(frame)).await.unwrap();
    }

    async fn recv(&mut self) -> ServerEvent {
        loop {
            let msg = timeout(Duration::from_secs(2), self.ws.next())
                .await
                .expect("Timed out waiting for an event")
                .expect("Connection closed")
                .unwrap();
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    /// Skip events until one matches
    async fn recv_until<F>(&mut self, pred: F) -> ServerEvent
    where
        F: Fn(&ServerEvent) -> bool,
    {
        loop {
            let event = self.recv().await;
            if pred(&event) {
                return event;
            }
        }
    }

    /// Nothing arrives within a short window
    async fn assert_silent(&mut self) {
        let next = timeout(Duration::from_millis(200), self.ws.next()).await;
        assert!(next.is_err(), "unexpected frame: {:?}", next);
    }

    async fn create_room(&mut self) -> String {
        self.send("create_room", json!({})).await;
        match self.recv().await {
            ServerEvent::RoomCreated(room) => room,
            other => panic!("expected room_created, got {:?}", other),
        }
    }

    /// Join and consume the sync the joiner receives
    async fn join(&mut self, room: &str, user: &str) {
        self.send("join_room", json!({ "room": room, "user": user }))
            .await;
        self.recv_until(|e| matches!(e, ServerEvent::PromptLockStatus(_)))
            .await;
    }

    async fn close(mut self) {
        self.ws.close(None).await.unwrap();
    }
}

fn member_names(event: &ServerEvent) -> Vec<String> {
    match event {
        ServerEvent::UpdateUserList(members) => members.iter().map(|m| m.name.clone()).collect(),
        other => panic!("expected update_user_list, got {:?}", other),
    }
}

// ========================================
// Tests
// ========================================

#[tokio::test]
async fn test_fifth_join_is_rejected() {
    // テスト項目: 4 人参加したルームへの 5 人目の参加は error_join で拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut clients = Vec::new();
    for _ in 0..5 {
        clients.push(server.client().await);
    }
    let room = clients[0].create_room().await;
    for (i, client) in clients.iter_mut().take(4).enumerate() {
        client.join(&room, &format!("user{}", i)).await;
    }

    // when (操作):
    clients[4]
        .send("join_room", json!({ "room": room, "user": "late" }))
        .await;

    // then (期待する結果):
    assert_eq!(
        clients[4].recv().await,
        ServerEvent::ErrorJoin("Room is full! Max 4 users allowed.".to_string())
    );
    let detail: RoomDetailDto = reqwest::get(server.http_url(&format!("/api/rooms/{}", room)))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.members.len(), 4);
    assert!(detail.members.iter().all(|m| m.name != "late"));
}

#[tokio::test]
async fn test_join_joiner_receives_sync() {
    // テスト項目: 参加者は参加者一覧・ギャラリー・ロック状態をこの順で受け取る
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.client().await;
    let room = alice.create_room().await;

    // when (操作):
    alice
        .send("join_room", json!({ "room": room, "user": "  alice  " }))
        .await;

    // then (期待する結果):
    assert_eq!(member_names(&alice.recv().await), vec!["alice"]);
    assert_eq!(alice.recv().await, ServerEvent::UpdateGallery(vec![]));
    assert_eq!(alice.recv().await, ServerEvent::PromptLockStatus(None));
}

#[tokio::test]
async fn test_join_unknown_room_is_rejected() {
    // テスト項目: 存在しないルームへの参加は error_join で拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.client().await;

    // when (操作):
    alice.send("join_room", json!("ZZZZZZ")).await;

    // then (期待する結果):
    assert_eq!(
        alice.recv().await,
        ServerEvent::ErrorJoin(
            "Room not found! Please check the ID or create a new room.".to_string()
        )
    );
}

#[tokio::test]
async fn test_prompt_lock_handoff_on_disconnect() {
    // テスト項目: ロック保持者が切断するとロックが解放され、他のメンバーが取得できる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.client().await;
    let mut bob = server.client().await;
    let room = alice.create_room().await;
    alice.join(&room, "alice").await;
    bob.join(&room, "bob").await;
    alice
        .recv_until(|e| matches!(e, ServerEvent::UpdateUserList(_)))
        .await;

    alice
        .send("start_prompt_edit", json!({ "room": room, "user": "alice" }))
        .await;
    assert_eq!(
        bob.recv().await,
        ServerEvent::PromptLockStatus(Some("alice".to_string()))
    );
    bob.send("start_prompt_edit", json!({ "room": room, "user": "bob" }))
        .await;
    bob.assert_silent().await;

    // when (操作):
    alice.close().await;

    // then (期待する結果):
    assert_eq!(bob.recv().await, ServerEvent::PromptLockStatus(None));
    assert_eq!(member_names(&bob.recv().await), vec!["bob"]);

    bob.send("start_prompt_edit", json!({ "room": room, "user": "bob" }))
        .await;
    bob.assert_silent().await;
    let detail: RoomDetailDto = reqwest::get(server.http_url(&format!("/api/rooms/{}", room)))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail.lock_holder.as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_prompt_sync_and_chat_are_relayed_to_others() {
    // テスト項目: プロンプト同期とチャットは送信者以外のメンバーに中継される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.client().await;
    let mut bob = server.client().await;
    let room = alice.create_room().await;
    alice.join(&room, "alice").await;
    bob.join(&room, "bob").await;
    alice
        .recv_until(|e| matches!(e, ServerEvent::UpdateUserList(_)))
        .await;

    // when (操作):
    alice
        .send("sync_prompt", json!({ "room": room, "text": "a cat on the porch" }))
        .await;
    alice
        .send(
            "send_message",
            json!({ "room": room, "user": "alice", "message": "hi" }),
        )
        .await;

    // then (期待する結果):
    assert_eq!(
        bob.recv().await,
        ServerEvent::ReceivePromptSync("a cat on the porch".to_string())
    );
    assert_eq!(
        bob.recv().await,
        ServerEvent::ReceiveMessage(json!({ "room": room, "user": "alice", "message": "hi" }))
    );
    alice.assert_silent().await;
}

#[tokio::test]
async fn test_generation_is_broadcast_and_purged_on_last_leave() {
    // テスト項目: 生成結果はルーム全員に配信され、最後のメンバーが退出すると画像が削除される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.client().await;
    let mut bob = server.client().await;
    let room = alice.create_room().await;
    alice.join(&room, "alice").await;
    bob.join(&room, "bob").await;
    alice
        .recv_until(|e| matches!(e, ServerEvent::UpdateUserList(_)))
        .await;

    // when (操作):
    bob.send(
        "collaborative_generate",
        json!({ "room": room, "prompt": "a cat", "user": "bob" }),
    )
    .await;

    // then (期待する結果):
    for client in [&mut alice, &mut bob] {
        match client.recv().await {
            ServerEvent::GenerationStatus(status) => {
                assert_eq!(status.status, GenerationStatusKind::Loading);
                assert_eq!(status.user.as_deref(), Some("bob"));
            }
            other => panic!("expected generation_status, got {:?}", other),
        }
        match client.recv().await {
            ServerEvent::ReceiveSharedImage(image) => {
                assert_eq!(image.photo, "https://img.example/1.png");
                assert_eq!(image.prompt, "a cat");
                assert_eq!(image.user, "bob");
            }
            other => panic!("expected receive_shared_image, got {:?}", other),
        }
        match client.recv().await {
            ServerEvent::UpdateGallery(history) => assert_eq!(history.len(), 1),
            other => panic!("expected update_gallery, got {:?}", other),
        }
        match client.recv().await {
            ServerEvent::GenerationStatus(status) => {
                assert_eq!(status.status, GenerationStatusKind::Success)
            }
            other => panic!("expected generation_status, got {:?}", other),
        }
    }

    alice.close().await;
    bob.close().await;

    let mut deleted = Vec::new();
    for _ in 0..40 {
        deleted = server.storage.deleted();
        if !deleted.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(deleted, vec!["handle-1".to_string()]);
    let status = reqwest::get(server.http_url(&format!("/api/rooms/{}", room)))
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_http_rooms_listing() {
    // テスト項目: ルーム一覧 API は作成済みのルームを返し、ヘルスチェックは ok を返す
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.client().await;
    let room = alice.create_room().await;

    // when (操作):
    let rooms: Value = reqwest::get(server.http_url("/api/rooms"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let health: Value = reqwest::get(server.http_url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(rooms.as_array().unwrap().len(), 1);
    assert_eq!(rooms[0]["id"], json!(room));
    assert_eq!(rooms[0]["history_size"], json!(0));
    assert_eq!(health, json!({ "status": "ok" }));
}
