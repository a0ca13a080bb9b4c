//! Integration tests for the comment server over real TCP connections.
//!
//! Each test starts an in-process server on an ephemeral port with its own
//! temporary comment list directory.

use std::{path::PathBuf, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use sajiki_server::{
    infrastructure::{
        ChannelHub, ViewerRegistry, message_pusher::RegistryMessagePusher,
        repository::FileCommentListStore,
    },
    ui::{Server, state::ConnectionSettings},
    usecase::{
        AttachViewerUseCase, DetachViewerUseCase, GetChannelDetailUseCase, GetChannelsUseCase,
        PostCommentUseCase,
    },
};
use sajiki_shared::{
    frame::{
        DEFAULT_MAX_FRAME_LENGTH, FrameCodec, NET_CONGESTION, POLICY_FILE_REQUEST,
        POLICY_FILE_RESPONSE,
    },
    time::SystemClock,
};
use tokio::{
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::oneshot,
    task::JoinHandle,
};
use tokio_util::codec::{FramedRead, FramedWrite};
use xmltree::Element;

const TIMEOUT: Duration = Duration::from_secs(5);
const COMMENT: &str = "u1,STUDENT,subscribe,12.34,Hello,SHARE,live,ALL,,30,100";

/// Helper struct to manage an in-process server
struct TestServer {
    port: u16,
    admin_port: Option<u16>,
    dir: tempfile::TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestServer {
    /// Start a server with `max_users` viewer slots
    async fn start(max_users: usize) -> Self {
        Self::start_with(max_users, false, None).await
    }

    /// Start a server, optionally with the diagnostics API and an idle timeout
    async fn start_with(max_users: usize, admin: bool, idle_timeout: Option<Duration>) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let registry = Arc::new(ViewerRegistry::new(max_users));
        let store = Arc::new(FileCommentListStore::new(dir.path()));
        let hub = Arc::new(ChannelHub::new(
            registry.clone(),
            store,
            Arc::new(SystemClock),
        ));
        let server = Server::new(
            hub.clone(),
            Arc::new(AttachViewerUseCase::new(hub.clone())),
            Arc::new(PostCommentUseCase::new(Arc::new(
                RegistryMessagePusher::new(registry),
            ))),
            Arc::new(DetachViewerUseCase::new(hub.clone())),
            Arc::new(GetChannelsUseCase::new(hub.clone())),
            Arc::new(GetChannelDetailUseCase::new(hub)),
            ConnectionSettings {
                idle_timeout,
                max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (admin_listener, admin_port) = if admin {
            let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let admin_port = admin_listener.local_addr().unwrap().port();
            (Some(admin_listener), Some(admin_port))
        } else {
            (None, None)
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(server.serve(listener, admin_listener, async move {
            let _ = shutdown_rx.await;
        }));

        TestServer {
            port,
            admin_port,
            dir,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    fn comment_list_path(&self, movie_id: &str) -> PathBuf {
        self.dir.path().join(format!("{}.xml", movie_id))
    }

    /// Wait until the stored comment list of `movie_id` holds `count` comments
    async fn wait_for_stored_comments(&self, movie_id: &str, count: usize) -> Element {
        let path = self.comment_list_path(movie_id);
        tokio::time::timeout(TIMEOUT, async {
            loop {
                if let Ok(bytes) = tokio::fs::read(&path).await
                    && let Ok(root) = Element::parse(bytes.as_slice())
                    && comment_elements(&root).len() == count
                {
                    return root;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("Timeout waiting for persisted comment list")
    }

    /// Stop accepting and wait for the shutdown persist
    async fn shutdown(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Helper struct for a raw protocol client
struct TestClient {
    reader: FramedRead<OwnedReadHalf, FrameCodec>,
    writer: FramedWrite<OwnedWriteHalf, FrameCodec>,
}

impl TestClient {
    async fn connect(port: u16) -> Self {
        let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let (read_half, write_half) = stream.into_split();
        TestClient {
            reader: FramedRead::new(read_half, FrameCodec::new()),
            writer: FramedWrite::new(write_half, FrameCodec::new()),
        }
    }

    /// Connect and attach to `movie_id`, returning the snapshot
    async fn attach(port: u16, movie_id: &str) -> (Self, Element) {
        let mut client = Self::connect(port).await;
        client.send(movie_id).await;
        let snapshot = client.recv().await.expect("Expected snapshot");
        let root = Element::parse(snapshot.as_bytes()).expect("Snapshot is not XML");
        (client, root)
    }

    async fn send(&mut self, frame: &str) {
        self.writer.send(frame).await.unwrap();
    }

    /// Next frame, `None` when the server closed the connection
    async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(TIMEOUT, self.reader.next())
            .await
            .expect("Timeout waiting for frame")
            .map(|frame| frame.unwrap())
    }

    /// Whether any frame arrives within `wait`
    async fn receives_within(&mut self, wait: Duration) -> bool {
        tokio::time::timeout(wait, self.reader.next()).await.is_ok()
    }
}

fn comment_elements(root: &Element) -> Vec<&Element> {
    root.children
        .iter()
        .filter_map(|node| node.as_element())
        .filter(|element| element.name == "comment")
        .collect()
}

fn field(comment: &Element, group: &str, name: &str) -> String {
    comment
        .get_child(group)
        .and_then(|g| g.get_child(name))
        .and_then(|f| f.get_text())
        .map(|t| t.into_owned())
        .unwrap_or_default()
}

fn child_text(root: &Element, name: &str) -> Option<String> {
    root.get_child(name)
        .and_then(|e| e.get_text())
        .map(|t| t.into_owned())
}

#[tokio::test]
async fn test_policy_file_request() {
    // テスト項目: ポリシーファイル要求にはポリシー文書を返して切断する
    // given (前提条件):
    let server = TestServer::start(2).await;
    let mut client = TestClient::connect(server.port).await;

    // when (操作):
    client.send(POLICY_FILE_REQUEST).await;

    // then (期待する結果):
    assert_eq!(client.recv().await.as_deref(), Some(POLICY_FILE_RESPONSE));
    assert_eq!(client.recv().await, None);
}

#[tokio::test]
async fn test_single_viewer_scenario() {
    // テスト項目: m1 に接続 → コメント投稿 → 切断で、スナップショット・配信・保存がすべて行われる
    // given (前提条件):
    let server = TestServer::start(4).await;

    // when (操作): 接続
    let (mut viewer, snapshot) = TestClient::attach(server.port, "m1").await;

    // then (期待する結果): 空のスナップショットと経過時間
    assert_eq!(snapshot.name, "root");
    let created_time = child_text(&snapshot, "createdTime").unwrap();
    let elapsed: i64 = child_text(&snapshot, "elapsedTime").unwrap().parse().unwrap();
    assert!((0..TIMEOUT.as_millis() as i64).contains(&elapsed));
    assert!(comment_elements(&snapshot).is_empty());

    // when (操作): コメント投稿
    viewer.send(COMMENT).await;

    // then (期待する結果): 送信者自身にも配信される
    let broadcast = viewer.recv().await.unwrap();
    assert!(!broadcast.contains("elapsedTime"));
    let data = Element::parse(broadcast.as_bytes()).unwrap();
    assert_eq!(data.name, "data");
    let comment = data.get_child("comment").unwrap();
    assert_eq!(field(comment, "user", "user_id"), "u1");
    assert_eq!(field(comment, "user", "role"), "STUDENT");
    assert_eq!(field(comment, "message", "time"), "12.34");
    assert_eq!(field(comment, "message", "value"), "Hello");
    assert_eq!(field(comment, "message", "whisper"), "");
    assert_eq!(field(comment, "style", "place"), "100");

    // when (操作): 切断
    drop(viewer);

    // then (期待する結果): m1.xml に作成時刻と 1 件のコメントが保存される
    let stored = server.wait_for_stored_comments("m1", 1).await;
    assert_eq!(child_text(&stored, "createdTime"), Some(created_time));
    assert!(stored.get_child("elapsedTime").is_none());
    let comments = comment_elements(&stored);
    assert_eq!(field(comments[0], "message", "value"), "Hello");
    assert_eq!(field(comments[0], "style", "fontsize"), "30");
}

#[tokio::test]
async fn test_comments_broadcast_to_every_viewer_of_the_movie() {
    // テスト項目: 同じ movie の全視聴者に同じ順序で配信され、別の movie には届かない
    // given (前提条件):
    let server = TestServer::start(4).await;
    let (mut alice, _) = TestClient::attach(server.port, "m1").await;
    let (mut bob, _) = TestClient::attach(server.port, "m1").await;
    let (mut carol, _) = TestClient::attach(server.port, "m2").await;

    // when (操作):
    for i in 0..5 {
        let frame = format!("u{i},viewer,web,{i}.0,c{i},normal,all,public,,18,bottom");
        if i % 2 == 0 {
            alice.send(&frame).await;
        } else {
            bob.send(&frame).await;
        }
    }

    // then (期待する結果):
    let mut alice_values = Vec::new();
    let mut bob_values = Vec::new();
    for _ in 0..5 {
        let frame = alice.recv().await.unwrap();
        let data = Element::parse(frame.as_bytes()).unwrap();
        alice_values.push(field(data.get_child("comment").unwrap(), "message", "value"));
        let frame = bob.recv().await.unwrap();
        let data = Element::parse(frame.as_bytes()).unwrap();
        bob_values.push(field(data.get_child("comment").unwrap(), "message", "value"));
    }
    assert_eq!(alice_values, bob_values);
    let mut sorted = alice_values.clone();
    sorted.sort();
    assert_eq!(sorted, vec!["c0", "c1", "c2", "c3", "c4"]);
    assert!(!carol.receives_within(Duration::from_millis(200)).await);
}

#[tokio::test]
async fn test_second_viewer_joins_live_channel() {
    // テスト項目: 視聴者がいる movie に後から接続すると、生きているチャンネルのコメントを受け取る
    // given (前提条件):
    let server = TestServer::start(4).await;
    let (mut alice, first_snapshot) = TestClient::attach(server.port, "m1").await;
    alice.send(COMMENT).await;
    alice.recv().await.unwrap();

    // when (操作):
    let (mut bob, snapshot) = TestClient::attach(server.port, "m1").await;
    bob.send("u2,viewer,web,1.0,Hi,normal,all,public,,18,bottom")
        .await;

    // then (期待する結果):
    assert_eq!(
        child_text(&snapshot, "createdTime"),
        child_text(&first_snapshot, "createdTime")
    );
    let comments = comment_elements(&snapshot);
    assert_eq!(comments.len(), 1);
    assert_eq!(field(comments[0], "message", "value"), "Hello");
    assert!(alice.recv().await.unwrap().contains("<value>Hi</value>"));
    assert!(bob.recv().await.unwrap().contains("<value>Hi</value>"));
}

#[tokio::test]
async fn test_reopen_restores_persisted_history() {
    // テスト項目: 全員が離脱した後に再接続すると、保存された履歴と作成時刻がそのまま復元される
    // given (前提条件):
    let server = TestServer::start(4).await;
    let (mut alice, first_snapshot) = TestClient::attach(server.port, "m1").await;
    alice.send(COMMENT).await;
    alice
        .send("u1,STUDENT,subscribe,15.00,World,SHARE,live,ALL,,30,100")
        .await;
    alice.recv().await.unwrap();
    alice.recv().await.unwrap();
    drop(alice);
    server.wait_for_stored_comments("m1", 2).await;

    // when (操作):
    let (_bob, snapshot) = TestClient::attach(server.port, "m1").await;

    // then (期待する結果):
    assert_eq!(
        child_text(&snapshot, "createdTime"),
        child_text(&first_snapshot, "createdTime")
    );
    let values: Vec<String> = comment_elements(&snapshot)
        .into_iter()
        .map(|comment| field(comment, "message", "value"))
        .collect();
    assert_eq!(values, vec!["Hello", "World"]);
}

#[tokio::test]
async fn test_net_congestion_when_registry_full() {
    // テスト項目: 満員のときは Net Congestion を返して切断し、空きができれば再び接続できる
    // given (前提条件):
    let server = TestServer::start(1).await;
    let (alice, _) = TestClient::attach(server.port, "m1").await;

    // when (操作):
    let mut bob = TestClient::connect(server.port).await;
    bob.send("m1").await;

    // then (期待する結果):
    assert_eq!(bob.recv().await.as_deref(), Some(NET_CONGESTION));
    assert_eq!(bob.recv().await, None);

    // when (操作): 1 人切断した後に再接続
    drop(alice);
    let snapshot = tokio::time::timeout(TIMEOUT, async {
        loop {
            let mut carol = TestClient::connect(server.port).await;
            carol.send("m2").await;
            match carol.recv().await {
                Some(frame) if frame != NET_CONGESTION => return frame,
                _ => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
    })
    .await
    .expect("Slot was never released");

    // then (期待する結果):
    assert!(snapshot.contains("<createdTime>"));
}

#[tokio::test]
async fn test_malformed_comment_is_dropped() {
    // テスト項目: フィールド数が合わないコメントは破棄され、接続は継続する
    // given (前提条件):
    let server = TestServer::start(2).await;
    let (mut viewer, _) = TestClient::attach(server.port, "m1").await;

    // when (操作):
    viewer.send("not,a,comment").await;
    viewer.send("").await;
    viewer.send(COMMENT).await;

    // then (期待する結果):
    let broadcast = viewer.recv().await.unwrap();
    assert!(broadcast.contains("<value>Hello</value>"));
    drop(viewer);
    server.wait_for_stored_comments("m1", 1).await;
}

#[tokio::test]
async fn test_control_characters_do_not_lose_history() {
    // テスト項目: 制御文字を含むコメントを送っても配信は XML として読め、保存済みの履歴も失われない
    // given (前提条件):
    let server = TestServer::start(2).await;
    let (mut alice, _) = TestClient::attach(server.port, "m1").await;
    alice.send(COMMENT).await;
    alice.recv().await.unwrap();

    // when (操作):
    alice
        .send("u1,STUDENT,subscribe,13.00,\u{1}bell,SHARE,live,ALL,,30,100")
        .await;

    // then (期待する結果): 配信フレームは XML として解釈できる
    let broadcast = alice.recv().await.unwrap();
    let data = Element::parse(broadcast.as_bytes()).expect("Broadcast is not XML");
    let comment = data.get_child("comment").unwrap();
    assert_eq!(field(comment, "message", "value"), "\u{FFFD}bell");

    // then (期待する結果): 再接続しても両方のコメントが残っている
    drop(alice);
    server.wait_for_stored_comments("m1", 2).await;
    let (_bob, snapshot) = TestClient::attach(server.port, "m1").await;
    let values: Vec<String> = comment_elements(&snapshot)
        .into_iter()
        .map(|comment| field(comment, "message", "value"))
        .collect();
    assert_eq!(values, vec!["Hello".to_string(), "\u{FFFD}bell".to_string()]);
}

#[tokio::test]
async fn test_idle_viewer_is_disconnected() {
    // テスト項目: 無通信の視聴者はタイムアウトで切断され、スロットが解放されチャンネルが保存される
    // given (前提条件):
    let server = TestServer::start_with(1, false, Some(Duration::from_millis(300))).await;
    let (mut viewer, _) = TestClient::attach(server.port, "m1").await;
    viewer.send(COMMENT).await;
    viewer.recv().await.unwrap();

    // when (操作): 何も送らずに待つ
    let closed = viewer.recv().await;

    // then (期待する結果): 接続が閉じられ、コメントが保存される
    assert_eq!(closed, None);
    server.wait_for_stored_comments("m1", 1).await;

    // then (期待する結果): 唯一のスロットが空いて再び接続できる
    let (_next, snapshot) = TestClient::attach(server.port, "m1").await;
    assert_eq!(snapshot.name, "root");
    assert_eq!(comment_elements(&snapshot).len(), 1);
}

#[tokio::test]
async fn test_invalid_movie_id_closes_connection() {
    // テスト項目: ファイル名にできない movie id は応答なしで切断される
    // given (前提条件):
    let server = TestServer::start(2).await;
    let mut client = TestClient::connect(server.port).await;

    // when (操作):
    client.send("../escape").await;

    // then (期待する結果):
    assert_eq!(client.recv().await, None);
    assert!(!server.dir.path().join("../escape.xml").exists());
}

#[tokio::test]
async fn test_shutdown_persists_live_channels() {
    // テスト項目: シャットダウン時に視聴者が残っているチャンネルも保存される
    // given (前提条件):
    let mut server = TestServer::start(2).await;
    let (mut viewer, _) = TestClient::attach(server.port, "m1").await;
    viewer.send(COMMENT).await;
    viewer.recv().await.unwrap();

    // when (操作):
    server.shutdown().await;

    // then (期待する結果): 視聴者は接続したままでもコメントが保存されている
    let bytes = std::fs::read(server.comment_list_path("m1")).unwrap();
    let stored = Element::parse(bytes.as_slice()).unwrap();
    assert_eq!(comment_elements(&stored).len(), 1);
    drop(viewer);
}

#[tokio::test]
async fn test_diagnostics_api() {
    // テスト項目: 診断 API でヘルスチェック・チャンネル一覧・詳細が取得できる
    // given (前提条件):
    let server = TestServer::start_with(4, true, None).await;
    let admin = format!("http://127.0.0.1:{}", server.admin_port.unwrap());
    let (mut viewer, _) = TestClient::attach(server.port, "m1").await;
    viewer.send(COMMENT).await;
    viewer.recv().await.unwrap();
    let client = reqwest::Client::new();

    // when (操作):
    let health: serde_json::Value = client
        .get(format!("{admin}/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let channels: serde_json::Value = client
        .get(format!("{admin}/api/channels"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let detail: serde_json::Value = client
        .get(format!("{admin}/api/channels/m1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let missing = client
        .get(format!("{admin}/api/channels/m2"))
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(health, serde_json::json!({"status": "ok"}));
    assert_eq!(channels[0]["movieId"], "m1");
    assert_eq!(channels[0]["viewers"], 1);
    assert_eq!(channels[0]["comments"], 1);
    assert_eq!(detail["slots"][0]["userId"], 0);
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
