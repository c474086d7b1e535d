//! Integration Tests for the Realtime Channel
//!
//! Runs the channel against a local in-process websocket server and
//! exercises the full lifecycle: connect, event dispatch, folder-intent
//! replay, reconnect suppression and heartbeat.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

use livesync::realtime::{
    ChannelConfig, ConnectionStatus, FileSystemEventKind, RealtimeChannel, WILDCARD,
};
use livesync::{CacheKeyGenerator, MemoryCache};

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

fn test_config(port: u16) -> ChannelConfig {
    ChannelConfig {
        url: format!("ws://127.0.0.1:{port}/api/ws"),
        base_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(400),
        max_reconnect_attempts: 5,
        heartbeat_interval: Duration::from_secs(30),
    }
}

const UPLOAD_FRAME: &str =
    r#"{"type":"upload","folderId":7,"message":"new file","timestamp":1724580000000}"#;

// == Connect & Dispatch ==

#[tokio::test]
async fn test_connect_receive_and_dispatch() {
    init_tracing();
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(UPLOAD_FRAME.to_string())).await.unwrap();
        // Stay open until the client closes
        while let Some(Ok(_)) = ws.next().await {}
    });

    let channel = RealtimeChannel::new(test_config(port)).unwrap();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    channel.add_event_listener("upload", move |event| {
        event_tx.send(event.clone()).ok();
        Ok(())
    });

    channel.connect();

    let event = timeout(Duration::from_secs(2), event_rx.recv())
        .await
        .expect("event not dispatched in time")
        .unwrap();
    assert_eq!(event.kind, FileSystemEventKind::Upload);
    assert_eq!(event.folder_id, Some(7));

    assert!(channel.is_connected());
    assert_eq!(
        channel.last_event().unwrap().kind,
        FileSystemEventKind::Upload
    );

    channel.disconnect();
    assert_eq!(channel.status(), ConnectionStatus::Disconnected);
    server.abort();
}

// == Folder Intent Replay ==

#[tokio::test]
async fn test_folder_intent_replayed_after_reconnect() {
    init_tracing();
    let (listener, port) = bind().await;
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<String>();

    let server = tokio::spawn(async move {
        // First session: read the explicit set_folder, then drop the
        // socket without a close handshake
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                frame_tx.send(format!("s1:{text}")).unwrap();
                break;
            }
        }
        drop(ws);

        // Second session: the client must replay the remembered intent
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                frame_tx.send(format!("s2:{text}")).unwrap();
            }
        }
    });

    let channel = RealtimeChannel::new(test_config(port)).unwrap();
    let mut status = channel.subscribe_status();
    channel.connect();

    timeout(
        Duration::from_secs(2),
        status.wait_for(|s| *s == ConnectionStatus::Connected),
    )
    .await
    .expect("never connected")
    .unwrap();

    channel.set_current_folder(Some(42));

    let first = timeout(Duration::from_secs(2), frame_rx.recv())
        .await
        .expect("explicit set_folder not received")
        .unwrap();
    assert_eq!(first, r#"s1:{"type":"set_folder","folderId":42}"#);

    // After the abrupt drop the channel reconnects on its own and
    // restates the intent exactly once
    let second = timeout(Duration::from_secs(3), frame_rx.recv())
        .await
        .expect("replayed set_folder not received")
        .unwrap();
    assert_eq!(second, r#"s2:{"type":"set_folder","folderId":42}"#);

    assert!(
        timeout(Duration::from_millis(300), frame_rx.recv()).await.is_err(),
        "intent must not be replayed twice"
    );

    channel.disconnect();
    server.abort();
}

// == Normal Closure ==

#[tokio::test]
async fn test_normal_close_does_not_reconnect() {
    init_tracing();
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "done".into(),
        }))
        .await
        .unwrap();
        while let Some(Ok(_)) = ws.next().await {}

        // Code 1000 must not trigger a reconnect
        let second = timeout(Duration::from_millis(500), listener.accept()).await;
        assert!(second.is_err(), "client reconnected after a normal close");
    });

    let channel = RealtimeChannel::new(test_config(port)).unwrap();
    let mut status = channel.subscribe_status();
    channel.connect();

    timeout(
        Duration::from_secs(2),
        status.wait_for(|s| *s == ConnectionStatus::Disconnected),
    )
    .await
    .expect("never settled disconnected")
    .unwrap();

    server.await.unwrap();
}

// == Manual Disconnect Cancels Pending Reconnect ==

#[tokio::test]
async fn test_disconnect_cancels_pending_reconnect() {
    init_tracing();
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        drop(ws);

        // The reconnect timer was pending when disconnect() ran; it must
        // check cancellation at fire time and never dial
        let second = timeout(Duration::from_millis(700), listener.accept()).await;
        assert!(second.is_err(), "cancelled reconnect still dialed");
    });

    let config = ChannelConfig {
        base_delay: Duration::from_millis(300),
        ..test_config(port)
    };
    let channel = RealtimeChannel::new(config).unwrap();
    let mut status = channel.subscribe_status();
    channel.connect();

    // Wait out connect -> abnormal drop -> disconnected
    timeout(
        Duration::from_secs(2),
        status.wait_for(|s| *s == ConnectionStatus::Connected),
    )
    .await
    .expect("never connected")
    .unwrap();
    timeout(
        Duration::from_secs(2),
        status.wait_for(|s| *s == ConnectionStatus::Disconnected),
    )
    .await
    .expect("never dropped")
    .unwrap();

    // Backoff timer (300ms) is now pending
    channel.disconnect();

    server.await.unwrap();
    assert_eq!(channel.status(), ConnectionStatus::Disconnected);
}

// == Disconnect During Handshake ==

#[tokio::test]
async fn test_disconnect_during_handshake_never_connects() {
    init_tracing();
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        // Hold the handshake open so disconnect() lands while the
        // session is still being established
        tokio::time::sleep(Duration::from_millis(200)).await;
        if let Ok(mut ws) = accept_async(stream).await {
            let _ = ws.next().await;
        }

        // The cancelled session must not dial again either
        let second = timeout(Duration::from_millis(500), listener.accept()).await;
        assert!(second.is_err(), "disposed channel reconnected");
    });

    let channel = RealtimeChannel::new(test_config(port)).unwrap();
    channel.connect();
    tokio::time::sleep(Duration::from_millis(50)).await;
    channel.disconnect();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(channel.status(), ConnectionStatus::Disconnected);
    assert!(!channel.is_connected());

    server.await.unwrap();
}

// == Attempt Cap ==

#[tokio::test]
async fn test_reconnect_attempts_are_capped() {
    init_tracing();
    let (listener, port) = bind().await;

    // One good session, then the listener disappears entirely so every
    // retry is refused
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        drop(ws);
        drop(listener);
    });

    let config = ChannelConfig {
        base_delay: Duration::from_millis(30),
        max_reconnect_attempts: 3,
        ..test_config(port)
    };
    let channel = RealtimeChannel::new(config).unwrap();
    let mut status = channel.subscribe_status();
    channel.connect();

    timeout(
        Duration::from_secs(2),
        status.wait_for(|s| *s == ConnectionStatus::Connected),
    )
    .await
    .expect("never connected")
    .unwrap();
    server.await.unwrap();

    // Delays 30 + 60 + 120 ms, then the channel gives up and stays put
    // until an explicit connect()
    tokio::time::sleep(Duration::from_millis(800)).await;
    let settled = channel.status();
    assert!(
        settled == ConnectionStatus::Error || settled == ConnectionStatus::Disconnected,
        "unexpected status after exhausting retries: {settled:?}"
    );

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(channel.status(), settled, "channel kept retrying past the cap");
}

// == Heartbeat ==

#[tokio::test]
async fn test_heartbeat_ping_sent_at_interval() {
    init_tracing();
    let (listener, port) = bind().await;
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<String>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                frame_tx.send(text).unwrap();
            }
        }
    });

    let config = ChannelConfig {
        heartbeat_interval: Duration::from_millis(100),
        ..test_config(port)
    };
    let channel = RealtimeChannel::new(config).unwrap();
    channel.connect();

    let ping = timeout(Duration::from_secs(2), frame_rx.recv())
        .await
        .expect("no heartbeat received")
        .unwrap();
    assert_eq!(ping, r#"{"type":"ping"}"#);

    channel.disconnect();
    server.abort();
}

// == Cache Invalidation Wiring ==

#[tokio::test]
async fn test_push_event_invalidates_cache_entry() {
    init_tracing();
    let (listener, port) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(UPLOAD_FRAME.to_string())).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    // Composition-root wiring: a wildcard listener drops the cached
    // listing for the folder named by the event
    let cache = Arc::new(Mutex::new(MemoryCache::<String>::new(
        100,
        Duration::from_secs(300),
    )));
    {
        let mut cache = cache.lock().unwrap();
        cache.set(CacheKeyGenerator::files(Some(7), &[]), "stale listing".to_string(), None);
        cache.set(CacheKeyGenerator::files(Some(8), &[]), "other folder".to_string(), None);
    }

    let channel = RealtimeChannel::new(test_config(port)).unwrap();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let cache_for_events = cache.clone();
    channel.add_event_listener(WILDCARD, move |event| {
        let key = CacheKeyGenerator::files(event.folder_id, &[]);
        cache_for_events.lock().unwrap().delete(&key);
        done_tx.send(()).ok();
        Ok(())
    });

    channel.connect();
    timeout(Duration::from_secs(2), done_rx.recv())
        .await
        .expect("event never arrived")
        .unwrap();

    {
        let mut cache = cache.lock().unwrap();
        assert_eq!(cache.get("files:7"), None);
        assert_eq!(cache.get("files:8"), Some("other folder".to_string()));
    }

    channel.disconnect();
    server.abort();
}
