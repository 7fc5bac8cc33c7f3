//! Session registry behaviour over real TCP sockets.

use std::sync::Arc;
use std::time::Duration;

use critter_ws::{Message, SessionInfo, SessionRegistry, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;

async fn wait_for_len(registry: &SessionRegistry, expected: usize) {
    for _ in 0..200 {
        if registry.len() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("registry never reached {expected} sessions, has {}", registry.len());
}

/// Accepts `count` connections, tracks each, and echoes until the peer leaves.
async fn spawn_echo_server(registry: Arc<SessionRegistry>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, peer)) = listener.accept().await else {
                return;
            };
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let stream = tokio_tungstenite::accept_async(stream).await.unwrap();
                let mut ws = WebSocket::new(stream, SessionInfo::new("/echo").peer_addr(peer));
                registry.track(ws.session());
                while let Some(Ok(msg)) = ws.recv().await {
                    if let Message::Text(_) = msg {
                        if ws.send(msg).await.is_err() {
                            break;
                        }
                    }
                }
            });
        }
    });

    format!("ws://{addr}/echo")
}

#[tokio::test]
async fn test_sessions_tracked_while_open() {
    let registry = Arc::new(SessionRegistry::new());
    let url = spawn_echo_server(Arc::clone(&registry)).await;

    let (mut first, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    let (mut second, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();

    first.send(tungstenite::Message::text("one")).await.unwrap();
    second.send(tungstenite::Message::text("two")).await.unwrap();
    assert_eq!(first.next().await.unwrap().unwrap().to_text().unwrap(), "one");
    assert_eq!(second.next().await.unwrap().unwrap().to_text().unwrap(), "two");

    wait_for_len(&registry, 2).await;
    let snapshot = registry.snapshot();
    assert!(snapshot.iter().all(|s| s.path() == "/echo" && s.peer_addr().is_some()));

    first.close(None).await.unwrap();
    wait_for_len(&registry, 1).await;

    drop(second);
    wait_for_len(&registry, 0).await;

    // The snapshot taken earlier still holds both sessions.
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.iter().all(|s| s.is_closed()));
}

#[tokio::test]
async fn test_broadcast_through_snapshot() {
    let registry = Arc::new(SessionRegistry::new());
    let url = spawn_echo_server(Arc::clone(&registry)).await;

    let mut clients = Vec::new();
    for _ in 0..3 {
        let (client, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
        clients.push(client);
    }
    wait_for_len(&registry, 3).await;

    for session in registry.snapshot() {
        session.send_text("hello all").await.unwrap();
    }

    for client in &mut clients {
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.to_text().unwrap(), "hello all");
    }
}
