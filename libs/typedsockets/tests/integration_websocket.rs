//! End-to-end tests over the tokio-tungstenite transport
//!
//! These run on real time against a loopback listener on an ephemeral port.

mod common;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use typedsockets::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Chat {
    from: String,
    text: String,
}

fn loopback(path: Option<&str>) -> Arc<TungsteniteTransport> {
    loopback_with(ListenOptions {
        path: path.map(str::to_owned),
        ..ListenOptions::default()
    })
}

fn loopback_with(options: ListenOptions) -> Arc<TungsteniteTransport> {
    Arc::new(TungsteniteTransport::new(ListenOptions {
        host: "127.0.0.1".into(),
        port: 0,
        ..options
    }))
}

/// Block on the crossbeam receiver without stalling the runtime
async fn next_event(
    events: &crossbeam_channel::Receiver<ServerEvent<Chat, Chat>>,
) -> ServerEvent<Chat, Chat> {
    let events = events.clone();
    tokio::task::spawn_blocking(move || events.recv_timeout(Duration::from_secs(5)))
        .await
        .unwrap()
        .expect("missing event")
}

async fn next_text<S>(stream: &mut S) -> String
where
    S: futures::Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    loop {
        let frame = timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("read error");

        if let Message::Text(text) = frame {
            return text;
        }
    }
}

#[tokio::test]
async fn test_json_echo_and_broadcast() {
    verbose_println!("Testing JSON round trip over loopback...");

    let transport = loopback(Some("/chat"));
    let server = builder()
        .json::<Chat, Chat>()
        .on_message(|client, chat: &Chat| {
            client.send(&Chat {
                from: "server".into(),
                text: chat.text.to_uppercase(),
            })
        })
        .build(Arc::clone(&transport))
        .await
        .unwrap();
    let events = server.subscribe();

    let addr = transport.local_addr().unwrap();
    let (mut ws, _) = connect_async(format!("ws://{}/chat", addr)).await.unwrap();

    ws.send(Message::Text(r#"{"from":"alice","text":"hi"}"#.into()))
        .await
        .unwrap();

    let reply: Chat = serde_json::from_str(&next_text(&mut ws).await).unwrap();
    assert_eq!(
        reply,
        Chat {
            from: "server".into(),
            text: "HI".into()
        }
    );

    // Garbage is dropped, the socket stays usable
    ws.send(Message::Text("not json".into())).await.unwrap();
    ws.send(Message::Binary(br#"{"from":"alice","text":"bin"}"#.to_vec()))
        .await
        .unwrap();
    let reply: Chat = serde_json::from_str(&next_text(&mut ws).await).unwrap();
    assert_eq!(reply.text, "BIN");

    let sent = server.send_to_all(&Chat {
        from: "server".into(),
        text: "everyone".into(),
    });
    assert_eq!(sent, 1);
    let broadcast: Chat = serde_json::from_str(&next_text(&mut ws).await).unwrap();
    assert_eq!(broadcast.text, "everyone");

    ws.close(None).await.unwrap();

    // Connection, two messages, disconnection
    let mut seen = Vec::new();
    while seen.len() < 4 {
        seen.push(next_event(&events).await);
    }

    assert!(matches!(seen[0], ServerEvent::Connection(_)));
    assert!(matches!(&seen[1], ServerEvent::Message(_, chat) if chat.text == "hi"));
    assert!(matches!(&seen[2], ServerEvent::Message(_, chat) if chat.text == "bin"));
    assert!(matches!(seen[3], ServerEvent::Disconnection(_)));
    assert_eq!(server.metrics().decode_failures, 1);

    server.close();
    timeout(Duration::from_secs(5), server.join())
        .await
        .expect("server loop did not finish")
        .unwrap();
}

#[tokio::test]
async fn test_wrong_path_rejected() {
    let transport = loopback(Some("/ws"));
    let server = builder()
        .json::<Chat, Chat>()
        .build(Arc::clone(&transport))
        .await
        .unwrap();

    let addr = transport.local_addr().unwrap();
    let result = connect_async(format!("ws://{}/other", addr)).await;

    assert!(result.is_err());
    assert_eq!(server.client_count(), 0);
}

#[tokio::test]
async fn test_unresponsive_client_is_terminated() {
    verbose_println!("Testing heartbeat over loopback...");

    let transport = loopback(None);
    let server = builder()
        .json::<Chat, Chat>()
        .heartbeat_interval(Duration::from_millis(100))
        // Pongs are answered automatically by the client library, so only
        // application traffic counts here
        .pong_resets_liveness(false)
        .build(Arc::clone(&transport))
        .await
        .unwrap();
    let events = server.subscribe();

    let addr = transport.local_addr().unwrap();
    let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

    // Drive the client so pings get answered; the stream ends once terminated
    let reader = tokio::spawn(async move { while let Some(Ok(_)) = ws.next().await {} });

    timeout(Duration::from_secs(5), reader)
        .await
        .expect("client was not disconnected")
        .unwrap();

    let disconnected = tokio::task::spawn_blocking(move || {
        events
            .iter()
            .any(|event| matches!(event, ServerEvent::Disconnection(_)))
    });
    assert!(timeout(Duration::from_secs(5), disconnected)
        .await
        .unwrap()
        .unwrap());
    assert!(server.metrics().terminations >= 1);
}

#[tokio::test]
async fn test_pong_keeps_quiet_client_connected() {
    let transport = loopback(None);
    let server = builder()
        .json::<Chat, Chat>()
        .heartbeat_interval(Duration::from_millis(100))
        .build(Arc::clone(&transport))
        .await
        .unwrap();

    let addr = transport.local_addr().unwrap();
    let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    let reader = tokio::spawn(async move { while let Some(Ok(_)) = ws.next().await {} });

    tokio::time::sleep(Duration::from_millis(550)).await;

    assert_eq!(server.client_count(), 1);
    assert!(server.metrics().probes_sent >= 3);
    assert_eq!(server.metrics().terminations, 0);
    reader.abort();
}

#[tokio::test]
async fn test_close_gives_up_on_silent_peer() {
    verbose_println!("Testing close timeout over loopback...");

    let close_timeout = Duration::from_millis(300);
    let transport = loopback_with(ListenOptions {
        close_timeout_ms: close_timeout.as_millis() as u64,
        ..ListenOptions::default()
    });
    let server = builder()
        .json::<Chat, Chat>()
        .build(Arc::clone(&transport))
        .await
        .unwrap();
    let events = server.subscribe();

    let addr = transport.local_addr().unwrap();
    // Never polled, so the close frame is never answered
    let (_ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

    let ServerEvent::Connection(client) = next_event(&events).await else {
        panic!("expected a connection event");
    };

    let started = tokio::time::Instant::now();
    client.close();

    let event = next_event(&events).await;
    assert!(matches!(event, ServerEvent::Disconnection(c) if c.id() == client.id()));
    assert!(started.elapsed() >= close_timeout);
    assert_eq!(server.client_count(), 0);
}

#[tokio::test]
async fn test_close_completes_with_answering_peer() {
    let transport = loopback(None);
    let server = builder()
        .json::<Chat, Chat>()
        .build(Arc::clone(&transport))
        .await
        .unwrap();
    let events = server.subscribe();

    let addr = transport.local_addr().unwrap();
    let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    let reader = tokio::spawn(async move { while let Some(Ok(_)) = ws.next().await {} });

    let ServerEvent::Connection(client) = next_event(&events).await else {
        panic!("expected a connection event");
    };
    client.close();

    // Well inside the default 30s close timeout
    assert!(matches!(next_event(&events).await, ServerEvent::Disconnection(_)));
    timeout(Duration::from_secs(5), reader)
        .await
        .expect("client stream did not end")
        .unwrap();
}

#[tokio::test]
async fn test_oversized_message_drops_connection() {
    let transport = loopback_with(ListenOptions {
        max_message_size: Some(64),
        max_frame_size: Some(64),
        ..ListenOptions::default()
    });
    let server = builder()
        .json::<Chat, Chat>()
        .build(Arc::clone(&transport))
        .await
        .unwrap();
    let events = server.subscribe();

    let addr = transport.local_addr().unwrap();
    let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    assert!(matches!(next_event(&events).await, ServerEvent::Connection(_)));

    let oversized = serde_json::to_string(&Chat {
        from: "alice".into(),
        text: "x".repeat(256),
    })
    .unwrap();
    ws.send(Message::Text(oversized)).await.unwrap();

    assert!(matches!(next_event(&events).await, ServerEvent::Disconnection(_)));
    assert_eq!(server.metrics().messages_received, 0);
    assert_eq!(server.client_count(), 0);
}
