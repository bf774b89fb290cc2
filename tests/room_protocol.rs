//! End-to-end protocol tests: a real listener, real WebSocket clients.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use room_gateway::config::RoomConfig;
use room_gateway::room::EchoRoom;
use room_gateway::server::RoomServer;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);
const QUIET_TIMEOUT: Duration = Duration::from_millis(300);

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let room = Arc::new(EchoRoom::new(&RoomConfig {
        name: "Test Room".to_string(),
        description: "A room for tests.".to_string(),
    }));
    let server = Arc::new(RoomServer::new(room));

    tokio::spawn(async move {
        while let Ok((stream, peer)) = listener.accept().await {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                server.handle_connection(stream, peer).await;
            });
        }
    });

    format!("ws://{}", addr)
}

async fn connect(url: &str, player: Uuid) -> Client {
    let (client, _) = connect_async(format!("{}/room?player={}", url, player))
        .await
        .expect("client failed to connect");
    client
}

async fn next_frame(client: &mut Client) -> WsMessage {
    timeout(RECV_TIMEOUT, client.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended unexpectedly")
        .expect("transport error while reading")
}

async fn next_json(client: &mut Client) -> Value {
    match next_frame(client).await {
        WsMessage::Text(text) => serde_json::from_str(&text).expect("frame was not valid JSON"),
        other => panic!("expected text frame, got {:?}", other),
    }
}

fn assert_ack(value: &Value) {
    assert_eq!(value["type"], "ack");
    assert_eq!(value["payload"]["version"], json!([1, 2]));
}

#[test_log::test(tokio::test)]
async fn test_open_is_acknowledged() {
    let url = spawn_server().await;
    let mut client = connect(&url, Uuid::new_v4()).await;

    let ack = next_json(&mut client).await;
    assert_ack(&ack);
}

#[test_log::test(tokio::test)]
async fn test_ack_reaches_every_session_of_the_peer() {
    let url = spawn_server().await;
    let player = Uuid::new_v4();

    let mut first = connect(&url, player).await;
    assert_ack(&next_json(&mut first).await);

    // A second device for the same player: its ack goes to the whole group.
    let mut second = connect(&url, player).await;
    assert_ack(&next_json(&mut second).await);
    assert_ack(&next_json(&mut first).await);
}

#[test_log::test(tokio::test)]
async fn test_room_reply_is_broadcast_to_the_group() {
    let url = spawn_server().await;
    let player = Uuid::new_v4();

    let mut first = connect(&url, player).await;
    assert_ack(&next_json(&mut first).await);
    let mut second = connect(&url, player).await;
    assert_ack(&next_json(&mut second).await);
    assert_ack(&next_json(&mut first).await);

    first
        .send(WsMessage::Text(
            json!({"type": "room", "payload": {"content": "/look"}}).to_string(),
        ))
        .await
        .unwrap();

    for client in [&mut first, &mut second] {
        let reply = next_json(client).await;
        assert_eq!(reply["type"], "player");
        assert_eq!(reply["payload"]["room"], "Test Room");
        assert_eq!(reply["payload"]["content"]["content"], "/look");
    }
}

#[test_log::test(tokio::test)]
async fn test_sessions_of_different_peers_are_isolated() {
    let url = spawn_server().await;

    let mut first = connect(&url, Uuid::new_v4()).await;
    assert_ack(&next_json(&mut first).await);

    let mut second = connect(&url, Uuid::new_v4()).await;
    assert_ack(&next_json(&mut second).await);

    // Neither the second ack nor this echo should leak across groups.
    second
        .send(WsMessage::Text(
            json!({"type": "room", "payload": {"content": "hello"}}).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(next_json(&mut second).await["type"], "player");

    let nothing = timeout(QUIET_TIMEOUT, first.next()).await;
    assert!(nothing.is_err(), "first client saw another peer's traffic");
}

#[test_log::test(tokio::test)]
async fn test_malformed_message_closes_with_classified_reason() {
    let url = spawn_server().await;
    let mut client = connect(&url, Uuid::new_v4()).await;
    assert_ack(&next_json(&mut client).await);

    client
        .send(WsMessage::Text("this is not a message".to_string()))
        .await
        .unwrap();

    match next_frame(&mut client).await {
        WsMessage::Close(Some(frame)) => {
            assert_eq!(u16::from(frame.code), 1011);
            assert_eq!(frame.reason, "ProtocolError::Decode");
            assert!(frame.reason.len() <= 123);
        }
        other => panic!("expected close frame, got {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn test_one_bad_session_does_not_poison_its_sibling() {
    let url = spawn_server().await;
    let player = Uuid::new_v4();

    let mut healthy = connect(&url, player).await;
    assert_ack(&next_json(&mut healthy).await);
    let mut doomed = connect(&url, player).await;
    assert_ack(&next_json(&mut doomed).await);
    assert_ack(&next_json(&mut healthy).await);

    // Poison the second session: the server closes it and only it.
    doomed
        .send(WsMessage::Text("garbage".to_string()))
        .await
        .unwrap();
    match next_frame(&mut doomed).await {
        WsMessage::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1011),
        other => panic!("expected close frame, got {:?}", other),
    }

    // The healthy sibling still works end to end.
    healthy
        .send(WsMessage::Text(
            json!({"type": "room", "payload": {"content": "still here"}}).to_string(),
        ))
        .await
        .unwrap();
    let reply = next_json(&mut healthy).await;
    assert_eq!(reply["type"], "player");
    assert_eq!(reply["payload"]["content"]["content"], "still here");
}
