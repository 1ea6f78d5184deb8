use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tetris_battle::connection;
use tetris_battle::{MatchConfig, RoomRegistry, ServerMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn boot() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(connection::serve(listener, RoomRegistry::new(MatchConfig::default())));
    format!("ws://{addr}")
}

async fn send(client: &mut Client, json: serde_json::Value) {
    client.send(Message::Text(json.to_string())).await.unwrap();
}

async fn recv(client: &mut Client) -> ServerMessage {
    loop {
        let frame = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("server went quiet")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Skips the steady stream of board updates.
async fn recv_event(client: &mut Client) -> ServerMessage {
    loop {
        match recv(client).await {
            ServerMessage::GameState { .. } => continue,
            other => return other,
        }
    }
}

#[tokio::test]
async fn two_clients_play_until_one_leaves() {
    let url = boot().await;
    let (mut alice, _) = connect_async(url.as_str()).await.unwrap();
    let (mut bob, _) = connect_async(url.as_str()).await.unwrap();

    send(&mut alice, serde_json::json!({"type": "createRoom", "name": "alice"})).await;
    let room_id = match recv(&mut alice).await {
        ServerMessage::RoomCreated { room_id, .. } => room_id,
        other => panic!("unexpected {other:?}"),
    };

    send(
        &mut bob,
        serde_json::json!({"type": "joinRoom", "roomId": "ZZZZZZ", "name": "bob"}),
    )
    .await;
    assert!(matches!(recv(&mut bob).await, ServerMessage::JoinError { .. }));

    send(
        &mut bob,
        serde_json::json!({"type": "joinRoom", "roomId": room_id, "name": "bob"}),
    )
    .await;
    for client in [&mut alice, &mut bob] {
        match recv(client).await {
            ServerMessage::PlayerJoined { participants } => {
                assert_eq!(participants.len(), 2);
                assert!(participants[0].is_creator);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    send(&mut alice, serde_json::json!({"type": "startGame", "roomId": room_id})).await;
    for client in [&mut alice, &mut bob] {
        assert!(matches!(recv(client).await, ServerMessage::GameStart { .. }));
        match recv(client).await {
            ServerMessage::GameState { my_board, opponent_board } => {
                assert!(my_board.current_piece.is_some());
                assert_eq!(my_board.current_piece, opponent_board.current_piece);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    send(
        &mut bob,
        serde_json::json!({"type": "playerInput", "roomId": room_id, "action": "drop"}),
    )
    .await;
    // A state already in flight may predate the drop.
    let mut landed = false;
    for _ in 0..10 {
        if let ServerMessage::GameState { my_board, .. } = recv(&mut bob).await {
            if my_board.grid.iter().flatten().any(|&c| c != 0) {
                landed = true;
                break;
            }
        }
    }
    assert!(landed, "hard drop never reached the grid");

    bob.close(None).await.unwrap();
    assert_eq!(recv_event(&mut alice).await, ServerMessage::OpponentDisconnected);
}
