use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{info, warn};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::{OUTBOX_CAPACITY, Outbox, Participant, ParticipantId, RoomRegistry};

/// Accepts websocket clients forever, one task per connection.
pub async fn serve(listener: TcpListener, registry: Arc<RoomRegistry>) -> anyhow::Result<()> {
    let next_id = AtomicU64::new(1);
    loop {
        let (stream, addr) = listener.accept().await?;
        let id = ParticipantId(next_id.fetch_add(1, Ordering::Relaxed));
        info!(participant = %id, %addr, "connected");
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(e) = handle_conn(stream, id, Arc::clone(&registry)).await {
                warn!(participant = %id, "connection error: {e:?}");
            }
            registry.disconnect(id).await;
            info!(participant = %id, "disconnected");
        });
    }
}

async fn handle_conn(
    stream: TcpStream,
    id: ParticipantId,
    registry: Arc<RoomRegistry>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    let (outbox, mut outbound) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);

    loop {
        tokio::select! {
            Some(msg) = outbound.recv() => {
                let text = serde_json::to_string(&msg)?;
                ws_tx.send(Message::Text(text)).await?;
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(msg) => handle_message(&registry, id, &outbox, msg).await,
                        Err(e) => warn!(participant = %id, "unparsable message: {e}"),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }
    Ok(())
}

async fn handle_message(
    registry: &Arc<RoomRegistry>,
    id: ParticipantId,
    outbox: &Outbox,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::CreateRoom { name } => {
            registry.create(Participant::new(id, name, outbox.clone())).await;
        }
        ClientMessage::JoinRoom { room_id, name } => {
            let participant = Participant::new(id, name, outbox.clone());
            if let Err(e) = registry.join(&room_id, participant).await {
                info!(participant = %id, room = %room_id, "join rejected: {e}");
                let _ = outbox.try_send(ServerMessage::JoinError {
                    message: e.to_string(),
                });
            }
        }
        ClientMessage::StartGame { room_id } => {
            if let Err(e) = registry.start(&room_id, id).await {
                info!(participant = %id, room = %room_id, "start refused: {e}");
            }
        }
        ClientMessage::PlayerInput { room_id, action } => {
            registry.dispatch(&room_id, id, action).await;
        }
        ClientMessage::LeaveRoom { room_id } => {
            registry.remove_participant(&room_id, id).await;
        }
    }
}
