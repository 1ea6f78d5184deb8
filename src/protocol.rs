use serde::{Deserialize, Serialize};

use crate::piece::{PieceKind, Rotation};
use crate::registry::{ParticipantId, RoomId};

/// `playerInput.action` on the wire.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Left,
    Right,
    Rotate,
    /// Hard drop.
    Drop,
    /// Soft drop pressed.
    Down,
    /// Soft drop released.
    DownRelease,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreateRoom { name: String },
    JoinRoom { room_id: RoomId, name: String },
    StartGame { room_id: RoomId },
    PlayerInput { room_id: RoomId, action: Action },
    LeaveRoom { room_id: RoomId },
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    pub name: String,
    pub is_creator: bool,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    Elimination,
    Time,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PieceSnapshot {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub x: i32,
    pub y: i32,
    pub shape: Vec<Vec<u8>>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    /// Row-major from the top; 0 is empty, 1-7 piece colours, 8 garbage.
    pub grid: Vec<Vec<u8>>,
    pub current_piece: Option<PieceSnapshot>,
    pub next_piece: Option<PieceKind>,
    pub score: u32,
    pub lives: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub pending_garbage: u32,
    pub game_over: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    RoomCreated {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
    PlayerJoined {
        participants: Vec<ParticipantInfo>,
    },
    GameStart {
        participants: Vec<ParticipantInfo>,
        start_timestamp: u64,
    },
    GameState {
        my_board: BoardSnapshot,
        opponent_board: BoardSnapshot,
    },
    GameEnded {
        winner_id: ParticipantId,
        reason: EndReason,
    },
    OpponentDisconnected,
    JoinError {
        message: String,
    },
}
