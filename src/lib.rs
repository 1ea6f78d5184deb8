//! Authoritative server for two-player falling-block battles.
//!
//! A [`RoomRegistry`] pairs two websocket participants into a room; starting
//! the room hands a [`Match`] to its own driver task which ticks both boards,
//! applies commands as they arrive and streams snapshots back.

pub mod assets;
pub mod board;
pub mod config;
pub mod connection;
pub mod error;
pub mod grid;
pub mod match_state;
pub mod piece;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod sequence;

pub use board::{Board, Direction, Gravity};
pub use config::{HEIGHT, MatchConfig, WIDTH};
pub use error::{ConfigError, JoinError, StartError};
pub use match_state::{Command, Match, MatchEvent, MatchResult};
pub use piece::{ActivePiece, PieceKind, Rotation};
pub use protocol::{Action, BoardSnapshot, ClientMessage, EndReason, ServerMessage};
pub use registry::{Participant, ParticipantId, RoomId, RoomRegistry};
pub use sequence::{PieceSequence, SequenceCursor};
