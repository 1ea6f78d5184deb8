use std::path::PathBuf;

use thiserror::Error;

use crate::registry::RoomId;

/// Why a `joinRoom` was turned down. The display text is what the requester
/// sees in `joinError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("room {0} does not exist")]
    NotFound(RoomId),
    #[error("room {0} is full")]
    Full(RoomId),
    #[error("room {0} has already started")]
    AlreadyStarted(RoomId),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StartError {
    #[error("room {0} does not exist")]
    NotFound(RoomId),
    #[error("requester is not in room {0}")]
    NotParticipant(RoomId),
    #[error("room {room} needs two participants, has {count}")]
    NotEnoughPlayers { room: RoomId, count: usize },
    #[error("room {0} has already started")]
    AlreadyStarted(RoomId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid match config: {0}")]
    Invalid(&'static str),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
