use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::MatchConfig;
use crate::error::{JoinError, StartError};
use crate::match_state::Match;
use crate::protocol::{Action, ParticipantInfo, ServerMessage};
use crate::room::{self, RoomHandle};

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ROOM_CODE_LEN: usize = 6;
/// Messages buffered per connection before new ones are dropped. A little
/// over ten seconds of state frames at the default tick.
pub const OUTBOX_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn random<R: Rng>(rng: &mut R) -> Self {
        let code = (0..ROOM_CODE_LEN)
            .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
            .collect();
        RoomId(code)
    }
}

impl From<&str> for RoomId {
    fn from(code: &str) -> Self {
        RoomId(code.to_string())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one connection for as long as it stays open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type Outbox = mpsc::Sender<ServerMessage>;

#[derive(Clone, Debug)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    outbox: Outbox,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>, outbox: Outbox) -> Self {
        Self {
            id,
            name: name.into(),
            outbox,
        }
    }

    /// Fire and forget. A closed connection drops the message, and so does
    /// one that has stopped reading and let its outbox fill up.
    pub fn send(&self, msg: ServerMessage) {
        match self.outbox.try_send(msg) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(ServerMessage::GameState { .. })) => {
                debug!(participant = %self.id, "outbox full, state frame dropped");
            }
            Err(TrySendError::Full(msg)) => {
                warn!(participant = %self.id, ?msg, "outbox full, message dropped");
            }
        }
    }
}

enum Phase {
    Lobby,
    Running(RoomHandle),
}

struct Room {
    participants: Vec<Participant>,
    phase: Phase,
}

impl Room {
    fn roster(&self) -> Vec<ParticipantInfo> {
        self.participants
            .iter()
            .enumerate()
            .map(|(idx, p)| ParticipantInfo {
                id: p.id,
                name: p.name.clone(),
                is_creator: idx == 0,
            })
            .collect()
    }

    fn side_of(&self, participant: ParticipantId) -> Option<usize> {
        self.participants.iter().position(|p| p.id == participant)
    }

    fn broadcast(&self, msg: ServerMessage) {
        for p in &self.participants {
            p.send(msg.clone());
        }
    }
}

/// Process-wide room table. The lock is held only while the table itself
/// changes; running rooms tick on their own tasks.
pub struct RoomRegistry {
    config: MatchConfig,
    rooms: Mutex<HashMap<RoomId, Room>>,
}

impl RoomRegistry {
    pub fn new(config: MatchConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            rooms: Mutex::new(HashMap::new()),
        })
    }

    pub async fn create(&self, creator: Participant) -> RoomId {
        let mut rooms = self.rooms.lock().await;
        let mut rng = rand::thread_rng();
        let room_id = loop {
            let candidate = RoomId::random(&mut rng);
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        info!(room = %room_id, creator = %creator.id, name = %creator.name, "room created");
        creator.send(ServerMessage::RoomCreated {
            room_id: room_id.clone(),
            participant_id: creator.id,
        });
        rooms.insert(
            room_id.clone(),
            Room {
                participants: vec![creator],
                phase: Phase::Lobby,
            },
        );
        room_id
    }

    pub async fn join(&self, room_id: &RoomId, participant: Participant) -> Result<(), JoinError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| JoinError::NotFound(room_id.clone()))?;
        if room.side_of(participant.id).is_some() {
            // Already seated: answer with the current roster and change nothing.
            participant.send(ServerMessage::PlayerJoined {
                participants: room.roster(),
            });
            return Ok(());
        }
        if room.participants.len() >= 2 {
            return Err(JoinError::Full(room_id.clone()));
        }
        if matches!(room.phase, Phase::Running(_)) {
            return Err(JoinError::AlreadyStarted(room_id.clone()));
        }
        info!(room = %room_id, participant = %participant.id, name = %participant.name, "joined room");
        room.participants.push(participant);
        room.broadcast(ServerMessage::PlayerJoined {
            participants: room.roster(),
        });
        Ok(())
    }

    /// Builds the match and hands it to a fresh room driver. Both
    /// participants get `gameStart` and an initial `gameState` before the
    /// first tick.
    pub async fn start(
        self: &Arc<Self>,
        room_id: &RoomId,
        requester: ParticipantId,
    ) -> Result<(), StartError> {
        let mut rooms = self.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| StartError::NotFound(room_id.clone()))?;
        if room.side_of(requester).is_none() {
            return Err(StartError::NotParticipant(room_id.clone()));
        }
        if matches!(room.phase, Phase::Running(_)) {
            return Err(StartError::AlreadyStarted(room_id.clone()));
        }
        let seats: [Participant; 2] = match room.participants.as_slice() {
            [a, b] => [a.clone(), b.clone()],
            others => {
                return Err(StartError::NotEnoughPlayers {
                    room: room_id.clone(),
                    count: others.len(),
                });
            }
        };

        let seed = self.config.seed.unwrap_or_else(rand::random);
        let game = Match::start(self.config.clone(), seed, Instant::now());
        room.broadcast(ServerMessage::GameStart {
            participants: room.roster(),
            start_timestamp: unix_millis(),
        });
        room::send_state(&seats, &game.snapshot());

        info!(room = %room_id, seed, "match started");
        let handle = room::spawn(
            Arc::clone(self),
            room_id.clone(),
            seats,
            game,
            self.config.tick_interval(),
        );
        room.phase = Phase::Running(handle);
        Ok(())
    }

    /// Forwards a player's action to their room. Anything that does not
    /// belong to a running match is dropped.
    pub async fn dispatch(&self, room_id: &RoomId, participant: ParticipantId, action: Action) {
        let rooms = self.rooms.lock().await;
        let Some(room) = rooms.get(room_id) else {
            debug!(room = %room_id, participant = %participant, "input for unknown room ignored");
            return;
        };
        let Some(side) = room.side_of(participant) else {
            debug!(room = %room_id, participant = %participant, "input from non-participant ignored");
            return;
        };
        match &room.phase {
            Phase::Running(handle) => handle.send(side, action.into()),
            Phase::Lobby => {
                debug!(room = %room_id, participant = %participant, "input before start ignored");
            }
        }
    }

    /// Leave or disconnect. A running match is torn down on the spot and
    /// the other participant told so; an empty room is discarded.
    pub async fn remove_participant(&self, room_id: &RoomId, participant: ParticipantId) {
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        let Some(side) = room.side_of(participant) else {
            return;
        };
        room.participants.remove(side);

        if matches!(room.phase, Phase::Running(_)) {
            let Some(mut room) = rooms.remove(room_id) else {
                return;
            };
            drop(rooms);
            if let Phase::Running(handle) = std::mem::replace(&mut room.phase, Phase::Lobby) {
                handle.stop().await;
            }
            info!(room = %room_id, participant = %participant, "participant lost mid-match, room torn down");
            room.broadcast(ServerMessage::OpponentDisconnected);
            return;
        }

        if room.participants.is_empty() {
            rooms.remove(room_id);
            info!(room = %room_id, "empty room discarded");
        } else {
            info!(room = %room_id, participant = %participant, "participant left lobby");
            room.broadcast(ServerMessage::OpponentDisconnected);
        }
    }

    /// Removes `participant` from every room it sits in.
    pub async fn disconnect(&self, participant: ParticipantId) {
        let room_ids: Vec<RoomId> = {
            let rooms = self.rooms.lock().await;
            rooms
                .iter()
                .filter(|(_, room)| room.side_of(participant).is_some())
                .map(|(id, _)| id.clone())
                .collect()
        };
        for room_id in room_ids {
            self.remove_participant(&room_id, participant).await;
        }
    }

    /// Called by a room driver once its match has a result. `false` means
    /// the room was already torn down and the result must not be announced.
    pub(crate) async fn retire(&self, room_id: &RoomId) -> bool {
        let mut rooms = self.rooms.lock().await;
        match rooms.get(room_id) {
            Some(room) if matches!(room.phase, Phase::Running(_)) => {
                rooms.remove(room_id);
                info!(room = %room_id, "room retired");
                true
            }
            _ => false,
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn roster(&self, room_id: &RoomId) -> Option<Vec<ParticipantInfo>> {
        self.rooms.lock().await.get(room_id).map(Room::roster)
    }

    pub async fn is_running(&self, room_id: &RoomId) -> bool {
        self.rooms
            .lock()
            .await
            .get(room_id)
            .is_some_and(|room| matches!(room.phase, Phase::Running(_)))
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
