use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::match_state::{Command, Match, MatchEvent, MatchResult};
use crate::protocol::{BoardSnapshot, ServerMessage};
use crate::registry::{Participant, RoomId, RoomRegistry};

#[derive(Debug)]
pub enum RoomInput {
    Command { side: usize, command: Command },
}

/// The registry's grip on a running room. Dropping it does not stop the
/// driver; `stop` does.
#[derive(Debug)]
pub struct RoomHandle {
    inputs: mpsc::UnboundedSender<RoomInput>,
    driver: JoinHandle<()>,
}

impl RoomHandle {
    pub fn send(&self, side: usize, command: Command) {
        let _ = self.inputs.send(RoomInput::Command { side, command });
    }

    /// Aborts the driver and waits until it can no longer emit anything.
    pub async fn stop(self) {
        self.driver.abort();
        let _ = self.driver.await;
    }
}

pub(crate) fn spawn(
    registry: Arc<RoomRegistry>,
    room_id: RoomId,
    seats: [Participant; 2],
    game: Match,
    tick: Duration,
) -> RoomHandle {
    let (inputs, rx) = mpsc::unbounded_channel();
    let driver = tokio::spawn(run(registry, room_id, seats, game, tick, rx));
    RoomHandle { inputs, driver }
}

/// Each seat sees its own board first.
pub(crate) fn send_state(seats: &[Participant; 2], boards: &[BoardSnapshot; 2]) {
    for (side, seat) in seats.iter().enumerate() {
        seat.send(ServerMessage::GameState {
            my_board: boards[side].clone(),
            opponent_board: boards[1 - side].clone(),
        });
    }
}

/// The room's single sequence point: ticks and player commands are handled
/// one at a time on this task.
async fn run(
    registry: Arc<RoomRegistry>,
    room_id: RoomId,
    seats: [Participant; 2],
    mut game: Match,
    tick: Duration,
    mut inputs: mpsc::UnboundedReceiver<RoomInput>,
) {
    let mut ticker = time::interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(room = %room_id, seed = game.seed(), "room driver running");

    let result = loop {
        tokio::select! {
            now = ticker.tick() => {
                let mut ended = None;
                for event in game.tick(now) {
                    match event {
                        MatchEvent::State(boards) => send_state(&seats, &boards),
                        MatchEvent::Ended(result) => ended = Some(result),
                    }
                }
                if let Some(result) = ended {
                    break result;
                }
            }
            input = inputs.recv() => match input {
                Some(RoomInput::Command { side, command }) => {
                    if let Some(result) = game.apply(side, command) {
                        send_state(&seats, &game.snapshot());
                        break result;
                    }
                }
                None => {
                    debug!(room = %room_id, "room inputs closed");
                    return;
                }
            },
        }
    };

    finish(&registry, &room_id, &seats, result).await;
}

async fn finish(
    registry: &RoomRegistry,
    room_id: &RoomId,
    seats: &[Participant; 2],
    result: MatchResult,
) {
    // Only announce if the room was still ours to retire; a disconnect may
    // have torn it down first.
    if !registry.retire(room_id).await {
        return;
    }
    let winner_id = seats[result.winner].id;
    info!(room = %room_id, winner = %winner_id, reason = ?result.reason, "match ended");
    for seat in seats {
        seat.send(ServerMessage::GameEnded {
            winner_id,
            reason: result.reason,
        });
    }
}
