use tokio::time::Instant;
use tracing::info;

use crate::board::{Board, Direction, Gravity};
use crate::config::MatchConfig;
use crate::protocol::{Action, BoardSnapshot, EndReason};
use crate::sequence::PieceSequence;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Shift(Direction),
    Rotate,
    SoftDrop(bool),
    HardDrop,
}

impl From<Action> for Command {
    fn from(action: Action) -> Self {
        match action {
            Action::Left => Command::Shift(Direction::Left),
            Action::Right => Command::Shift(Direction::Right),
            Action::Rotate => Command::Rotate,
            Action::Drop => Command::HardDrop,
            Action::Down => Command::SoftDrop(true),
            Action::DownRelease => Command::SoftDrop(false),
        }
    }
}

/// `winner` is a board slot: 0 for the room creator, 1 for the joiner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchResult {
    pub winner: usize,
    pub reason: EndReason,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchEvent {
    State([BoardSnapshot; 2]),
    Ended(MatchResult),
}

/// Authoritative two-board match. Owns both boards and the shared piece
/// sequence; nothing else mutates them.
pub struct Match {
    config: MatchConfig,
    boards: [Board; 2],
    sequence: PieceSequence,
    started_at: Instant,
    last_tick: Instant,
    result: Option<MatchResult>,
}

fn gap_seed(seed: u64, side: usize) -> u64 {
    (seed ^ (side as u64 + 1)).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl Match {
    pub fn start(config: MatchConfig, seed: u64, now: Instant) -> Self {
        let sequence = PieceSequence::generate(seed, config.sequence_length);
        let mut boards = [
            Board::new(&config, gap_seed(seed, 0)),
            Board::new(&config, gap_seed(seed, 1)),
        ];
        for board in boards.iter_mut() {
            board.spawn_from(&sequence);
        }
        Self {
            config,
            boards,
            sequence,
            started_at: now,
            last_tick: now,
            result: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.result.is_none()
    }

    pub fn result(&self) -> Option<MatchResult> {
        self.result
    }

    pub fn seed(&self) -> u64 {
        self.sequence.seed()
    }

    pub fn sequence(&self) -> &PieceSequence {
        &self.sequence
    }

    pub fn board(&self, side: usize) -> &Board {
        &self.boards[side]
    }

    #[cfg(test)]
    pub(crate) fn board_mut(&mut self, side: usize) -> &mut Board {
        &mut self.boards[side]
    }

    pub fn snapshot(&self) -> [BoardSnapshot; 2] {
        [self.boards[0].snapshot(), self.boards[1].snapshot()]
    }

    /// Advances both drop timers by the wall time since the previous tick,
    /// then checks the time limit. Returns nothing once the match is over.
    pub fn tick(&mut self, now: Instant) -> Vec<MatchEvent> {
        if self.result.is_some() {
            return Vec::new();
        }
        let elapsed = now.saturating_duration_since(self.last_tick).as_millis() as u64;
        self.last_tick = now;

        for side in 0..2 {
            if !self.boards[side].accumulate(elapsed) {
                continue;
            }
            if let Gravity::Locked { lines_cleared } = self.boards[side].step_gravity() {
                self.resolve_lock(side, lines_cleared);
            }
            self.boards[side].reset_drop_timer();
            if self.result.is_some() {
                break;
            }
        }

        let mut events = vec![MatchEvent::State(self.snapshot())];
        if self.result.is_none()
            && now.saturating_duration_since(self.started_at) >= self.config.time_limit()
        {
            let winner = self.time_winner();
            self.finish(winner, EndReason::Time);
        }
        if let Some(result) = self.result {
            events.push(MatchEvent::Ended(result));
        }
        events
    }

    /// Applies one player command immediately. Returns the result if this
    /// command ended the match.
    pub fn apply(&mut self, side: usize, command: Command) -> Option<MatchResult> {
        if self.result.is_some() {
            return None;
        }
        let board = &mut self.boards[side];
        match command {
            Command::Shift(direction) => {
                board.shift(direction);
            }
            Command::Rotate => {
                board.rotate();
            }
            Command::SoftDrop(active) => board.set_soft_drop(active),
            Command::HardDrop => {
                if board.current().is_some() {
                    let lines_cleared = board.hard_drop();
                    self.resolve_lock(side, lines_cleared);
                }
            }
        }
        self.result
    }

    fn resolve_lock(&mut self, side: usize, lines_cleared: usize) {
        let other = 1 - side;
        if lines_cleared > 0 {
            let board = &self.boards[side];
            let attack = board.garbage_yield(lines_cleared, board.combo());
            if attack > 0 {
                self.net_pending_garbage();
                self.boards[other].add_pending_garbage(attack);
            }
        }
        self.boards[side].apply_pending_garbage();

        if self.boards[side].advance_piece(&self.sequence) {
            return;
        }
        if self.boards[side].eliminate() {
            info!(
                seed = self.seed(),
                side,
                lives = self.boards[side].lives(),
                "board topped out, respawning"
            );
            self.boards[side].advance_piece(&self.sequence);
        } else {
            self.finish(other, EndReason::Elimination);
        }
    }

    /// Outstanding garbage on both sides cancels out before any of it lands.
    fn net_pending_garbage(&mut self) {
        let [a, b] = &mut self.boards;
        let cancel = a.pending_garbage().min(b.pending_garbage());
        if cancel > 0 {
            a.cancel_pending_garbage(cancel);
            b.cancel_pending_garbage(cancel);
        }
    }

    /// More lives wins, then strictly more points; a full tie goes to slot 0.
    fn time_winner(&self) -> usize {
        let [a, b] = &self.boards;
        if a.lives() != b.lives() {
            return if a.lives() > b.lives() { 0 } else { 1 };
        }
        if b.score() > a.score() { 1 } else { 0 }
    }

    fn finish(&mut self, winner: usize, reason: EndReason) {
        info!(seed = self.seed(), winner, ?reason, "match finished");
        self.result = Some(MatchResult { winner, reason });
    }
}
