use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::MatchConfig;
use crate::grid::Grid;
use crate::piece::{ActivePiece, PieceKind};
use crate::protocol::{BoardSnapshot, PieceSnapshot};
use crate::sequence::{PieceSequence, SequenceCursor};

const LINE_SCORES: [u32; 5] = [0, 100, 300, 500, 800];
const COMBO_BONUS: u32 = 50;
/// Column offsets tried in order when a rotation collides.
const KICKS: [i32; 5] = [0, -1, 1, -2, 2];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    fn dx(self) -> i32 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gravity {
    Moved,
    Locked { lines_cleared: usize },
}

/// One player's grid and everything that goes with it: pieces, score,
/// lives, combo, incoming garbage and the drop timer.
#[derive(Clone, Debug)]
pub struct Board {
    grid: Grid,
    current: Option<ActivePiece>,
    next: Option<PieceKind>,
    cursor: SequenceCursor,
    score: u32,
    lives: u32,
    combo: u32,
    max_combo: u32,
    pending_garbage: u32,
    game_over: bool,
    drop_timer_ms: u64,
    soft_dropping: bool,
    drop_interval_ms: u64,
    soft_drop_interval_ms: u64,
    combo_multiplier: f64,
    rng: ChaCha8Rng,
}

impl Board {
    /// `gap_seed` drives the garbage gap columns for this board.
    pub fn new(config: &MatchConfig, gap_seed: u64) -> Self {
        Self {
            grid: Grid::new(),
            current: None,
            next: None,
            cursor: SequenceCursor::new(),
            score: 0,
            lives: config.starting_lives,
            combo: 0,
            max_combo: 0,
            pending_garbage: 0,
            game_over: false,
            drop_timer_ms: 0,
            soft_dropping: false,
            drop_interval_ms: config.drop_interval_ms,
            soft_drop_interval_ms: config.soft_drop_interval_ms,
            combo_multiplier: config.combo_multiplier,
            rng: ChaCha8Rng::seed_from_u64(gap_seed),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[cfg(test)]
    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn current(&self) -> Option<&ActivePiece> {
        self.current.as_ref()
    }

    /// Replaces the falling piece without any collision check.
    #[cfg(test)]
    pub(crate) fn set_current(&mut self, piece: ActivePiece) {
        self.current = Some(piece);
    }

    pub fn next(&self) -> Option<PieceKind> {
        self.next
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    #[cfg(test)]
    pub(crate) fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn pending_garbage(&self) -> u32 {
        self.pending_garbage
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn drop_interval_ms(&self) -> u64 {
        if self.soft_dropping {
            self.soft_drop_interval_ms
        } else {
            self.drop_interval_ms
        }
    }

    pub fn collides(&self, piece: &ActivePiece, dx: i32, dy: i32) -> bool {
        self.grid.collides(piece, dx, dy)
    }

    pub fn shift(&mut self, direction: Direction) -> bool {
        let Some(piece) = self.current else {
            return false;
        };
        if self.collides(&piece, direction.dx(), 0) {
            return false;
        }
        self.current = Some(ActivePiece {
            x: piece.x + direction.dx(),
            ..piece
        });
        true
    }

    /// Clockwise quarter turn, kicking sideways if needed. On failure the
    /// piece is left exactly as it was.
    pub fn rotate(&mut self) -> bool {
        let Some(piece) = self.current else {
            return false;
        };
        let rotated = ActivePiece {
            rotation: piece.rotation.rotate_cw(),
            ..piece
        };
        for dx in KICKS {
            if !self.collides(&rotated, dx, 0) {
                self.current = Some(ActivePiece {
                    x: rotated.x + dx,
                    ..rotated
                });
                return true;
            }
        }
        false
    }

    fn try_fall(&mut self) -> bool {
        let Some(piece) = self.current else {
            return false;
        };
        if self.collides(&piece, 0, 1) {
            return false;
        }
        self.current = Some(ActivePiece {
            y: piece.y + 1,
            ..piece
        });
        true
    }

    /// One row down, or lock if the piece is resting on something.
    pub fn step_gravity(&mut self) -> Gravity {
        if self.try_fall() {
            Gravity::Moved
        } else {
            Gravity::Locked {
                lines_cleared: self.lock_piece(),
            }
        }
    }

    pub fn hard_drop(&mut self) -> usize {
        while self.try_fall() {}
        self.lock_piece()
    }

    /// Stamps the current piece and clears rows. Pending garbage is left for
    /// `apply_pending_garbage` so attacks can be netted first.
    pub fn lock_piece(&mut self) -> usize {
        let Some(piece) = self.current.take() else {
            return 0;
        };
        self.grid.stamp(&piece);
        self.clear_lines()
    }

    pub fn clear_lines(&mut self) -> usize {
        let cleared = self.grid.clear_full_rows();
        if cleared > 0 {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
            self.score += self.line_score(cleared);
        } else {
            self.combo = 0;
        }
        cleared
    }

    /// Points for `lines` cleared at the current combo level.
    pub fn line_score(&self, lines: usize) -> u32 {
        let mut points = LINE_SCORES[lines.min(LINE_SCORES.len() - 1)];
        if self.combo > 1 {
            points += (self.combo - 1) * COMBO_BONUS;
        }
        points
    }

    /// Rows of garbage sent to the opponent for a clear.
    pub fn garbage_yield(&self, lines: usize, combo: u32) -> u32 {
        let base = (lines / 2) as u32;
        if base == 0 {
            return 0;
        }
        if combo >= 2 {
            (base as f64 * self.combo_multiplier.powi(combo as i32 - 1)).floor() as u32
        } else {
            base
        }
    }

    pub fn add_pending_garbage(&mut self, rows: u32) {
        self.pending_garbage += rows;
    }

    /// Cancels up to `rows` of incoming garbage; returns how many were cancelled.
    pub fn cancel_pending_garbage(&mut self, rows: u32) -> u32 {
        let cancelled = rows.min(self.pending_garbage);
        self.pending_garbage -= cancelled;
        cancelled
    }

    /// Each row gets its own random gap.
    pub fn receive_garbage(&mut self, rows: u32) {
        for _ in 0..rows {
            self.grid.push_garbage_row(&mut self.rng);
        }
    }

    pub fn apply_pending_garbage(&mut self) {
        if self.pending_garbage > 0 {
            self.receive_garbage(self.pending_garbage);
            self.pending_garbage = 0;
        }
    }

    /// Places the pieces under this board's cursor. `false` means the new
    /// piece is already blocked at its spawn position.
    pub fn spawn_from(&mut self, seq: &PieceSequence) -> bool {
        let piece = ActivePiece::spawn(self.cursor.current(seq));
        self.next = Some(self.cursor.next(seq));
        self.current = Some(piece);
        !self.collides(&piece, 0, 0)
    }

    /// Promotes next to current and draws a new next.
    pub fn advance_piece(&mut self, seq: &PieceSequence) -> bool {
        self.cursor.advance(seq);
        self.spawn_from(seq)
    }

    /// Costs a life and wipes the field. Returns whether the board is still
    /// in the match.
    pub fn eliminate(&mut self) -> bool {
        self.lives = self.lives.saturating_sub(1);
        self.grid = Grid::new();
        self.current = None;
        self.combo = 0;
        self.pending_garbage = 0;
        self.drop_timer_ms = 0;
        self.game_over = self.lives == 0;
        !self.game_over
    }

    pub fn set_soft_drop(&mut self, active: bool) {
        self.soft_dropping = active;
    }

    /// Adds elapsed wall time to the drop timer; true when a gravity step is due.
    pub fn accumulate(&mut self, elapsed_ms: u64) -> bool {
        self.drop_timer_ms += elapsed_ms;
        self.drop_timer_ms >= self.drop_interval_ms()
    }

    pub fn reset_drop_timer(&mut self) {
        self.drop_timer_ms = 0;
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            grid: self.grid.rows().iter().map(|row| row.to_vec()).collect(),
            current_piece: self.current.map(|p| PieceSnapshot {
                kind: p.kind,
                rotation: p.rotation,
                x: p.x,
                y: p.y,
                shape: p.shape().matrix(p.kind.color_id()),
            }),
            next_piece: self.next,
            score: self.score,
            lives: self.lives,
            combo: self.combo,
            max_combo: self.max_combo,
            pending_garbage: self.pending_garbage,
            game_over: self.game_over,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HEIGHT, WIDTH};
    use crate::grid::{CELL_EMPTY, CELL_GARBAGE};
    use crate::piece::Rotation;

    fn board() -> Board {
        Board::new(&MatchConfig::default(), 1)
    }

    fn place(board: &mut Board, kind: PieceKind, rotation: Rotation, x: i32, y: i32) {
        board.current = Some(ActivePiece {
            kind,
            rotation,
            x,
            y,
        });
    }

    /// Bottom `rows` rows full except column 0.
    fn well(board: &mut Board, rows: usize) {
        for y in HEIGHT - rows..HEIGHT {
            for x in 1..WIDTH {
                board.grid.set_cell(x, y, CELL_GARBAGE);
            }
        }
    }

    fn drop_vertical_i_in_well(board: &mut Board) -> usize {
        place(board, PieceKind::I, Rotation::Right, 0, 0);
        board.hard_drop()
    }

    #[test]
    fn shift_stops_at_walls() {
        let mut b = board();
        place(&mut b, PieceKind::O, Rotation::Spawn, 1, 5);
        assert!(b.shift(Direction::Left));
        assert!(!b.shift(Direction::Left));
        assert_eq!(b.current().map(|p| p.x), Some(0));
    }

    #[test]
    fn rotation_kicks_off_the_right_wall() {
        let mut b = board();
        place(&mut b, PieceKind::T, Rotation::Right, 8, 5);
        assert!(b.rotate());
        let p = b.current().copied().unwrap();
        assert_eq!(p.rotation, Rotation::Reverse);
        assert_eq!(p.x, 7);
    }

    #[test]
    fn blocked_rotation_leaves_piece_untouched() {
        let mut b = board();
        place(&mut b, PieceKind::I, Rotation::Spawn, 3, HEIGHT as i32 - 1);
        let before = b.current().copied();
        assert!(!b.rotate());
        assert_eq!(b.current().copied(), before);
    }

    #[test]
    fn clear_without_full_rows_resets_combo() {
        let mut b = board();
        b.grid.set_cell(4, 19, 3);
        let before = b.grid.clone();
        assert_eq!(b.clear_lines(), 0);
        assert_eq!(b.combo(), 0);
        assert_eq!(b.grid, before);
    }

    #[test]
    fn line_scores_without_combo() {
        for (rows, expected) in [(1, 100), (2, 300), (3, 500), (4, 800)] {
            let mut b = board();
            well(&mut b, rows);
            assert_eq!(drop_vertical_i_in_well(&mut b), rows);
            assert_eq!(b.score(), expected, "{rows} rows");
            assert_eq!(b.combo(), 1);
        }
    }

    #[test]
    fn third_consecutive_clear_earns_combo_bonus() {
        let mut b = board();
        b.combo = 2;
        b.max_combo = 2;
        well(&mut b, 1);
        assert_eq!(drop_vertical_i_in_well(&mut b), 1);
        assert_eq!(b.combo(), 3);
        assert_eq!(b.score(), 200);
        assert_eq!(b.max_combo(), 3);
    }

    #[test]
    fn zero_clear_lock_breaks_combo_but_not_max() {
        let mut b = board();
        b.combo = 4;
        b.max_combo = 4;
        place(&mut b, PieceKind::O, Rotation::Spawn, 4, 0);
        assert_eq!(b.hard_drop(), 0);
        assert_eq!(b.combo(), 0);
        assert_eq!(b.max_combo(), 4);
    }

    #[test]
    fn garbage_yield_table() {
        let b = board();
        assert_eq!(b.garbage_yield(1, 1), 0);
        assert_eq!(b.garbage_yield(2, 1), 1);
        assert_eq!(b.garbage_yield(4, 1), 2);
        assert_eq!(b.garbage_yield(4, 3), (2.0 * 1.2f64.powi(2)).floor() as u32);
        assert_eq!(b.garbage_yield(4, 3), 2);
        assert_eq!(b.garbage_yield(4, 5), 4);
        assert_eq!(b.garbage_yield(1, 6), 0);
    }

    #[test]
    fn receive_garbage_row_by_row() {
        let mut b = board();
        b.grid.set_cell(0, 0, 5);
        b.grid.set_cell(0, 2, 5);
        b.grid.set_cell(0, 3, 6);
        b.receive_garbage(3);
        let rows = b.grid().rows();
        assert_eq!(rows.len(), HEIGHT);
        assert_eq!(b.grid().cell(0, 0), 6);
        for row in &rows[HEIGHT - 3..] {
            assert_eq!(row.iter().filter(|&&c| c == CELL_EMPTY).count(), 1);
        }
        assert_eq!(b.grid().filled_rows(), 4);
    }

    #[test]
    fn pending_garbage_materialises_once() {
        let mut b = board();
        b.add_pending_garbage(2);
        b.apply_pending_garbage();
        assert_eq!(b.pending_garbage(), 0);
        assert_eq!(b.grid().filled_rows(), 2);
        b.apply_pending_garbage();
        assert_eq!(b.grid().filled_rows(), 2);
    }

    #[test]
    fn elimination_keeps_score_and_spends_a_life() {
        let mut b = board();
        b.score = 900;
        b.combo = 2;
        b.add_pending_garbage(3);
        well(&mut b, 6);
        assert!(b.eliminate());
        assert_eq!(b.lives(), 2);
        assert_eq!(b.score(), 900);
        assert_eq!(b.combo(), 0);
        assert_eq!(b.pending_garbage(), 0);
        assert_eq!(b.grid().filled_rows(), 0);
        assert!(!b.is_game_over());
    }

    #[test]
    fn soft_drop_switches_interval() {
        let mut b = board();
        assert!(!b.accumulate(50));
        b.set_soft_drop(true);
        assert!(b.accumulate(0));
        b.set_soft_drop(false);
        assert_eq!(b.drop_interval_ms(), 1000);
    }

    #[test]
    fn spawn_reports_blocked_entry() {
        let seq = PieceSequence::generate(5, 10);
        let mut b = board();
        assert!(b.spawn_from(&seq));
        assert_eq!(b.current().map(|p| p.kind), Some(seq.get(0)));
        assert_eq!(b.next(), Some(seq.get(1)));
        b.receive_garbage(HEIGHT as u32);
        assert!(!b.advance_piece(&seq));
        assert_eq!(b.current().map(|p| p.kind), Some(seq.get(1)));
    }
}
