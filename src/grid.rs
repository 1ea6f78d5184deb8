use rand::Rng;

use crate::config::{HEIGHT, WIDTH};
use crate::piece::ActivePiece;

pub const CELL_EMPTY: u8 = 0;
pub const CELL_GARBAGE: u8 = 8;

pub type Row = [u8; WIDTH];

/// One player's field. Row 0 is the top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Row>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self {
            rows: vec![[CELL_EMPTY; WIDTH]; HEIGHT],
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn cell(&self, x: usize, y: usize) -> u8 {
        self.rows[y][x]
    }

    pub fn set_cell(&mut self, x: usize, y: usize, value: u8) {
        self.rows[y][x] = value;
    }

    /// Walls and the floor are solid; above the field (y < 0) is open.
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
            return true;
        }
        y >= 0 && self.rows[y as usize][x as usize] != CELL_EMPTY
    }

    pub fn collides(&self, piece: &ActivePiece, dx: i32, dy: i32) -> bool {
        piece.cells().any(|(x, y)| self.is_blocked(x + dx, y + dy))
    }

    /// Writes the piece's visible cells into the field.
    pub fn stamp(&mut self, piece: &ActivePiece) {
        let color = piece.kind.color_id();
        for (x, y) in piece.cells() {
            if (0..HEIGHT as i32).contains(&y) && (0..WIDTH as i32).contains(&x) {
                self.rows[y as usize][x as usize] = color;
            }
        }
    }

    /// Removes full rows bottom to top, shifting everything above down and
    /// inserting empty rows at the top. Returns how many rows went.
    pub fn clear_full_rows(&mut self) -> usize {
        let mut cleared = 0;
        let mut y = HEIGHT;
        while y > 0 {
            let idx = y - 1;
            if self.rows[idx].iter().all(|&c| c != CELL_EMPTY) {
                self.rows.remove(idx);
                self.rows.insert(0, [CELL_EMPTY; WIDTH]);
                cleared += 1;
                // re-examine idx: the row above has shifted into it
            } else {
                y -= 1;
            }
        }
        cleared
    }

    /// Pushes one garbage row in from the bottom, dropping the top row.
    pub fn push_garbage_row<R: Rng>(&mut self, rng: &mut R) {
        let gap = rng.gen_range(0..WIDTH);
        let mut row = [CELL_GARBAGE; WIDTH];
        row[gap] = CELL_EMPTY;
        self.rows.remove(0);
        self.rows.push(row);
    }

    pub fn filled_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.iter().any(|&c| c != CELL_EMPTY))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fill_row(grid: &mut Grid, y: usize, value: u8) {
        for x in 0..WIDTH {
            grid.set_cell(x, y, value);
        }
    }

    #[test]
    fn rows_above_the_field_never_collide_with_cells() {
        let grid = Grid::new();
        let piece = ActivePiece {
            y: -1,
            ..ActivePiece::spawn(PieceKind::O)
        };
        assert!(!grid.collides(&piece, 0, 0));
        assert!(grid.collides(&piece, -5, 0));
        assert!(grid.collides(&piece, 0, HEIGHT as i32));
    }

    #[test]
    fn clear_keeps_order_of_remaining_rows() {
        let mut grid = Grid::new();
        grid.set_cell(0, 15, 3);
        fill_row(&mut grid, 16, 1);
        grid.set_cell(1, 17, 4);
        fill_row(&mut grid, 18, 2);
        fill_row(&mut grid, 19, 5);

        assert_eq!(grid.clear_full_rows(), 3);
        assert_eq!(grid.cell(1, 19), 4);
        assert_eq!(grid.cell(0, 18), 3);
        assert_eq!(grid.filled_rows(), 2);
        assert_eq!(grid.rows().len(), HEIGHT);
    }

    #[test]
    fn clear_on_partial_rows_is_a_no_op() {
        let mut grid = Grid::new();
        for y in 10..HEIGHT {
            for x in 1..WIDTH {
                grid.set_cell(x, y, 6);
            }
        }
        let before = grid.clone();
        assert_eq!(grid.clear_full_rows(), 0);
        assert_eq!(grid, before);
    }

    #[test]
    fn garbage_row_has_a_single_gap() {
        let mut grid = Grid::new();
        grid.set_cell(3, 0, 7);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        grid.push_garbage_row(&mut rng);
        assert_eq!(grid.rows().len(), HEIGHT);
        assert_eq!(grid.cell(3, 0), CELL_EMPTY);
        let bottom = grid.rows()[HEIGHT - 1];
        assert_eq!(bottom.iter().filter(|&&c| c == CELL_EMPTY).count(), 1);
        assert_eq!(bottom.iter().filter(|&&c| c == CELL_GARBAGE).count(), WIDTH - 1);
    }
}
