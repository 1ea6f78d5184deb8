use serde::{Deserialize, Serialize};

use crate::config::WIDTH;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    pub fn color_id(self) -> u8 {
        match self {
            PieceKind::I => 1,
            PieceKind::O => 2,
            PieceKind::T => 3,
            PieceKind::S => 4,
            PieceKind::Z => 5,
            PieceKind::J => 6,
            PieceKind::L => 7,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Rotation {
    Spawn = 0,
    Right = 1,
    Reverse = 2,
    Left = 3,
}

impl Rotation {
    pub fn rotate_cw(self) -> Rotation {
        match self {
            Rotation::Spawn => Rotation::Right,
            Rotation::Right => Rotation::Reverse,
            Rotation::Reverse => Rotation::Left,
            Rotation::Left => Rotation::Spawn,
        }
    }
}

/// Occupied cells of one orientation as `(col, row)` offsets from the
/// top-left corner of its bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shape {
    pub cells: [(u8, u8); 4],
    pub width: u8,
    pub height: u8,
}

impl Shape {
    /// Boolean-matrix view used by snapshots, filled with `fill` where occupied.
    pub fn matrix(&self, fill: u8) -> Vec<Vec<u8>> {
        let mut rows = vec![vec![0u8; self.width as usize]; self.height as usize];
        for &(c, r) in &self.cells {
            rows[r as usize][c as usize] = fill;
        }
        rows
    }
}

const fn shape(cells: [(u8, u8); 4], width: u8, height: u8) -> Shape {
    Shape {
        cells,
        width,
        height,
    }
}

// Transpose then reverse rows: (c, r) in a w×h box lands on (h-1-r, c) in h×w.
const fn rotate_cw(s: Shape) -> Shape {
    let mut cells = [(0u8, 0u8); 4];
    let mut i = 0;
    while i < 4 {
        let (c, r) = s.cells[i];
        cells[i] = (s.height - 1 - r, c);
        i += 1;
    }
    shape(cells, s.height, s.width)
}

const fn orientations(spawn: Shape) -> [Shape; 4] {
    let right = rotate_cw(spawn);
    let reverse = rotate_cw(right);
    let left = rotate_cw(reverse);
    [spawn, right, reverse, left]
}

/// Every orientation of every piece, indexed by `[PieceKind as usize][Rotation as usize]`.
pub static ROTATIONS: [[Shape; 4]; 7] = [
    orientations(shape([(0, 0), (1, 0), (2, 0), (3, 0)], 4, 1)), // I
    orientations(shape([(0, 0), (1, 0), (0, 1), (1, 1)], 2, 2)), // O
    orientations(shape([(1, 0), (0, 1), (1, 1), (2, 1)], 3, 2)), // T
    orientations(shape([(1, 0), (2, 0), (0, 1), (1, 1)], 3, 2)), // S
    orientations(shape([(0, 0), (1, 0), (1, 1), (2, 1)], 3, 2)), // Z
    orientations(shape([(0, 0), (0, 1), (1, 1), (2, 1)], 3, 2)), // J
    orientations(shape([(2, 0), (0, 1), (1, 1), (2, 1)], 3, 2)), // L
];

pub fn shape_of(kind: PieceKind, rotation: Rotation) -> &'static Shape {
    &ROTATIONS[kind as usize][rotation as usize]
}

/// The falling piece. `(x, y)` anchors the top-left of the current shape's
/// bounding box in grid coordinates; `y` may be negative above the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivePiece {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub x: i32,
    pub y: i32,
}

impl ActivePiece {
    /// Horizontally centred on the top row.
    pub fn spawn(kind: PieceKind) -> Self {
        let width = shape_of(kind, Rotation::Spawn).width as i32;
        Self {
            kind,
            rotation: Rotation::Spawn,
            x: (WIDTH as i32 - width) / 2,
            y: 0,
        }
    }

    pub fn shape(&self) -> &'static Shape {
        shape_of(self.kind, self.rotation)
    }

    /// Absolute grid coordinates of the four occupied cells.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape()
            .cells
            .iter()
            .map(move |&(c, r)| (self.x + c as i32, self.y + r as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_quarter_turns_return_to_spawn() {
        for kind in PieceKind::ALL {
            let spawn = *shape_of(kind, Rotation::Spawn);
            let back = rotate_cw(*shape_of(kind, Rotation::Left));
            assert_eq!(back, spawn, "{kind:?}");
        }
    }

    #[test]
    fn t_rotates_like_a_matrix_transform() {
        // [[0,1,0],[1,1,1]] -> [[1,0],[1,1],[1,0]]
        let right = shape_of(PieceKind::T, Rotation::Right);
        assert_eq!((right.width, right.height), (2, 3));
        assert_eq!(right.matrix(1), vec![vec![1, 0], vec![1, 1], vec![1, 0]]);
    }

    #[test]
    fn i_piece_stands_up() {
        let right = shape_of(PieceKind::I, Rotation::Right);
        assert_eq!(right.matrix(1), vec![vec![1]; 4]);
    }

    #[test]
    fn spawn_is_centred() {
        assert_eq!(ActivePiece::spawn(PieceKind::I).x, 3);
        assert_eq!(ActivePiece::spawn(PieceKind::O).x, 4);
        assert_eq!(ActivePiece::spawn(PieceKind::T).x, 3);
    }
}
