use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use crate::piece::PieceKind;

/// The match-wide piece order, generated once from a seed and shared by
/// both boards.
#[derive(Clone, Debug)]
pub struct PieceSequence {
    seed: u64,
    pieces: Arc<[PieceKind]>,
}

impl PieceSequence {
    pub fn generate(seed: u64, length: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let pieces: Vec<PieceKind> = (0..length.max(1))
            .map(|_| PieceKind::ALL[rng.gen_range(0..PieceKind::ALL.len())])
            .collect();
        Self {
            seed,
            pieces: pieces.into(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Positions past the end wrap back to the start.
    pub fn get(&self, index: usize) -> PieceKind {
        self.pieces[index % self.pieces.len()]
    }
}

/// One board's read position. Current is read at `pos`, next at `pos + 1`,
/// so both boards walk the same global order independently.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceCursor {
    pos: usize,
}

impl SequenceCursor {
    pub fn new() -> Self {
        Self { pos: 0 }
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub fn current(&self, seq: &PieceSequence) -> PieceKind {
        seq.get(self.pos)
    }

    pub fn next(&self, seq: &PieceSequence) -> PieceKind {
        seq.get(self.pos + 1)
    }

    pub fn advance(&mut self, seq: &PieceSequence) {
        self.pos += 1;
        if (self.pos + 1) % seq.len() == 0 {
            warn!(seed = seq.seed(), position = self.pos, "piece sequence wrapped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_order() {
        let a = PieceSequence::generate(1234, 1500);
        let b = PieceSequence::generate(1234, 1500);
        let c = PieceSequence::generate(1235, 1500);
        assert_eq!(a.pieces, b.pieces);
        assert_ne!(a.pieces, c.pieces);
        assert_eq!(a.len(), 1500);
    }

    #[test]
    fn every_kind_shows_up() {
        let seq = PieceSequence::generate(7, 1500);
        for kind in PieceKind::ALL {
            assert!(seq.pieces.contains(&kind), "{kind:?} missing");
        }
    }

    #[test]
    fn cursors_read_offset_pairs_and_wrap() {
        let seq = PieceSequence::generate(99, 3);
        let mut cursor = SequenceCursor::new();
        assert_eq!(cursor.current(&seq), seq.get(0));
        assert_eq!(cursor.next(&seq), seq.get(1));
        cursor.advance(&seq);
        cursor.advance(&seq);
        assert_eq!(cursor.current(&seq), seq.get(2));
        assert_eq!(cursor.next(&seq), seq.get(0));
        cursor.advance(&seq);
        assert_eq!(cursor.position(), 3);
        assert_eq!(cursor.current(&seq), seq.get(0));
    }
}
