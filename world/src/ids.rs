//! Deterministic unit identifier allocation.

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_core::UnitId;

const BLOCK_SIZE: u32 = 4096;
const FIRST_ID: u32 = 10_000;
const ID_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// Hands out identifiers from shuffled blocks so that ids reveal nothing about
/// spawn order while staying reproducible from the map seed.
#[derive(Debug)]
pub(crate) struct IdGenerator {
    rng: ChaCha8Rng,
    next_block_start: u32,
    block: Vec<u32>,
    cursor: usize,
}

impl IdGenerator {
    pub(crate) fn new(seed: u64) -> Self {
        let mut generator = Self {
            rng: ChaCha8Rng::seed_from_u64(seed ^ ID_STREAM),
            next_block_start: FIRST_ID,
            block: Vec::with_capacity(BLOCK_SIZE as usize),
            cursor: 0,
        };
        generator.refill();
        generator
    }

    fn refill(&mut self) {
        let start = self.next_block_start;
        self.block.clear();
        self.block.extend(start..start.saturating_add(BLOCK_SIZE));
        self.block.shuffle(&mut self.rng);
        self.next_block_start = start.saturating_add(BLOCK_SIZE);
        self.cursor = 0;
    }

    pub(crate) fn next_id(&mut self) -> UnitId {
        if self.cursor >= self.block.len() {
            self.refill();
        }
        let value = self
            .block
            .get(self.cursor)
            .copied()
            .unwrap_or(self.next_block_start);
        self.cursor += 1;
        UnitId::new(value)
    }
}
