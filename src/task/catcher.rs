//! A minimal falling-block task for demos and tests.
//!
//! A block drops down a `width × height` board; a paddle on the bottom row
//! moves left or right. Catching the block scores a point and spawns the
//! next one. The episode ends on a miss or after [`Catcher::DROPS`] blocks.

use rand::prelude::*;

use super::{Actions, TaskSimulation};

/// Action channels understood by [`Catcher`].
pub mod channel {
    pub const DOWN: usize = 0;
    pub const RIGHT: usize = 1;
    pub const LEFT: usize = 2;
    pub const CW: usize = 3;
    pub const CCW: usize = 4;
}

const EXCLUSIVE: [(usize, usize); 1] = [(channel::RIGHT, channel::LEFT)];

/// Falling-block catching task.
#[derive(Debug, Clone)]
pub struct Catcher {
    width: usize,
    height: usize,
    rng: StdRng,
    seed: u64,
    paddle: usize,
    block: (usize, usize),
    ticks: u64,
    drops: u32,
    score: i64,
    active: bool,
}

impl Catcher {
    /// Blocks per episode.
    pub const DROPS: u32 = 20;
    /// Ticks between gravity steps when not fast-dropping.
    pub const FALL_INTERVAL: u64 = 3;
    /// Paddle width in cells.
    pub const PADDLE: usize = 2;

    pub fn new(width: usize, height: usize, seed: u64) -> Self {
        assert!(width >= Self::PADDLE && height >= 2, "board too small");
        Self {
            width,
            height,
            rng: StdRng::seed_from_u64(seed),
            seed,
            paddle: 0,
            block: (0, 0),
            ticks: 0,
            drops: 0,
            score: 0,
            active: false,
        }
    }

    /// Observation length for this board.
    pub fn input_size(&self) -> usize {
        self.width * self.height
    }

    fn spawn(&mut self) {
        self.block = (self.rng.gen_range(0..self.width), 0);
    }

    fn land(&mut self) {
        let x = self.block.0;
        if x >= self.paddle && x < self.paddle + Self::PADDLE {
            self.score += 1;
        } else {
            self.active = false;
            return;
        }
        self.drops += 1;
        if self.drops >= Self::DROPS {
            self.active = false;
        } else {
            self.spawn();
        }
    }
}

impl TaskSimulation for Catcher {
    fn init(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.paddle = (self.width - Self::PADDLE) / 2;
        self.ticks = 0;
        self.drops = 0;
        self.score = 0;
        self.active = true;
        self.spawn();
    }

    fn observe(&self) -> Vec<f32> {
        let mut cells = vec![0.0; self.input_size()];
        if !self.active {
            return cells;
        }
        let bottom = (self.height - 1) * self.width;
        for x in self.paddle..self.paddle + Self::PADDLE {
            cells[bottom + x] = 1.0;
        }
        let (bx, by) = self.block;
        cells[by * self.width + bx] = -1.0;
        cells
    }

    fn step(&mut self, actions: &Actions) {
        if !self.active {
            return;
        }
        if actions.is_active(channel::RIGHT) && self.paddle + Self::PADDLE < self.width {
            self.paddle += 1;
        }
        if actions.is_active(channel::LEFT) && self.paddle > 0 {
            self.paddle -= 1;
        }

        self.ticks += 1;
        if actions.is_active(channel::DOWN) || self.ticks % Self::FALL_INTERVAL == 0 {
            self.block.1 += 1;
            if self.block.1 >= self.height - 1 {
                self.land();
            }
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn score(&self) -> i64 {
        self.score
    }

    fn exclusive_pairs(&self) -> &[(usize, usize)] {
        &EXCLUSIVE
    }
}
