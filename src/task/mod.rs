//! Contract between the evolution engine and the task a genome is scored on.
//!
//! The engine never looks inside a task. Each decision step it asks for an
//! observation, feeds it through the genome's network, hands back an
//! [`Actions`] vector and reads the outcome:
//!
//! ```text
//! init() ─► observe() ─► step(actions) ─► is_active()? ─► score()
//!              ▲                               │
//!              └─────────── yes ───────────────┘
//! ```
//!
//! While the task is active a genome's fitness is `score + frames + 1`; once
//! it stops, the fitness is frozen and the genome is marked finished.

pub mod catcher;

pub use catcher::Catcher;

/// A single episode of an external task.
pub trait TaskSimulation: Send {
    /// Reset to a fresh episode.
    fn init(&mut self);

    /// Observation vector; its length must equal the pool's input size.
    fn observe(&self) -> Vec<f32>;

    /// Apply one action vector and advance one tick.
    fn step(&mut self, actions: &Actions);

    /// Whether the episode is still running.
    fn is_active(&self) -> bool;

    /// Task score so far.
    fn score(&self) -> i64;

    /// Pairs of action channels that cancel out when both fire.
    fn exclusive_pairs(&self) -> &[(usize, usize)] {
        &[]
    }
}

/// Creates task episodes for the evaluation workers.
pub trait TaskFactory: Sync {
    /// Create an uninitialized episode driven by `seed`.
    fn create(&self, seed: u64) -> Box<dyn TaskSimulation>;
}

impl<F> TaskFactory for F
where
    F: Fn(u64) -> Box<dyn TaskSimulation> + Sync,
{
    fn create(&self, seed: u64) -> Box<dyn TaskSimulation> {
        self(seed)
    }
}

/// Thresholded action vector handed to [`TaskSimulation::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct Actions {
    values: Vec<f32>,
}

impl Actions {
    /// All channels inactive.
    pub fn inactive(width: usize) -> Self {
        Self {
            values: vec![0.0; width],
        }
    }

    /// Build from raw network outputs.
    ///
    /// An empty `raw` (failed evaluation) yields all-inactive. For each
    /// exclusive pair, both channels are zeroed when both are active.
    pub fn from_outputs(raw: &[f32], width: usize, exclusive: &[(usize, usize)]) -> Self {
        if raw.is_empty() {
            return Self::inactive(width);
        }
        let mut values = raw.to_vec();
        values.resize(width, 0.0);
        for &(a, b) in exclusive {
            if a < width && b < width && values[a] > 0.0 && values[b] > 0.0 {
                values[a] = 0.0;
                values[b] = 0.0;
            }
        }
        Self { values }
    }

    /// Whether channel `i` fires (`> 0`).
    #[inline]
    pub fn is_active(&self, i: usize) -> bool {
        self.values.get(i).is_some_and(|&v| v > 0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_outputs_are_inactive() {
        let actions = Actions::from_outputs(&[], 5, &[]);
        assert_eq!(actions.len(), 5);
        assert!((0..5).all(|i| !actions.is_active(i)));
    }

    #[test]
    fn test_positive_channels_fire() {
        let actions = Actions::from_outputs(&[0.2, -0.1, 0.0], 3, &[]);
        assert!(actions.is_active(0));
        assert!(!actions.is_active(1));
        assert!(!actions.is_active(2));
    }

    #[test]
    fn test_exclusive_pair_cancels() {
        let actions = Actions::from_outputs(&[0.0, 0.5, 0.7, 0.3], 4, &[(1, 2)]);
        assert!(!actions.is_active(1));
        assert!(!actions.is_active(2));
        assert!(actions.is_active(3));

        let one_side = Actions::from_outputs(&[0.0, 0.5, -0.7], 3, &[(1, 2)]);
        assert!(one_side.is_active(1));
    }

    #[test]
    fn test_closure_factory() {
        let factory = |seed: u64| -> Box<dyn TaskSimulation> { Box::new(Catcher::new(4, 4, seed)) };
        let mut task = factory.create(3);
        task.init();
        assert!(task.is_active());
        assert_eq!(task.observe().len(), 16);
    }
}
