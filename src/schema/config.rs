//! Configuration types for neuroevolution runs.

use std::ops::{Index, IndexMut};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration for a NEAT run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeatConfig {
    /// Length of the observation vector fed to every network.
    pub input_size: usize,
    /// Number of output neurons (length of the action vector).
    pub outputs: usize,
    /// Target number of genomes per generation.
    pub population: usize,
    /// Weight of the disjoint-gene term in the compatibility distance.
    pub delta_disjoint: f32,
    /// Weight of the mean weight difference in the compatibility distance.
    pub delta_weights: f32,
    /// Genomes closer than this distance share a species.
    pub delta_threshold: f32,
    /// Generations without improvement before a species is dropped.
    pub stale_species: u32,
    /// Probability that a point mutation perturbs rather than resets a weight.
    pub perturb_chance: f32,
    /// Probability that breeding uses crossover rather than cloning.
    pub crossover_chance: f32,
    /// First output node id. `input_size` is the bias node, so hidden node ids
    /// live in `(input_size, max_nodes)`.
    pub max_nodes: i32,
    /// Initial per-genome mutation rates.
    pub mutation_rates: MutationRates,
    /// Evaluation pass settings.
    pub evaluation: EvaluationConfig,
    /// Random seed for reproducibility.
    pub random_seed: Option<u64>,
    /// Directory for per-generation and manual snapshots.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for NeatConfig {
    fn default() -> Self {
        Self {
            input_size: 200,
            outputs: 5,
            population: 300,
            delta_disjoint: 2.0,
            delta_weights: 0.4,
            delta_threshold: 1.0,
            stale_species: 15,
            perturb_chance: 0.9,
            crossover_chance: 0.75,
            max_nodes: 1_000_000,
            mutation_rates: MutationRates::default(),
            evaluation: EvaluationConfig::default(),
            random_seed: None,
            snapshot_dir: None,
        }
    }
}

impl NeatConfig {
    /// Node id of the always-present bias source.
    #[inline]
    pub fn bias_node(&self) -> i32 {
        self.input_size as i32
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_size == 0 {
            return Err(ConfigError::InvalidInputSize);
        }
        if self.outputs == 0 {
            return Err(ConfigError::InvalidOutputs);
        }
        if self.population == 0 {
            return Err(ConfigError::InvalidPopulation);
        }
        // room for the bias node and at least one hidden id
        if i64::from(self.max_nodes) <= self.input_size as i64 + 1 {
            return Err(ConfigError::NodeRangeOverlap {
                max_nodes: self.max_nodes,
                input_size: self.input_size,
            });
        }
        if self.delta_threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold);
        }
        for (name, p) in [
            ("perturb_chance", self.perturb_chance),
            ("crossover_chance", self.crossover_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::InvalidProbability { name, value: p });
            }
        }
        if self.evaluation.max_in_flight == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        Ok(())
    }
}

/// Settings for the concurrent evaluation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Maximum number of genomes stepped concurrently per pass.
    pub max_in_flight: usize,
    /// Force-finish episodes after this many ticks. `None` never does.
    pub max_ticks: Option<u64>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 150,
            max_ticks: None,
        }
    }
}

/// The closed set of self-adapting mutation rates carried by each genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Chance of a point (weight) mutation pass.
    Connections,
    /// Expected number of new links.
    Link,
    /// Expected number of new bias links.
    Bias,
    /// Expected number of node splits.
    Node,
    /// Expected number of re-enabled genes.
    Enable,
    /// Expected number of disabled genes.
    Disable,
    /// Perturbation step size for point mutation.
    Step,
}

impl MutationKind {
    /// Number of kinds.
    pub const COUNT: usize = 7;

    /// All kinds, in storage order.
    pub const ALL: [MutationKind; Self::COUNT] = [
        MutationKind::Connections,
        MutationKind::Link,
        MutationKind::Bias,
        MutationKind::Node,
        MutationKind::Enable,
        MutationKind::Disable,
        MutationKind::Step,
    ];

    /// Storage slot.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Per-genome mutation rates, indexed by [`MutationKind`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "NamedRates", into = "NamedRates")]
pub struct MutationRates([f32; MutationKind::COUNT]);

impl Default for MutationRates {
    fn default() -> Self {
        Self([0.25, 2.0, 0.4, 0.5, 0.2, 0.4, 0.1])
    }
}

impl MutationRates {
    /// Iterate `(kind, rate)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (MutationKind, f32)> + '_ {
        MutationKind::ALL.iter().map(|&k| (k, self.0[k.index()]))
    }
}

impl Index<MutationKind> for MutationRates {
    type Output = f32;

    fn index(&self, kind: MutationKind) -> &f32 {
        &self.0[kind.index()]
    }
}

impl IndexMut<MutationKind> for MutationRates {
    fn index_mut(&mut self, kind: MutationKind) -> &mut f32 {
        &mut self.0[kind.index()]
    }
}

/// On-disk shape of [`MutationRates`].
#[derive(Serialize, Deserialize)]
struct NamedRates {
    connections: f32,
    link: f32,
    bias: f32,
    node: f32,
    enable: f32,
    disable: f32,
    step: f32,
}

impl From<NamedRates> for MutationRates {
    fn from(r: NamedRates) -> Self {
        Self([
            r.connections,
            r.link,
            r.bias,
            r.node,
            r.enable,
            r.disable,
            r.step,
        ])
    }
}

impl From<MutationRates> for NamedRates {
    fn from(r: MutationRates) -> Self {
        let [connections, link, bias, node, enable, disable, step] = r.0;
        Self {
            connections,
            link,
            bias,
            node,
            enable,
            disable,
            step,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Input size must be non-zero")]
    InvalidInputSize,
    #[error("Output count must be non-zero")]
    InvalidOutputs,
    #[error("Population must be non-zero")]
    InvalidPopulation,
    #[error("max_nodes ({max_nodes}) must exceed input_size + 1 ({input_size} + 1)")]
    NodeRangeOverlap { max_nodes: i32, input_size: usize },
    #[error("Compatibility threshold must be positive")]
    InvalidThreshold,
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f32 },
    #[error("max_in_flight must be non-zero")]
    InvalidConcurrency,
}
