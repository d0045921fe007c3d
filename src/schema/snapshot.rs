//! Serializable records for saving and resuming a population.
//!
//! The in-memory [`Pool`](crate::compute::evolution::Pool) converts to and from
//! these records; only the fields needed to resume evolution are stored.
//! Networks, episodes and ranks are derived state and are rebuilt on load.

use serde::{Deserialize, Serialize};

use super::MutationRates;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Whole-population snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    #[serde(default)]
    pub version: u32,
    pub generation: u32,
    /// Last innovation id handed out.
    pub innovation: i32,
    pub max_fitness: i64,
    pub input_size: usize,
    pub species: Vec<SpeciesSnapshot>,
}

/// A species and its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSnapshot {
    #[serde(default)]
    pub version: u32,
    pub top_fitness: i64,
    pub staleness: u32,
    #[serde(default)]
    pub average_fitness: i64,
    pub genomes: Vec<GenomeSnapshot>,
}

/// A single genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeSnapshot {
    #[serde(default)]
    pub version: u32,
    pub fitness: i64,
    pub max_neuron: i32,
    pub mutation_rates: MutationRates,
    pub genes: Vec<GeneRecord>,
}

/// A single connection gene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneRecord {
    #[serde(default)]
    pub version: u32,
    pub into: i32,
    pub out: i32,
    pub weight: f32,
    pub enabled: bool,
    pub innovation: i32,
}

impl PoolSnapshot {
    /// Highest record version found anywhere in the snapshot.
    pub fn max_version(&self) -> u32 {
        let nested = self
            .species
            .iter()
            .flat_map(|s| {
                std::iter::once(s.version).chain(s.genomes.iter().flat_map(|g| {
                    std::iter::once(g.version).chain(g.genes.iter().map(|gene| gene.version))
                }))
            })
            .max()
            .unwrap_or(0);
        self.version.max(nested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_version_defaults_to_zero() {
        let json = r#"{"into": 1, "out": 1000000, "weight": 0.5, "enabled": true, "innovation": 7}"#;
        let gene: GeneRecord = serde_json::from_str(json).unwrap();
        assert_eq!(gene.version, 0);
        assert_eq!(gene.innovation, 7);
    }

    #[test]
    fn test_max_version_scans_nested_records() {
        let snapshot = PoolSnapshot {
            version: SNAPSHOT_VERSION,
            generation: 3,
            innovation: 12,
            max_fitness: 40,
            input_size: 4,
            species: vec![SpeciesSnapshot {
                version: SNAPSHOT_VERSION,
                top_fitness: 40,
                staleness: 0,
                average_fitness: 0,
                genomes: vec![GenomeSnapshot {
                    version: SNAPSHOT_VERSION,
                    fitness: 40,
                    max_neuron: 5,
                    mutation_rates: MutationRates::default(),
                    genes: vec![GeneRecord {
                        version: 9,
                        into: 0,
                        out: 1_000_000,
                        weight: 1.0,
                        enabled: true,
                        innovation: 6,
                    }],
                }],
            }],
        };
        assert_eq!(snapshot.max_version(), 9);
    }
}
