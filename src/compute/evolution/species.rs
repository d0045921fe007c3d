//! Species: clusters of compatible genomes, crossover and distance metrics.

use std::collections::{HashMap, HashSet};

use super::gene::Gene;
use super::genome::{Genome, MutationContext};
use super::network::NodeLayout;
use super::rng::GenomeRng;
use crate::schema::{NeatConfig, SNAPSHOT_VERSION, SpeciesSnapshot};

/// Fraction of genes whose innovation appears in only one of the genomes.
///
/// Normalized by the larger gene count; 0 when both genomes are empty.
pub fn disjoint(g1: &Genome, g2: &Genome) -> f32 {
    let i1: HashSet<i32> = g1.genes.iter().map(|g| g.innovation).collect();
    let i2: HashSet<i32> = g2.genes.iter().map(|g| g.innovation).collect();

    let only1 = g1.genes.iter().filter(|g| !i2.contains(&g.innovation)).count();
    let only2 = g2.genes.iter().filter(|g| !i1.contains(&g.innovation)).count();

    let n = g1.genes.len().max(g2.genes.len());
    if n == 0 {
        return 0.0;
    }
    (only1 + only2) as f32 / n as f32
}

/// Mean absolute weight difference over genes with matching innovations.
///
/// 0 when no innovations match.
pub fn weights(g1: &Genome, g2: &Genome) -> f32 {
    let i2: HashMap<i32, &Gene> = g2.genes.iter().map(|g| (g.innovation, g)).collect();

    let mut sum = 0.0f32;
    let mut coincident = 0usize;
    for gene in &g1.genes {
        if let Some(other) = i2.get(&gene.innovation) {
            sum += (gene.weight - other.weight).abs();
            coincident += 1;
        }
    }

    if coincident > 0 {
        sum / coincident as f32
    } else {
        0.0
    }
}

/// Compatibility test against the configured distance threshold.
pub fn same_species(g1: &Genome, g2: &Genome, config: &NeatConfig) -> bool {
    let dd = config.delta_disjoint * disjoint(g1, g2);
    let dw = config.delta_weights * weights(g1, g2);
    dd + dw < config.delta_threshold
}

/// Combine two parents, biased toward the fitter one.
///
/// Walks the fitter parent's genes; a matching enabled gene from the other
/// parent replaces it on a coin flip. Genes only the weaker parent carries
/// are never inherited.
pub fn crossover(g1: &Genome, g2: &Genome, rng: &mut GenomeRng) -> Genome {
    let (g1, g2) = if g2.fitness > g1.fitness { (g2, g1) } else { (g1, g2) };

    let innovations2: HashMap<i32, &Gene> =
        g2.genes.iter().map(|g| (g.innovation, g)).collect();

    let mut child = Genome::new(g1.mutation_rates, g1.max_neuron.max(g2.max_neuron));
    child.genes = g1
        .genes
        .iter()
        .map(|gene1| match innovations2.get(&gene1.innovation) {
            Some(gene2) if rng.coin() && gene2.enabled => **gene2,
            _ => *gene1,
        })
        .collect();

    child
}

/// A cluster of genomes sharing a breeding quota.
#[derive(Debug)]
pub struct Species {
    /// Members; index 0 is the representative. Sorted best-first after culling.
    pub genomes: Vec<Genome>,
    pub top_fitness: i64,
    pub staleness: u32,
    /// Mean global rank of the members.
    pub average_fitness: i64,
}

impl Species {
    /// A new species holding just `founder`.
    pub fn new(founder: Genome) -> Self {
        Self {
            genomes: vec![founder],
            top_fitness: 0,
            staleness: 0,
            average_fitness: 0,
        }
    }

    /// The member new genomes are compared against.
    pub fn representative(&self) -> &Genome {
        self.genomes
            .first()
            .expect("species must hold at least one genome")
    }

    /// Sort best-first by fitness.
    pub fn sort_by_fitness(&mut self) {
        self.genomes.sort_by(|a, b| b.fitness.cmp(&a.fitness));
    }

    /// Keep the best half (rounded up), or only the best member.
    pub fn cull(&mut self, cut_to_one: bool) {
        self.sort_by_fitness();
        let remaining = if cut_to_one {
            1
        } else {
            self.genomes.len().div_ceil(2)
        };
        self.genomes.truncate(remaining);
    }

    /// Set `average_fitness` to the mean global rank of the members.
    pub fn calculate_average_fitness(&mut self) {
        self.average_fitness = if self.genomes.is_empty() {
            0
        } else {
            let total: i64 = self.genomes.iter().map(|g| g.global_rank as i64).sum();
            total / self.genomes.len() as i64
        };
    }

    /// Breed one mutated child from this species.
    pub fn breed_child(&self, ctx: &mut MutationContext<'_>, crossover_chance: f32) -> Genome {
        assert!(
            !self.genomes.is_empty(),
            "breeding from a species with no genomes"
        );

        let mut child = if ctx.rng.unit() < crossover_chance {
            let g1 = &self.genomes[ctx.rng.index(self.genomes.len())];
            let g2 = &self.genomes[ctx.rng.index(self.genomes.len())];
            crossover(g1, g2, ctx.rng)
        } else {
            self.genomes[ctx.rng.index(self.genomes.len())].clone_offspring()
        };

        child.mutate(ctx);
        child
    }

    pub fn to_snapshot(&self) -> SpeciesSnapshot {
        SpeciesSnapshot {
            version: SNAPSHOT_VERSION,
            top_fitness: self.top_fitness,
            staleness: self.staleness,
            average_fitness: self.average_fitness,
            genomes: self.genomes.iter().map(Genome::to_snapshot).collect(),
        }
    }

    pub fn from_snapshot(snapshot: &SpeciesSnapshot, layout: NodeLayout) -> Self {
        Self {
            genomes: snapshot
                .genomes
                .iter()
                .map(|g| Genome::from_snapshot(g, layout))
                .collect(),
            top_fitness: snapshot.top_fitness,
            staleness: snapshot.staleness,
            average_fitness: snapshot.average_fitness,
        }
    }
}
