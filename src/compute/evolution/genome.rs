//! Genomes: gene lists, derived networks and the mutation operators.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use super::gene::{Gene, InnovationCounter, NodeId};
use super::network::{Network, NodeLayout};
use super::rng::GenomeRng;
use crate::schema::{GenomeSnapshot, MutationKind, MutationRates, NeatConfig, SNAPSHOT_VERSION};
use crate::task::{Actions, TaskSimulation};

/// Rate multiplier applied on a "decrease" coin flip.
const RATE_DECAY: f32 = 0.95;
/// Rate multiplier applied on an "increase" coin flip.
const RATE_GROWTH: f32 = 1.05263;

/// Shared state a genome needs while mutating.
pub struct MutationContext<'a> {
    pub rng: &'a mut GenomeRng,
    pub innovations: &'a mut InnovationCounter,
    pub layout: NodeLayout,
    pub perturb_chance: f32,
}

impl<'a> MutationContext<'a> {
    pub fn new(
        rng: &'a mut GenomeRng,
        innovations: &'a mut InnovationCounter,
        config: &NeatConfig,
    ) -> Self {
        Self {
            rng,
            innovations,
            layout: NodeLayout::from_config(config),
            perturb_chance: config.perturb_chance,
        }
    }
}

/// One individual in the population.
pub struct Genome {
    /// Connection genes, in insertion order (regrouped by target on network generation).
    pub genes: Vec<Gene>,
    pub fitness: i64,
    /// Network derived from the enabled genes.
    pub network: Network,
    /// Highest hidden node id allocated so far.
    pub max_neuron: NodeId,
    /// Position in the last population-wide ascending fitness sort.
    pub global_rank: usize,
    pub mutation_rates: MutationRates,
    pub frames_survived: u64,
    pub current_frame: u64,
    pub finished: bool,
    episode: Option<Box<dyn TaskSimulation>>,
}

impl fmt::Debug for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Genome")
            .field("genes", &self.genes.len())
            .field("fitness", &self.fitness)
            .field("max_neuron", &self.max_neuron)
            .field("global_rank", &self.global_rank)
            .field("finished", &self.finished)
            .field("live", &self.episode.is_some())
            .finish_non_exhaustive()
    }
}

impl Genome {
    /// Empty genome with the given rates and hidden-node watermark.
    pub fn new(mutation_rates: MutationRates, max_neuron: NodeId) -> Self {
        Self {
            genes: Vec::new(),
            fitness: 0,
            network: Network::default(),
            max_neuron,
            global_rank: 0,
            mutation_rates,
            frames_survived: 0,
            current_frame: 0,
            finished: false,
            episode: None,
        }
    }

    /// A fresh, unevaluated individual with this genome's genes and rates.
    pub fn clone_offspring(&self) -> Self {
        Self {
            genes: self.genes.clone(),
            network: self.network.clone(),
            ..Self::new(self.mutation_rates, self.max_neuron)
        }
    }

    /// Rebuild the network from the enabled genes.
    ///
    /// Genes are first sorted (stably) by target node to group insertion.
    pub fn generate_network(&mut self, layout: NodeLayout) {
        self.genes.sort_by_key(|g| g.out);
        self.network = Network::build(&self.genes, layout);
    }

    /// Evaluate the network on one observation. Empty on length mismatch.
    pub fn evaluate_network(&mut self, inputs: &[f32]) -> Vec<f32> {
        self.network.evaluate(inputs)
    }

    /// Pick a random node id.
    ///
    /// With `non_input`, inputs and the bias node are excluded; outputs are
    /// always candidates.
    pub fn random_neuron(&self, non_input: bool, ctx: &mut MutationContext<'_>) -> NodeId {
        let layout = ctx.layout;
        let mut neurons = BTreeSet::new();

        if !non_input {
            neurons.extend(0..layout.input_size as NodeId);
        }
        neurons.extend((0..layout.outputs).map(|o| layout.output(o)));

        for gene in &self.genes {
            if !non_input || gene.into > layout.bias() {
                neurons.insert(gene.into);
            }
            if !non_input || gene.out > layout.bias() {
                neurons.insert(gene.out);
            }
        }

        let n = ctx.rng.index(neurons.len());
        neurons
            .into_iter()
            .nth(n)
            .expect("index drawn within candidate set")
    }

    /// Whether a gene with the same `(into, out)` pair exists.
    pub fn contains_link(&self, link: &Gene) -> bool {
        self.genes.iter().any(|g| g.same_link(link))
    }

    /// Perturb or reset every weight.
    pub fn point_mutate(&mut self, ctx: &mut MutationContext<'_>) {
        let step = self.mutation_rates[MutationKind::Step];

        for gene in &mut self.genes {
            if ctx.rng.unit() < ctx.perturb_chance {
                gene.weight += ctx.rng.uniform(-step, step);
            } else {
                gene.weight = ctx.rng.uniform(-2.0, 2.0);
            }
        }
    }

    /// Add a new forward link, optionally sourced from the bias node.
    pub fn link_mutate(&mut self, force_bias: bool, ctx: &mut MutationContext<'_>) {
        let mut neuron1 = self.random_neuron(false, ctx);
        let mut neuron2 = self.random_neuron(true, ctx);
        let layout = ctx.layout;

        if layout.is_input_side(neuron1) && layout.is_input_side(neuron2) {
            return;
        }
        if layout.is_input_side(neuron2) {
            std::mem::swap(&mut neuron1, &mut neuron2);
        }

        let mut link = Gene {
            into: if force_bias { layout.bias() } else { neuron1 },
            out: neuron2,
            weight: 0.0,
            enabled: true,
            innovation: 0,
        };
        if self.contains_link(&link) {
            return;
        }

        link.innovation = ctx.innovations.next();
        link.weight = ctx.rng.uniform(-2.0, 2.0);
        self.genes.push(link);
    }

    /// Split a random enabled gene with a new hidden node.
    ///
    /// No-op once the hidden id range below the outputs is exhausted.
    pub fn node_mutate(&mut self, ctx: &mut MutationContext<'_>) {
        if self.genes.is_empty() {
            return;
        }
        if self.max_neuron + 1 >= ctx.layout.max_nodes {
            log::debug!("hidden node ids exhausted at {}", self.max_neuron);
            return;
        }

        self.max_neuron += 1;

        let idx = ctx.rng.index(self.genes.len());
        if !self.genes[idx].enabled {
            return;
        }
        self.genes[idx].enabled = false;
        let split = self.genes[idx];

        self.genes.push(Gene {
            out: self.max_neuron,
            weight: 1.0,
            innovation: ctx.innovations.next(),
            enabled: true,
            ..split
        });
        self.genes.push(Gene {
            into: self.max_neuron,
            innovation: ctx.innovations.next(),
            enabled: true,
            ..split
        });
    }

    /// Flip one random gene whose `enabled` flag differs from `enable`.
    pub fn enable_disable_mutate(&mut self, enable: bool, ctx: &mut MutationContext<'_>) {
        let candidates: Vec<usize> = self
            .genes
            .iter()
            .enumerate()
            .filter(|(_, g)| g.enabled != enable)
            .map(|(i, _)| i)
            .collect();

        if candidates.is_empty() {
            return;
        }

        let gene = &mut self.genes[candidates[ctx.rng.index(candidates.len())]];
        gene.enabled = !gene.enabled;
    }

    /// Adapt the mutation rates, then apply every operator.
    ///
    /// The structural rates are expected counts: an operator runs once per
    /// whole unit of rate and once more with the fractional remainder as
    /// probability.
    pub fn mutate(&mut self, ctx: &mut MutationContext<'_>) {
        for kind in MutationKind::ALL {
            if ctx.rng.coin() {
                self.mutation_rates[kind] *= RATE_DECAY;
            } else {
                self.mutation_rates[kind] *= RATE_GROWTH;
            }
        }

        if ctx.rng.unit() < self.mutation_rates[MutationKind::Connections] {
            self.point_mutate(ctx);
        }

        self.repeat_expected(MutationKind::Link, ctx, |g, c| g.link_mutate(false, c));
        self.repeat_expected(MutationKind::Bias, ctx, |g, c| g.link_mutate(true, c));
        self.repeat_expected(MutationKind::Node, ctx, |g, c| g.node_mutate(c));
        self.repeat_expected(MutationKind::Enable, ctx, |g, c| {
            g.enable_disable_mutate(true, c)
        });
        self.repeat_expected(MutationKind::Disable, ctx, |g, c| {
            g.enable_disable_mutate(false, c)
        });

        self.generate_network(ctx.layout);
    }

    fn repeat_expected<F>(&mut self, kind: MutationKind, ctx: &mut MutationContext<'_>, mut op: F)
    where
        F: FnMut(&mut Self, &mut MutationContext<'_>),
    {
        let mut p = self.mutation_rates[kind];
        while p > 0.0 {
            if ctx.rng.unit() < p {
                op(self, ctx);
            }
            p -= 1.0;
        }
    }

    /// Whether an episode has been started for this genome.
    pub fn has_episode(&self) -> bool {
        self.episode.is_some()
    }

    /// The live (possibly finished) episode, if any.
    pub fn episode(&self) -> Option<&dyn TaskSimulation> {
        self.episode.as_deref()
    }

    /// Begin a new run on `task`.
    pub fn start_episode(&mut self, mut task: Box<dyn TaskSimulation>, layout: NodeLayout) {
        task.init();
        self.episode = Some(task);
        self.frames_survived = 0;
        self.current_frame = 0;
        self.finished = false;
        self.generate_network(layout);
    }

    /// Advance the episode by one decision step and update fitness.
    ///
    /// While the task is active, fitness is `score + frames_survived + 1`
    /// (0 is remapped to -1). When it stops, or `max_ticks` is reached, the
    /// genome is finished and `max_fitness` is raised to its fitness.
    pub fn evaluate_current(&mut self, max_fitness: &AtomicI64, max_ticks: Option<u64>) {
        if self.finished {
            return;
        }
        let task = self
            .episode
            .as_mut()
            .expect("evaluating a genome without a started episode");

        let observation = task.observe();
        let raw = self.network.evaluate(&observation);
        let width = self.network.output_count();
        let actions = Actions::from_outputs(&raw, width, task.exclusive_pairs());

        task.step(&actions);
        self.current_frame += 1;

        let active = task.is_active();
        if active {
            self.frames_survived = self.frames_survived.max(self.current_frame);
            let fitness = task.score() + self.frames_survived as i64 + 1;
            self.fitness = if fitness == 0 { -1 } else { fitness };
        }

        let capped = max_ticks.is_some_and(|cap| self.current_frame >= cap);
        if !active || capped {
            max_fitness.fetch_max(self.fitness, Ordering::AcqRel);
            self.finished = true;
        }
    }

    pub fn to_snapshot(&self) -> GenomeSnapshot {
        GenomeSnapshot {
            version: SNAPSHOT_VERSION,
            fitness: self.fitness,
            max_neuron: self.max_neuron,
            mutation_rates: self.mutation_rates,
            genes: self.genes.iter().map(Gene::to_record).collect(),
        }
    }

    /// Rebuild a genome (and its network) from a snapshot.
    pub fn from_snapshot(snapshot: &GenomeSnapshot, layout: NodeLayout) -> Self {
        let mut genome = Self::new(snapshot.mutation_rates, snapshot.max_neuron);
        genome.fitness = snapshot.fitness;
        genome.genes = snapshot.genes.iter().map(Gene::from_record).collect();
        genome.network = Network::build(&genome.genes, layout);
        genome
    }
}
