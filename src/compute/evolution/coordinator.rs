//! Drives concurrent fitness evaluation and generational turnover.

use rayon::prelude::*;
use serde::Serialize;

use super::genome::Genome;
use super::pool::Pool;
use super::rng::episode_seed;
use crate::schema::EvaluationConfig;
use crate::task::TaskFactory;

/// Summary handed to the progress callback after each generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub generation: u32,
    pub max_fitness: i64,
    pub species: usize,
    pub population: usize,
}

impl GenerationReport {
    fn of(pool: &Pool) -> Self {
        Self {
            generation: pool.generation,
            max_fitness: pool.max_fitness(),
            species: pool.species.len(),
            population: pool.genome_count(),
        }
    }
}

/// Evaluation driver: one task episode per genome, stepped in parallel.
pub struct Coordinator<F: TaskFactory> {
    factory: F,
    max_in_flight: usize,
    max_ticks: Option<u64>,
    passes: u64,
}

impl<F: TaskFactory> Coordinator<F> {
    pub fn new(factory: F, config: &EvaluationConfig) -> Self {
        Self {
            factory,
            max_in_flight: config.max_in_flight.max(1),
            max_ticks: config.max_ticks,
            passes: 0,
        }
    }

    /// Evaluation passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Run one evaluation pass.
    ///
    /// Every unfinished genome without an episode gets one first. Then up to
    /// `max_in_flight` unfinished genomes each advance one step on the rayon
    /// pool. Returns `true` only when every genome was already finished.
    pub fn process(&mut self, pool: &mut Pool) -> bool {
        if pool.all_finished() {
            return true;
        }

        let layout = pool.layout();
        let run_seed = pool.run_seed();
        let generation = pool.generation;
        let max_ticks = self.max_ticks;

        let (mut genomes, max_fitness) = pool.evaluation_view();
        for (slot, genome) in genomes.iter_mut().enumerate() {
            if !genome.finished && !genome.has_episode() {
                let task = self.factory.create(episode_seed(run_seed, generation, slot));
                genome.start_episode(task, layout);
            }
        }

        let mut batch: Vec<&mut Genome> = genomes
            .into_iter()
            .filter(|g| !g.finished)
            .take(self.max_in_flight)
            .collect();

        batch.par_iter_mut().for_each(|genome| {
            genome.evaluate_current(max_fitness, max_ticks);
        });

        self.passes += 1;
        if self.passes % 1000 == 0 {
            log::debug!(
                "Generation {generation}: {}% measured after {} passes",
                pool.percent_measured(),
                self.passes
            );
        }
        false
    }

    /// Evaluate until every genome has finished, then breed the next generation.
    pub fn run_generation(&mut self, pool: &mut Pool) -> GenerationReport {
        while !self.process(pool) {}
        pool.new_generation();
        GenerationReport::of(pool)
    }

    /// Run `generations` generations, reporting after each.
    pub fn run<C>(&mut self, pool: &mut Pool, generations: u32, mut callback: C) -> GenerationReport
    where
        C: FnMut(&GenerationReport),
    {
        let mut report = GenerationReport::of(pool);
        for _ in 0..generations {
            report = self.run_generation(pool);
            log::info!(
                "Generation {} done: max fitness {}, {} species, {} genomes",
                report.generation,
                report.max_fitness,
                report.species,
                report.population
            );
            callback(&report);
        }
        report
    }
}
