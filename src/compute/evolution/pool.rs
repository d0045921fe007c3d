//! The population: speciation, generational turnover and persistence.

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use super::gene::InnovationCounter;
use super::genome::{Genome, MutationContext};
use super::network::NodeLayout;
use super::persistence::{PersistError, SnapshotStore, read_snapshot, write_snapshot};
use super::rng::GenomeRng;
use super::species::{Species, same_species};
use crate::schema::{NeatConfig, PoolSnapshot, SNAPSHOT_VERSION};

/// Whole evolutionary state of one run.
pub struct Pool {
    config: NeatConfig,
    pub generation: u32,
    innovations: InnovationCounter,
    max_fitness: AtomicI64,
    pub species: Vec<Species>,
    rng: GenomeRng,
    run_seed: u64,
    store: Option<SnapshotStore>,
}

impl Pool {
    /// Create an empty pool. Call [`Pool::init`] to populate it.
    pub fn new(config: NeatConfig) -> Self {
        let run_seed = config.random_seed.unwrap_or_else(rand::random);
        let rng = GenomeRng::new(run_seed);

        let store = config
            .snapshot_dir
            .as_ref()
            .and_then(|dir| match SnapshotStore::new(dir) {
                Ok(store) => Some(store),
                Err(e) => {
                    log::warn!("Snapshots disabled: {e}");
                    None
                }
            });

        Self {
            innovations: InnovationCounter::starting_after(config.outputs as i32),
            config,
            generation: 0,
            max_fitness: AtomicI64::new(0),
            species: Vec::new(),
            rng,
            run_seed,
            store,
        }
    }

    pub fn config(&self) -> &NeatConfig {
        &self.config
    }

    pub fn layout(&self) -> NodeLayout {
        NodeLayout::from_config(&self.config)
    }

    pub fn input_size(&self) -> usize {
        self.config.input_size
    }

    /// Seed all per-episode task seeds derive from.
    pub fn run_seed(&self) -> u64 {
        self.run_seed
    }

    /// Last innovation id handed out.
    pub fn innovation(&self) -> i32 {
        self.innovations.last()
    }

    /// Allocate a fresh innovation id.
    pub fn new_innovation(&mut self) -> i32 {
        self.innovations.next()
    }

    /// Best finished fitness seen so far.
    pub fn max_fitness(&self) -> i64 {
        self.max_fitness.load(Ordering::Acquire)
    }

    /// Fill the pool with `population` mutated basic genomes.
    pub fn init(&mut self) {
        let Self {
            config,
            innovations,
            species,
            rng,
            ..
        } = self;

        let mut ctx = MutationContext::new(rng, innovations, config);
        for _ in 0..config.population {
            let mut genome = Genome::new(config.mutation_rates, config.input_size as i32);
            genome.mutate(&mut ctx);
            Self::insert_into_species(species, genome, config);
        }

        log::info!(
            "Initialized pool: {} genomes in {} species",
            self.genome_count(),
            self.species.len()
        );
        self.write_generation_snapshot();
    }

    /// Place `child` in the first compatible species, or found a new one.
    pub fn add_to_species(&mut self, child: Genome) {
        Self::insert_into_species(&mut self.species, child, &self.config);
    }

    fn insert_into_species(species: &mut Vec<Species>, child: Genome, config: &NeatConfig) {
        match species
            .iter_mut()
            .find(|s| same_species(&child, s.representative(), config))
        {
            Some(existing) => existing.genomes.push(child),
            None => species.push(Species::new(child)),
        }
    }

    /// Assign every genome its position in an ascending population-wide fitness sort.
    pub fn rank_globally(&mut self) {
        let mut all: Vec<&mut Genome> = self
            .species
            .iter_mut()
            .flat_map(|s| s.genomes.iter_mut())
            .collect();
        all.sort_by_key(|g| g.fitness);
        for (rank, genome) in all.into_iter().enumerate() {
            genome.global_rank = rank;
        }
    }

    /// Sum of species average fitness (mean global rank).
    pub fn total_average_fitness(&self) -> i64 {
        self.species.iter().map(|s| s.average_fitness).sum()
    }

    pub fn cull_species(&mut self, cut_to_one: bool) {
        for species in &mut self.species {
            species.cull(cut_to_one);
        }
    }

    /// Age species that did not improve and drop the ones stale for too long,
    /// unless they hold the population's best fitness.
    pub fn remove_stale_species(&mut self) {
        let max_fitness = self.max_fitness();
        let stale_limit = self.config.stale_species;

        self.species.retain_mut(|species| {
            species.sort_by_fitness();
            let best = species.representative().fitness;
            if best > species.top_fitness {
                species.top_fitness = best;
                species.staleness = 0;
            } else {
                species.staleness += 1;
            }
            species.staleness < stale_limit || species.top_fitness >= max_fitness
        });
    }

    /// Drop species whose breeding allocation rounds down to zero.
    ///
    /// With a zero total every species is kept.
    pub fn remove_weak_species(&mut self) {
        let sum = self.total_average_fitness();
        let population = self.config.population;
        if sum == 0 {
            return;
        }
        self.species
            .retain(|s| breed_quota(s.average_fitness, sum, population) >= 1);
    }

    /// Replace the evaluated population with the next generation.
    ///
    /// Returns the new generation number.
    pub fn new_generation(&mut self) -> u32 {
        self.cull_species(false);
        self.rank_globally();
        self.remove_stale_species();
        self.rank_globally();
        for species in &mut self.species {
            species.calculate_average_fitness();
        }
        self.remove_weak_species();

        let sum = self.total_average_fitness();
        let Self {
            config,
            innovations,
            species,
            rng,
            ..
        } = self;
        let population = config.population;
        let crossover_chance = config.crossover_chance;
        let mut ctx = MutationContext::new(rng, innovations, config);

        let mut children = Vec::with_capacity(population);
        for s in species.iter() {
            let quota = if sum == 0 {
                0
            } else {
                breed_quota(s.average_fitness, sum, population)
            };
            for _ in 0..quota {
                children.push(s.breed_child(&mut ctx, crossover_chance));
            }
        }

        for s in species.iter_mut() {
            s.cull(true);
        }

        while children.len() + species.len() < population {
            assert!(
                !species.is_empty(),
                "no species left to breed the population from"
            );
            let s = &species[ctx.rng.index(species.len())];
            children.push(s.breed_child(&mut ctx, crossover_chance));
        }

        for child in children {
            Self::insert_into_species(species, child, config);
        }

        self.generation += 1;
        log::info!(
            "Generation {}: {} species, {} genomes, max fitness {}",
            self.generation,
            self.species.len(),
            self.genome_count(),
            self.max_fitness()
        );
        self.write_generation_snapshot();
        self.generation
    }

    /// All genomes, species by species.
    pub fn genomes(&self) -> impl Iterator<Item = &Genome> {
        self.species.iter().flat_map(|s| s.genomes.iter())
    }

    pub fn genomes_mut(&mut self) -> impl Iterator<Item = &mut Genome> {
        self.species.iter_mut().flat_map(|s| s.genomes.iter_mut())
    }

    pub fn genome_count(&self) -> usize {
        self.species.iter().map(|s| s.genomes.len()).sum()
    }

    /// Mutable genomes alongside the shared fitness record, for parallel evaluation.
    pub(crate) fn evaluation_view(&mut self) -> (Vec<&mut Genome>, &AtomicI64) {
        let genomes = self
            .species
            .iter_mut()
            .flat_map(|s| s.genomes.iter_mut())
            .collect();
        (genomes, &self.max_fitness)
    }

    /// Whether every genome has finished its episode.
    pub fn all_finished(&self) -> bool {
        self.genomes().all(|g| g.finished)
    }

    /// Highest-fitness genome among those with a live episode.
    pub fn best_live_genome(&self) -> Option<&Genome> {
        self.genomes()
            .filter(|g| g.has_episode())
            .fold(None, |best: Option<&Genome>, g| match best {
                Some(b) if b.fitness >= g.fitness => Some(b),
                _ => Some(g),
            })
    }

    /// Share of finished genomes, as a whole percentage.
    pub fn percent_measured(&self) -> u32 {
        let total = self.genome_count();
        if total == 0 {
            return 0;
        }
        let finished = self.genomes().filter(|g| g.finished).count();
        (finished as f64 / total as f64 * 100.0) as u32
    }

    pub fn to_snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            version: SNAPSHOT_VERSION,
            generation: self.generation,
            innovation: self.innovations.last(),
            max_fitness: self.max_fitness(),
            input_size: self.config.input_size,
            species: self.species.iter().map(Species::to_snapshot).collect(),
        }
    }

    /// Replace the population with a snapshot's.
    ///
    /// On error the pool is left untouched. Restored genomes have no episode
    /// and are evaluated again.
    pub fn restore(&mut self, snapshot: &PoolSnapshot) -> Result<(), PersistError> {
        let found = snapshot.max_version();
        if found > SNAPSHOT_VERSION {
            return Err(PersistError::UnsupportedVersion { found });
        }
        if snapshot.input_size != self.config.input_size {
            return Err(PersistError::InputSizeMismatch {
                expected: self.config.input_size,
                found: snapshot.input_size,
            });
        }

        let layout = self.layout();
        self.species = snapshot
            .species
            .iter()
            .map(|s| Species::from_snapshot(s, layout))
            .collect();
        self.generation = snapshot.generation;
        self.innovations = InnovationCounter::starting_after(snapshot.innovation);
        self.max_fitness
            .store(snapshot.max_fitness, Ordering::Release);
        Ok(())
    }

    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistError> {
        write_snapshot(path, &self.to_snapshot())
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), PersistError> {
        let snapshot = read_snapshot(path)?;
        self.restore(&snapshot)
    }

    /// Manual save to the store's current-pool file. Failures are logged.
    pub fn save_pool(&self) {
        let Some(store) = &self.store else {
            log::warn!("Save skipped: no snapshot directory configured");
            return;
        };
        match store.save_current(&self.to_snapshot()) {
            Ok(path) => log::info!("Saved pool to {}", path.display()),
            Err(e) => log::warn!("Save failed: {e}"),
        }
    }

    /// Manual load from the store's current-pool file. Failures are logged
    /// and leave the pool as it was.
    pub fn load_pool(&mut self) {
        let Some(store) = &self.store else {
            log::warn!("Load skipped: no snapshot directory configured");
            return;
        };
        match store.load_current().and_then(|s| self.restore(&s)) {
            Ok(()) => log::info!(
                "Loaded pool at generation {} ({} genomes)",
                self.generation,
                self.genome_count()
            ),
            Err(e) => log::warn!("Load failed: {e}"),
        }
    }

    fn write_generation_snapshot(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.write_generation(&self.to_snapshot()) {
                log::warn!("Generation {} snapshot failed: {e}", self.generation);
            }
        }
    }
}

/// Children a species earns: its share of the summed average fitness times
/// the population, floored. `sum` must be non-zero.
fn breed_quota(average: i64, sum: i64, population: usize) -> usize {
    (average as f64 / sum as f64 * population as f64).floor().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(seed: u64) -> NeatConfig {
        NeatConfig {
            input_size: 200,
            population: 300,
            random_seed: Some(seed),
            ..Default::default()
        }
    }

    fn small_config(seed: u64) -> NeatConfig {
        NeatConfig {
            input_size: 8,
            outputs: 2,
            population: 40,
            max_nodes: 1000,
            random_seed: Some(seed),
            ..Default::default()
        }
    }

    fn finish_all(pool: &mut Pool, fitness: impl Fn(usize) -> i64) {
        for (i, genome) in pool.genomes_mut().enumerate() {
            genome.fitness = fitness(i);
            genome.finished = true;
        }
    }

    #[test]
    fn test_init_fills_population() {
        let mut pool = Pool::new(config(1));
        pool.init();
        assert!(!pool.species.is_empty());
        assert_eq!(pool.genome_count(), 300);
        assert!(pool.innovation() > 5);
    }

    #[test]
    fn test_new_generation_keeps_population() {
        let mut pool = Pool::new(config(2));
        pool.init();
        finish_all(&mut pool, |_| 1);

        let generation = pool.new_generation();
        assert_eq!(generation, 1);
        assert_eq!(pool.generation, 1);
        // top-up guarantees the floor; elites may push slightly past it
        assert!(pool.genome_count() >= 300);
    }

    #[test]
    fn test_varied_fitness_generations() {
        let mut pool = Pool::new(small_config(3));
        pool.init();
        for round in 0..5 {
            finish_all(&mut pool, |i| ((i * 7 + round) % 13) as i64);
            pool.new_generation();
            assert!(pool.genome_count() >= 40);
        }
        assert_eq!(pool.generation, 5);
    }

    #[test]
    fn test_cull_to_one() {
        let mut pool = Pool::new(small_config(4));
        pool.init();
        pool.cull_species(true);
        assert!(pool.species.iter().all(|s| s.genomes.len() == 1));
    }

    #[test]
    fn test_rank_globally_orders_by_fitness() {
        let mut pool = Pool::new(small_config(5));
        pool.init();
        finish_all(&mut pool, |i| (40 - i) as i64);
        pool.rank_globally();

        let mut ranked: Vec<(i64, usize)> =
            pool.genomes().map(|g| (g.fitness, g.global_rank)).collect();
        ranked.sort_by_key(|&(_, rank)| rank);
        assert!(ranked.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(ranked.last().map(|r| r.1), Some(39));
    }

    #[test]
    fn test_stale_species_removed_unless_best() {
        let mut pool = Pool::new(small_config(6));
        pool.init();
        pool.cull_species(true);
        let count = pool.species.len();
        for species in &mut pool.species {
            species.genomes[0].fitness = 1;
            species.top_fitness = 1;
            species.staleness = pool.config.stale_species;
        }
        pool.max_fitness.store(5, Ordering::Release);
        pool.remove_stale_species();
        assert!(pool.species.is_empty(), "{count} species should all be stale");

        let mut pool = Pool::new(small_config(6));
        pool.init();
        for species in &mut pool.species {
            species.top_fitness = 5;
            species.staleness = pool.config.stale_species;
        }
        pool.max_fitness.store(5, Ordering::Release);
        pool.remove_stale_species();
        assert!(!pool.species.is_empty());
    }

    #[test]
    fn test_weak_species_kept_on_zero_total() {
        let mut pool = Pool::new(small_config(7));
        pool.init();
        let count = pool.species.len();
        for species in &mut pool.species {
            species.average_fitness = 0;
        }
        pool.remove_weak_species();
        assert_eq!(pool.species.len(), count);
    }

    #[test]
    fn test_breed_quota_floors() {
        assert_eq!(breed_quota(1, 3, 10), 3);
        assert_eq!(breed_quota(0, 3, 10), 0);
        assert_eq!(breed_quota(3, 3, 10), 10);
    }

    #[test]
    fn test_same_seed_same_pool() {
        let mut a = Pool::new(small_config(9));
        let mut b = Pool::new(small_config(9));
        a.init();
        b.init();
        assert_eq!(a.to_snapshot(), b.to_snapshot());
    }

    #[test]
    fn test_percent_measured_and_best_live() {
        let mut pool = Pool::new(small_config(10));
        pool.init();
        assert_eq!(pool.percent_measured(), 0);
        assert!(pool.best_live_genome().is_none());

        for (i, genome) in pool.genomes_mut().enumerate() {
            genome.finished = i % 2 == 0;
        }
        assert_eq!(pool.percent_measured(), 50);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool.json");

        let mut pool = Pool::new(small_config(11));
        pool.init();
        finish_all(&mut pool, |i| i as i64 - 3);
        pool.new_generation();
        pool.write_file(&path).unwrap();

        let mut restored = Pool::new(small_config(99));
        restored.load_file(&path).unwrap();

        assert_eq!(restored.generation, pool.generation);
        assert_eq!(restored.innovation(), pool.innovation());
        assert_eq!(restored.species.len(), pool.species.len());
        for (a, b) in pool.genomes().zip(restored.genomes()) {
            assert_eq!(a.genes, b.genes);
            assert_eq!(a.fitness, b.fitness);
            assert_eq!(a.mutation_rates, b.mutation_rates);
            assert!(!b.has_episode());
        }
    }

    #[test]
    fn test_innovation_continues_after_restore() {
        let mut pool = Pool::new(small_config(14));
        pool.init();
        let last = pool.innovation();
        assert_eq!(pool.new_innovation(), last + 1);

        let snapshot = pool.to_snapshot();
        let mut restored = Pool::new(small_config(15));
        restored.restore(&snapshot).unwrap();
        assert_eq!(restored.new_innovation(), last + 2);
    }

    #[test]
    fn test_restore_rejects_mismatched_input() {
        let mut pool = Pool::new(small_config(12));
        pool.init();
        let snapshot = pool.to_snapshot();

        let mut other = Pool::new(NeatConfig {
            input_size: 9,
            ..small_config(12)
        });
        assert!(matches!(
            other.restore(&snapshot),
            Err(PersistError::InputSizeMismatch { .. })
        ));
        assert!(other.species.is_empty());
    }

    #[test]
    fn test_load_pool_failure_keeps_state() {
        let dir = tempdir().unwrap();
        let mut pool = Pool::new(NeatConfig {
            snapshot_dir: Some(dir.path().to_path_buf()),
            ..small_config(13)
        });
        pool.init();
        let before = pool.to_snapshot();

        // nothing saved yet
        pool.load_pool();
        assert_eq!(pool.to_snapshot(), before);

        pool.save_pool();
        assert!(dir.path().join("pool.json").exists());
        assert!(dir.path().join("backup0.json").exists());
    }
}
