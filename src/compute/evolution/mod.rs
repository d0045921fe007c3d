//! NEAT neuroevolution: evolving variable-topology networks against a task.
//!
//! # Overview
//!
//! The engine is layered leaf-first:
//!
//! - **Genes** (`gene`): weighted connections tagged with innovation ids
//! - **Networks** (`network`): sparse neuron graphs derived from enabled genes
//! - **Genomes** (`genome`): gene lists, adaptive mutation rates, mutation operators
//! - **Species** (`species`): compatibility clusters, crossover and breeding
//! - **Pool** (`pool`): the population, generational turnover and snapshots
//! - **Coordinator** (`coordinator`): parallel evaluation against a task
//!
//! # Example
//!
//! ```rust,no_run
//! use neuroevolve::compute::evolution::{Coordinator, Pool};
//! use neuroevolve::schema::NeatConfig;
//! use neuroevolve::task::{Catcher, TaskSimulation};
//!
//! let config = NeatConfig {
//!     input_size: 10 * 20,
//!     random_seed: Some(42),
//!     ..Default::default()
//! };
//!
//! let mut pool = Pool::new(config.clone());
//! pool.init();
//!
//! let factory = |seed: u64| -> Box<dyn TaskSimulation> { Box::new(Catcher::new(10, 20, seed)) };
//! let mut coordinator = Coordinator::new(factory, &config.evaluation);
//! coordinator.run(&mut pool, 10, |report| {
//!     println!("Generation {}: max fitness = {}", report.generation, report.max_fitness);
//! });
//! ```
//!
//! # Generational turnover
//!
//! Once every genome has finished its episode, [`Pool::new_generation`]
//! halves each species, ranks the population, drops stale and weak species,
//! breeds children in proportion to each species' mean rank, keeps one elite
//! per species and re-speciates the children.

mod coordinator;
mod gene;
mod genome;
mod network;
mod persistence;
mod pool;
mod rng;
mod species;

pub use coordinator::{Coordinator, GenerationReport};
pub use gene::{Gene, InnovationCounter, NodeId};
pub use genome::{Genome, MutationContext};
pub use network::{Network, Neuron, NodeLayout, sigmoid};
pub use persistence::{
    CURRENT_POOL_FILE, PersistError, SnapshotStore, read_snapshot, write_snapshot,
};
pub use pool::Pool;
pub use rng::{GenomeRng, episode_seed};
pub use species::{Species, crossover, disjoint, same_species, weights};
