//! neuroevolve - NEAT neuroevolution of variable-topology networks.
//!
//! This crate evolves populations of sparse neural networks with
//! historical-marking crossover, dynamic speciation and parallel fitness
//! evaluation against an external task.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Configuration and snapshot records
//! - `compute`: The evolutionary engine (genomes, species, pool, coordinator)
//! - `task`: The contract a task simulation implements, plus a demo task
//!
//! # Example
//!
//! ```rust,no_run
//! use neuroevolve::{Coordinator, NeatConfig, Pool};
//! use neuroevolve::task::{Catcher, TaskSimulation};
//!
//! let config = NeatConfig::default();
//! let mut pool = Pool::new(config.clone());
//! pool.init();
//!
//! let factory = |seed: u64| -> Box<dyn TaskSimulation> { Box::new(Catcher::new(10, 20, seed)) };
//! let mut coordinator = Coordinator::new(factory, &config.evaluation);
//! let report = coordinator.run_generation(&mut pool);
//!
//! println!("Generation {} max fitness: {}", report.generation, report.max_fitness);
//! ```

pub mod compute;
pub mod schema;
pub mod task;

// Re-export commonly used types
pub use compute::evolution::{Coordinator, GenerationReport, Genome, Pool};
pub use schema::{NeatConfig, PoolSnapshot};
pub use task::{Actions, TaskFactory, TaskSimulation};
