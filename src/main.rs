//! neuroevolve CLI - Evolve networks on the demo task from a JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use neuroevolve::{
    compute::evolution::{Coordinator, Pool},
    schema::NeatConfig,
    task::{Catcher, TaskSimulation},
};

/// Demo board dimensions; `input_size` must equal their product.
const BOARD_WIDTH: usize = 10;
const BOARD_HEIGHT: usize = 20;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [generations]", args[0]);
        eprintln!();
        eprintln!("Evolve networks on the falling-block demo task.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to NEAT configuration file");
        eprintln!("  generations  Number of generations to run (default: 10)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let generations: u32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: NeatConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    if config.input_size != BOARD_WIDTH * BOARD_HEIGHT {
        eprintln!(
            "input_size must be {} for the {}x{} demo board",
            BOARD_WIDTH * BOARD_HEIGHT,
            BOARD_WIDTH,
            BOARD_HEIGHT
        );
        std::process::exit(1);
    }

    println!("neuroevolve");
    println!("===========");
    println!(
        "Population: {} ({} inputs, {} outputs)",
        config.population, config.input_size, config.outputs
    );
    println!("Generations: {}", generations);
    if let Some(dir) = &config.snapshot_dir {
        println!("Snapshots: {}", dir.display());
    }
    println!();

    let mut pool = Pool::new(config.clone());
    pool.init();
    println!(
        "Initial pool: {} genomes in {} species",
        pool.genome_count(),
        pool.species.len()
    );

    let factory = |seed: u64| -> Box<dyn TaskSimulation> {
        Box::new(Catcher::new(BOARD_WIDTH, BOARD_HEIGHT, seed))
    };
    let mut coordinator = Coordinator::new(factory, &config.evaluation);

    println!("Evolving...");
    let start = Instant::now();

    let report = coordinator.run(&mut pool, generations, |report| {
        let elapsed = start.elapsed().as_secs_f32();
        println!(
            "  Generation {}: max fitness={}, species={}, genomes={}, {:.1}s",
            report.generation, report.max_fitness, report.species, report.population, elapsed
        );
    });

    if pool.config().snapshot_dir.is_some() {
        pool.save_pool();
    }

    println!();
    println!("Final generation: {}", report.generation);
    println!("Max fitness: {}", report.max_fitness);
    println!(
        "Time: {:.2}s ({} evaluation passes)",
        start.elapsed().as_secs_f32(),
        coordinator.passes()
    );
}

fn print_example_config() {
    let config = NeatConfig {
        input_size: BOARD_WIDTH * BOARD_HEIGHT,
        snapshot_dir: Some(PathBuf::from("snapshots")),
        ..Default::default()
    };

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
