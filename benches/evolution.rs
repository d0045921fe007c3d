//! Benchmarks for neuroevolve network evaluation and generational turnover.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use neuroevolve::{
    compute::evolution::{Genome, GenomeRng, InnovationCounter, MutationContext, Pool},
    schema::NeatConfig,
};

fn evolved_genome(config: &NeatConfig, rounds: usize) -> Genome {
    let mut rng = GenomeRng::new(7);
    let mut innovations = InnovationCounter::starting_after(config.outputs as i32);
    let mut ctx = MutationContext::new(&mut rng, &mut innovations, config);

    let mut genome = Genome::new(config.mutation_rates, config.input_size as i32);
    for _ in 0..rounds {
        genome.mutate(&mut ctx);
    }
    genome
}

fn bench_network_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("network_evaluate");
    let config = NeatConfig::default();
    let inputs: Vec<f32> = (0..config.input_size)
        .map(|i| if i % 7 == 0 { 1.0 } else { 0.0 })
        .collect();

    for rounds in [1, 10, 50] {
        let mut genome = evolved_genome(&config, rounds);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_genes", genome.genes.len())),
            &rounds,
            |b, _| {
                b.iter(|| black_box(genome.evaluate_network(black_box(&inputs))));
            },
        );
    }

    group.finish();
}

fn bench_new_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("new_generation");
    group.sample_size(20);

    for population in [100, 300] {
        let config = NeatConfig {
            population,
            random_seed: Some(1),
            ..Default::default()
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(population),
            &population,
            |b, _| {
                b.iter_batched(
                    || {
                        let mut pool = Pool::new(config.clone());
                        pool.init();
                        for (i, genome) in pool.genomes_mut().enumerate() {
                            genome.fitness = (i % 17) as i64;
                            genome.finished = true;
                        }
                        pool
                    },
                    |mut pool| {
                        pool.new_generation();
                        pool
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_network_evaluate, bench_new_generation);
criterion_main!(benches);
