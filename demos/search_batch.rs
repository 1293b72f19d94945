//! Best-of-N Search Demo - Parallel Trials with Memoization
//!
//! Run with: `cargo run --example search_batch`
//!
//! Drives the search pipeline with a simple random-restart optimizer: each
//! seed places points uniformly in the unit square and greedily nudges the
//! closest pair apart for a few rounds. The batch keeps the design with the
//! smallest certified coverage radius; rerunning a seed hits the trial
//! store instead of recomputing.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use minimax_db::coverage::nearest_distance;
use minimax_db::domain::BoxDomain;
use minimax_db::search::{
    MemoryTrialStore, Optimizer, OptimizerError, SearchConfig, SearchDriver,
};

/// Random restart with pairwise repulsion. Deterministic per seed.
struct RepulsionOptimizer;

impl Optimizer for RepulsionOptimizer {
    fn optimize(
        &self,
        domain: &BoxDomain,
        size: usize,
        seed: u64,
        max_iterations: usize,
        _tolerance: f64,
    ) -> Result<Vec<Vec<f64>>, OptimizerError> {
        let d = domain.dimension();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut points: Vec<Vec<f64>> = (0..size)
            .map(|_| {
                (0..d)
                    .map(|k| rng.gen_range(domain.lo()[k]..=domain.hi()[k]))
                    .collect()
            })
            .collect();

        for _ in 0..max_iterations {
            let Some((i, j)) = closest_pair(&points) else {
                break;
            };
            // Push the closest pair apart, clamped to the box.
            for k in 0..d {
                let delta = 0.05 * (points[i][k] - points[j][k]);
                points[i][k] = (points[i][k] + delta).clamp(domain.lo()[k], domain.hi()[k]);
                points[j][k] = (points[j][k] - delta).clamp(domain.lo()[k], domain.hi()[k]);
            }
        }
        Ok(points)
    }
}

fn closest_pair(points: &[Vec<f64>]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let dist = nearest_distance(&points[i..=i], &points[j]);
            if best.map_or(true, |(_, _, b)| dist < b) {
                best = Some((i, j, dist));
            }
        }
    }
    best.map(|(i, j, _)| (i, j))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Minimax-DB Best-of-N Search Demo ===\n");

    let driver = SearchDriver::new(
        "square",
        RepulsionOptimizer,
        MemoryTrialStore::new(),
        SearchConfig::default(),
    )?;

    let seeds: Vec<u64> = (0..16).collect();
    for size in [5_usize, 9, 13] {
        let started = Instant::now();
        let best = driver.run_batch(size, &seeds).await?;
        println!(
            "size {size:2}: best radius {:.6} over {} seeds in {:?}",
            best.radius,
            seeds.len(),
            started.elapsed()
        );
    }

    // Second pass over the same seeds is pure recall.
    let started = Instant::now();
    let recalled = driver.run_batch(9, &seeds).await?;
    println!(
        "\nmemoized rerun (size 9): radius {:.6} in {:?}, {} trials stored",
        recalled.radius,
        started.elapsed(),
        driver.store().len()
    );

    Ok(())
}
