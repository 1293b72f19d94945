//! Search driver integration tests
//!
//! Uses a deterministic fixture optimizer so the driver's behaviors can be
//! checked exactly: memoization (the optimizer runs once per key), failure
//! isolation (a bad seed never poisons the batch), and best-of-N selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use minimax_db::domain::BoxDomain;
use minimax_db::search::{
    trial_key, FileTrialStore, MemoryTrialStore, Optimizer, OptimizerError, SearchConfig,
    SearchDriver, TrialStore,
};
use minimax_db::Error;

/// Places a centered k x k grid where k = seed + 1, counting invocations.
/// Larger seeds therefore produce strictly better (smaller) radii.
struct GridOptimizer {
    calls: Arc<AtomicUsize>,
}

impl Optimizer for GridOptimizer {
    fn optimize(
        &self,
        _domain: &BoxDomain,
        _size: usize,
        seed: u64,
        _max_iterations: usize,
        _tolerance: f64,
    ) -> Result<Vec<Vec<f64>>, OptimizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let k = seed as usize + 1;
        let step = 1.0 / k as f64;
        let mut points = Vec::with_capacity(k * k);
        for i in 0..k {
            for j in 0..k {
                points.push(vec![(i as f64 + 0.5) * step, (j as f64 + 0.5) * step]);
            }
        }
        Ok(points)
    }
}

/// Fails on even seeds, degenerates (point outside the box) on seed 5.
struct FlakyOptimizer;

impl Optimizer for FlakyOptimizer {
    fn optimize(
        &self,
        _domain: &BoxDomain,
        _size: usize,
        seed: u64,
        _max_iterations: usize,
        _tolerance: f64,
    ) -> Result<Vec<Vec<f64>>, OptimizerError> {
        if seed % 2 == 0 {
            return Err("no convergence".into());
        }
        if seed == 5 {
            return Ok(vec![vec![2.0, 2.0]]);
        }
        Ok(vec![vec![0.5, 0.5]])
    }
}

struct AlwaysFails;

impl Optimizer for AlwaysFails {
    fn optimize(
        &self,
        _domain: &BoxDomain,
        _size: usize,
        _seed: u64,
        _max_iterations: usize,
        _tolerance: f64,
    ) -> Result<Vec<Vec<f64>>, OptimizerError> {
        Err("singular basis".into())
    }
}

#[tokio::test]
async fn trial_is_computed_once_per_key() {
    let calls = Arc::new(AtomicUsize::new(0));
    let driver = SearchDriver::new(
        "square",
        GridOptimizer {
            calls: Arc::clone(&calls),
        },
        MemoryTrialStore::new(),
        SearchConfig::default(),
    )
    .unwrap();

    let first = driver.run_trial(4, 1).await.unwrap();
    let second = driver.run_trial(4, 1).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A different seed is a different key.
    driver.run_trial(4, 2).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(driver.store().exists(&trial_key(4, 1)).await.unwrap());
}

#[tokio::test]
async fn batch_selects_the_smallest_radius() {
    let calls = Arc::new(AtomicUsize::new(0));
    let driver = SearchDriver::new(
        "square",
        GridOptimizer { calls },
        MemoryTrialStore::new(),
        SearchConfig::default(),
    )
    .unwrap();

    let best = driver.run_batch(9, &[0, 1, 2]).await.unwrap();
    // Seed 2 yields the 3x3 grid, radius sqrt(2)/6.
    let expected = std::f64::consts::SQRT_2 / 6.0;
    assert!((best.radius - expected).abs() < 1e-9);
    assert_eq!(best.size(), 9);
    assert_eq!(best.domain.as_deref(), Some("square"));
}

#[tokio::test]
async fn failed_seeds_are_isolated_and_memoized() {
    let driver = SearchDriver::new(
        "square",
        FlakyOptimizer,
        MemoryTrialStore::new(),
        SearchConfig::default(),
    )
    .unwrap();

    // Seeds 0, 2, 4 fail outright and seed 5 is rejected by the oracle;
    // seeds 1 and 3 succeed.
    let best = driver.run_batch(1, &[0, 1, 2, 3, 4, 5]).await.unwrap();
    assert!((best.radius - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);

    // Failures are memoized too, as failure records.
    let failed = driver.run_trial(1, 0).await.unwrap();
    assert!(failed.is_failure());
    assert_eq!(driver.store().len(), 6);
}

#[tokio::test]
async fn all_failures_yield_no_feasible_design() {
    let driver = SearchDriver::new(
        "square",
        AlwaysFails,
        MemoryTrialStore::new(),
        SearchConfig::default(),
    )
    .unwrap();

    let err = driver.run_batch(3, &[0, 1, 2]).await.unwrap_err();
    assert!(matches!(err, Error::NoFeasibleDesign { size: 3 }));
}

#[tokio::test]
async fn unknown_domain_tag_fails_construction() {
    let result = SearchDriver::new(
        "torus",
        AlwaysFails,
        MemoryTrialStore::new(),
        SearchConfig::default(),
    );
    assert!(matches!(result.unwrap_err(), Error::InvalidDomainTag(_)));
}

#[tokio::test]
async fn memoized_trials_survive_a_driver_restart() {
    let cache = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let first_run = {
        let driver = SearchDriver::new(
            "square",
            GridOptimizer {
                calls: Arc::clone(&calls),
            },
            FileTrialStore::new(cache.path()).unwrap(),
            SearchConfig::default(),
        )
        .unwrap();
        driver.run_trial(4, 1).await.unwrap()
    };
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A fresh driver on the same cache directory stands in for a process
    // restart: the trial is recalled, not recomputed.
    let driver = SearchDriver::new(
        "square",
        GridOptimizer {
            calls: Arc::clone(&calls),
        },
        FileTrialStore::new(cache.path()).unwrap(),
        SearchConfig::default(),
    )
    .unwrap();
    let recalled = driver.run_trial(4, 1).await.unwrap();
    assert_eq!(recalled, first_run);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn records_carry_provenance_notes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let driver = SearchDriver::new(
        "square",
        GridOptimizer { calls },
        MemoryTrialStore::new(),
        SearchConfig {
            author: "fixture".to_string(),
            ..SearchConfig::default()
        },
    )
    .unwrap();

    let record = driver.run_trial(1, 0).await.unwrap();
    assert_eq!(record.author.as_deref(), Some("fixture"));
    let notes = record.notes.unwrap();
    assert!(notes.contains("seed=0"), "notes: {notes}");
    assert!(notes.contains("maxiter=500"), "notes: {notes}");
}
