//! Best-of-N parallel search driver
//!
//! Runs an external point-placement optimizer once per seed, computes the
//! authoritative coverage radius for every candidate with the oracle, and
//! selects the seed minimizing the radius. Every `(size, seed)` trial is
//! memoized through a [`TrialStore`], so re-running a batch after adding
//! seeds reuses prior work. A failed optimizer run is recorded as a failure
//! record (`radius = +inf`) rather than aborting the batch; the minimizing
//! selection then skips it naturally.
//!
//! Trials are CPU-bound and run on `spawn_blocking` workers, keeping the
//! async reactor free for store and baseline I/O.

mod trial_store;

pub use trial_store::{trial_key, FileTrialStore, MemoryTrialStore, TrialStore};

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::coverage::coverage_radius;
use crate::design::DesignRecord;
use crate::domain::BoxDomain;
use crate::{Error, Result};

/// Opaque error type the external optimizer may fail with.
pub type OptimizerError = Box<dyn std::error::Error + Send + Sync>;

/// Collaborator boundary: the black-box point-placement optimizer.
///
/// Implementations produce a candidate point set for `size` points under
/// the given seed; any failure is treated as a failed trial, never as a
/// fatal error for the batch.
pub trait Optimizer: Send + Sync {
    /// Produce a candidate design of `size` points inside `domain`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the driver maps all failures to a failure
    /// record.
    fn optimize(
        &self,
        domain: &BoxDomain,
        size: usize,
        seed: u64,
        max_iterations: usize,
        tolerance: f64,
    ) -> std::result::Result<Vec<Vec<f64>>, OptimizerError>;
}

/// Optimizer settings recorded in every emitted design's provenance notes.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Author attribution written into emitted records.
    pub author: String,
    /// Iteration budget handed to the optimizer.
    pub max_iterations: usize,
    /// Convergence tolerance handed to the optimizer.
    pub tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            author: "minimax-db search driver".to_string(),
            max_iterations: 500,
            tolerance: 1e-9,
        }
    }
}

/// Best-of-N search driver over a seed set.
pub struct SearchDriver<O, S> {
    domain: Arc<BoxDomain>,
    domain_tag: String,
    optimizer: Arc<O>,
    store: Arc<S>,
    config: Arc<SearchConfig>,
}

impl<O, S> std::fmt::Debug for SearchDriver<O, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchDriver")
            .field("domain", &self.domain)
            .field("domain_tag", &self.domain_tag)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<O, S> Clone for SearchDriver<O, S> {
    fn clone(&self) -> Self {
        Self {
            domain: Arc::clone(&self.domain),
            domain_tag: self.domain_tag.clone(),
            optimizer: Arc::clone(&self.optimizer),
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<O, S> SearchDriver<O, S>
where
    O: Optimizer + 'static,
    S: TrialStore + 'static,
{
    /// Create a driver for the domain identified by `domain_tag`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDomainTag`] when the tag is unrecognized.
    pub fn new(domain_tag: &str, optimizer: O, store: S, config: SearchConfig) -> Result<Self> {
        let domain = BoxDomain::from_tag(domain_tag)?;
        Ok(Self {
            domain: Arc::new(domain),
            domain_tag: domain_tag.to_string(),
            optimizer: Arc::new(optimizer),
            store: Arc::new(store),
            config: Arc::new(config),
        })
    }

    /// Shared handle to the trial store.
    #[must_use]
    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    /// Run (or recall) a single `(size, seed)` trial.
    ///
    /// # Errors
    ///
    /// Store and serialization failures propagate; optimizer failures are
    /// recorded as failure records, not errors.
    pub async fn run_trial(&self, size: usize, seed: u64) -> Result<DesignRecord> {
        let key = trial_key(size, seed);
        if let Some(bytes) = self.store.get(&key).await? {
            debug!(size, seed, "trial memoized, skipping recomputation");
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let domain = Arc::clone(&self.domain);
        let optimizer = Arc::clone(&self.optimizer);
        let config = Arc::clone(&self.config);
        let tag = self.domain_tag.clone();
        let record = tokio::task::spawn_blocking(move || {
            compute_trial(&domain, &tag, optimizer.as_ref(), &config, size, seed)
        })
        .await
        .unwrap_or_else(|join_err| {
            warn!(size, seed, error = %join_err, "trial worker aborted");
            DesignRecord::failure()
        });

        let inserted = self
            .store
            .put_if_absent(&key, serde_json::to_vec(&record)?)
            .await?;
        if !inserted {
            // A concurrent trial landed first; its result is canonical.
            if let Some(bytes) = self.store.get(&key).await? {
                return Ok(serde_json::from_slice(&bytes)?);
            }
        }

        info!(size, seed, radius = record.radius, "trial finished");
        Ok(record)
    }

    /// Run all seeds for `size` in parallel and return the best design.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFeasibleDesign`] when every trial failed; store
    /// and serialization failures propagate.
    pub async fn run_batch(&self, size: usize, seeds: &[u64]) -> Result<DesignRecord> {
        let mut handles = Vec::with_capacity(seeds.len());
        for &seed in seeds {
            let driver = self.clone();
            handles.push((
                seed,
                tokio::spawn(async move { driver.run_trial(size, seed).await }),
            ));
        }

        let mut best: Option<(u64, DesignRecord)> = None;
        for (seed, handle) in handles {
            let record = match handle.await {
                Ok(result) => result?,
                Err(join_err) => {
                    warn!(size, seed, error = %join_err, "trial task aborted");
                    continue;
                }
            };
            if record.is_failure() {
                continue;
            }
            let better = best
                .as_ref()
                .map_or(true, |(_, current)| record.radius < current.radius);
            if better {
                best = Some((seed, record));
            }
        }

        match best {
            Some((seed, record)) => {
                info!(size, seed, radius = record.radius, "selected best trial");
                Ok(record)
            }
            None => Err(Error::NoFeasibleDesign { size }),
        }
    }
}

/// One full trial: optimize, then measure with the oracle.
fn compute_trial<O: Optimizer>(
    domain: &BoxDomain,
    domain_tag: &str,
    optimizer: &O,
    config: &SearchConfig,
    size: usize,
    seed: u64,
) -> DesignRecord {
    let points = match optimizer.optimize(domain, size, seed, config.max_iterations, config.tolerance)
    {
        Ok(points) => points,
        Err(err) => {
            warn!(size, seed, error = %err, "optimizer failed, recording failed trial");
            return DesignRecord::failure();
        }
    };

    match coverage_radius(domain, &points) {
        Ok(radius) => DesignRecord::new(&config.author, domain_tag, radius, points).with_notes(
            format!(
                "seed={seed}, maxiter={}, xtol={:e}",
                config.max_iterations, config.tolerance
            ),
        ),
        Err(err) => {
            warn!(size, seed, error = %err, "coverage oracle rejected candidate");
            DesignRecord::failure()
        }
    }
}
