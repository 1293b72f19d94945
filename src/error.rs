//! Error types for minimax-db
//!
//! Per-trial and per-record failures are isolated by the callers; the
//! variants here distinguish structural errors (fatal to the enclosing
//! operation) from the novelty/consistency signals the regression engine
//! aggregates into its report.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// minimax-db error types
#[derive(Error, Debug)]
pub enum Error {
    /// Unrecognized domain tag in a design record or driver configuration
    #[error("unrecognized domain tag '{0}' (supported: \"square\")")]
    InvalidDomainTag(String),

    /// Point dimensionality does not match the domain
    #[error("dimension mismatch: domain is {domain}-dimensional, point is {point}-dimensional")]
    DimensionMismatch {
        /// Domain dimensionality
        domain: usize,
        /// Offending point dimensionality
        point: usize,
    },

    /// A design point lies outside its domain
    #[error("point {index} lies outside the domain")]
    PointOutsideDomain {
        /// Index of the offending point within the design
        index: usize,
    },

    /// The geometry computation cannot produce a finite coverage radius
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// Every search trial for a design size failed
    #[error("no feasible design of size {size}: every trial failed")]
    NoFeasibleDesign {
        /// Requested design size
        size: usize,
    },

    /// Corpus tree contains a file that is not a well-formed design file
    #[error("invalid repository layout: {0}")]
    InvalidRepositoryLayout(String),

    /// No baseline record exists at the given path (novelty signal, non-fatal)
    #[error("no baseline record at '{0}'")]
    BaselineNotFound(String),

    /// Remote baseline fetch failed (fatal for that record only)
    #[error("remote fetch failed: {0}")]
    RemoteFetchError(String),

    /// Recomputed radius disagrees with the stored radius beyond tolerance
    #[error(
        "tolerance violation: measured radius {measured:.15e} disagrees with reported {reported:.15e}"
    )]
    ToleranceViolation {
        /// Radius recomputed by the coverage oracle
        measured: f64,
        /// Radius claimed by the design record
        reported: f64,
    },

    /// Local radius exceeds the baseline radius beyond tolerance
    #[error("regression: local radius {local:.15e} exceeds baseline {baseline:.15e}")]
    RegressionViolation {
        /// Radius of the local design record
        local: f64,
        /// Radius of the canonical baseline record
        baseline: f64,
    },

    /// Invalid configuration input (check mode, root directory, ...)
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
