//! Design-repository diff and regression engine
//!
//! A read-only verification pass over the local corpus: every discovered
//! design record is classified against the canonical remote baseline
//! ([`BaselineDiff`]), re-verified from first principles with the coverage
//! oracle (independently of its stored radius), and held to the monotonic
//! non-regression invariant - a new record must match or improve on the
//! baseline radius. Per-record failures are isolated; only structural
//! problems (invalid layout, bad configuration) abort a run.
//!
//! CPU-bound recomputation runs on `spawn_blocking` workers while baseline
//! fetches stay on the async reactor, so slow remote responses never block
//! local verification and vice versa.

mod baseline;

pub use baseline::{BaselineSource, HttpBaseline, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use tracing::{info, warn};

use crate::coverage::{approx_eq, coverage_radius};
use crate::design::{self, DesignRecord};
use crate::domain::BoxDomain;
use crate::{Error, Result};

/// Environment variable selecting the [`CheckMode`].
pub const ENV_CHECK: &str = "MINIMAX_DB_CHECK";

/// Environment variable selecting the corpus root directory.
pub const ENV_ROOT: &str = "MINIMAX_DB_ROOT";

/// Which locally discovered records receive the full verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckMode {
    /// Verify every record in the corpus.
    All,
    /// Verify only records that differ from (or are absent in) the baseline.
    Novel,
}

impl CheckMode {
    /// Parse a configuration value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] for anything but `"all"` or
    /// `"novel"`.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "all" => Ok(Self::All),
            "novel" => Ok(Self::Novel),
            other => Err(Error::ConfigurationError(format!(
                "check mode must be 'all' or 'novel', got '{other}'"
            ))),
        }
    }

    /// The configuration spelling of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Novel => "novel",
        }
    }
}

/// How hard the non-regression invariant is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A regression makes the run fail.
    Strict,
    /// Regressions are reported but the run still passes.
    Advisory,
}

/// Regression engine configuration.
#[derive(Debug, Clone)]
pub struct RegressionConfig {
    /// Local corpus root (contains the `designs/` tree).
    pub root: PathBuf,
    /// Record selection mode.
    pub check_mode: CheckMode,
    /// Enforcement severity for the non-regression invariant.
    pub severity: Severity,
    /// Relative tolerance for radius comparisons.
    pub rtol: f64,
    /// Absolute tolerance for radius comparisons.
    pub atol: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            check_mode: CheckMode::Novel,
            severity: Severity::Strict,
            rtol: 1e-10,
            atol: 1e-10,
        }
    }
}

impl RegressionConfig {
    /// Build a configuration from `MINIMAX_DB_CHECK` / `MINIMAX_DB_ROOT`.
    ///
    /// Unset variables fall back to the defaults (`novel`, `.`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] for an invalid check mode.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(ENV_CHECK) {
            config.check_mode = CheckMode::parse(&value)?;
        }
        if let Ok(value) = std::env::var(ENV_ROOT) {
            config.root = PathBuf::from(value);
        }
        Ok(config)
    }
}

/// Three-way comparison of a local record against its baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaselineDiff {
    /// No baseline record exists at the path.
    New,
    /// Local record equals the baseline.
    Unchanged,
    /// Local record differs from the baseline.
    Changed,
    /// The baseline could not be fetched (hard failure for this record).
    FetchFailed(String),
}

impl BaselineDiff {
    /// Whether this record counts as novel for `CheckMode::Novel` selection.
    #[must_use]
    pub fn is_novel(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Classify a local record against a fetched baseline.
#[must_use]
pub fn classify(local: &DesignRecord, baseline: Option<&DesignRecord>) -> BaselineDiff {
    match baseline {
        None => BaselineDiff::New,
        Some(b) if b == local => BaselineDiff::Unchanged,
        Some(_) => BaselineDiff::Changed,
    }
}

/// Result of checking one design record.
#[derive(Debug)]
pub struct RecordOutcome {
    /// Record path relative to the corpus root.
    pub path: String,
    /// Novelty classification; `None` when the local file was unreadable.
    pub diff: Option<BaselineDiff>,
    /// Radius claimed by the local record, when it parsed.
    pub reported_radius: Option<f64>,
    /// Radius recomputed by the oracle, when verification ran.
    pub measured_radius: Option<f64>,
    /// Radius of the baseline record, when one exists.
    pub baseline_radius: Option<f64>,
    /// Whether the full verification pass ran for this record.
    pub checked: bool,
    /// Everything that went wrong for this record.
    pub errors: Vec<Error>,
}

impl RecordOutcome {
    /// Whether the record came through without any violation or failure.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether a non-regression violation fired.
    #[must_use]
    pub fn has_regression(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, Error::RegressionViolation { .. }))
    }

    /// Whether the recomputed radius disagreed with the stored one.
    #[must_use]
    pub fn has_tolerance_violation(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, Error::ToleranceViolation { .. }))
    }
}

/// Aggregated result of one category check.
#[derive(Debug)]
pub struct RegressionReport {
    /// Category path, e.g. `minimax/l2`.
    pub category: String,
    /// Selection mode the report was generated under.
    pub check_mode: CheckMode,
    /// Wall-clock generation time.
    pub generated_at: DateTime<Utc>,
    /// Per-record outcomes, in corpus path order.
    pub outcomes: Vec<RecordOutcome>,
}

impl RegressionReport {
    /// Number of records classified as novel.
    #[must_use]
    pub fn novel_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.diff.as_ref().is_some_and(BaselineDiff::is_novel))
            .count()
    }

    /// Number of records identical to their baseline.
    #[must_use]
    pub fn unchanged_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.diff == Some(BaselineDiff::Unchanged))
            .count()
    }

    /// Number of records that received the full verification pass.
    #[must_use]
    pub fn checked_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.checked).count()
    }

    /// Number of non-regression violations across all records.
    #[must_use]
    pub fn regression_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.has_regression()).count()
    }

    /// Number of consistency (tolerance) violations across all records.
    #[must_use]
    pub fn tolerance_violation_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.has_tolerance_violation())
            .count()
    }

    /// Check the corpus-level monotonicity invariant: a larger optimal
    /// design must cover at least as well, so the best recorded radius at
    /// size `n` must not exceed the best at any smaller size beyond
    /// tolerance.
    ///
    /// Sizes are parsed from the record filenames; the measured radius is
    /// preferred over the reported one, and failure records are ignored.
    /// Returns the offending `(smaller size, larger size)` pairs of
    /// adjacent recorded sizes, empty for a monotone corpus.
    #[must_use]
    pub fn monotonicity_violations(&self, rtol: f64, atol: f64) -> Vec<(usize, usize)> {
        let mut best: BTreeMap<usize, f64> = BTreeMap::new();
        for outcome in &self.outcomes {
            let Some(radius) = outcome.measured_radius.or(outcome.reported_radius) else {
                continue;
            };
            if !radius.is_finite() {
                continue;
            }
            let Ok(size) = design::design_size_from_path(Path::new(&outcome.path)) else {
                continue;
            };
            best.entry(size)
                .and_modify(|r| *r = r.min(radius))
                .or_insert(radius);
        }

        let mut violations = Vec::new();
        let mut previous: Option<(usize, f64)> = None;
        for (&size, &radius) in &best {
            if let Some((smaller, smaller_radius)) = previous {
                if radius > smaller_radius && !approx_eq(radius, smaller_radius, rtol, atol) {
                    warn!(
                        smaller,
                        larger = size,
                        "corpus radius grows with design size"
                    );
                    violations.push((smaller, size));
                }
            }
            previous = Some((size, radius));
        }
        violations
    }

    /// Whether the run passes under the given severity.
    ///
    /// `Advisory` tolerates non-regression violations; everything else
    /// (tolerance violations, fetch failures, malformed records) always
    /// fails the run.
    #[must_use]
    pub fn is_clean(&self, severity: Severity) -> bool {
        self.outcomes.iter().all(|outcome| {
            outcome.errors.iter().all(|e| {
                matches!(e, Error::RegressionViolation { .. })
                    && matches!(severity, Severity::Advisory)
            })
        })
    }
}

/// Read-only verification engine over a local corpus and a remote baseline.
pub struct RegressionEngine<B> {
    config: RegressionConfig,
    baseline: Arc<B>,
    cache: DashMap<(String, CheckMode), Arc<RegressionReport>, FxBuildHasher>,
}

impl<B> RegressionEngine<B>
where
    B: BaselineSource + 'static,
{
    /// Create an engine over `baseline` with the given configuration.
    #[must_use]
    pub fn new(config: RegressionConfig, baseline: B) -> Self {
        Self {
            config,
            baseline: Arc::new(baseline),
            cache: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Check every design record under `designs/<category>/`.
    ///
    /// Results are memoized per `(category, check mode)` for the lifetime
    /// of the engine, so repeated calls within a run never re-scan remote
    /// state.
    ///
    /// # Errors
    ///
    /// Structural errors are fatal: [`Error::InvalidRepositoryLayout`] from
    /// the corpus walk and [`Error::Io`] from the filesystem. Per-record
    /// problems land in the report instead.
    pub async fn check_category(&self, category: &str) -> Result<Arc<RegressionReport>> {
        let cache_key = (category.to_string(), self.config.check_mode);
        if let Some(report) = self.cache.get(&cache_key) {
            return Ok(Arc::clone(report.value()));
        }

        let report = Arc::new(self.run_checks(category).await?);
        let stored = self
            .cache
            .entry(cache_key)
            .or_insert_with(|| Arc::clone(&report));
        Ok(Arc::clone(stored.value()))
    }

    async fn run_checks(&self, category: &str) -> Result<RegressionReport> {
        let files = design::list_designs(&self.config.root, category)?;
        info!(category, count = files.len(), "discovered design records");

        // Stage 1: load local records and fetch baselines concurrently.
        // A local record that fails to parse is an isolated per-record
        // failure, never a batch abort.
        let mut staged = Vec::with_capacity(files.len());
        let mut outcomes = Vec::with_capacity(files.len());
        for rel in files {
            let path = rel.to_string_lossy().replace('\\', "/");
            match design::load_design(&self.config.root.join(&rel)) {
                Ok(local) => {
                    let source = Arc::clone(&self.baseline);
                    let fetch_path = path.clone();
                    let handle = tokio::spawn(async move { source.fetch(&fetch_path).await });
                    staged.push((path, local, handle));
                }
                Err(err) => {
                    warn!(path, error = %err, "unreadable design record");
                    outcomes.push(RecordOutcome {
                        path,
                        diff: None,
                        reported_radius: None,
                        measured_radius: None,
                        baseline_radius: None,
                        checked: false,
                        errors: vec![err],
                    });
                }
            }
        }

        // Stage 2: classify novelty and select records for verification.
        let mut verifying = Vec::new();
        for (path, local, handle) in staged {
            let fetched = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(Error::RemoteFetchError(format!(
                    "baseline fetch task aborted: {join_err}"
                ))),
            };

            let reported = local.radius;
            match fetched {
                Ok(baseline) => {
                    let diff = classify(&local, baseline.as_ref());
                    let baseline_radius = baseline.map(|b| b.radius);
                    let selected = match self.config.check_mode {
                        CheckMode::All => true,
                        CheckMode::Novel => diff.is_novel(),
                    };
                    if selected {
                        verifying.push((path, local, diff, baseline_radius));
                    } else {
                        info!(path, "unchanged against baseline, skipping");
                        outcomes.push(RecordOutcome {
                            path,
                            diff: Some(diff),
                            reported_radius: Some(reported),
                            measured_radius: None,
                            baseline_radius,
                            checked: false,
                            errors: Vec::new(),
                        });
                    }
                }
                Err(err) => {
                    // Hard fetch failure: this record's regression check is
                    // aborted, the rest of the batch proceeds.
                    warn!(path, error = %err, "baseline fetch failed");
                    outcomes.push(RecordOutcome {
                        path,
                        diff: Some(BaselineDiff::FetchFailed(err.to_string())),
                        reported_radius: Some(reported),
                        measured_radius: None,
                        baseline_radius: None,
                        checked: false,
                        errors: vec![err],
                    });
                }
            }
        }

        // Stage 3: CPU-bound verification off the reactor.
        let rtol = self.config.rtol;
        let atol = self.config.atol;
        let mut verify_handles = Vec::with_capacity(verifying.len());
        for (path, local, diff, baseline_radius) in verifying {
            let improvement_baseline = match diff {
                // The improvement check only applies when a differing
                // baseline exists; identical records trivially match.
                BaselineDiff::Changed => baseline_radius,
                _ => None,
            };
            let handle = tokio::task::spawn_blocking(move || {
                let (measured, errors) =
                    verify_record(&path, &local, improvement_baseline, rtol, atol);
                RecordOutcome {
                    path,
                    diff: Some(diff),
                    reported_radius: Some(local.radius),
                    measured_radius: measured,
                    baseline_radius,
                    checked: true,
                    errors,
                }
            });
            verify_handles.push(handle);
        }
        for handle in verify_handles {
            let outcome = handle
                .await
                .map_err(|e| Error::ConfigurationError(format!("verification worker lost: {e}")))?;
            outcomes.push(outcome);
        }

        outcomes.sort_by(|a, b| a.path.cmp(&b.path));

        let report = RegressionReport {
            category: category.to_string(),
            check_mode: self.config.check_mode,
            generated_at: Utc::now(),
            outcomes,
        };
        info!(
            category,
            novel = report.novel_count(),
            unchanged = report.unchanged_count(),
            checked = report.checked_count(),
            regressions = report.regression_count(),
            tolerance_violations = report.tolerance_violation_count(),
            "regression check complete"
        );
        Ok(report)
    }
}

/// Full first-principles verification of one record.
///
/// Reports both the measured and the reported radius so a human can assess
/// the magnitude of any discrepancy, not merely pass/fail.
fn verify_record(
    path: &str,
    record: &DesignRecord,
    improvement_baseline: Option<f64>,
    rtol: f64,
    atol: f64,
) -> (Option<f64>, Vec<Error>) {
    let mut errors = Vec::new();

    match design::design_size_from_path(Path::new(path)) {
        Ok(named) if named == record.size() => {}
        Ok(named) => errors.push(Error::InvalidRepositoryLayout(format!(
            "'{path}': name suggests {named} points, file has {}",
            record.size()
        ))),
        Err(err) => errors.push(err),
    }

    if let Err(err) = record.validate_tags() {
        errors.push(err);
    }

    let mut measured = None;
    if let Some(tag) = record.domain.as_deref() {
        match BoxDomain::from_tag(tag) {
            Ok(domain) => match coverage_radius(&domain, &record.points) {
                Ok(radius) => {
                    info!(
                        path,
                        measured = %format_args!("{radius:.15e}"),
                        reported = %format_args!("{:.15e}", record.radius),
                        "consistency check"
                    );
                    if !approx_eq(radius, record.radius, rtol, atol) {
                        warn!(path, "measured radius disagrees with reported radius");
                        errors.push(Error::ToleranceViolation {
                            measured: radius,
                            reported: record.radius,
                        });
                    }
                    measured = Some(radius);
                }
                Err(err) => errors.push(err),
            },
            Err(err) => errors.push(err),
        }
    }

    if let Some(baseline) = improvement_baseline {
        info!(
            path,
            baseline = %format_args!("{baseline:.15e}"),
            local = %format_args!("{:.15e}", record.radius),
            "improvement check"
        );
        if record.radius > baseline && !approx_eq(record.radius, baseline, rtol, atol) {
            warn!(path, "local design does not improve on the baseline");
            errors.push(Error::RegressionViolation {
                local: record.radius,
                baseline,
            });
        }
    }

    (measured, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_mode_parse() {
        assert_eq!(CheckMode::parse("all").unwrap(), CheckMode::All);
        assert_eq!(CheckMode::parse("novel").unwrap(), CheckMode::Novel);
        assert!(matches!(
            CheckMode::parse("some").unwrap_err(),
            Error::ConfigurationError(_)
        ));
    }

    #[test]
    fn test_classify_three_way() {
        let local = DesignRecord::new("a", "square", 0.5, vec![vec![0.5, 0.5]]);
        assert_eq!(classify(&local, None), BaselineDiff::New);
        assert_eq!(classify(&local, Some(&local.clone())), BaselineDiff::Unchanged);

        let mut other = local.clone();
        other.radius = 0.4;
        assert_eq!(classify(&local, Some(&other)), BaselineDiff::Changed);
    }

    #[test]
    fn test_fetch_failed_counts_as_novel() {
        assert!(BaselineDiff::FetchFailed("timeout".to_string()).is_novel());
        assert!(BaselineDiff::New.is_novel());
        assert!(BaselineDiff::Changed.is_novel());
        assert!(!BaselineDiff::Unchanged.is_novel());
    }

    #[test]
    fn test_verify_record_tolerance_violation() {
        // Claims 0.5 for a single center point; the true radius is
        // sqrt(2)/2, so the consistency check must fire.
        let record = DesignRecord::new("a", "square", 0.5, vec![vec![0.5, 0.5]]);
        let (measured, errors) = verify_record(
            "designs/minimax/l2/square_0001.json",
            &record,
            None,
            1e-10,
            1e-10,
        );
        let measured = measured.unwrap();
        assert!((measured - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-9);
        assert!(errors
            .iter()
            .any(|e| matches!(e, Error::ToleranceViolation { .. })));
    }

    #[test]
    fn test_verify_record_improvement_accepted() {
        let mut record = DesignRecord::new("a", "square", 0.5, vec![vec![0.5, 0.5]]);
        record.radius = std::f64::consts::FRAC_1_SQRT_2;
        // Local 0.7071 improves on baseline 0.75: no regression.
        let (_, errors) = verify_record(
            "designs/minimax/l2/square_0001.json",
            &record,
            Some(0.75),
            1e-10,
            1e-10,
        );
        assert!(!errors
            .iter()
            .any(|e| matches!(e, Error::RegressionViolation { .. })));

        // Reversed: baseline 0.6 is better than local 0.7071.
        let (_, errors) = verify_record(
            "designs/minimax/l2/square_0001.json",
            &record,
            Some(0.6),
            1e-10,
            1e-10,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, Error::RegressionViolation { .. })));
    }

    #[test]
    fn test_verify_record_size_cross_check() {
        let mut record = DesignRecord::new("a", "square", 0.5, vec![vec![0.5, 0.5]]);
        record.radius = std::f64::consts::FRAC_1_SQRT_2;
        let (_, errors) = verify_record(
            "designs/minimax/l2/square_0002.json",
            &record,
            None,
            1e-10,
            1e-10,
        );
        assert!(errors
            .iter()
            .any(|e| matches!(e, Error::InvalidRepositoryLayout(_))));
    }

    #[test]
    fn test_monotonicity_over_recorded_sizes() {
        let outcome = |path: &str, radius: f64| RecordOutcome {
            path: path.to_string(),
            diff: Some(BaselineDiff::New),
            reported_radius: Some(radius),
            measured_radius: Some(radius),
            baseline_radius: None,
            checked: true,
            errors: Vec::new(),
        };
        let report = |outcomes| RegressionReport {
            category: "minimax/l2".to_string(),
            check_mode: CheckMode::All,
            generated_at: Utc::now(),
            outcomes,
        };

        // Radii shrink as sizes grow: monotone.
        let clean = report(vec![
            outcome("designs/minimax/l2/square_0001.json", 0.71),
            outcome("designs/minimax/l2/square_0004.json", 0.36),
            outcome("designs/minimax/l2/square_0005.json", 0.36),
        ]);
        assert!(clean.monotonicity_violations(1e-10, 1e-10).is_empty());

        // The size-4 design covers worse than the size-1 design.
        let broken = report(vec![
            outcome("designs/minimax/l2/square_0001.json", 0.71),
            outcome("designs/minimax/l2/square_0004.json", 0.9),
        ]);
        assert_eq!(broken.monotonicity_violations(1e-10, 1e-10), vec![(1, 4)]);

        // Failure records and unparsable names are skipped, not violations.
        let sparse = report(vec![
            outcome("designs/minimax/l2/square_0001.json", 0.71),
            outcome("designs/minimax/l2/square_0002.json", f64::INFINITY),
        ]);
        assert!(sparse.monotonicity_violations(1e-10, 1e-10).is_empty());
    }

    #[test]
    fn test_report_is_clean_severity() {
        let regression = RecordOutcome {
            path: "designs/minimax/l2/square_0002.json".to_string(),
            diff: Some(BaselineDiff::Changed),
            reported_radius: Some(0.4),
            measured_radius: Some(0.4),
            baseline_radius: Some(0.35),
            checked: true,
            errors: vec![Error::RegressionViolation {
                local: 0.4,
                baseline: 0.35,
            }],
        };
        let report = RegressionReport {
            category: "minimax/l2".to_string(),
            check_mode: CheckMode::All,
            generated_at: Utc::now(),
            outcomes: vec![regression],
        };

        assert!(!report.is_clean(Severity::Strict));
        assert!(report.is_clean(Severity::Advisory));
        assert_eq!(report.regression_count(), 1);
    }
}
