//! Corpus Verification Demo - Regression Check Against the Baseline
//!
//! Run with: `MINIMAX_DB_ROOT=/path/to/corpus cargo run --example verify_corpus`
//!
//! Walks the local `designs/minimax/l2/` tree, classifies every record
//! against the canonical remote corpus, recomputes each selected radius
//! with the coverage oracle, and exits nonzero when anything regressed.
//! Set `MINIMAX_DB_CHECK=all` to re-verify unchanged records too.

use std::process::ExitCode;

use minimax_db::regression::{HttpBaseline, RegressionConfig, RegressionEngine};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Minimax-DB Corpus Verification ===\n");

    let config = RegressionConfig::from_env()?;
    let severity = config.severity;
    println!("corpus root: {}", config.root.display());
    println!("check mode:  {:?}\n", config.check_mode);

    let engine = RegressionEngine::new(config, HttpBaseline::canonical()?);
    let report = engine.check_category("minimax/l2").await?;

    for outcome in &report.outcomes {
        let status = if outcome.passed() { "ok" } else { "FAIL" };
        print!("[{status}] {}", outcome.path);
        match (outcome.reported_radius, outcome.measured_radius) {
            (Some(reported), Some(measured)) => {
                print!("  reported {reported:.12}  measured {measured:.12}");
            }
            (Some(reported), None) => print!("  reported {reported:.12}  (not re-verified)"),
            _ => print!("  (unreadable)"),
        }
        println!();
        for error in &outcome.errors {
            println!("       {error}");
        }
    }

    println!(
        "\n{} records: {} novel, {} unchanged, {} checked, {} regressions, {} tolerance violations",
        report.outcomes.len(),
        report.novel_count(),
        report.unchanged_count(),
        report.checked_count(),
        report.regression_count(),
        report.tolerance_violation_count()
    );

    if report.is_clean(severity) {
        println!("corpus is clean");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("corpus has violations");
        Ok(ExitCode::FAILURE)
    }
}
