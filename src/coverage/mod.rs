//! Coverage-radius oracle
//!
//! Computes the minimax coverage radius of a finite point set over a
//! [`BoxDomain`]: the maximum, over the whole domain, of the distance to the
//! nearest design point. The maximum of that function over a convex domain
//! is attained at a Voronoi vertex interior to the domain or on a boundary
//! feature of the box, so the oracle enumerates exactly those candidate
//! locations ([`voronoi`]) and takes a min-max over exact distances.
//!
//! The oracle is a pure query: deterministic given exact floating input,
//! with a tolerance-bounded sensitivity in near-degenerate configurations
//! that callers absorb via [`approx_eq`].

mod voronoi;

use rayon::prelude::*;

use crate::domain::BoxDomain;
use crate::{Error, Result};

/// Compute the minimax coverage radius of `points` over `domain`.
///
/// # Errors
///
/// - [`Error::DegenerateGeometry`] for an empty point set, non-finite
///   coordinates, or when no finite radius can be produced
/// - [`Error::DimensionMismatch`] when a point disagrees with the domain
///   dimensionality
/// - [`Error::PointOutsideDomain`] when a point escapes the domain
pub fn coverage_radius(domain: &BoxDomain, points: &[Vec<f64>]) -> Result<f64> {
    validate_points(domain, points)?;

    let candidates = voronoi::candidate_vertices(domain, points);

    // Exact nearest-generator distance at every candidate, max over all.
    let radius = candidates
        .par_iter()
        .map(|v| nearest_distance(points, v))
        .reduce(|| 0.0, f64::max);

    if radius.is_finite() {
        Ok(radius)
    } else {
        Err(Error::DegenerateGeometry(
            "no finite candidate distance".to_string(),
        ))
    }
}

/// Distance from `x` to the nearest point of `points`.
#[must_use]
pub fn nearest_distance(points: &[Vec<f64>], x: &[f64]) -> f64 {
    points
        .iter()
        .map(|p| {
            p.iter()
                .zip(x)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt()
        })
        .fold(f64::INFINITY, f64::min)
}

/// Symmetric closeness test with relative and absolute tolerance.
///
/// Matches the semantics the corpus checks were written against:
/// `|a - b| <= atol + rtol * |b|`.
#[must_use]
pub fn approx_eq(a: f64, b: f64, rtol: f64, atol: f64) -> bool {
    if a == b {
        // Covers identical infinities.
        return true;
    }
    (a - b).abs() <= atol + rtol * b.abs()
}

fn validate_points(domain: &BoxDomain, points: &[Vec<f64>]) -> Result<()> {
    if points.is_empty() {
        return Err(Error::DegenerateGeometry("empty point set".to_string()));
    }
    for (index, p) in points.iter().enumerate() {
        domain.check_dimension(p)?;
        if p.iter().any(|v| !v.is_finite()) {
            return Err(Error::DegenerateGeometry(format!(
                "point {index} has non-finite coordinates"
            )));
        }
        if !domain.contains(p) {
            return Err(Error::PointOutsideDomain { index });
        }
    }
    Ok(())
}
