//! Axis-aligned box domains
//!
//! The only geometric domain the system supports. A domain is immutable
//! once constructed; every component that needs one resolves it from the
//! design-file tag via [`BoxDomain::from_tag`].

use crate::{Error, Result};

/// Absolute tolerance for containment tests.
///
/// Absorbs floating round-off at the domain boundary: a point exactly on a
/// face is inside, a point further than this outside a face is not.
pub const CONTAINS_TOL: f64 = 1e-10;

/// Axis-aligned box `[lo[0], hi[0]] x ... x [lo[d-1], hi[d-1]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxDomain {
    lo: Vec<f64>,
    hi: Vec<f64>,
}

impl BoxDomain {
    /// Create a box from explicit bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDomainTag`] if the bound vectors differ in
    /// length, are empty, or `lo[i] < hi[i]` fails for some axis.
    pub fn try_new(lo: Vec<f64>, hi: Vec<f64>) -> Result<Self> {
        if lo.is_empty() || lo.len() != hi.len() {
            return Err(Error::InvalidDomainTag(format!(
                "box bounds must be nonempty and equal-length (got {} and {})",
                lo.len(),
                hi.len()
            )));
        }
        for (i, (l, h)) in lo.iter().zip(&hi).enumerate() {
            if !(l.is_finite() && h.is_finite() && l < h) {
                return Err(Error::InvalidDomainTag(format!(
                    "box bounds must satisfy lo < hi on every axis (axis {i}: {l} .. {h})"
                )));
            }
        }
        Ok(Self { lo, hi })
    }

    /// Unit box `[0, 1]^d`.
    #[must_use]
    pub fn unit(d: usize) -> Self {
        Self {
            lo: vec![0.0; d],
            hi: vec![1.0; d],
        }
    }

    /// Resolve a design-file domain tag.
    ///
    /// Exactly one tag is built in: `"square"`, the unit square `[0,1]^2`.
    /// Additional tags are a configuration point, not a runtime feature.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDomainTag`] for any other tag.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "square" => Ok(Self::unit(2)),
            other => Err(Error::InvalidDomainTag(other.to_string())),
        }
    }

    /// Domain dimensionality.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.lo.len()
    }

    /// Lower bound vector.
    #[must_use]
    pub fn lo(&self) -> &[f64] {
        &self.lo
    }

    /// Upper bound vector.
    #[must_use]
    pub fn hi(&self) -> &[f64] {
        &self.hi
    }

    /// Containment test with boundary tolerance.
    ///
    /// Returns `false` for points of the wrong dimensionality; use
    /// [`check_dimension`](Self::check_dimension) where the distinction
    /// matters.
    #[must_use]
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dimension()
            && x.iter()
                .zip(self.lo.iter().zip(&self.hi))
                .all(|(v, (l, h))| *v >= l - CONTAINS_TOL && *v <= h + CONTAINS_TOL)
    }

    /// Check that a point has the domain's dimensionality.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] on disagreement.
    pub fn check_dimension(&self, x: &[f64]) -> Result<()> {
        if x.len() == self.dimension() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                domain: self.dimension(),
                point: x.len(),
            })
        }
    }

    /// Corner selected by a bitmask: bit `k` set picks `hi[k]`, else `lo[k]`.
    #[must_use]
    pub fn corner(&self, mask: usize) -> Vec<f64> {
        (0..self.dimension())
            .map(|k| {
                if mask & (1 << k) == 0 {
                    self.lo[k]
                } else {
                    self.hi[k]
                }
            })
            .collect()
    }

    /// Iterator over all `2^d` corners.
    pub fn corners(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        (0..(1usize << self.dimension())).map(|mask| self.corner(mask))
    }

    /// Euclidean length of the box diagonal (upper bound on any coverage radius).
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        self.lo
            .iter()
            .zip(&self.hi)
            .map(|(l, h)| (h - l) * (h - l))
            .sum::<f64>()
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag_square() {
        let domain = BoxDomain::from_tag("square").unwrap();
        assert_eq!(domain.dimension(), 2);
        assert_eq!(domain.lo(), &[0.0, 0.0]);
        assert_eq!(domain.hi(), &[1.0, 1.0]);
    }

    #[test]
    fn test_from_tag_unknown_rejected() {
        let err = BoxDomain::from_tag("hexagon").unwrap_err();
        assert!(matches!(err, Error::InvalidDomainTag(tag) if tag == "hexagon"));
    }

    #[test]
    fn test_try_new_rejects_inverted_bounds() {
        assert!(BoxDomain::try_new(vec![0.0, 1.0], vec![1.0, 0.5]).is_err());
        assert!(BoxDomain::try_new(vec![], vec![]).is_err());
        assert!(BoxDomain::try_new(vec![0.0], vec![0.0]).is_err());
    }

    #[test]
    fn test_contains_interior_and_boundary() {
        let domain = BoxDomain::unit(2);
        assert!(domain.contains(&[0.5, 0.5]));
        // Exactly on a face counts as inside
        assert!(domain.contains(&[0.0, 0.3]));
        assert!(domain.contains(&[1.0, 1.0]));
        // Within tolerance of the boundary
        assert!(domain.contains(&[1.0 + 1e-12, 0.5]));
    }

    #[test]
    fn test_contains_rejects_outside_points() {
        let domain = BoxDomain::unit(2);
        assert!(!domain.contains(&[1.0 + 1e-6, 0.5]));
        assert!(!domain.contains(&[-1e-6, 0.5]));
        // Wrong dimensionality is never inside
        assert!(!domain.contains(&[0.5]));
    }

    #[test]
    fn test_check_dimension() {
        let domain = BoxDomain::unit(3);
        assert!(domain.check_dimension(&[0.1, 0.2, 0.3]).is_ok());
        let err = domain.check_dimension(&[0.1, 0.2]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch { domain: 3, point: 2 }
        ));
    }

    #[test]
    fn test_corners_enumeration() {
        let domain = BoxDomain::unit(2);
        let corners: Vec<_> = domain.corners().collect();
        assert_eq!(corners.len(), 4);
        assert!(corners.contains(&vec![0.0, 0.0]));
        assert!(corners.contains(&vec![1.0, 0.0]));
        assert!(corners.contains(&vec![0.0, 1.0]));
        assert!(corners.contains(&vec![1.0, 1.0]));
    }

    #[test]
    fn test_diagonal() {
        let domain = BoxDomain::unit(2);
        assert!((domain.diagonal() - std::f64::consts::SQRT_2).abs() < 1e-15);
    }
}
