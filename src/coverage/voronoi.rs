//! Box-restricted Voronoi vertex enumeration
//!
//! A vertex of the Voronoi diagram of `M` generators, restricted to an
//! axis-aligned box in dimension `d`, satisfies `d` independent linear
//! constraints drawn from two families:
//!
//! - bisector hyperplanes `2(b - a) . x = |b|^2 - |a|^2` of generator pairs
//! - box faces `x_k = lo_k` or `x_k = hi_k`
//!
//! Enumerating every subset of `m` generators (`m - 1` bisector rows,
//! `1 <= m <= d + 1`) combined with `d - m + 1` faces on distinct axes and
//! solving the resulting `d x d` system yields a superset of the true
//! box-restricted Voronoi vertices. The superset is safe: the nearest-point
//! distance is evaluated exactly at each candidate, so in-box candidates can
//! never overestimate the maximum, while the true extremal locations are all
//! present. Singular systems (coincident or collinear generators) are simply
//! skipped, which is how geometric degeneracy degrades gracefully here.
//!
//! Cost is `O(C(M, d+1) * d^3)` dominated by the largest subset family;
//! for the corpus' planar designs (`d = 2`, `M <= ~100`) this is a few
//! thousand 2x2/LU solves.

use nalgebra::{DMatrix, DVector};

use crate::domain::BoxDomain;

/// Slack for accepting solved vertices as inside the box. Accepted
/// candidates are clamped back onto the box so round-off can only shrink,
/// never inflate, the reported maximum.
const INSIDE_TOL: f64 = 1e-9;

/// Enumerate candidate extremal locations for the coverage-radius maximum.
///
/// Always includes the `2^d` box corners, so the result is nonempty for any
/// valid domain.
pub(crate) fn candidate_vertices(domain: &BoxDomain, points: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let d = domain.dimension();
    let mut candidates: Vec<Vec<f64>> = domain.corners().collect();

    // m = 1 contributes no bisector rows and is exactly the corner set above.
    for m in 2..=(d + 1).min(points.len()) {
        let face_count = d - (m - 1);
        for gens in combinations(points.len(), m) {
            for axes in combinations(d, face_count) {
                for mask in 0..(1usize << face_count) {
                    if let Some(v) = solve_vertex(domain, points, &gens, &axes, mask) {
                        candidates.push(v);
                    }
                }
            }
        }
    }

    candidates
}

/// Solve one `d x d` constraint system; `None` when singular or out of box.
fn solve_vertex(
    domain: &BoxDomain,
    points: &[Vec<f64>],
    gens: &[usize],
    axes: &[usize],
    mask: usize,
) -> Option<Vec<f64>> {
    let d = domain.dimension();
    let mut a = DMatrix::<f64>::zeros(d, d);
    let mut rhs = DVector::<f64>::zeros(d);

    let p0 = &points[gens[0]];
    let n0: f64 = p0.iter().map(|v| v * v).sum();
    for (row, &gi) in gens[1..].iter().enumerate() {
        let p = &points[gi];
        for k in 0..d {
            a[(row, k)] = 2.0 * (p[k] - p0[k]);
        }
        rhs[row] = p.iter().map(|v| v * v).sum::<f64>() - n0;
    }

    let offset = gens.len() - 1;
    for (row, &axis) in axes.iter().enumerate() {
        a[(offset + row, axis)] = 1.0;
        rhs[offset + row] = if mask & (1 << row) == 0 {
            domain.lo()[axis]
        } else {
            domain.hi()[axis]
        };
    }

    let v = a.lu().solve(&rhs)?;
    let mut out = Vec::with_capacity(d);
    for k in 0..d {
        let x = v[k];
        if !x.is_finite() || x < domain.lo()[k] - INSIDE_TOL || x > domain.hi()[k] + INSIDE_TOL {
            return None;
        }
        out.push(x.clamp(domain.lo()[k], domain.hi()[k]));
    }
    Some(out)
}

/// All `k`-element index subsets of `0..n`, in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k > n {
        return Vec::new();
    }
    if k == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.clone());
        // Advance the rightmost index that still has room.
        let mut i = k;
        loop {
            if i == 0 {
                return out;
            }
            i -= 1;
            if idx[i] != i + n - k {
                break;
            }
            if i == 0 {
                return out;
            }
        }
        idx[i] += 1;
        for j in i + 1..k {
            idx[j] = idx[j - 1] + 1;
        }
    }
}
