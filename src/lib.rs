//! # Minimax-DB: Coverage Design Search and Regression Engine
//!
//! Minimax-db verifies and regression-tests point-set designs that cover a
//! bounded geometric domain under a minimax coverage objective, and drives
//! the best-of-N search that produces new candidate designs.
//!
//! ## Components
//!
//! - **Domain** ([`domain`]): axis-aligned box with exact containment
//! - **Coverage oracle** ([`coverage`]): provably correct coverage radius
//!   via box-restricted Voronoi-vertex enumeration
//! - **Search driver** ([`search`]): parallel best-of-N trials with
//!   memoization over a pluggable trial store
//! - **Design records** ([`design`]): the append-only, versioned corpus
//!   format
//! - **Regression engine** ([`regression`]): novelty detection against a
//!   remote canonical baseline plus monotonic-improvement enforcement
//!
//! ## Example
//!
//! ```rust
//! use minimax_db::coverage::coverage_radius;
//! use minimax_db::domain::BoxDomain;
//!
//! let domain = BoxDomain::from_tag("square")?;
//! let radius = coverage_radius(&domain, &[vec![0.5, 0.5]])?;
//! assert!((radius - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
//! # Ok::<(), minimax_db::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod coverage;
pub mod design;
pub mod domain;
pub mod error;
pub mod regression;
pub mod search;

pub use error::{Error, Result};
