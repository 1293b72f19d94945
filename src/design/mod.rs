//! Design records and corpus layout
//!
//! A design is a named, versioned point set plus its claimed coverage
//! radius and provenance metadata. The corpus treats designs as an
//! append-only dataset: records are immutable after creation and are
//! identified externally by a filename encoding the design size.
//!
//! ```rust
//! use minimax_db::design::DesignRecord;
//!
//! let record = DesignRecord::new("Jane Ellison", "square", 0.5, vec![vec![0.5, 0.5]])
//!     .with_notes("seed=3, maxiter=500, xtol=1e-9");
//! assert_eq!(record.size(), 1);
//! assert!(!record.is_failure());
//! ```

mod record;
mod repository;

pub use record::{DesignRecord, METRIC_L2, OBJECTIVE_MINIMAX};
pub use repository::{design_filename, design_size_from_path, list_designs, load_design, save_design};
