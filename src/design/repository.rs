//! Corpus layout: design files organized by category path
//!
//! Design files live under `<root>/designs/<category>/` with filenames that
//! encode the design size, e.g. `designs/minimax/l2/square_0010.json`. The
//! walk treats anything that is not a `.json` file as a structural error
//! rather than skipping it: the corpus is append-only and strictly typed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::DesignRecord;
use crate::{Error, Result};

/// Render the canonical filename for a design of `size` points, e.g.
/// `square_0010.json`.
#[must_use]
pub fn design_filename(domain_tag: &str, size: usize) -> String {
    format!("{domain_tag}_{size:04}.json")
}

/// Parse the design size from the `_{M:04d}.json` filename convention.
///
/// # Errors
///
/// Returns [`Error::InvalidRepositoryLayout`] when the filename does not
/// follow the convention.
pub fn design_size_from_path(path: &Path) -> Result<usize> {
    let malformed = || {
        Error::InvalidRepositoryLayout(format!(
            "filename does not encode a design size: '{}'",
            path.display()
        ))
    };
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(malformed)?;
    let digits = stem.rsplit('_').next().ok_or_else(malformed)?;
    digits.parse::<usize>().map_err(|_| malformed())
}

/// Recursively enumerate design files under `<root>/designs/<category>/`.
///
/// Returns paths relative to `root` (so they double as baseline paths),
/// sorted for deterministic processing. A missing category directory is an
/// empty corpus, not an error.
///
/// # Errors
///
/// Returns [`Error::InvalidRepositoryLayout`] when a non-JSON file is found
/// under the scanned tree, [`Error::Io`] on filesystem failures.
pub fn list_designs(root: &Path, category: &str) -> Result<Vec<PathBuf>> {
    let tree = root.join("designs").join(category);
    if !tree.exists() {
        warn!(category, root = %root.display(), "design category not present");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    walk(&tree, &mut files)?;

    let mut relative = Vec::with_capacity(files.len());
    for file in files {
        let rel = file
            .strip_prefix(root)
            .map_err(|_| {
                Error::InvalidRepositoryLayout(format!(
                    "design file escapes the corpus root: '{}'",
                    file.display()
                ))
            })?
            .to_path_buf();
        relative.push(rel);
    }
    relative.sort();
    Ok(relative)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        } else {
            return Err(Error::InvalidRepositoryLayout(format!(
                "non-JSON file under designs tree: '{}'",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Load a design record from a JSON file.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read, [`Error::Json`] when
/// it is not a well-formed design record.
pub fn load_design(path: &Path) -> Result<DesignRecord> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Persist a design record as compact JSON, creating parent directories.
///
/// # Errors
///
/// Returns [`Error::Io`] on filesystem failures, [`Error::Json`] on
/// serialization failures.
pub fn save_design(path: &Path, record: &DesignRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let raw = serde_json::to_string(record)?;
    fs::write(path, raw)?;
    Ok(())
}
