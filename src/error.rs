//src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Everything that aborts an LCA run. Per-hit lookup misses are not errors;
/// they are tallied in `MissingTally` instead.
#[derive(Debug, Error)]
pub enum LcaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("percent identity floor must be between 0 and 100, got {0}")]
    InvalidPidentFloor(f64),

    #[error("LCA cutoff must be a finite, non-negative number, got {0}")]
    InvalidCutoff(f64),

    #[error("line {line}: you have NAs for taxids in at least one case, row: {row}")]
    MissingTaxid { line: usize, row: String },

    #[error("line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("{service} returned {got} records for {expected} submitted values")]
    ResultCountMismatch {
        service: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("taxon identifier {0} could not be resolved to a scientific name")]
    UnresolvedTaxid(String),

    #[error("{}:{line}: {reason}", .path.display())]
    MalformedTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}
