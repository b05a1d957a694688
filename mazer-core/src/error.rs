//! Errors surfaced at the document/CLI boundary.
//!
//! The calculation functions themselves never fail on user input:
//! blank or unparseable numerics degrade to "no value" and are skipped,
//! and solvers decline rather than error. Errors here cover parsing
//! units and loading persisted recipe documents.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown unit `{0}`")]
pub struct UnitParseError(String);

impl UnitParseError {
    pub(crate) fn new(s: &str) -> Self {
        UnitParseError(s.to_string())
    }
}

/// Failure loading a persisted recipe document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported recipe schema version {0}")]
    UnsupportedVersion(u32),
    #[error(transparent)]
    Unit(#[from] UnitParseError),
}
