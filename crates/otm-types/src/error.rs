use thiserror::Error;

/// Errors produced when validating entry records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("entry {id} has no revisions")]
    EmptyHistory { id: String },

    #[error("entry {id}: the first revision must not carry a residue")]
    UnexpectedResidue { id: String },

    #[error("entry {id}: revision {revision} is missing its residue")]
    MissingResidue { id: String, revision: usize },
}
