//! Error types for the merge engine.

use otm_types::TypeError;

/// Errors that can occur while merging entries.
///
/// Most variants are protocol violations: the caller or the replication
/// stream broke an ordering or ownership rule and the document session should
/// be resynchronised. See [`MergeError::is_protocol_violation`].
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A revision names a parent entry the engine has never seen.
    #[error("entry {id} names missing parent {parent}")]
    MissingParent {
        /// The entry carrying the bad link.
        id: String,
        /// The missing parent id.
        parent: String,
    },

    /// A parent link points past the parent's newest revision.
    #[error("entry {id} names revision {revision} of {parent}, which has only {available}")]
    ParentRevisionOutOfRange {
        /// The entry carrying the bad link.
        id: String,
        /// The parent entry.
        parent: String,
        /// The revision index requested.
        revision: usize,
        /// Number of revisions the parent actually has.
        available: usize,
    },

    /// The parent sits at or after the position the entry is going to.
    #[error("entry {id} at index {index} has its parent {parent} at index {parent_index}")]
    ParentAfterEntry {
        id: String,
        parent: String,
        index: usize,
        parent_index: usize,
    },

    /// `rebased` was given an entry whose id differs from the one stored at
    /// that index.
    #[error("index {index} holds entry {expected}, not {found}")]
    EntryMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    /// A rebased history does not extend the stored one.
    #[error("rebased history of entry {0} rewrites existing revisions")]
    HistoryRewritten(String),

    /// Replaying a rebased revision did not reproduce the tracked applied
    /// operation. Local state has diverged.
    #[error("rebased entry {0} does not reproduce its applied operation")]
    DivergentApplied(String),

    /// An entry id was inserted twice.
    #[error("duplicate entry: {0}")]
    DuplicateEntry(String),

    /// An index beyond the end of the list.
    #[error("index {index} is out of bounds for {len} entries")]
    IndexOutOfBounds { index: usize, len: usize },

    /// `push` was given an entry that does not continue from the current tail.
    #[error("entry {id} has parent {found}, but the tail is {expected}")]
    StaleParent {
        id: String,
        /// The tail link, or `none` for an empty list.
        expected: String,
        /// The entry's parent link, or `none`.
        found: String,
    },

    /// The entry breaks a structural rule of revision histories.
    #[error("malformed entry: {0}")]
    MalformedEntry(#[from] TypeError),

    /// The recomposed document is not a single pure insertion.
    #[error("recomposed document is not a pure insertion")]
    NotAnInsertion,

    /// The operation algebra rejected a transform or compose.
    #[error("operation algebra failed: {0}")]
    Algebra(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MergeError {
    /// Wrap an algebra provider's failure.
    pub fn algebra<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Algebra(Box::new(err))
    }

    /// Returns `true` for errors that indicate a broken replication protocol
    /// rather than a failure of the algebra or of I/O.
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(
            self,
            Self::Algebra(_) | Self::Serialization(_) | Self::NotAnInsertion
        )
    }
}

/// Convenience alias for merge engine results.
pub type MergeResult<T> = Result<T, MergeError>;
