//! Operation tree merge engine.
//!
//! Reconciles text-edit operations from several writers into one
//! deterministic edit stream. Entries arrive in the order an external
//! ordered-list store converged on, which need not match causal order; the
//! engine keeps, for every entry, the operation currently effective at its
//! list position and any transform remainder still waiting to be folded into
//! a durable revision by the entry's owner.
//!
//! # Key Types
//!
//! - [`MergeEngine`] -- The position-indexed ledger of entries
//! - [`DocumentSnapshot`] -- Persisted / transported list of entries
//! - [`MergeError`] -- Protocol and algebra violations
//!
//! The engine is generic over the entry identity ([`otm_types::EntryKey`])
//! and the operation algebra ([`otm_types::Operation`]).

pub mod engine;
pub mod error;
pub mod snapshot;

pub use engine::{MergeEngine, Minted};
pub use error::{MergeError, MergeResult};
pub use snapshot::DocumentSnapshot;
