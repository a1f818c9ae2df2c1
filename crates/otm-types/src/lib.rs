//! Foundation types for the operation tree merge (OTM) engine.
//!
//! This crate provides the record shapes exchanged between replicas and the
//! trait boundary to the operation algebra. Every other OTM crate depends on
//! `otm-types`.
//!
//! # Key Types
//!
//! - [`Entry`] -- One writer-authored edit with its append-only revision list
//! - [`Revision`] -- One version of an entry's operation, its parent, and residue
//! - [`ParentLink`] -- `(entry id, revision index)` a revision was derived from
//! - [`EntryId`] -- Opaque identifier assigned by the ordered-list storage
//! - [`Operation`] -- Inclusion transform and composition supplied by an algebra

pub mod entry;
pub mod error;
pub mod id;
pub mod operation;

pub use entry::{Entry, ParentLink, Revision};
pub use error::TypeError;
pub use id::{EntryId, EntryKey};
pub use operation::Operation;
