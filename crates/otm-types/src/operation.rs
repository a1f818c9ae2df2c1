//! The boundary to the operation algebra.
//!
//! The merge engine never inspects an operation's contents. It only needs the
//! two operational-transformation primitives below, which must obey the usual
//! OT laws (TP1 for `transform`, associativity for `compose`).

use std::fmt;

/// An edit operation supplied by an external algebra.
///
/// `Default` must produce the identity operation over an empty document; it
/// is what an empty entry list composes to.
pub trait Operation: Clone + PartialEq + Default + fmt::Debug {
    /// Failure reported by the algebra (mismatched lengths and the like).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Inclusion transform.
    ///
    /// Returns `(a', b')` where `a' = self` rebased past `other` and
    /// `b' = other` rebased past `self`, so that applying `self` then `b'`
    /// equals applying `other` then `a'`. When both sides insert at the same
    /// position, `self`'s insertion is placed first.
    fn transform(&self, other: &Self) -> Result<(Self, Self), Self::Error>;

    /// Sequential composition: applying the result equals applying `self`
    /// followed by `other`.
    fn compose(&self, other: &Self) -> Result<Self, Self::Error>;

    /// The inserted text when this operation is a single pure insertion over
    /// an empty document. The identity operation yields `Some("")`.
    fn inserted_text(&self) -> Option<&str>;
}
