//! Text operation algebra for the OTM engine.
//!
//! Operations are sequences of retain / insert / delete segments that walk
//! the whole base document, in the style of classic operational
//! transformation libraries. Lengths are counted in `char`s.
//!
//! # Key Types
//!
//! - [`TextOp`] / [`Component`] -- A normalised text operation
//! - [`OtError`] -- Length mismatches and malformed wire data
//!
//! [`TextOp`] implements [`otm_types::Operation`], so it plugs straight into
//! the merge engine.

pub mod diff;
pub mod error;
pub mod op;
pub mod wire;

pub use error::{OtError, OtResult};
pub use op::{Component, TextOp};
