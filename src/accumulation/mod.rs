//! Potential-surface integration.
//!
//! `decay` holds the pure decay and contribution functions, `surface` the
//! per-pixel state, and `accumulator` ties them together per slice.
//!
//! # THREADING
//! The surface is only ever touched by the processing thread. Nothing here
//! is shared or locked.

pub mod accumulator;
pub mod decay;
pub mod surface;

pub use accumulator::{Accumulator, Frame};
pub use surface::PotentialSurface;
