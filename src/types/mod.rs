//! Core types shared across the crate.
//!
//! This module contains the primitive aliases and the SDR (Sparse Distributed
//! Representation) produced by every encoder.

mod primitives;
mod sdr;

pub use primitives::*;
pub use sdr::*;
