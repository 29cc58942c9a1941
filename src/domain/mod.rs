//! Domain types used throughout the calibration session.
//!
//! This module defines:
//!
//! - the sky spectrum and its sampled domain (`Spectrum`)
//! - the line list with its validated edits (`LineList`)
//! - per-line fit outcomes and the resolution model
//! - session configuration (`SessionConfig`, `HalfWidth`)

pub mod lines;
pub mod types;

pub use lines::*;
pub use types::*;
