//! Fitting.
//!
//! Responsibilities:
//!
//! - fit one sky line's profile inside a window (`gaussian`)
//! - aggregate per-line widths into a resolution polynomial (`resolution`)
//! - interpolate the fitted model

pub mod gaussian;
pub mod resolution;

pub use gaussian::*;
pub use resolution::*;
