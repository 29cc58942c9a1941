//! Input/output helpers.
//!
//! - sky spectrum text files (`spectrum`)
//! - line list persistence (`lines`)
//! - resolution model JSON export (`model`)

pub mod lines;
pub mod model;
pub mod spectrum;

pub use lines::*;
pub use model::*;
pub use spectrum::*;
