//! Mathematical utilities: weighted least squares and polynomials.

pub mod ols;
pub mod poly;

pub use ols::*;
pub use poly::*;
