//! Reporting utilities: formatted terminal output for the session menus.

pub mod format;

pub use format::*;
