//! `skyfit` library crate.
//!
//! The binary (`skyfit`) is a thin wrapper around this library so that:
//!
//! - the session state machine is testable with a scripted console
//! - the fit pipeline is usable without the terminal front end
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
pub mod session;
pub mod tui;
