//! fx-rs library
//!
//! Command-line host for the `fx-particles` runtime: settings files,
//! a fixed-step simulation loop and statistics output.

pub mod cli;
pub mod commands;
pub mod utils;
