//! Command-line front end for meshgen.

pub mod args;
pub mod config;
pub mod progress;
