//! CLI module
//!
//! Command-line interface for running the job.
//!
//! # Commands
//!
//! - `run` - Read, map and write the table
//! - `check` - Read and map without writing
//! - `mapping` - Print the effective mapping table
//! - `tables` - List the tables of a catalog database

mod commands;
mod runner;

pub use commands::{Cli, Commands, JobArgs, OutputFormat};
pub use runner::Runner;
