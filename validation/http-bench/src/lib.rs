//! HTTP benchmarking tool built on `bench-core`.
//!
//! This crate provides tools to:
//! - Load benchmark scenarios from YAML files
//! - Drive a fixed number of GET requests over a fixed number of connections
//! - Output results in multiple formats (console, JSON, CSV)

pub mod config;
pub mod report;
pub mod results;
pub mod runner;

pub use config::BenchConfig;
pub use report::ResultsReport;
pub use results::RunResults;
pub use runner::LoadRunner;
