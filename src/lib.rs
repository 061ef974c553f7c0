//! bq-report - Run a SQL file against BigQuery and export the result as JSON.
//!
//! This library exposes the core modules for the binary and integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod warehouse;
