//! Prever CLI - tabular inference server
//!
//! # Commands
//!
//! - `serve` - Start the HTTP server
//! - `check` - Validate an artifact directory
//! - `predict` - Run one record or a CSV file from the command line
//! - `export-demo` - Write the reference bundles to disk
//! - `info` - Show version info

use clap::Parser;
use prever::{cli::Cli, error::Result};

#[tokio::main]
async fn main() -> Result<()> {
    prever::cli::entrypoint(Cli::parse()).await
}
