// Allow common clippy pedantic lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

//! fraud-etl CLI
//!
//! Command-line interface for running the fraud scoring ETL job

use clap::Parser;
use fraud_etl::cli::{Cli, Runner};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        match e.stage() {
            Some(stage) => eprintln!(
                "Error: job '{}' failed during {stage} stage: {}",
                runner.job_name(),
                e.root()
            ),
            None => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }
}
