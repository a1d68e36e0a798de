// src/main.rs

use anyhow::Result;
use clap::Parser;
use gmxforge::cli::Cli;
use gmxforge::{BuildConfig, Pipeline};
use std::io::{self, Write};

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the recipe document.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let pipeline = Pipeline::new(BuildConfig::default());

    let stdout = io::stdout();
    let mut output = stdout.lock();
    pipeline.run(cli.stages(), &mut output)?;
    output.flush()?;
    Ok(())
}
