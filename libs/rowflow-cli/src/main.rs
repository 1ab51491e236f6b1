// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! rowflow CLI
//!
//! Runs and inspects pipeline graph files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "rowflow")]
#[command(author, version, about = "Row-oriented dataflow pipeline engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline graph to completion and print its result as JSON
    Run {
        /// Pipeline graph file (JSON or YAML)
        #[arg(value_name = "GRAPH_FILE")]
        graph_file: PathBuf,

        /// Engine config file (YAML, JSON or TOML)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Capacity of every queue, in batches
        #[arg(long, value_name = "N")]
        queue_capacity: Option<usize>,

        /// Variable used in copy-count expressions (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Safe-stop the input steps after this many milliseconds
        #[arg(long, value_name = "MS")]
        safe_stop_after_ms: Option<u64>,
    },

    /// Print the compiled queue topology without running anything
    Plan {
        /// Pipeline graph file (JSON or YAML)
        #[arg(value_name = "GRAPH_FILE")]
        graph_file: PathBuf,

        /// Variable used in copy-count expressions (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// List the built-in step types
    Steps,
}

fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    if name.is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            graph_file,
            config,
            queue_capacity,
            vars,
            safe_stop_after_ms,
        } => {
            let succeeded = commands::run::run(commands::run::RunOptions {
                graph_file,
                config,
                queue_capacity,
                variables: vars.into_iter().collect(),
                safe_stop_after_ms,
            })
            .context("Pipeline run failed")?;
            if !succeeded {
                std::process::exit(1);
            }
        }
        Commands::Plan { graph_file, vars } => {
            commands::plan::plan(&graph_file, vars.into_iter().collect())
                .context("Failed to compile pipeline")?;
        }
        Commands::Steps => commands::steps::list(),
    }

    Ok(())
}
