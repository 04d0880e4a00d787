// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! shmarray CLI
//!
//! Operator tool for the shared-memory frame exchange: write a file into a
//! frame, read a frame back out, or inspect one without consuming it.

use std::time::Duration;

use clap::{Parser, Subcommand};

use shmarray_core::{ConfigLoader, ElementType, ExchangeConfig, FrameExchange, InstanceGuard};

mod commands;

/// shmarray - exchange large arrays through shared-memory frames
#[derive(Parser)]
#[command(name = "shmarray")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the frame directory
    #[arg(long)]
    pub base_dir: Option<String>,

    /// Give up on a frame operation after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a raw file as a frame and print its descriptor as JSON
    Write {
        /// Element type (boolean, byte, short, int32, int64, float32, float64)
        #[arg(short = 't', long = "type")]
        element_type: ElementType,

        /// File holding the native-endian payload
        #[arg(short, long)]
        input: String,

        /// Fill the mapped frame directly instead of a buffered write
        #[arg(short, long)]
        mapped: bool,
    },

    /// Read a frame's payload out and release the frame
    Read {
        /// Frame handle (absolute path)
        #[arg(long)]
        handle: String,

        /// Element type the frame was written with
        #[arg(short = 't', long = "type")]
        element_type: ElementType,

        /// Number of elements
        #[arg(short = 'n', long)]
        len: usize,

        /// Output file; raw bytes go to stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show a frame's header and payload checksum without consuming it
    Inspect {
        /// Frame handle (absolute path)
        #[arg(long)]
        handle: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Allocate and print a fresh handle
    Alloc,

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        file: String,
    },
}

fn build_exchange(cli: &Cli) -> Result<FrameExchange, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_file(path)?,
        None => ExchangeConfig::default(),
    };

    if let Some(base_dir) = &cli.base_dir {
        let overridden = ExchangeConfig::with_base_dir(base_dir)?;
        config.base_dir = overridden.base_dir;
    }

    Ok(FrameExchange::new(config))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let _guard = InstanceGuard::acquire("shmarray-cli")?;
    let timeout = cli.timeout_ms.map(Duration::from_millis);

    // Dispatch to command handlers
    match &cli.command {
        Commands::Write {
            element_type,
            input,
            mapped,
        } => {
            let exchange = build_exchange(&cli)?;
            commands::write::execute(exchange, timeout, *element_type, input, *mapped).await
        }
        Commands::Read {
            handle,
            element_type,
            len,
            output,
        } => {
            let exchange = build_exchange(&cli)?;
            commands::read::execute(
                exchange,
                timeout,
                handle,
                *element_type,
                *len,
                output.as_deref(),
            )
            .await
        }
        Commands::Inspect { handle, json } => {
            let exchange = build_exchange(&cli)?;
            commands::inspect::execute(exchange, timeout, handle, *json).await
        }
        Commands::Alloc => commands::alloc::execute(&build_exchange(&cli)?).await,
        Commands::Validate { file } => commands::validate::execute(file).await,
    }
}
