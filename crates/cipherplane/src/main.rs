// SPDX-FileCopyrightText: 2026 Cipherplane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cipherplane - administrative control plane for data-encryption migrations.
//!
//! This is the binary entry point for the Cipherplane server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

mod doctor;
mod serve;
mod shutdown;

/// Cipherplane - administrative control plane for data-encryption migrations.
#[derive(Parser, Debug)]
#[command(name = "cipherplane", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (skips the discovery hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the control-plane server.
    Serve,
    /// Run diagnostic checks against the Cipherplane environment.
    Doctor {
        /// Run additional intensive checks.
        #[arg(long)]
        deep: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

fn load_config(
    path: Option<&Path>,
) -> Result<cipherplane_config::CipherplaneConfig, Vec<cipherplane_config::ConfigError>> {
    match path {
        Some(path) => cipherplane_config::load_and_validate_path(path),
        None => cipherplane_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            cipherplane_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Doctor { deep, plain }) => {
            doctor::run_doctor(&config, cli.config.as_deref(), deep, plain).await
        }
        None => {
            println!("cipherplane: use --help for available commands");
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("cipherplane: {err}");
        std::process::exit(1);
    }
}
