// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GraphBuilder command-line entry point

mod cli;

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

use cli::{handle_dashboards, handle_load, handle_show, Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.level_filter())
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Version => {
            println!("{} {}", "GraphBuilder".bold().green(), graphbuilder::VERSION);
            println!("CLI version {}", env!("CARGO_PKG_VERSION"));
            Ok(true)
        }
        Commands::Load(args) => handle_load(args),
        Commands::Show {
            db,
            label,
            storage,
            format,
        } => handle_show(db, label, storage, format).map(|_| true),
        Commands::Dashboards {
            db,
            tag,
            storage,
            format,
        } => handle_dashboards(db, tag, storage, format).map(|_| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        // Published, but at least one prune scope failed
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            ExitCode::FAILURE
        }
    }
}
