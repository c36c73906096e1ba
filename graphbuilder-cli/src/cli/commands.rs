// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command definitions for GraphBuilder

use clap::{Args, Parser, Subcommand, ValueEnum};
use graphbuilder::StorageType;
use std::path::PathBuf;

/// Log level options
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warn,
    /// Info, warnings, and errors
    Info,
    /// Debug messages and above (verbose)
    Debug,
    /// All messages including trace (very verbose)
    Trace,
    /// Disable all logging
    Off,
}

impl LogLevel {
    /// Convert to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// GraphBuilder CLI - metadata ingestion into a property graph
#[derive(Parser)]
#[command(name = "graphbuilder")]
#[command(about = "GraphBuilder - stage and publish catalog metadata into a graph store")]
#[command(version)]
pub struct Cli {
    /// Set log level (error, warn, info, debug, trace, off)
    #[arg(short = 'l', long = "log-level", global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Verbose mode (equivalent to --log-level debug)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level requested on the command line; `--log-level` wins over `--verbose`
    pub fn level_filter(&self) -> log::LevelFilter {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level.to_level_filter(),
            (None, true) => log::LevelFilter::Debug,
            (None, false) => log::LevelFilter::Warn,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show detailed version information
    Version,

    /// Extract rows from a JSON file, stage them and publish into the graph
    Load(LoadArgs),

    /// List the nodes of one label
    Show {
        /// Database path
        #[arg(long, default_value = "./db")]
        db: PathBuf,

        /// Node label to list
        #[arg(long)]
        label: String,

        /// Storage backend
        #[arg(long, default_value = "sled")]
        storage: StorageType,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Read published dashboards back out of the graph
    Dashboards {
        /// Database path
        #[arg(long, default_value = "./db")]
        db: PathBuf,

        /// Only dashboards published with this tag
        #[arg(long)]
        tag: Option<String>,

        /// Storage backend
        #[arg(long, default_value = "sled")]
        storage: StorageType,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

/// Options of the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Kind of entity the input rows describe
    #[arg(short, long, value_enum)]
    pub kind: EntityKind,

    /// JSON file holding an array of row objects
    #[arg(short, long)]
    pub input: PathBuf,

    /// Database path
    #[arg(long, default_value = "./db")]
    pub db: PathBuf,

    /// Storage backend
    #[arg(long, default_value = "sled")]
    pub storage: StorageType,

    /// Staging directory (defaults to <db>/staging)
    #[arg(long)]
    pub staging: Option<PathBuf>,

    /// Publish tag of this run (generated when omitted)
    #[arg(short, long)]
    pub tag: Option<String>,

    /// JSON job configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep entities the run did not refresh
    #[arg(long)]
    pub no_prune: bool,

    /// Abort on the first invalid entity instead of skipping it
    #[arg(long)]
    pub strict: bool,
}

/// Entity kinds the load command can build
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EntityKind {
    /// Table and column rows grouped per table
    Table,
    /// One dashboard per row
    Dashboard,
}

/// Output format options
#[derive(Clone, Copy, Debug)]
pub enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}
