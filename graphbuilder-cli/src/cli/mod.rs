// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for GraphBuilder
//!
//! Provides command-line interface for running a load job from a row file
//! and inspecting what a run published.

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{Cli, Commands};
pub use handlers::{handle_dashboards, handle_load, handle_show};
