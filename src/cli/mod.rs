//! CLI module for ibqueue - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for listing the queue,
//! popping the next item, and managing stored items.

pub mod commands;

pub use commands::Cli;
