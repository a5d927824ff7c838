//! CLI command definitions using clap.
//!
//! - queue: list today's queue, or preview another day
//! - next: pop the next item to review
//! - review: work through the queue interactively
//! - init: turn a stored item into an incremental item
//! - show: priority details of one item
//! - reschedule: move an item to another day

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ibqueue - incremental reading review queue
#[derive(Parser, Debug)]
#[command(name = "ibqueue")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the review queue
    Queue {
        /// Day to list (YYYY-MM-DD); other days than today are previews
        #[arg(short, long)]
        date: Option<String>,

        /// Comma-separated reference tags to filter by
        #[arg(short, long)]
        refs: Option<String>,
    },

    /// Pop and print the next item to review
    Next {
        /// Comma-separated reference tags to filter by
        #[arg(short, long)]
        refs: Option<String>,
    },

    /// Work through today's queue, one item at a time
    Review {
        /// Comma-separated reference tags to filter by
        #[arg(short, long)]
        refs: Option<String>,
    },

    /// Turn a stored item into an incremental item
    Init {
        /// Item ID
        id: String,

        /// Due date (YYYY-MM-DD); defaults to the stored one, else today
        #[arg(short, long)]
        due: Option<String>,
    },

    /// Show priority details of an item
    Show {
        /// Item ID
        id: String,
    },

    /// Move an item to another day
    Reschedule {
        /// Item ID
        id: String,

        /// New due date (YYYY-MM-DD)
        date: String,
    },
}
