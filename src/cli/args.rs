//! CLI argument definitions (§6).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// snapbase - a snapshot-based structured-data versioning engine
#[derive(Parser, Debug)]
#[command(name = "snapbase")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Workspace directory. Defaults to the current directory (which may
    /// inherit an ancestor's snapbase.toml); an explicit path never does.
    #[arg(long, global = true)]
    pub workspace: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the workspace's storage root if it doesn't already exist
    Init,

    /// Commit a new snapshot of a source
    Snapshot {
        /// Path to the source file, relative to the workspace unless absolute
        source: String,

        /// Snapshot name. Defaults to the configured name pattern.
        #[arg(long)]
        name: Option<String>,
    },

    /// Compare the current on-disk source against a baseline snapshot
    Status {
        source: String,
        /// Defaults to the source's most recent snapshot
        baseline: Option<String>,
    },

    /// Compare two committed snapshots of the same source
    Diff {
        source: String,
        from: String,
        to: String,
    },

    /// Run SQL across every snapshot of a source
    Query {
        source: String,
        sql: String,

        #[arg(long)]
        limit: Option<u64>,
    },

    /// Copy a snapshot's committed payload to a file
    Export {
        source: String,

        #[arg(long = "file")]
        dest: PathBuf,

        #[arg(long = "to")]
        snapshot: String,

        #[arg(long)]
        force: bool,
    },

    /// Print workspace-wide counts
    Stats,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
