use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(
    name = "otm",
    about = "Operation Tree Merge: inspect, rebase, and author collaborative edit logs",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log engine decisions at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (overrides the config file)
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,

    /// Config file [default: otm.toml if present]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the document text of a snapshot
    Text(SnapshotArgs),
    /// List entries, parents, and pending residues
    Inspect(SnapshotArgs),
    /// Fold pending residues of owned entries into new revisions
    Rebase(RebaseArgs),
    /// Print the operation turning one text file into another
    Diff(DiffArgs),
}

#[derive(Args)]
pub struct SnapshotArgs {
    /// Snapshot file (JSON array of entries)
    pub snapshot: PathBuf,
}

#[derive(Args)]
pub struct RebaseArgs {
    pub snapshot: PathBuf,
    /// Entry id owned by this writer (repeatable)
    #[arg(long = "own", value_name = "ID")]
    pub own: Vec<String>,
    /// Write the updated snapshot back to its file
    #[arg(long)]
    pub write: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
}
