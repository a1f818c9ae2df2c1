use std::collections::HashSet;
use std::convert::Infallible;
use std::fs;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use otm_engine::{DocumentSnapshot, MergeEngine, Minted};
use otm_text::TextOp;
use otm_types::EntryId;

use crate::cli::*;
use crate::config::CliConfig;

pub type TextEngine = MergeEngine<EntryId, TextOp>;
pub type TextSnapshot = DocumentSnapshot<EntryId, TextOp>;

pub fn run_command(cli: Cli, config: &CliConfig) -> anyhow::Result<()> {
    let format = cli.format.unwrap_or(config.format);
    match cli.command {
        Command::Text(args) => cmd_text(&args.snapshot, format),
        Command::Inspect(args) => cmd_inspect(&args.snapshot, format),
        Command::Rebase(args) => cmd_rebase(args, config, format),
        Command::Diff(args) => cmd_diff(&args.old, &args.new),
    }
}

fn cmd_text(path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let text = load_snapshot(path)?.text()?;
    match format {
        OutputFormat::Text => println!("{text}"),
        OutputFormat::Json => println!("{}", serde_json::json!({ "text": text })),
    }
    Ok(())
}

fn cmd_inspect(path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let engine = load_snapshot(path)?.restore()?;
    let report = inspect(&engine);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            let shape = if report.linear {
                "linear".green()
            } else {
                "not linear".yellow()
            };
            println!("{} entries, {}", report.entries.len().to_string().bold(), shape);
            for entry in &report.entries {
                let pending = if entry.pending_residue {
                    "residue pending".yellow()
                } else {
                    "".normal()
                };
                println!(
                    "  {:>3}  {}  v{}  parent {}  {}",
                    entry.index,
                    entry.id.cyan(),
                    entry.revisions,
                    entry.parent.as_deref().unwrap_or("none").dimmed(),
                    pending
                );
            }
        }
    }
    Ok(())
}

fn cmd_rebase(args: RebaseArgs, config: &CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    let own = if args.own.is_empty() {
        &config.own
    } else {
        &args.own
    };
    let snapshot = load_snapshot(&args.snapshot)?;
    let (updated, minted) = rebase_snapshot(snapshot, own)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&minted)?),
        OutputFormat::Text => {
            if minted.is_empty() {
                println!("Nothing to rebase.");
            }
            for (index, revision) in &minted {
                let parent = revision
                    .parent
                    .as_ref()
                    .map_or_else(|| "none".to_string(), ToString::to_string);
                println!(
                    "{} index {} -> new revision, parent {}",
                    "✓".green(),
                    index.to_string().bold(),
                    parent.cyan()
                );
            }
        }
    }

    if args.write && !minted.is_empty() {
        fs::write(&args.snapshot, updated.to_json_pretty()?)
            .with_context(|| format!("writing snapshot {}", args.snapshot.display()))?;
        tracing::info!(path = %args.snapshot.display(), minted = minted.len(), "snapshot updated");
    }
    Ok(())
}

fn cmd_diff(old: &Path, new: &Path) -> anyhow::Result<()> {
    let old_text =
        fs::read_to_string(old).with_context(|| format!("reading {}", old.display()))?;
    let new_text =
        fs::read_to_string(new).with_context(|| format!("reading {}", new.display()))?;
    println!("{}", serde_json::to_string(&TextOp::diff(&old_text, &new_text))?);
    Ok(())
}

// ---------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct Inspection {
    pub linear: bool,
    pub entries: Vec<EntryReport>,
}

#[derive(Debug, Serialize)]
pub struct EntryReport {
    pub index: usize,
    pub id: String,
    pub revisions: usize,
    pub parent: Option<String>,
    pub pending_residue: bool,
}

pub fn load_snapshot(path: &Path) -> anyhow::Result<TextSnapshot> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    TextSnapshot::from_json(&json).with_context(|| format!("parsing snapshot {}", path.display()))
}

pub fn inspect(engine: &TextEngine) -> Inspection {
    let entries = engine
        .entries()
        .enumerate()
        .map(|(index, entry)| EntryReport {
            index,
            id: entry.id.to_string(),
            revisions: entry.revisions.len(),
            parent: entry
                .latest()
                .and_then(|r| r.parent.as_ref())
                .map(ToString::to_string),
            pending_residue: engine.residue(&entry.id).is_some(),
        })
        .collect();
    Inspection {
        linear: engine.is_linear(),
        entries,
    }
}

/// Ids on the command line are numeric when they parse as such.
pub fn parse_id(raw: &str) -> EntryId {
    raw.parse().unwrap_or_else(|never: Infallible| match never {})
}

/// One rebase pass over `snapshot` on behalf of the writer owning `own`.
pub fn rebase_snapshot(
    snapshot: TextSnapshot,
    own: &[String],
) -> anyhow::Result<(TextSnapshot, Vec<Minted<EntryId, TextOp>>)> {
    let own: HashSet<EntryId> = own.iter().map(|raw| parse_id(raw)).collect();
    let mut engine = snapshot.restore()?;
    let minted = engine.rebase_with(&own);
    Ok((DocumentSnapshot::capture(&engine), minted))
}
