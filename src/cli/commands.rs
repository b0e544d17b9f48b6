//! CLI command implementations (§6).
//!
//! Each command opens its own `Workspace` handle, runs one operation, and
//! prints a result. Errors propagate as `SnapbaseError` so `main.rs` can map
//! them to the documented exit codes without this module knowing about
//! process exit at all.

use arrow::util::pretty::pretty_format_batches;

use crate::{SnapbaseError, SnapbaseResult, Workspace};

use super::args::Command;

pub fn run_command(workspace_path: Option<&str>, command: Command) -> SnapbaseResult<()> {
    let workspace = Workspace::new(workspace_path)?;

    match command {
        Command::Init => init(&workspace),
        Command::Snapshot { source, name } => snapshot(&workspace, &source, name.as_deref()),
        Command::Status { source, baseline } => status(&workspace, &source, baseline.as_deref()),
        Command::Diff { source, from, to } => diff(&workspace, &source, &from, &to),
        Command::Query { source, sql, limit } => query(&workspace, &source, &sql, limit),
        Command::Export { source, dest, snapshot, force } => export(&workspace, &source, &dest, &snapshot, force),
        Command::Stats => stats(&workspace),
    }
}

fn init(workspace: &Workspace) -> SnapbaseResult<()> {
    workspace.init()?;
    println!("initialized workspace at {}", workspace.get_path().display());
    Ok(())
}

fn snapshot(workspace: &Workspace, source: &str, name: Option<&str>) -> SnapbaseResult<()> {
    let summary = workspace.create_snapshot(source, name)?;
    println!("{summary}");
    Ok(())
}

fn status(workspace: &Workspace, source: &str, baseline: Option<&str>) -> SnapbaseResult<()> {
    let outcome = workspace.status(source, baseline)?;
    print_json(&outcome)
}

fn diff(workspace: &Workspace, source: &str, from: &str, to: &str) -> SnapbaseResult<()> {
    let outcome = workspace.diff(source, from, to)?;
    print_json(&outcome)
}

fn query(workspace: &Workspace, source: &str, sql: &str, limit: Option<u64>) -> SnapbaseResult<()> {
    let batches = workspace.query(source, sql, limit)?;
    let table = pretty_format_batches(&batches).map_err(|e| {
        SnapbaseError::Query(crate::query::QueryError::Engine(e.to_string()))
    })?;
    println!("{table}");
    Ok(())
}

fn export(workspace: &Workspace, source: &str, dest: &std::path::Path, snapshot: &str, force: bool) -> SnapbaseResult<()> {
    workspace.export(source, dest, snapshot, force)?;
    println!("exported {snapshot} to {}", dest.display());
    Ok(())
}

fn stats(workspace: &Workspace) -> SnapbaseResult<()> {
    let stats = workspace.stats()?;
    print_json(&stats)
}

fn print_json<T: serde::Serialize>(value: &T) -> SnapbaseResult<()> {
    let text = serde_json::to_string_pretty(value).expect("result types always serialize");
    println!("{text}");
    Ok(())
}
