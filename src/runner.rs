//! CLI execution and command dispatch logic.
//!
//! This module keeps [`main`] minimal by providing a single entry point
//! that computes the flag configuration, builds and validates the graph
//! from the project descriptors, and serialises it to the requested
//! destination.

use crate::cli::{Cli, Commands};
use crate::descriptor;
use crate::flags::{FlagSet, Platform};
use crate::graph::{BuildGraph, GraphBuilder};
use crate::ninja_gen;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::{self, Write};
use std::process::Command;
use tracing::{debug, info};

/// Generated headers land here; declared up front so the directory node
/// exists even for projects whose root descriptor only includes fragments.
const GENERATED_DIR: &str = "gen";

/// Execute the parsed [`Cli`] commands.
///
/// # Errors
///
/// Returns an error if descriptor loading, graph validation, or output
/// writing fails.
pub fn run(cli: &Cli) -> Result<()> {
    let command = cli.command.clone().unwrap_or_else(|| Commands::Emit {
        file: Utf8PathBuf::from("-"),
    });
    let platform = cli.platform.unwrap_or_else(Platform::host);
    let revision = cli
        .revision
        .clone()
        .unwrap_or_else(|| discover_revision(&cli.directory));
    let flags = FlagSet::compute(platform, cli.minimize, &cli.project_version, &revision);
    let graph = build_graph(cli)?;

    match command {
        Commands::Emit { file } => {
            let text = ninja_gen::generate(&graph, &flags, &cli.source_root);
            if file == "-" {
                io::stdout()
                    .lock()
                    .write_all(text.as_bytes())
                    .context("write build description to stdout")?;
            } else {
                let target = resolve_output(&cli.directory, &file);
                write_and_log(&target, &text)
                    .with_context(|| format!("write build description to {target}"))?;
            }
        }
        Commands::Check => {
            info!(nodes = graph.nodes().len(), "graph validated");
        }
    }
    Ok(())
}

/// Build and validate the graph for the project at `cli.directory`.
fn build_graph(cli: &Cli) -> Result<BuildGraph> {
    let mut builder = GraphBuilder::new();
    builder.emit_make_directory(Utf8Path::new(GENERATED_DIR))?;
    descriptor::load_project(&cli.directory, &cli.source_root, &mut builder)?;
    let graph = builder.finalize()?;
    debug!(nodes = graph.nodes().len(), "graph finalized");
    Ok(graph)
}

/// Resolve a relative output path against the project directory.
fn resolve_output(directory: &Utf8Path, file: &Utf8Path) -> Utf8PathBuf {
    if file.is_absolute() {
        file.to_owned()
    } else {
        directory.join(file)
    }
}

/// Write `content` to `path` and log the file's location.
fn write_and_log(path: &Utf8Path, content: &str) -> io::Result<()> {
    fs::write(path, content)?;
    info!("generated build description at {path}");
    Ok(())
}

/// Discover the source revision from git, falling back to `unknown`.
///
/// Mirrors `git rev-parse HEAD` truncated to twenty characters; the
/// revision only feeds a `-DREVISION=` define, so failure is not fatal.
fn discover_revision(directory: &Utf8Path) -> String {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(directory)
        .output();
    match output {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            text.trim().chars().take(20).collect()
        }
        _ => {
            debug!("revision discovery failed, using fallback");
            "unknown".to_owned()
        }
    }
}
