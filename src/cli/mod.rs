//! Command-line interface for cataloger.
//!
//! Operates on a JSON snapshot of an asset graph (see
//! [`MemoryAssetGraph`](crate::adapters::MemoryAssetGraph)) and the catalog
//! definition file of the resolved asset library.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::adapters::{AssetGraph, MemoryAssetGraph};
use crate::config::{load_config, ResolvedConfig, RootSource};
use crate::core::{
    CatalogOptions, CatalogSession, ClassificationMode, DedupeSession, Delimiter, LoserStatus,
    PreviewResult,
};
use crate::domain::TargetTypeFilter;
use crate::library::{CatalogStore, WriteOutcome};

/// cataloger - Rule-driven asset catalog assignment and duplicate cleanup
#[derive(Parser, Debug)]
#[command(name = "cataloger")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to start the config file search from
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show proposed catalog assignments without changing anything
    Preview {
        #[command(flatten)]
        run: RunArgs,

        /// List every row instead of the first 50
        #[arg(long)]
        all: bool,
    },

    /// Write catalogs and assign them, then save the graph snapshot
    Apply {
        #[command(flatten)]
        run: RunArgs,

        /// Signature printed by an earlier preview; refuse if it changed
        #[arg(long)]
        expect_signature: Option<String>,
    },

    /// Restore the catalog file from its .bak copy
    Restore {
        /// Graph snapshot (used to locate the project file)
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Asset library root (overrides config)
        #[arg(long)]
        library_root: Option<PathBuf>,
    },

    /// Show where the catalog file lives and whether a backup exists
    Status {
        /// Graph snapshot (used to locate the project file)
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Asset library root (overrides config)
        #[arg(long)]
        library_root: Option<PathBuf>,
    },

    /// Find duplicate assets and optionally fold them into one
    Dedupe {
        /// Graph snapshot file
        #[arg(short, long)]
        graph: PathBuf,

        /// Remap references and delete losers
        #[arg(long)]
        apply: bool,

        /// Signature printed by an earlier dedupe preview
        #[arg(long)]
        expect_signature: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Options shared by preview and apply
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Graph snapshot file
    #[arg(short, long)]
    pub graph: PathBuf,

    /// Asset library root (overrides config)
    #[arg(long)]
    pub library_root: Option<PathBuf>,

    /// Classification mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Name prefix delimiter
    #[arg(long, value_enum)]
    pub delimiter: Option<DelimiterArg>,

    /// Catalog root prefix
    #[arg(long)]
    pub root_prefix: Option<String>,

    /// Asset types to process
    #[arg(long, value_enum)]
    pub target_type: Option<TargetArg>,

    /// Mark non-asset data objects during apply
    #[arg(long)]
    pub auto_mark: bool,
}

/// Classification mode for CLI (maps to ClassificationMode)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    NamePrefix,
    RelativeFolder,
}

impl From<ModeArg> for ClassificationMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::NamePrefix => ClassificationMode::NamePrefix,
            ModeArg::RelativeFolder => ClassificationMode::RelativeFolderPath,
        }
    }
}

/// Delimiter for CLI (maps to Delimiter)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DelimiterArg {
    Underscore,
    Dash,
    Space,
}

impl From<DelimiterArg> for Delimiter {
    fn from(d: DelimiterArg) -> Self {
        match d {
            DelimiterArg::Underscore => Delimiter::Underscore,
            DelimiterArg::Dash => Delimiter::Dash,
            DelimiterArg::Space => Delimiter::Space,
        }
    }
}

/// Target type for CLI (maps to TargetTypeFilter)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TargetArg {
    All,
    Materials,
    NodeGroups,
    ObjectsCollections,
}

impl From<TargetArg> for TargetTypeFilter {
    fn from(t: TargetArg) -> Self {
        match t {
            TargetArg::All => TargetTypeFilter::All,
            TargetArg::Materials => TargetTypeFilter::Materials,
            TargetArg::NodeGroups => TargetTypeFilter::NodeGroups,
            TargetArg::ObjectsCollections => TargetTypeFilter::ObjectsAndCollections,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let start = match self.project_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let config = load_config(&start)?;

        match self.command {
            Commands::Preview { run, all } => preview(&config, &run, all),
            Commands::Apply {
                run,
                expect_signature,
            } => apply(&config, &run, expect_signature.as_deref()),
            Commands::Restore {
                graph,
                library_root,
            } => restore(&config, graph.as_deref(), library_root),
            Commands::Status {
                graph,
                library_root,
            } => status(&config, graph.as_deref(), library_root),
            Commands::Dedupe {
                graph,
                apply,
                expect_signature,
            } => dedupe(&graph, apply, expect_signature.as_deref()),
            Commands::Config => show_config(&config),
        }
    }
}

/// Merge CLI overrides into the resolved config
fn run_options(config: &ResolvedConfig, run: &RunArgs, graph: &MemoryAssetGraph) -> Result<(CatalogOptions, RootSource)> {
    let mut config = config.clone();
    if let Some(root) = &run.library_root {
        config.library_root = Some(root.clone());
        config.registered = None;
    }
    if let Some(mode) = run.mode {
        config.mode = mode.into();
    }
    if let Some(delimiter) = run.delimiter {
        config.delimiter = delimiter.into();
    }
    if let Some(prefix) = &run.root_prefix {
        config.root_prefix = prefix.clone();
    }
    if let Some(target) = run.target_type {
        config.target_type = target.into();
    }
    if run.auto_mark {
        config.auto_mark_missing_as_assets = true;
    }

    config.catalog_options(graph.project_file().as_deref())
}

fn print_preview(result: &PreviewResult, all: bool) {
    let rows = if all {
        &result.entries[..]
    } else {
        result.display_rows()
    };

    println!("{:<32} {:<40}", "ASSET", "CATALOG");
    println!("{}", "-".repeat(73));
    for entry in rows {
        let target = match (&entry.proposed, entry.skip_reason) {
            (Some(path), _) => path.to_string(),
            (None, Some(reason)) => format!("(skipped: {})", reason),
            (None, None) => "(skipped)".to_string(),
        };
        let marker = if entry.needs_mark { " *" } else { "" };
        println!("{:<32} {}{}", entry.asset_name, target, marker);
    }
    if rows.len() < result.entries.len() {
        println!("... {} more", result.entries.len() - rows.len());
    }

    println!();
    println!("Assets: {}", result.planned().count());
    for (path, count) in result.catalog_counts() {
        println!("  {:<40} {}", path.to_string(), count);
    }
    println!("Skipped (unclassifiable): {}", result.skip_count);
    println!("Excluded linked: {}", result.linked_excluded);
    println!("Excluded non-assets: {}", result.unmarked_excluded);
    println!("Signature: {}", result.signature);
}

/// Preview catalog assignments
fn preview(config: &ResolvedConfig, run: &RunArgs, all: bool) -> Result<()> {
    let graph = MemoryAssetGraph::load(&run.graph)?;
    let (options, source) = run_options(config, run, &graph)?;

    let mut session = CatalogSession::new();
    let result = session.preview(&graph, options)?;

    println!(
        "Library root: {} ({})",
        result.library_root.display(),
        source
    );
    print_preview(result, all);

    Ok(())
}

/// Preview, verify and apply catalog assignments
fn apply(config: &ResolvedConfig, run: &RunArgs, expect_signature: Option<&str>) -> Result<()> {
    let mut graph = MemoryAssetGraph::load(&run.graph)?;
    let (options, _) = run_options(config, run, &graph)?;

    let mut session = CatalogSession::new();
    let preview = session.preview(&graph, options)?;
    if let Some(expected) = expect_signature {
        if preview.signature != expected {
            anyhow::bail!(
                "Options or target set changed since preview (expected {}, found {}). Run preview again",
                expected,
                preview.signature
            );
        }
    }

    let result = session.apply(&mut graph)?;
    graph.save(&run.graph)?;

    match &result.write {
        WriteOutcome::Unchanged => println!("Catalog file unchanged"),
        WriteOutcome::Written { created, backup } => {
            println!("Catalog file written ({} new catalogs)", created);
            if let Some(backup) = backup {
                println!("Backup: {}", backup.display());
            }
        }
    }
    for entry in &result.created {
        println!("  + {} {}", entry.id, entry.path);
    }
    println!(
        "Applied: {} assets, catalogs: {} (created {}), skipped {}, auto-marked {}, unassigned {}",
        result.assigned,
        result.catalogs,
        result.created.len(),
        result.skipped,
        result.auto_marked,
        result.unassigned.len()
    );
    eprintln!("Note: host undo does not revert catalog file changes; use `cataloger restore`.");

    Ok(())
}

fn resolve_store(
    config: &ResolvedConfig,
    graph: Option<&Path>,
    library_root: Option<PathBuf>,
) -> Result<(CatalogStore, RootSource)> {
    if let Some(root) = library_root {
        return Ok((CatalogStore::for_library(&root), RootSource::Manual));
    }

    let project_file = match graph {
        Some(path) => MemoryAssetGraph::load(path)?.project_file(),
        None => None,
    };
    let (root, source) = config
        .library_root(project_file.as_deref())
        .context("Cannot resolve asset library root")?;

    Ok((CatalogStore::for_library(&root), source))
}

/// Restore the catalog file from backup
fn restore(config: &ResolvedConfig, graph: Option<&Path>, library_root: Option<PathBuf>) -> Result<()> {
    let (store, _) = resolve_store(config, graph, library_root)?;
    store.restore()?;

    println!(
        "Restored {} from {}",
        store.catalog_file().display(),
        store.backup_file().display()
    );
    Ok(())
}

/// Show catalog and backup file status
fn status(config: &ResolvedConfig, graph: Option<&Path>, library_root: Option<PathBuf>) -> Result<()> {
    let (store, source) = resolve_store(config, graph, library_root)?;
    let status = store.status();
    let exists = |flag: bool| if flag { "exists" } else { "missing" };

    println!("Root source: {}", source);
    println!("Catalog file: {} ({})", status.catalog_file.display(), exists(status.catalog_exists));
    println!("Backup file: {} ({})", status.backup_file.display(), exists(status.backup_exists));

    if status.catalog_exists {
        let tree = store.load()?;
        println!("Catalogs: {}", tree.len());
    }
    Ok(())
}

/// Find duplicates and optionally remap them
fn dedupe(graph_path: &Path, apply: bool, expect_signature: Option<&str>) -> Result<()> {
    let mut graph = MemoryAssetGraph::load(graph_path)?;
    let mut session = DedupeSession::new();
    let preview = session.preview(&graph);

    if preview.groups.is_empty() {
        println!("No duplicates found");
        return Ok(());
    }

    for (group, plan) in preview.groups.iter().zip(&preview.plans) {
        println!("{} \"{}\"", group.asset_type, group.base_name);
        for candidate in &group.candidates {
            let role = if candidate.id == plan.winner { "keep" } else { "remove" };
            println!(
                "  {:<6} {:<32} refs={}",
                role, candidate.name, candidate.reference_count
            );
        }
    }
    println!("Signature: {}", preview.signature);

    if !apply {
        println!("\n{} assets would be removed. Re-run with --apply to clean up.", preview.loser_count());
        return Ok(());
    }
    if let Some(expected) = expect_signature {
        if preview.signature != expected {
            anyhow::bail!("Graph changed since dedupe preview. Run dedupe again");
        }
    }

    let report = session.apply(&mut graph)?;
    graph.save(graph_path)?;

    println!("\nRemoved: {}", report.removed().count());
    for failure in report.failures() {
        match &failure.status {
            LoserStatus::RewriteFailed { holder, remaining } => println!(
                "  kept {}: reference from {} could not be rewritten ({} remaining)",
                failure.loser, holder, remaining
            ),
            LoserStatus::Retained { remaining } => println!(
                "  kept {}: still referenced ({} remaining)",
                failure.loser, remaining
            ),
            LoserStatus::Removed => {}
        }
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig) -> Result<()> {
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    match &config.library_root {
        Some(root) => println!("Library root: {}", root.display()),
        None => println!("Library root: (project file directory)"),
    }
    if let Some(name) = &config.registered {
        println!("Registered library: {}", name);
    }
    for (name, path) in &config.libraries {
        println!("  {}: {}", name, path.display());
    }
    println!("Mode: {:?}", config.mode);
    println!("Delimiter: {:?}", config.delimiter);
    println!("Root prefix: {}", config.root_prefix);
    println!("Target type: {}", config.target_type);
    println!("Auto-mark missing: {}", config.auto_mark_missing_as_assets);
    if let Some(path) = &config.manual_catalog_override {
        println!("Manual catalog: {}", path);
    }

    Ok(())
}
