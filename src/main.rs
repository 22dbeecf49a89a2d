// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! claypack - browser bundler for Clay component trees
//!
//! Discovers component entry files, builds the module graph and writes the
//! per-module files, buckets and metadata the client-side loader consumes.

mod watch;

use anyhow::Context;
use claypack_graph::{pipeline, BuildConfig, BuildReport, Entries, GraphBuilder};
use claypack_sfc::{BasicSfcCompiler, HandlebarsRegistrar};
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "claypack",
    about = "Browserify-style bundler for Clay component trees",
    version,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    /// Entry files (discovered from the project tree when omitted)
    entries: Vec<PathBuf>,

    /// Project root
    #[arg(short = 'r', long, default_value = ".")]
    root: PathBuf,

    /// Output directory (defaults to <root>/public/js)
    #[arg(short = 'o', long)]
    out: Option<PathBuf>,

    /// Minify emitted scripts
    #[arg(long)]
    minify: bool,

    /// Rebuild on change
    #[arg(short = 'w', long)]
    watch: bool,

    /// Legacy file globs, relative to the root
    #[arg(long = "legacy", value_delimiter = ',')]
    legacy_globs: Vec<String>,

    /// Production mode for component compilation
    #[arg(long)]
    production: bool,

    /// Inject component styles at runtime instead of extracting them
    #[arg(long)]
    inline_styles: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = build_config(&cli)?;
    init_logging(&config, cli.verbose);

    let entries = if cli.entries.is_empty() {
        Entries::discover(&config)?
    } else {
        Entries::from_paths(cli.entries.iter().map(|p| config.project_root.join(p)))
    };
    if entries.is_empty() {
        println!(
            "{} nothing to build under {}",
            "Note:".yellow().bold(),
            config.project_root.display()
        );
        return Ok(());
    }

    let templates = HandlebarsRegistrar::new(&config.project_root);
    let mut builder = GraphBuilder::new(
        config,
        Arc::new(BasicSfcCompiler::new()),
        Arc::new(templates),
    )?;
    let report = pipeline::run(&mut builder, &entries).await?;
    print_report(&report);

    if builder.config().watch {
        watch::run(&mut builder).await?;
    }
    Ok(())
}

/// Defaults, then `CLAY_COMPILER_*` variables, then flags
fn build_config(cli: &Cli) -> anyhow::Result<BuildConfig> {
    let root = std::fs::canonicalize(&cli.root)
        .with_context(|| format!("project root {} does not exist", cli.root.display()))?;

    let mut config = BuildConfig::new(&root);
    config.load_vars(std::env::vars());

    if let Some(out) = &cli.out {
        config.output_dir = root.join(out);
    }
    config.minify |= cli.minify;
    config.watch |= cli.watch;
    config.production |= cli.production;
    config.extract_styles = !cli.inline_styles;
    if !cli.legacy_globs.is_empty() {
        config.legacy_globs = cli.legacy_globs.clone();
    }
    if let Some(level) = &cli.log_level {
        config.load_vars([("CLAY_COMPILER_LOG_LEVEL", level)]);
    }
    Ok(config)
}

fn init_logging(config: &BuildConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "claypack={0},claypack_graph={0},claypack_sfc={0}",
            level
        ))
        .init();
}

pub(crate) fn print_report(report: &BuildReport) {
    println!(
        "{} {} modules ({} ids, {} files, {} buckets, {} env vars) in {:.2?}",
        "Built".green().bold(),
        report.modules,
        report.identifiers,
        report.module_files,
        report.bucket_files.len(),
        report.env_vars,
        report.elapsed
    );
}
