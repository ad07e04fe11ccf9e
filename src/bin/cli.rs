// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! vertexweld CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use vertexweld::cli::{Reporter, Runner};
use vertexweld::geometry::validate_mesh;
use vertexweld::{io, WeldConfig};

#[derive(Parser)]
#[command(name = "vertexweld")]
#[command(about = "Merge duplicate mesh vertices with a BVH broad phase", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./vertexweld.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Weld one or more mesh files
    Weld {
        /// Input mesh file(s) (stl, json)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (single input)
        #[arg(short, long, conflicts_with = "out_dir")]
        output: Option<PathBuf>,

        /// Output directory (any number of inputs)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Merge tolerance
        #[arg(short, long)]
        epsilon: Option<f64>,

        /// Seed for the hierarchy insertion order
        #[arg(long)]
        seed: Option<u64>,

        /// Cross-check the broad phase against an exhaustive comparison
        #[arg(long)]
        verify: bool,

        /// Report manifold and boundary information
        #[arg(long)]
        topology: bool,

        /// Drop vertices no face references
        #[arg(long)]
        prune_orphans: bool,
    },

    /// Print candidate duplicate pairs of a mesh
    Pairs {
        /// Input mesh file
        input: PathBuf,

        /// Box half-width
        #[arg(short, long)]
        epsilon: Option<f64>,

        /// Print pairs as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show counts, bounds and topology of a mesh
    Inspect {
        /// Input mesh file
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = WeldConfig::load(cli.config.as_deref())?;
    config.verbose |= cli.verbose;
    init_tracing(config.verbose);

    match cli.command {
        Commands::Weld {
            inputs,
            output,
            out_dir,
            epsilon,
            seed,
            verify,
            topology,
            prune_orphans,
        } => {
            if let Some(epsilon) = epsilon {
                config.epsilon = epsilon;
            }
            config.seed = seed.or(config.seed);
            config.verify |= verify;
            config.topology |= topology;
            config.prune_orphans |= prune_orphans;
            config.validate()?;

            weld_command(config, &inputs, output.as_deref(), out_dir.as_deref())?;
        }
        Commands::Pairs { input, epsilon, json } => {
            if let Some(epsilon) = epsilon {
                config.epsilon = epsilon;
            }
            config.validate()?;

            pairs_command(config, &input, json)?;
        }
        Commands::Inspect { input } => {
            inspect_command(&input)?;
        }
        Commands::Version => {
            println!("vertexweld v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn weld_command(
    config: WeldConfig,
    inputs: &[PathBuf],
    output: Option<&Path>,
    out_dir: Option<&Path>,
) -> Result<()> {
    let verbose = config.verbose;
    let runner = Runner::new(config);

    if let (Some(output), [input]) = (output, inputs) {
        if !input.exists() {
            Reporter::report_error(&format!("Input file not found: {}", input.display()));
            std::process::exit(1);
        }

        let run = runner.weld_file(input, output)?;
        Reporter::report_weld(&run);
        if !run.passed() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let Some(out_dir) = out_dir else {
        Reporter::report_error("Use --output with a single input, or --out-dir");
        std::process::exit(1);
    };

    let progress = if verbose {
        None
    } else {
        let pb = ProgressBar::new(inputs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("#>-"),
        );
        Some(pb)
    };

    let results = runner.weld_batch(inputs, out_dir, progress.as_ref())?;

    if let Some(pb) = progress {
        pb.finish_with_message("Welding complete");
    }

    let mut failed = 0;
    for (input, result) in &results {
        match result {
            Ok(run) => {
                if verbose {
                    Reporter::report_weld(run);
                }
                if !run.passed() {
                    Reporter::report_warning(&format!("Verification failed: {}", input.display()));
                    failed += 1;
                }
            }
            Err(e) => {
                Reporter::report_error(&format!("{}: {:#}", input.display(), e));
                failed += 1;
            }
        }
    }

    let removed: usize = results
        .iter()
        .filter_map(|(_, result)| result.as_ref().ok())
        .map(|run| run.stats.removed_vertices())
        .sum();

    println!("\n{}", "═".repeat(80).bright_black());
    println!("{}", "Batch Summary".bold());
    println!("{}", "═".repeat(80).bright_black());
    println!("  {} {}", "Files:".bright_black(), results.len().to_string().cyan());
    println!(
        "  {} {}",
        "Failed:".bright_black(),
        if failed > 0 { failed.to_string().red() } else { failed.to_string().green() }
    );
    println!("  {} {}", "Vertices removed:".bright_black(), removed.to_string().yellow());
    println!("  {} {}", "Output:".bright_black(), out_dir.display().to_string().cyan());
    println!("{}", "═".repeat(80).bright_black());

    if failed > 0 {
        std::process::exit(1);
    }
    Reporter::success("All files welded");

    Ok(())
}

fn pairs_command(config: WeldConfig, input: &Path, json: bool) -> Result<()> {
    if !input.exists() {
        Reporter::report_error(&format!("Input file not found: {}", input.display()));
        std::process::exit(1);
    }

    let pairs = Runner::new(config).candidate_pairs(input)?;

    if json {
        let list: Vec<(usize, usize)> = pairs.into_iter().collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        Reporter::report_pairs(&pairs);
    }

    Ok(())
}

fn inspect_command(input: &Path) -> Result<()> {
    if !input.exists() {
        Reporter::report_error(&format!("Input file not found: {}", input.display()));
        std::process::exit(1);
    }

    let mesh = io::import_mesh(input)?;
    let topology = validate_mesh(&mesh);
    Reporter::report_inspect(
        &input.display().to_string(),
        mesh.vertex_count(),
        mesh.face_count(),
        &mesh.bounding_box(),
        &topology,
    );

    Ok(())
}
