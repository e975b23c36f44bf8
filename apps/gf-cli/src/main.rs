use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gf_engine::{EngineConfig, EngineResult, Orchestrator, RoundReport};
use gf_model::{load_grid_yaml, segment_with_stats};
use gf_solver::{BuiltinSolverFactory, CalculationMethod};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gf-cli")]
#[command(about = "GridFlow CLI - segmented grid recalculation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate grid file syntax and references
    Validate {
        /// Path to the grid YAML file
        grid_path: PathBuf,
    },
    /// Print the segments of a grid
    Segment {
        /// Path to the grid YAML file
        grid_path: PathBuf,
    },
    /// Run recalculation rounds on a grid
    Run {
        /// Path to the grid YAML file
        grid_path: PathBuf,
        /// Calculation method (optimize, lopf, lpf, pf)
        #[arg(short, long)]
        method: Option<CalculationMethod>,
        /// Engine configuration YAML file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of rounds to run
        #[arg(long, default_value_t = 1)]
        rounds: usize,
        /// Dispatch every segment, not only changed ones
        #[arg(long)]
        force: bool,
        /// Print round reports as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> EngineResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { grid_path } => cmd_validate(&grid_path),
        Commands::Segment { grid_path } => cmd_segment(&grid_path),
        Commands::Run {
            grid_path,
            method,
            config,
            rounds,
            force,
            json,
        } => cmd_run(&grid_path, method, config.as_deref(), rounds, force, json),
    }
}

fn cmd_validate(grid_path: &Path) -> EngineResult<()> {
    println!("Validating grid: {}", grid_path.display());
    let grid = load_grid_yaml(grid_path)?;
    let model = grid.to_model()?;
    println!("✓ Grid is valid");
    println!("  Buses: {}", model.bus_count());
    println!("  Lines/transformers: {}", model.edge_count());
    println!("  Injections: {}", model.injection_count());
    println!("  Snapshots: {}", grid.snapshots().len());
    Ok(())
}

fn cmd_segment(grid_path: &Path) -> EngineResult<()> {
    let model = load_grid_yaml(grid_path)?.to_model()?;
    let (segments, stats) = segment_with_stats(&model);

    println!(
        "{} segment(s) in {:.3} ms",
        segments.len(),
        stats.elapsed_s * 1000.0
    );
    for (i, segment) in segments.iter().enumerate() {
        println!(
            "  [{}] {} buses, {} lines, {} transformers, {} injections{}",
            i,
            segment.bus_count(),
            segment.lines().len(),
            segment.transformers().len(),
            segment.injection_count(),
            if segment.has_generation() {
                ""
            } else {
                " (no generation)"
            }
        );
        println!("      {}", segment.bus_names().join(", "));
    }
    Ok(())
}

fn cmd_run(
    grid_path: &Path,
    method: Option<CalculationMethod>,
    config_path: Option<&Path>,
    rounds: usize,
    force: bool,
    json: bool,
) -> EngineResult<()> {
    let mut config = match config_path {
        Some(path) => {
            debug!(path = %path.display(), "loading engine config");
            EngineConfig::from_yaml_file(path)?
        }
        None => EngineConfig::default(),
    };
    if let Some(method) = method {
        config.method = method;
    }

    let grid = load_grid_yaml(grid_path)?;
    let mut engine = Orchestrator::start(Arc::new(BuiltinSolverFactory), &config)?;
    engine.set_snapshots(grid.snapshots());
    let model = grid.to_model()?;
    info!(
        grid = %grid_path.display(),
        buses = model.bus_count(),
        snapshots = grid.snapshots().len(),
        "grid loaded"
    );
    engine.set_input_model(model);

    println!(
        "Running {} round(s) with method {} on {}",
        rounds,
        config.method,
        grid_path.display()
    );
    for round in 1..=rounds {
        let report = if force {
            engine.force_calculate()?
        } else {
            engine.selective_calculate()?
        };
        if json {
            let rendered = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
            println!("{rendered}");
        } else {
            print_report(round, &report);
        }
    }

    let stats = engine.pool().stats();
    let solve = stats.solve_summary();
    println!(
        "Pool: {} slot(s), {} segment(s) solved, {:.3} s solving (max {:.3} ms), {} failure(s)",
        engine.pool().slot_count(),
        stats.segments_solved(),
        solve.total_s,
        solve.max_s * 1000.0,
        stats.failures()
    );
    engine.shutdown();
    Ok(())
}

fn print_report(round: usize, report: &RoundReport) {
    println!(
        "Round {} ({}): {} of {} segment(s) dispatched, {} skipped",
        round,
        report.mode,
        report.dispatched(),
        report.segments_total,
        report.segments_skipped
    );
    for segment in &report.segments {
        let marker = if segment.status.is_ok() { "✓" } else { "✗" };
        println!(
            "  {} slot {}: {} / {} ({} buses, build {:.3} ms, solve {:.3} ms)",
            marker,
            segment.slot + 1,
            segment.status,
            segment.condition,
            segment.bus_names.len(),
            segment.build_time_s * 1000.0,
            segment.solve_time_s * 1000.0
        );
    }
    println!(
        "  Segmentation {:.3} ms, diff {:.3} ms, wall {:.3} ms",
        report.segmentation_time_s * 1000.0,
        report.diff_time_s * 1000.0,
        report.wall_time_s * 1000.0
    );
}
