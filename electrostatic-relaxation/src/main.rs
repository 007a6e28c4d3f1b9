use anyhow::{Context, Result};
use clap::Parser;
use electrostatic_relaxation::config::{Config, Scheme};
use electrostatic_relaxation::visualisation::HeatmapRenderer;
use electrostatic_relaxation::{Grid, Solution};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Relax the potential of an electrode pair or charge layout")]
struct Args {
    /// TOML run configuration; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Solve with every scheme and compare iteration counts
    #[arg(long)]
    compare: bool,

    /// Skip writing heatmaps
    #[arg(long)]
    no_render: bool,
}

struct Run {
    scheme: Scheme,
    elapsed: Duration,
    outcome: electrostatic_relaxation::Result<Solution>,
}

fn solve(config: &Config, scheme: Scheme) -> Result<Run> {
    let solver = config.solver(scheme)?;
    let start = Instant::now();
    let outcome = solver.run_with_observer(|progress| {
        info!(
            scheme = %scheme,
            iteration = progress.iteration,
            "delta = {:e}",
            progress.delta
        );
    });
    Ok(Run {
        scheme,
        elapsed: start.elapsed(),
        outcome,
    })
}

fn report(run: &Run) {
    match &run.outcome {
        Ok(solution) if solution.converged => info!(
            "{}: converged in {} iterations (delta {:e}, {:.3?})",
            run.scheme, solution.iterations, solution.delta, run.elapsed
        ),
        Ok(solution) => warn!(
            "{}: stopped after {} iterations without converging (delta {:e}, {:.3?})",
            run.scheme, solution.iterations, solution.delta, run.elapsed
        ),
        Err(e) => warn!("{}: failed after {:.3?}: {}", run.scheme, run.elapsed, e),
    }
}

fn render(renderer: &HeatmapRenderer, grid: &Grid, run: &Run) -> Result<()> {
    if let Ok(solution) = &run.outcome {
        let title = format!("{} ({} iterations)", run.scheme, solution.iterations);
        renderer.render(&solution.potential, grid, &title, &run.scheme.to_string())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.log_summary();

    let schemes: Vec<Scheme> = if args.compare {
        Scheme::ALL.to_vec()
    } else {
        vec![config.solver.scheme]
    };

    // Runs are independent; each one relaxes its own grid sequentially.
    let runs = schemes
        .par_iter()
        .map(|&scheme| solve(&config, scheme))
        .collect::<Result<Vec<_>>>()?;

    for run in &runs {
        report(run);
    }

    if config.output.render && !args.no_render {
        let grid = config.grid()?;
        let renderer =
            HeatmapRenderer::new(&config.output.dir, config.output.width, config.output.height)
                .context("failed to set up heatmap output")?;
        for run in &runs {
            render(&renderer, &grid, run)?;
        }
    }

    Ok(())
}
