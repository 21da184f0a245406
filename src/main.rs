//! kepsim - Keplerian orbit propagation from the command line.
//!
//! Propagates a catalog satellite over a fixed time grid, prints the initial
//! elements and a summary of the series, and optionally writes the full
//! ephemeris as JSON for plotting tools.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use kepsim::body::EARTH;
use kepsim::catalog::Catalog;
use kepsim::propagator::{Propagator, RunOptions, Schedule, TimeGrid, DEFAULT_CHUNK};
use kepsim::report::{ElementTable, EphemerisDocument, SeriesSummary};

#[derive(Parser, Debug)]
#[command(name = "kepsim", version, about = "Two-body Keplerian orbit propagator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Propagate a satellite and report the series
    Propagate(PropagateArgs),
    /// Print the initial elements of a satellite
    Show(ShowArgs),
    /// List satellites in the catalog
    List(CatalogArgs),
}

#[derive(Args, Debug, Clone)]
struct CatalogArgs {
    /// YAML catalog file (built-in catalog when omitted)
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct ShowArgs {
    /// Catalog entry name
    #[arg(long, default_value = "LEO 1")]
    satellite: String,
    #[command(flatten)]
    catalog: CatalogArgs,
}

#[derive(Args, Debug, Clone)]
struct PropagateArgs {
    #[command(flatten)]
    target: ShowArgs,
    /// Time horizon in days
    #[arg(long, default_value_t = 0.2)]
    days: f64,
    /// Propagation step in seconds
    #[arg(long, default_value_t = 30.0)]
    step: f64,
    /// Spread samples across all cores
    #[arg(long)]
    parallel: bool,
    /// Samples per parallel work unit
    #[arg(long, default_value_t = DEFAULT_CHUNK)]
    chunk: usize,
    /// Output JSON file path
    #[arg(long)]
    output: Option<PathBuf>,
    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
}

fn load_catalog(args: &CatalogArgs) -> Result<Catalog> {
    match &args.catalog {
        Some(path) => Catalog::load(path).with_context(|| format!("loading catalog {path:?}")),
        None => Ok(Catalog::builtin()),
    }
}

fn run_show(args: ShowArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let entry = catalog.get(&args.satellite)?;
    let elements = entry
        .elements(&EARTH)
        .with_context(|| format!("invalid elements for '{}'", entry.name))?;
    println!("{}", ElementTable { name: &entry.name, elements: &elements, body: &EARTH });
    Ok(())
}

fn run_list(args: CatalogArgs) -> Result<()> {
    let catalog = load_catalog(&args)?;
    for name in catalog.names() {
        println!("{name}");
    }
    Ok(())
}

fn run_propagate(args: PropagateArgs) -> Result<()> {
    let catalog = load_catalog(&args.target.catalog)?;
    let entry = catalog.get(&args.target.satellite)?;
    let elements = entry
        .elements(&EARTH)
        .with_context(|| format!("invalid elements for '{}'", entry.name))?;
    let grid = TimeGrid::from_days(args.days, args.step).context("invalid time grid")?;

    println!("{}", ElementTable { name: &entry.name, elements: &elements, body: &EARTH });
    log::info!("Running simulation for {}...", entry.name);

    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(grid.len() as u64)
    };
    progress.set_style(
        ProgressStyle::with_template(
            "{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {percent}% ETA {eta_precise}",
        )?
        .progress_chars("##-"),
    );
    let observer = |index: usize, _total: usize| progress.set_position(index as u64 + 1);

    let schedule = if args.parallel {
        Schedule::Parallel { chunk: args.chunk }
    } else {
        Schedule::Sequential
    };
    let options = RunOptions::default().with_schedule(schedule).with_observer(&observer);

    let ephemeris = Propagator::new(elements, EARTH)
        .propagate_with(&grid, &options)
        .with_context(|| format!("propagating '{}'", entry.name))?;
    progress.finish_and_clear();

    if let Some(summary) = SeriesSummary::from_ephemeris(&ephemeris, &elements) {
        println!("{summary}");
    }

    if let Some(output) = &args.output {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(output)
            .with_context(|| format!("creating {output:?}"))?;
        EphemerisDocument::new(&entry.name, &elements, &EARTH, &ephemeris)
            .write_json(std::io::BufWriter::new(file))?;
        log::info!("Wrote ephemeris to {:?}", output);
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Propagate(args) => run_propagate(args),
        Command::Show(args) => run_show(args),
        Command::List(args) => run_list(args),
    }
}
