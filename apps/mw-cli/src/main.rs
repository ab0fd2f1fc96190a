use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mw_core::units::days;
use mw_fluids::{Phase, PhaseUsage, TableRelPerm};
use mw_well::{
    BlockDiagonalSystem, ConvergenceReport, InnerIterationOutcome, ReservoirContext,
    WellCollection, WellModelParameters, WellState,
};
use serde::Serialize;

mod deck;

use deck::{DeckResult, load_deck};

#[derive(Parser)]
#[command(name = "mw-cli")]
#[command(about = "Multi-segment well model driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a well deck and summarise its wells
    Validate {
        /// Path to the deck YAML file
        deck_path: PathBuf,
    },
    /// Solve the well equations against the deck's frozen reservoir
    Run {
        /// Path to the deck YAML file
        deck_path: PathBuf,
        /// Print the final report as YAML
        #[arg(long)]
        yaml: bool,
    },
}

fn main() -> DeckResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { deck_path } => cmd_validate(&deck_path),
        Commands::Run { deck_path, yaml } => cmd_run(&deck_path, yaml),
    }
}

fn cmd_validate(deck_path: &Path) -> DeckResult<()> {
    println!("Validating deck: {}", deck_path.display());
    let deck = load_deck(deck_path)?;
    let wells = deck.build_wells()?;

    println!("Cells: {}", deck.cells.len());
    for (well, _) in &wells {
        let topology = well.topology();
        let depths = topology.segments().iter().map(|s| s.depth());
        let deepest = depths.fold(f64::NEG_INFINITY, f64::max);
        println!(
            "  {} ({:?}, {} control): {} segments, {} perforations, deepest node {:.1} m",
            well.name(),
            well.settings().well_type,
            well.settings().control.name(),
            topology.number_of_segments(),
            topology.number_of_perforations(),
            deepest
        );
    }
    println!("✓ Deck is valid");
    Ok(())
}

/// Residual averaging factors in compact phase order.
fn averaging(usage: &PhaseUsage, params: &WellModelParameters) -> Vec<f64> {
    usage
        .active_phases()
        .map(|phase| params.inner_iteration_averaging[phase.index()])
        .collect()
}

#[derive(Serialize)]
struct WellSummary<'a> {
    name: &'a str,
    state: &'a WellState,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    iterations: usize,
    report: &'a ConvergenceReport,
    wells: Vec<WellSummary<'a>>,
}

fn cmd_run(deck_path: &Path, yaml: bool) -> DeckResult<()> {
    let deck = load_deck(deck_path)?;
    let usage = deck.usage();
    let pvt = deck.pvt()?;
    let relperm = TableRelPerm::default();
    let cells = deck.evaluate_cells(&pvt, &relperm)?;
    let ctx = ReservoirContext::new(&cells, &pvt, &relperm);

    let (wells, mut states): (Vec<_>, Vec<_>) = deck.build_wells()?.into_iter().unzip();
    let mut wells = WellCollection::new(wells)?;
    wells.calculate_explicit_quantities(&ctx)?;

    let dt = days(deck.timestep_days).value;
    let b_avg = averaging(&usage, &deck.parameters);
    let mut system = BlockDiagonalSystem::new(cells.len(), usage.num_phases());
    let mut report = ConvergenceReport::default();
    let mut iterations = 0;

    for it in 0..deck.max_iterations {
        system.clear();
        let outcomes = wells.assemble(&ctx, dt, &mut states, &mut system)?;
        for (well, outcome) in wells.wells().iter().zip(&outcomes) {
            if let Some(InnerIterationOutcome::Exhausted { iterations }) = outcome {
                info!(well = well.name(), iterations, "inner iterations exhausted");
            }
        }
        report = wells.convergence(&b_avg)?;
        iterations = it;
        info!(
            iteration = it,
            converged = report.converged,
            residuals = ?report.maximum_residuals,
            "well iteration"
        );
        if report.converged || report.abnormal() {
            break;
        }
        wells.solve_eq_and_update_well_state(&mut states)?;
        iterations = it + 1;
    }

    if yaml {
        let summary = RunSummary {
            iterations,
            report: &report,
            wells: wells
                .wells()
                .iter()
                .zip(&states)
                .map(|(well, state)| WellSummary {
                    name: well.name(),
                    state,
                })
                .collect(),
        };
        print!("{}", serde_yaml::to_string(&summary)?);
        return Ok(());
    }

    if report.converged {
        println!("✓ Converged after {} iterations", iterations);
    } else if report.abnormal() {
        println!("✗ Abnormal residuals after {} iterations", iterations);
        for problem in &report.problem_wells {
            println!("  {}: {}", problem.well, problem.equation);
        }
    } else {
        println!("✗ Not converged after {} iterations", iterations);
    }

    let names: Vec<&str> = usage.active_phases().map(Phase::name).collect();
    print!("Maximum residuals:");
    for (name, r) in names.iter().chain(["Pressure"].iter()).zip(&report.maximum_residuals) {
        print!("  {}={:.3e}", name, r);
    }
    println!();

    for (well, state) in wells.wells().iter().zip(&states) {
        println!("\nWell {}: bhp = {:.3} bar", well.name(), state.bhp / 1.0e5);
        for (name, rate) in names.iter().zip(&state.well_rates) {
            println!("  {:<6} rate: {:.6e} sm3/s", name, rate);
        }
        let index = well.topology().index();
        for (loc, p) in state.segment_pressures.iter().enumerate() {
            println!(
                "  segment {:>3}: p = {:.3} bar",
                index.location_to_number(loc).get(),
                p / 1.0e5
            );
        }
    }
    Ok(())
}
