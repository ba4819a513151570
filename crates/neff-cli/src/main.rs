//! neff command-line interface.
//!
//! Sweep, fit and evaluate waveguide models from TOML job files:
//! ```sh
//! neff run job.toml
//! neff validate job.toml
//! neff materials
//! neff mzi --delta-length 20
//! ```

mod config;
mod runner;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use neff_core::model::Model;
use neff_geometry::layout::{mzi, MziParams};
use neff_materials::MaterialLibrary;

#[derive(Parser)]
#[command(name = "neff")]
#[command(about = "neff: parameter-swept waveguide mode models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep, fit and evaluate a model from a TOML job file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a job file and build its model without solving.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List built-in materials.
    Materials,
    /// Lay out a Mach-Zehnder interferometer and print its ports.
    Mzi {
        /// Length difference between the arms (µm).
        #[arg(long, default_value_t = 10.0)]
        delta_length: f64,
        /// Vertical arm length (µm).
        #[arg(long, default_value_t = 0.1)]
        length_y: f64,
        /// Horizontal arm length (µm).
        #[arg(long, default_value_t = 0.1)]
        length_x: f64,
        /// Bend radius (µm).
        #[arg(long, default_value_t = 10.0)]
        bend_radius: f64,
        /// Omit the input and output splitters.
        #[arg(long)]
        no_splitter: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("neff waveguide model");
            println!("====================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            runner::write_sweep_csv(&result.sweep, &out_dir.join("sweep.csv"), &job)?;
            if job.output.save_json {
                runner::write_sweep_json(&result.sweep, &out_dir.join("sweep.json"))?;
            }
            if !result.queries.is_empty() {
                runner::write_sdict_csv(&result.queries, &out_dir.join("sdict.csv"))?;
            }

            println!("Job complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let model = runner::build_model(&job)?;
            let space = model.space();
            for (i, query) in job.query.iter().enumerate() {
                runner::query_assignment(space, query).with_context(|| format!("query {i}"))?;
            }
            println!("Configuration is valid: {}", config.display());
            println!(
                "  {} parameters, {} grid points, {} modes",
                space.len(),
                space.grid_size(job.sweep.mode),
                model.num_modes()
            );
            Ok(())
        }
        Commands::Materials => {
            println!("Built-in materials:");
            println!();
            let lib = MaterialLibrary::builtin();
            for (id, m) in lib.iter() {
                let (lo, hi) = m.wavelength_range();
                println!("  {id:<6} {:<24} {lo}–{hi} µm", m.name());
            }
            Ok(())
        }
        Commands::Mzi {
            delta_length,
            length_y,
            length_x,
            bend_radius,
            no_splitter,
        } => {
            let params = MziParams {
                delta_length,
                length_y,
                length_x,
                bend_radius,
                with_splitter: !no_splitter,
                ..Default::default()
            };
            let layout = mzi(&params)?;
            println!("Ports:");
            for port in layout.ports() {
                println!(
                    "  {:<4} ({:>9.3}, {:>9.3}) µm  {:>6.1}°  w={} µm",
                    port.name, port.position[0], port.position[1], port.orientation, port.width
                );
            }
            let (top, bottom) = layout.arm_lengths()?;
            println!(
                "Arm lengths: top {top:.3} µm, bottom {bottom:.3} µm (Δ = {:.3} µm)",
                bottom - top
            );
            Ok(())
        }
    }
}
