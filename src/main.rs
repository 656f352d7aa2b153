use anyhow::Result;
use clap::Parser;
use hadron_box::output::{save_particles_csv, save_snapshots, SnapshotFormat, WallCrossingCsvOutput};
use hadron_box::BoxSimulation;
use hadron_box_common::SimulationConfig;
use log::{debug, error, info, trace, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Hadron gas in a periodic box.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the TOML configuration.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides the random seed of the configuration.
    #[arg(short, long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting hadron box...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        info!("Overriding seed {} with {}.", config.general.seed, seed);
        config.general.seed = seed;
    }

    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Box ---
    let mut sim = BoxSimulation::new(config)?;
    info!("Box initialized with {} particles at t = {} fm.", sim.particles().len(), sim.time());
    debug!("Run parameters: {:#?}", sim.params());

    if sim.config().output.save_wall_crossings {
        let filename = format!("{}_wall_crossings.csv", sim.config().output.base_filename);
        sim.add_output(Box::new(WallCrossingCsvOutput::create(&filename)?));
        info!("Writing wall crossings to {}", filename);
    }

    // --- Simulation Loop ---
    let dt = sim.params().delta_time;
    let total_steps = ((sim.config().general.end_time - sim.time()) / dt).ceil().max(0.0) as u64;
    let output_interval = sim.config().general.output_interval.max(0.0);
    let mut record_interval_steps = (output_interval / dt).round() as u64;
    if record_interval_steps == 0 {
        warn!(
            "Output interval ({:.3} fm) is smaller than the timestep ({:.3} fm). Recording every step.",
            output_interval, dt
        );
        record_interval_steps = 1;
    }
    info!("Recording snapshot every {} steps ({:.3} fm).", record_interval_steps, record_interval_steps as f64 * dt);

    info!("Starting simulation loop for {} steps...", total_steps);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;

    // --- Initial Snapshot ---
    info!("Recording initial snapshot (t = {} fm)...", sim.time());
    if let Err(e) = sim.record_snapshot() {
        error!("Error recording initial snapshot: {}", e);
        anyhow::bail!("Failed to record initial snapshot.");
    }

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        if let Err(e) = sim.step() {
            error!("Error during simulation step {}: {}", step + 1, e);
            anyhow::bail!("Simulation step failed.");
        }
        let step_duration = step_start_time.elapsed();

        let current_time = Instant::now();
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= 5.0;
        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step + 1 == total_steps;

        if should_print_status || is_record_step || is_last_step {
            info!(
                "Step [{}/{}] (t = {:.2} fm) | Particles: {} | Wall crossings: {} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                step + 1,
                total_steps,
                sim.time(),
                sim.particles().len(),
                sim.total_wraps(),
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;

            if is_record_step || is_last_step {
                if let Err(e) = sim.record_snapshot() {
                    error!("Error recording snapshot at step {}: {}", step + 1, e);
                    anyhow::bail!("Failed to record snapshot.");
                }
            }
        } else {
            trace!("Step [{}/{}] completed in {:.2} ms", step + 1, total_steps, step_duration.as_secs_f64() * 1000.0);
        }
    }

    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());
    sim.finish()?;

    // --- Save Recorded Data ---
    let base = sim.config().output.base_filename.clone();
    if sim.config().output.save_snapshots {
        let format = SnapshotFormat::from_name(sim.config().output.format.as_deref());
        match save_snapshots(&base, format, sim.get_recorded_snapshots()) {
            Ok(filename) => info!("{} snapshots saved to {}", sim.get_recorded_snapshots().len(), filename),
            Err(e) => error!("Error saving snapshots: {}", e),
        }
    } else {
        info!("Skipping saving snapshots as per config (save_snapshots is false).");
    }

    if sim.config().output.save_particles {
        match save_particles_csv(&base, sim.particles()) {
            Ok(filename) => info!("Final particles saved to {}", filename),
            Err(e) => error!("Error saving final particles: {}", e),
        }
    } else {
        info!("Skipping saving final particles as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}
