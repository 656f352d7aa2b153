use crate::boxmodus::BoxModus;
use crate::density::{
    rho_eckart_particles, update_density_lattice, update_tmn_lattice, DensityLattice, DensityParameters,
    DensityType, TmnLattice,
};
use crate::lattice::{LatticeUpdate, RectangularLattice};
use crate::output::OutputInterface;
use crate::particles::Particles;
use anyhow::Result;
use hadron_box_common::{
    ExperimentParameters, FourVector, SimulationConfig, Snapshot, SpeciesCatalog, ThreeVector,
};
use log::{debug, info, trace};
use rand::prelude::*;
use rayon::prelude::*;
use std::sync::Arc;

/// A box of hadrons streaming freely between periodic walls.
pub struct BoxSimulation {
    /// The simulation configuration as loaded.
    config: SimulationConfig,
    params: ExperimentParameters,
    modus: BoxModus,
    particles: Particles,
    density_params: DensityParameters,
    density_type: DensityType,
    /// Present only when a `[lattice]` section is configured.
    lattice: Option<DensityLattice>,
    /// Energy-momentum tensor on the same grid, when enabled.
    tmn_lattice: Option<TmnLattice>,
    outputs: Vec<Box<dyn OutputInterface>>,
    /// Current simulation time [fm].
    time: f64,
    current_step: u64,
    wraps_since_snapshot: u64,
    total_wraps: u64,
    /// Stores collected snapshots at output times.
    recorded_snapshots: Vec<Snapshot>,
}

impl BoxSimulation {
    /// Builds the species catalog and the box from `config` and creates the
    /// initial particles.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let catalog = match &config.species {
            Some(entries) => SpeciesCatalog::new(entries.clone())?,
            None => SpeciesCatalog::default_hadrons()?,
        };
        let params = config.experiment_parameters();
        let modus = BoxModus::new(&config.box_modus, &params, Arc::new(catalog))?;
        Self::with_modus(config, modus)
    }

    /// Like [`Self::new`], with a box built by the caller.
    pub fn with_modus(config: SimulationConfig, mut modus: BoxModus) -> Result<Self> {
        let params = config.experiment_parameters();
        info!("{}", modus);

        let mut rng = StdRng::seed_from_u64(config.general.seed);
        let mut particles = Particles::new();
        let time = modus.initial_conditions(&mut particles, &mut rng)?;

        let lattice = match &config.lattice {
            Some(lat_config) => Some(RectangularLattice::from_config(lat_config)?),
            None => None,
        };
        let tmn_lattice = match &config.lattice {
            Some(lat_config) if lat_config.energy_momentum_tensor => {
                Some(RectangularLattice::from_config(lat_config)?)
            }
            _ => None,
        };
        let density_type = DensityType::from(config.density.density_type);
        let density_params = DensityParameters::new(&params);
        debug!("Density parameters: {:?}", density_params);

        Ok(Self {
            config,
            params,
            modus,
            particles,
            density_params,
            density_type,
            lattice,
            tmn_lattice,
            outputs: Vec::new(),
            time,
            current_step: 0,
            wraps_since_snapshot: 0,
            total_wraps: 0,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Registers a receiver for wall crossings.
    pub fn add_output(&mut self, output: Box<dyn OutputInterface>) {
        self.outputs.push(output);
    }

    /// Advances the box by one timestep `delta_time`.
    pub fn step(&mut self) -> Result<()> {
        let dt = self.params.delta_time;

        // --- 1. Free streaming (Parallel) ---
        self.particles.as_mut_slice().par_iter_mut().for_each(|p| {
            let x = p.position();
            let moved = x.threevec() + p.velocity() * dt;
            p.set_4position(FourVector::from_parts(x.x0 + dt, moved));
        });
        self.time += dt;

        // --- 2. Periodic boundaries ---
        let wraps = self.modus.impose_boundary_conditions(&mut self.particles, &mut self.outputs)? as u64;
        self.wraps_since_snapshot += wraps;
        self.total_wraps += wraps;

        // --- 3. Lattices ---
        update_density_lattice(
            self.lattice.as_mut(),
            LatticeUpdate::EveryTimestep,
            self.density_type,
            &self.density_params,
            &self.particles,
        );
        update_tmn_lattice(
            self.tmn_lattice.as_mut(),
            LatticeUpdate::EveryTimestep,
            DensityType::Hadron,
            &self.density_params,
            &self.particles,
        );

        self.current_step += 1;
        trace!("Step {} done at t = {:.3} fm, {} wraps", self.current_step, self.time, wraps);
        Ok(())
    }

    /// Records a snapshot of the current state. Before the equilibration time
    /// only the initial snapshot is kept. Returns whether one was recorded.
    pub fn record_snapshot(&mut self) -> Result<bool> {
        let equilibration_time = self.modus.equilibration_time();
        let is_initial = self.current_step == 0;
        if !is_initial && equilibration_time > 0.0 && self.time < equilibration_time {
            debug!("Skipping snapshot at {:.2} fm, before equilibration at {:.2} fm.", self.time, equilibration_time);
            return Ok(false);
        }

        update_density_lattice(
            self.lattice.as_mut(),
            LatticeUpdate::AtOutput,
            self.density_type,
            &self.density_params,
            &self.particles,
        );
        update_tmn_lattice(
            self.tmn_lattice.as_mut(),
            LatticeUpdate::AtOutput,
            DensityType::Hadron,
            &self.density_params,
            &self.particles,
        );

        let half = 0.5 * self.modus.length();
        let (central_density, _) = rho_eckart_particles(
            ThreeVector::new(half, half, half),
            &self.particles,
            &self.density_params,
            self.density_type,
            false,
        );
        let lattice_densities = match &self.lattice {
            Some(lat) => lat.iter().map(|node| node.density()).collect(),
            None => Vec::new(),
        };
        let lattice_energy_densities = match &self.tmn_lattice {
            Some(lat) => lat.iter().map(|node| node.energy_density()).collect(),
            None => Vec::new(),
        };
        let positions = if self.config.output.save_positions_in_snapshot {
            Some(self.particles.iter().map(|p| p.position().threevec().to_array()).collect())
        } else {
            None
        };
        let total = self.particles.total_momentum();

        debug!("Recording snapshot at {:.2} fm...", self.time);
        self.recorded_snapshots.push(Snapshot {
            time: self.time,
            particle_count: self.particles.len() as u32,
            wall_crossings: self.wraps_since_snapshot,
            total_momentum: [total.x0, total.x1, total.x2, total.x3],
            lattice_densities,
            lattice_energy_densities,
            central_density,
            positions,
        });
        self.wraps_since_snapshot = 0;
        Ok(true)
    }

    /// Tells every output that the run is over.
    pub fn finish(&mut self) -> Result<()> {
        for output in self.outputs.iter_mut() {
            output.at_eventend()?;
        }
        Ok(())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn params(&self) -> &ExperimentParameters {
        &self.params
    }

    pub fn modus(&self) -> &BoxModus {
        &self.modus
    }

    pub fn particles(&self) -> &Particles {
        &self.particles
    }

    pub fn lattice(&self) -> Option<&DensityLattice> {
        self.lattice.as_ref()
    }

    pub fn tmn_lattice(&self) -> Option<&TmnLattice> {
        self.tmn_lattice.as_ref()
    }

    pub fn density_params(&self) -> &DensityParameters {
        &self.density_params
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    pub fn total_wraps(&self) -> u64 {
        self.total_wraps
    }

    pub fn get_recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }
}
