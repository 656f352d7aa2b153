use serde::{Serialize, Deserialize};

/// A snapshot of the box state at an output time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation time [fm].
    pub time: f64,
    pub particle_count: u32,
    /// Boundary crossings since the previous snapshot.
    pub wall_crossings: u64,
    /// Summed 4-momentum (E, px, py, pz) of all particles [GeV].
    pub total_momentum: [f64; 4],
    /// Rest-frame density of every lattice cell, x fastest [fm^-3].
    /// Empty when no lattice is configured.
    pub lattice_densities: Vec<f64>,
    /// Energy density T^00 of every lattice cell, x fastest [GeV fm^-3].
    /// Empty unless the energy-momentum tensor lattice is enabled.
    #[serde(default)]
    pub lattice_energy_densities: Vec<f64>,
    /// Eckart density at the centre of the box [fm^-3].
    pub central_density: f64,
    /// Particle positions [fm], only when requested in the config. Always
    /// written, as `null` when absent, so positional encodings stay decodable.
    #[serde(default)]
    pub positions: Option<Vec<[f64; 3]>>,
}
