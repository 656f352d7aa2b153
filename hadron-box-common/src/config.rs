use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::experiment_params::ExperimentParameters;
use crate::particle_type::ParticleType;
use std::collections::BTreeMap;
use std::path::Path;

// Run-wide settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GeneralConfig {
    pub seed: u64,
    #[serde(default = "default_testparticles")]
    pub testparticles: u32,
    /// Timestep [fm].
    pub delta_time: f64,
    /// End of the simulation [fm].
    pub end_time: f64,
    /// Interval between recorded snapshots [fm].
    pub output_interval: f64,
    /// Scales thermal densities of unstable species.
    #[serde(default = "default_res_lifetime_factor")]
    pub res_lifetime_factor: f64,
}

fn default_testparticles() -> u32 {
    1
}

fn default_res_lifetime_factor() -> f64 {
    1.0
}

/// Initial momentum distribution of the box particles.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxInitialCondition {
    /// Every particle gets |p| = 3T.
    #[serde(rename = "peaked momenta")]
    PeakedMomenta,
    /// Maxwell-Boltzmann momenta.
    #[serde(rename = "thermal momenta")]
    ThermalMomentaBoltzmann,
    /// Fermi-Dirac or Bose-Einstein momenta.
    #[serde(rename = "thermal momenta quantum")]
    ThermalMomentaQuantum,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct JetConfig {
    pub pdg: i32,
    /// Initial jet momentum along x [GeV].
    #[serde(default = "default_jet_momentum")]
    pub momentum: f64,
}

fn default_jet_momentum() -> f64 {
    20.0
}

// Box modus settings, loaded from the [box] table
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BoxConfig {
    /// Edge length of the cube [fm].
    pub length: f64,
    /// Temperature [GeV].
    pub temperature: f64,
    #[serde(default)]
    pub start_time: f64,
    /// Snapshots before this time are not written; negative disables.
    #[serde(default = "default_equilibration_time")]
    pub equilibration_time: f64,
    pub initial_condition: BoxInitialCondition,
    #[serde(default)]
    pub use_thermal_multiplicities: bool,
    #[serde(default)]
    pub baryon_chemical_potential: f64,
    #[serde(default)]
    pub strange_chemical_potential: f64,
    #[serde(default)]
    pub charge_chemical_potential: f64,
    #[serde(default = "default_account_resonance_widths")]
    pub account_resonance_widths: bool,
    /// Leptons in quantum sampling fall back to Boltzmann statistics
    /// instead of aborting the run.
    #[serde(default)]
    pub allow_lepton_boltzmann_fallback: bool,
    /// PDG code (decimal string) to initial count.
    #[serde(default)]
    pub init_multiplicities: BTreeMap<String, u32>,
    #[serde(default)]
    pub jet: Option<JetConfig>,
}

fn default_equilibration_time() -> f64 {
    -1.0
}

fn default_account_resonance_widths() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityTypeConfig {
    None,
    Hadron,
    Baryon,
    BaryonicIsospin,
    Pion,
}

// Gaussian smearing settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DensityConfig {
    /// Smearing width sigma [fm].
    #[serde(default = "default_gaussian_sigma")]
    pub gaussian_sigma: f64,
    /// Cutoff radius in units of sigma.
    #[serde(default = "default_gauss_cutoff_in_sigma")]
    pub gauss_cutoff_in_sigma: f64,
    #[serde(default = "default_density_type")]
    pub density_type: DensityTypeConfig,
}

fn default_gaussian_sigma() -> f64 {
    1.0
}

fn default_gauss_cutoff_in_sigma() -> f64 {
    4.0
}

fn default_density_type() -> DensityTypeConfig {
    DensityTypeConfig::Baryon
}

impl Default for DensityConfig {
    fn default() -> Self {
        DensityConfig {
            gaussian_sigma: default_gaussian_sigma(),
            gauss_cutoff_in_sigma: default_gauss_cutoff_in_sigma(),
            density_type: default_density_type(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatticeUpdateConfig {
    AtOutput,
    EveryTimestep,
}

// Density lattice settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LatticeConfig {
    #[serde(default)]
    pub origin: [f64; 3],
    pub sizes: [f64; 3],
    pub cell_numbers: [usize; 3],
    #[serde(default = "default_periodic")]
    pub periodic: bool,
    #[serde(default = "default_lattice_update")]
    pub update: LatticeUpdateConfig,
    /// Also fill an energy-momentum tensor lattice on the same grid.
    #[serde(default)]
    pub energy_momentum_tensor: bool,
}

fn default_periodic() -> bool {
    true
}

fn default_lattice_update() -> LatticeUpdateConfig {
    LatticeUpdateConfig::AtOutput
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_snapshots: bool,
    #[serde(default)]
    pub save_particles: bool,
    #[serde(default)]
    pub save_wall_crossings: bool,
    #[serde(default)]
    pub save_positions_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

fn default_true() -> bool {
    true
}

// Main configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub general: GeneralConfig,
    #[serde(rename = "box")]
    pub box_modus: BoxConfig,
    #[serde(default)]
    pub density: DensityConfig,
    #[serde(default)]
    pub lattice: Option<LatticeConfig>,
    pub output: OutputConfig,
    /// Replaces the built-in species table when present.
    #[serde(default)]
    pub species: Option<Vec<ParticleType>>,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.general.testparticles == 0 {
            anyhow::bail!("testparticles must be greater than 0.");
        }
        if self.general.delta_time <= 0.0 {
            anyhow::bail!("delta_time must be positive, got {}.", self.general.delta_time);
        }
        if self.box_modus.length <= 0.0 {
            anyhow::bail!("Box length must be positive, got {}.", self.box_modus.length);
        }
        if self.density.gaussian_sigma <= 0.0 {
            anyhow::bail!("gaussian_sigma must be positive, got {}.", self.density.gaussian_sigma);
        }
        if self.density.gauss_cutoff_in_sigma <= 0.0 {
            anyhow::bail!("gauss_cutoff_in_sigma must be positive, got {}.", self.density.gauss_cutoff_in_sigma);
        }
        if let Some(lattice) = &self.lattice {
            if lattice.cell_numbers.iter().any(|&n| n == 0) {
                anyhow::bail!("Lattice cell numbers must be positive, got {:?}.", lattice.cell_numbers);
            }
            if lattice.sizes.iter().any(|&s| s <= 0.0) {
                anyhow::bail!("Lattice sizes must be positive, got {:?}.", lattice.sizes);
            }
        }
        Ok(())
    }

    /// Derives the run-scoped parameters shared by all components.
    pub fn experiment_parameters(&self) -> ExperimentParameters {
        ExperimentParameters {
            testparticles: self.general.testparticles,
            gaussian_sigma: self.density.gaussian_sigma,
            gauss_cutoff_in_sigma: self.density.gauss_cutoff_in_sigma,
            box_length: self.box_modus.length,
            res_lifetime_factor: self.general.res_lifetime_factor,
            delta_time: self.general.delta_time,
        }
    }
}
