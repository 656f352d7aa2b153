pub mod config;
pub mod constants;
pub mod experiment_params;
pub mod fourvector;
pub mod particle_type;
pub mod pdg;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{
    BoxConfig, BoxInitialCondition, DensityConfig, DensityTypeConfig, GeneralConfig, JetConfig,
    LatticeConfig, LatticeUpdateConfig, OutputConfig, SimulationConfig,
};
pub use constants::{HBARC, REALLY_SMALL, WIDTH_CUTOFF};
pub use experiment_params::ExperimentParameters;
pub use fourvector::{FourVector, ThreeVector};
pub use particle_type::{ParticleType, SpeciesCatalog};
pub use pdg::PdgCode;
pub use snapshot::Snapshot;
