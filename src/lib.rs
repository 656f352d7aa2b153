//! Hadronic matter in a periodic box.
//!
//! The engine fills a cube with hadrons (fixed or thermal multiplicities,
//! peaked, Boltzmann or quantum momenta), streams them freely and wraps them
//! at the walls, and tracks Gaussian-smeared rest-frame densities and the
//! energy-momentum tensor on a lattice, and densities at arbitrary points.

pub mod boxmodus;
pub mod density;
pub mod distributions;
pub mod energymomentumtensor;
pub mod hadgas_eos;
pub mod lattice;
pub mod output;
pub mod particles;
pub mod quantum_sampling;
pub mod simulation;

pub use boxmodus::BoxModus;
pub use density::{DensityLattice, DensityOnLattice, DensityParameters, DensityType, TmnLattice};
pub use energymomentumtensor::EnergyMomentumTensor;
pub use lattice::{LatticeUpdate, RectangularLattice};
pub use output::{OutputInterface, WallCrossingAction, WallCrossingCsvOutput};
pub use particles::{ParticleData, Particles};
pub use simulation::BoxSimulation;
