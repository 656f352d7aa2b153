use serde::{Deserialize, Serialize};

/// Run-scoped parameters derived from the configuration, shared read-only by
/// the modus, the density layer and the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentParameters {
    pub testparticles: u32,
    /// Gaussian smearing width [fm].
    pub gaussian_sigma: f64,
    /// Smearing cutoff radius in units of sigma.
    pub gauss_cutoff_in_sigma: f64,
    /// Globally agreed box edge length [fm].
    pub box_length: f64,
    pub res_lifetime_factor: f64,
    /// Timestep [fm].
    pub delta_time: f64,
}

impl Default for ExperimentParameters {
    fn default() -> Self {
        ExperimentParameters {
            testparticles: 1,
            gaussian_sigma: 1.0,
            gauss_cutoff_in_sigma: 4.0,
            box_length: 10.0,
            res_lifetime_factor: 1.0,
            delta_time: 0.1,
        }
    }
}
