use crate::distributions::{integrate_simpson, juttner_distribution_func};
use hadron_box_common::PdgCode;
use rand::{Rng, RngCore};
use std::f64::consts::PI;
use std::fmt;

/// Occupation statistics of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantumStatistics {
    FermiDirac,
    BoseEinstein,
    Boltzmann,
}

impl QuantumStatistics {
    /// The `s` in `1 / (exp((E - μ)/T) + s)`.
    pub fn sign(self) -> f64 {
        match self {
            QuantumStatistics::FermiDirac => 1.0,
            QuantumStatistics::BoseEinstein => -1.0,
            QuantumStatistics::Boltzmann => 0.0,
        }
    }

    /// Fermi-Dirac for baryons, Bose-Einstein for mesons, nothing otherwise.
    pub fn of_hadron(pdg: PdgCode) -> Option<Self> {
        if pdg.is_baryon() {
            Some(QuantumStatistics::FermiDirac)
        } else if pdg.is_meson() {
            Some(QuantumStatistics::BoseEinstein)
        } else {
            None
        }
    }
}

impl fmt::Display for QuantumStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuantumStatistics::FermiDirac => "Fermi-Dirac",
            QuantumStatistics::BoseEinstein => "Bose-Einstein",
            QuantumStatistics::Boltzmann => "Boltzmann",
        };
        f.write_str(name)
    }
}

/// Why no chemical potential reproduces a requested density.
#[derive(Debug, Clone, PartialEq)]
pub enum ChemicalPotentialError {
    /// The requested density [GeV³] was zero or negative.
    NonPositiveDensity(f64),
    /// Bosons cannot reach the requested density [GeV³] with `μ < m`.
    BoseCondensation { mass: f64, density: f64, max_density: f64 },
    /// The root search did not bracket or converge.
    NoConvergence { iterations: usize },
}

impl fmt::Display for ChemicalPotentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChemicalPotentialError::NonPositiveDensity(n) => {
                write!(f, "number density must be positive, got {} GeV^3", n)
            }
            ChemicalPotentialError::BoseCondensation { mass, density, max_density } => write!(
                f,
                "density {} GeV^3 exceeds the largest uncondensed Bose-Einstein density {} GeV^3 for mass {} GeV",
                density, max_density, mass
            ),
            ChemicalPotentialError::NoConvergence { iterations } => {
                write!(f, "chemical potential search did not converge after {} iterations", iterations)
            }
        }
    }
}

impl std::error::Error for ChemicalPotentialError {}

/// Momentum sampling from quantum distributions at fixed density.
pub trait QuantumSampling: Send + Sync {
    /// Chemical potential [GeV] at which a gas of `degeneracy`-fold species of
    /// `mass` at `temperature` has `number_density` [GeV³].
    fn effective_chemical_potential(
        &self,
        degeneracy: f64,
        mass: f64,
        number_density: f64,
        temperature: f64,
        statistics: QuantumStatistics,
        precision: f64,
    ) -> Result<f64, ChemicalPotentialError>;

    /// Largest value of `p² f(p)` over all momenta.
    fn maximum_of_the_distribution(
        &self,
        mass: f64,
        temperature: f64,
        chemical_potential: f64,
        statistics: QuantumStatistics,
        precision: f64,
    ) -> f64;

    /// One radial momentum [GeV] in `[0, max_momentum]`.
    #[allow(clippy::too_many_arguments)]
    fn sample_momentum(
        &self,
        mass: f64,
        temperature: f64,
        chemical_potential: f64,
        statistics: QuantumStatistics,
        max_momentum: f64,
        distribution_maximum: f64,
        rng: &mut dyn RngCore,
    ) -> f64;
}

const MAX_ITERATIONS: usize = 500;

/// Quadrature, bisection and rejection sampling.
#[derive(Debug, Clone)]
pub struct NumericalQuantumSampling {
    integration_steps: usize,
}

impl Default for NumericalQuantumSampling {
    fn default() -> Self {
        Self { integration_steps: 2000 }
    }
}

impl NumericalQuantumSampling {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number density [GeV³] at chemical potential `mu`.
    pub fn number_density(&self, degeneracy: f64, mass: f64, temperature: f64, mu: f64, statistics: QuantumStatistics) -> f64 {
        let s = statistics.sign();
        let e_max = mass.max(mu) + 50.0 * temperature;
        let p_max = (e_max * e_max - mass * mass).sqrt();
        let integral = integrate_simpson(
            |p| juttner_distribution_func(p, mass, temperature, mu, s),
            0.0,
            p_max,
            self.integration_steps,
        );
        degeneracy / (2.0 * PI * PI) * integral
    }
}

impl QuantumSampling for NumericalQuantumSampling {
    fn effective_chemical_potential(
        &self,
        degeneracy: f64,
        mass: f64,
        number_density: f64,
        temperature: f64,
        statistics: QuantumStatistics,
        precision: f64,
    ) -> Result<f64, ChemicalPotentialError> {
        if !(number_density > 0.0) {
            return Err(ChemicalPotentialError::NonPositiveDensity(number_density));
        }
        let density = |mu: f64| self.number_density(degeneracy, mass, temperature, mu, statistics);

        let mut hi = if statistics == QuantumStatistics::BoseEinstein {
            let limit = mass - precision;
            let max_density = density(limit);
            if max_density < number_density {
                return Err(ChemicalPotentialError::BoseCondensation { mass, density: number_density, max_density });
            }
            limit
        } else {
            let mut hi = mass;
            let mut step = temperature;
            let mut iterations = 0;
            while density(hi) < number_density {
                hi += step;
                step *= 2.0;
                iterations += 1;
                if iterations > MAX_ITERATIONS {
                    return Err(ChemicalPotentialError::NoConvergence { iterations });
                }
            }
            hi
        };

        let mut lo = hi - temperature;
        let mut step = temperature;
        let mut iterations = 0;
        while density(lo) > number_density {
            lo -= step;
            step *= 2.0;
            iterations += 1;
            if iterations > MAX_ITERATIONS {
                return Err(ChemicalPotentialError::NoConvergence { iterations });
            }
        }

        for _ in 0..MAX_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if hi - lo < precision {
                return Ok(mid);
            }
            if density(mid) < number_density {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Err(ChemicalPotentialError::NoConvergence { iterations: MAX_ITERATIONS })
    }

    fn maximum_of_the_distribution(
        &self,
        mass: f64,
        temperature: f64,
        chemical_potential: f64,
        statistics: QuantumStatistics,
        precision: f64,
    ) -> f64 {
        let s = statistics.sign();
        let f = |p: f64| juttner_distribution_func(p, mass, temperature, chemical_potential, s);
        // golden-section search; p² f(p) is unimodal
        let inv_phi = 0.5 * (5.0f64.sqrt() - 1.0);
        let e_max = mass.max(chemical_potential) + 50.0 * temperature;
        let mut a = 0.0;
        let mut b = (e_max * e_max - mass * mass).sqrt();
        let mut c = b - inv_phi * (b - a);
        let mut d = a + inv_phi * (b - a);
        let (mut fc, mut fd) = (f(c), f(d));
        for _ in 0..MAX_ITERATIONS {
            if b - a < precision {
                break;
            }
            if fc > fd {
                b = d;
                d = c;
                fd = fc;
                c = b - inv_phi * (b - a);
                fc = f(c);
            } else {
                a = c;
                c = d;
                fc = fd;
                d = a + inv_phi * (b - a);
                fd = f(d);
            }
        }
        f(0.5 * (a + b)).max(fc).max(fd)
    }

    fn sample_momentum(
        &self,
        mass: f64,
        temperature: f64,
        chemical_potential: f64,
        statistics: QuantumStatistics,
        max_momentum: f64,
        distribution_maximum: f64,
        rng: &mut dyn RngCore,
    ) -> f64 {
        if !(distribution_maximum > 0.0) {
            return 0.0;
        }
        let s = statistics.sign();
        loop {
            let p = rng.random::<f64>() * max_momentum;
            let y = rng.random::<f64>() * distribution_maximum;
            if y < juttner_distribution_func(p, mass, temperature, chemical_potential, s) {
                return p;
            }
        }
    }
}
