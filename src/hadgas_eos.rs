//! Equation of state of an ideal hadron gas.
//!
//! The box modus only needs three things from it: which species are part of
//! the gas, their grand-canonical partial densities, and thermal masses for
//! resonances. [`HadronGasEos`] captures exactly that; [`BoltzmannHadronGas`]
//! is the built-in implementation with classical statistics.

use crate::distributions::integrate_simpson;
use hadron_box_common::{ParticleType, HBARC};
use rand::{Rng, RngCore};
use std::f64::consts::PI;

pub trait HadronGasEos: Send + Sync {
    /// Whether `ptype` is one of the species the gas is made of.
    fn is_eos_particle(&self, ptype: &ParticleType) -> bool;

    /// Partial number density [fm⁻³] of `ptype` at temperature `t` [GeV] and
    /// baryon, strangeness and charge chemical potentials [GeV].
    fn partial_density(
        &self,
        ptype: &ParticleType,
        t: f64,
        mub: f64,
        mus: f64,
        muq: f64,
        account_for_width: bool,
    ) -> f64;

    /// Mass of a resonance in a thermal bath at inverse temperature `beta`
    /// [GeV⁻¹], weighted by its spectral function.
    fn sample_mass_thermal(&self, ptype: &ParticleType, beta: f64, rng: &mut dyn RngCore) -> f64;
}

/// Species heavier than this are left out of the gas [GeV].
const MAX_EOS_MASS: f64 = 2.0;
/// Resonance masses are limited to `m0 ± WIDTH_RANGE · Γ`.
const WIDTH_RANGE: f64 = 2.0;
const MOMENTUM_STEPS: usize = 1000;
const MASS_STEPS: usize = 100;

/// Ideal hadron gas with Boltzmann statistics.
#[derive(Debug, Clone, Default)]
pub struct BoltzmannHadronGas;

impl BoltzmannHadronGas {
    pub fn new() -> Self {
        BoltzmannHadronGas
    }

    /// Boltzmann number density in natural units [GeV³]:
    /// `g / (2π²) ∫ p² exp(-(E - μ)/T) dp`.
    pub fn density_gev3(mass: f64, t: f64, mu: f64, degeneracy: f64) -> f64 {
        let p_max = ((mass + 40.0 * t).powi(2) - mass * mass).sqrt();
        let integral = integrate_simpson(
            |p| {
                let e = (p * p + mass * mass).sqrt();
                p * p * (-(e - mu) / t).exp()
            },
            0.0,
            p_max,
            MOMENTUM_STEPS,
        );
        degeneracy / (2.0 * PI * PI) * integral
    }

    fn mass_range(ptype: &ParticleType) -> (f64, f64) {
        let lo = (ptype.mass - WIDTH_RANGE * ptype.width).max(0.5 * ptype.mass);
        let hi = ptype.mass + WIDTH_RANGE * ptype.width;
        (lo, hi)
    }

    /// Non-relativistic Breit-Wigner, unnormalized.
    fn breit_wigner(m: f64, pole: f64, width: f64) -> f64 {
        let half = 0.5 * width;
        half / ((m - pole).powi(2) + half * half)
    }

    fn chemical_potential(ptype: &ParticleType, mub: f64, mus: f64, muq: f64) -> f64 {
        ptype.baryon_number() as f64 * mub + ptype.strangeness as f64 * mus + ptype.charge as f64 * muq
    }
}

impl HadronGasEos for BoltzmannHadronGas {
    fn is_eos_particle(&self, ptype: &ParticleType) -> bool {
        ptype.is_hadron() && ptype.mass < MAX_EOS_MASS
    }

    fn partial_density(
        &self,
        ptype: &ParticleType,
        t: f64,
        mub: f64,
        mus: f64,
        muq: f64,
        account_for_width: bool,
    ) -> f64 {
        let g = ptype.pdg.spin_degeneracy() as f64;
        let mu = Self::chemical_potential(ptype, mub, mus, muq);
        let n = if account_for_width && !ptype.is_stable() {
            let (lo, hi) = Self::mass_range(ptype);
            let weighted = integrate_simpson(
                |m| Self::breit_wigner(m, ptype.mass, ptype.width) * Self::density_gev3(m, t, mu, g),
                lo,
                hi,
                MASS_STEPS,
            );
            let norm = integrate_simpson(|m| Self::breit_wigner(m, ptype.mass, ptype.width), lo, hi, MASS_STEPS);
            weighted / norm
        } else {
            Self::density_gev3(ptype.mass, t, mu, g)
        };
        n / (HBARC * HBARC * HBARC)
    }

    fn sample_mass_thermal(&self, ptype: &ParticleType, beta: f64, rng: &mut dyn RngCore) -> f64 {
        if ptype.is_stable() {
            return ptype.mass;
        }
        let t = 1.0 / beta;
        let (lo, hi) = Self::mass_range(ptype);
        let half = 0.5 * ptype.width;
        let a_lo = ((lo - ptype.mass) / half).atan();
        let a_hi = ((hi - ptype.mass) / half).atan();
        // Boltzmann densities fall with mass, so the lightest allowed mass bounds the weight
        let n_max = Self::density_gev3(lo, t, 0.0, 1.0);
        loop {
            let u = a_lo + (a_hi - a_lo) * rng.random::<f64>();
            let m = ptype.mass + half * u.tan();
            let weight = Self::density_gev3(m, t, 0.0, 1.0) / n_max;
            if rng.random::<f64>() < weight {
                return m;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hadron_box_common::{PdgCode, SpeciesCatalog};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn massless_density_matches_closed_form() {
        let t = 0.15;
        let n = BoltzmannHadronGas::density_gev3(0.0, t, 0.0, 1.0);
        let expected = t * t * t / (PI * PI);
        assert!((n / expected - 1.0).abs() < 1e-5, "{} vs {}", n, expected);
    }

    #[test]
    fn chemical_potential_scales_density() {
        let catalog = SpeciesCatalog::default_hadrons().unwrap();
        let eos = BoltzmannHadronGas::new();
        let proton = catalog.find(PdgCode::PROTON).unwrap();
        let anti_proton = catalog.find(PdgCode(-2212)).unwrap();
        let n0 = eos.partial_density(proton, 0.15, 0.0, 0.0, 0.0, false);
        let n_b = eos.partial_density(proton, 0.15, 0.3, 0.0, 0.0, false);
        let n_bbar = eos.partial_density(anti_proton, 0.15, 0.3, 0.0, 0.0, false);
        assert!((n_b / n0 - 2.0f64.exp()).abs() < 1e-9);
        assert!((n_bbar / n0 - (-2.0f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn eos_species_are_light_hadrons() {
        let catalog = SpeciesCatalog::default_hadrons().unwrap();
        let eos = BoltzmannHadronGas::new();
        assert!(eos.is_eos_particle(catalog.find(PdgCode::PI_ZERO).unwrap()));
        assert!(eos.is_eos_particle(catalog.find(PdgCode(2224)).unwrap()));
        assert!(!eos.is_eos_particle(catalog.find(PdgCode(11)).unwrap()));
        let heavy = ParticleType::new("N(2250)", 22212, 2.25, 0.4, 1, 0, 1, 1);
        assert!(!eos.is_eos_particle(&heavy));
    }

    #[test]
    fn width_accounting_only_affects_resonances() {
        let catalog = SpeciesCatalog::default_hadrons().unwrap();
        let eos = BoltzmannHadronGas::new();
        let pion = catalog.find(PdgCode::PI_PLUS).unwrap();
        assert_eq!(
            eos.partial_density(pion, 0.15, 0.0, 0.0, 0.0, true),
            eos.partial_density(pion, 0.15, 0.0, 0.0, 0.0, false)
        );
        // lighter masses dominate the average, so a wide resonance gains density
        let delta = catalog.find(PdgCode(2224)).unwrap();
        let with_width = eos.partial_density(delta, 0.15, 0.0, 0.0, 0.0, true);
        let pole_only = eos.partial_density(delta, 0.15, 0.0, 0.0, 0.0, false);
        assert!(with_width > pole_only);
    }

    #[test]
    fn thermal_masses_stay_in_the_allowed_window() {
        let catalog = SpeciesCatalog::default_hadrons().unwrap();
        let eos = BoltzmannHadronGas::new();
        let mut rng = StdRng::seed_from_u64(3);
        let rho = catalog.find(PdgCode(113)).unwrap();
        let (lo, hi) = BoltzmannHadronGas::mass_range(rho);
        let masses: Vec<f64> = (0..2000).map(|_| eos.sample_mass_thermal(rho, 1.0 / 0.15, &mut rng)).collect();
        assert!(masses.iter().all(|&m| m >= lo && m <= hi));
        let mean = masses.iter().sum::<f64>() / masses.len() as f64;
        assert!(mean < rho.mass, "thermal weighting should favour light masses, mean = {}", mean);

        let proton = catalog.find(PdgCode::PROTON).unwrap();
        assert_eq!(eos.sample_mass_thermal(proton, 1.0 / 0.15, &mut rng), proton.mass);
    }
}
