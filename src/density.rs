//! Gaussian-smeared densities and currents.
//!
//! A particle at `r_i` with 4-velocity `u_i` contributes to the 4-current at `r`
//!
//! ```text
//! j^μ(r) = Σ_i C_i u_i^μ / u_i^0 · exp(-r_rest² / 2σ²) · u_i^0 / ((2πσ²)^{3/2} · ntest · g(a))
//! r_rest² = (r - r_i)² + (u_i · (r - r_i))²
//! ```
//!
//! where `C_i` is the particle's charge for the chosen [`DensityType`] and the
//! Gaussian is cut at `r_cut = a·σ`. The rest-frame (Eckart) density is
//! `|j_+| - |j_-|`, with the currents of positive and negative charges
//! accumulated separately.
//!
//! Summation order: the lattice pass deposits in particle order and the point
//! query sums in iteration order. Reordering the particles changes results only
//! through floating-point rounding of the sums.

use crate::energymomentumtensor::EnergyMomentumTensor;
use crate::lattice::{LatticeUpdate, RectangularLattice};
use crate::particles::{ParticleData, Particles};
use hadron_box_common::{
    DensityTypeConfig, ExperimentParameters, FourVector, ParticleType, ThreeVector, REALLY_SMALL,
};
use log::warn;
use rayon::prelude::*;
use std::f64::consts::PI;
use std::fmt;

/// Which charge the density counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityType {
    None,
    Hadron,
    Baryon,
    BaryonicIsospin,
    Pion,
}

impl fmt::Display for DensityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DensityType::None => "none",
            DensityType::Hadron => "hadron density",
            DensityType::Baryon => "baryon density",
            DensityType::BaryonicIsospin => "baryonic isospin density",
            DensityType::Pion => "pion density",
        };
        f.write_str(name)
    }
}

impl From<DensityTypeConfig> for DensityType {
    fn from(c: DensityTypeConfig) -> Self {
        match c {
            DensityTypeConfig::None => DensityType::None,
            DensityTypeConfig::Hadron => DensityType::Hadron,
            DensityTypeConfig::Baryon => DensityType::Baryon,
            DensityTypeConfig::BaryonicIsospin => DensityType::BaryonicIsospin,
            DensityTypeConfig::Pion => DensityType::Pion,
        }
    }
}

/// How much a particle of `ptype` contributes to `dens_type`.
///
/// Antibaryons count -1 towards the baryon density; baryons count I3/I towards
/// the baryonic isospin density; species outside the selected class count 0.
pub fn density_factor(ptype: &ParticleType, dens_type: DensityType) -> f64 {
    match dens_type {
        DensityType::Hadron => {
            if ptype.is_hadron() {
                1.0
            } else {
                0.0
            }
        }
        DensityType::Baryon => ptype.baryon_number() as f64,
        DensityType::BaryonicIsospin => {
            if ptype.is_baryon() {
                ptype.isospin3_rel()
            } else {
                0.0
            }
        }
        DensityType::Pion => {
            if ptype.pdg.is_pion() {
                1.0
            } else {
                0.0
            }
        }
        DensityType::None => 0.0,
    }
}

/// `(2π σ²)^{3/2}` [fm³], the integral of the unnormalized Gaussian over all space.
#[inline]
pub fn smearing_factor_norm(two_sigma_sqr: f64) -> f64 {
    let tmp = two_sigma_sqr * PI;
    tmp * tmp.sqrt()
}

/// `(2π σ²)^{3/2} · σ²` [fm⁵], the norm for the gradient of the smearing factor.
#[inline]
pub fn smearing_factor_grad_norm(two_sigma_sqr: f64) -> f64 {
    let tmp = two_sigma_sqr * PI;
    tmp * tmp.sqrt() * 0.5 * two_sigma_sqr
}

/// Fraction of a normalized Gaussian inside the sphere of radius `a·σ`:
///
/// ```text
/// g(a) = -sqrt(2/π) · a · exp(-a²/2) + erf(a / sqrt(2))
/// ```
///
/// g(3) = 0.97071, g(4) = 0.99887.
#[inline]
pub fn smearing_factor_rcut_correction(rcut_in_sigma: f64) -> f64 {
    let x = rcut_in_sigma / 2.0f64.sqrt();
    -2.0 / PI.sqrt() * x * (-x * x).exp() + libm::erf(x)
}

/// Precomputed smearing constants, built once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityParameters {
    sigma: f64,
    r_cut: f64,
    r_cut_sqr: f64,
    two_sig_sqr_inv: f64,
    norm_factor: f64,
    norm_factor_grad: f64,
    ntest: u32,
}

impl DensityParameters {
    pub fn new(par: &ExperimentParameters) -> Self {
        Self::from_smearing(par.gaussian_sigma, par.gauss_cutoff_in_sigma, par.testparticles)
    }

    /// `sigma` [fm], cutoff radius `a·sigma`, `ntest` testparticles.
    pub fn from_smearing(sigma: f64, rcut_in_sigma: f64, ntest: u32) -> Self {
        let r_cut = rcut_in_sigma * sigma;
        let two_sig_sqr = 2.0 * sigma * sigma;
        let corr_factor = smearing_factor_rcut_correction(rcut_in_sigma);
        let ntest_f = ntest as f64;
        Self {
            sigma,
            r_cut,
            r_cut_sqr: r_cut * r_cut,
            two_sig_sqr_inv: 1.0 / two_sig_sqr,
            norm_factor: 1.0 / (smearing_factor_norm(two_sig_sqr) * ntest_f * corr_factor),
            norm_factor_grad: 1.0 / (smearing_factor_grad_norm(two_sig_sqr) * ntest_f * corr_factor),
            ntest,
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn ntest(&self) -> u32 {
        self.ntest
    }

    /// Cutoff radius [fm].
    pub fn r_cut(&self) -> f64 {
        self.r_cut
    }

    pub fn r_cut_sqr(&self) -> f64 {
        self.r_cut_sqr
    }

    /// `1 / (2σ²)` [fm⁻²].
    pub fn two_sig_sqr_inv(&self) -> f64 {
        self.two_sig_sqr_inv
    }

    /// Multiplies the unnormalized smearing factor so it integrates to `1/ntest`.
    pub fn norm_factor(&self) -> f64 {
        self.norm_factor
    }

    /// Normalization for the gradient of the smearing factor.
    pub fn norm_factor_grad(&self) -> f64 {
        self.norm_factor_grad
    }
}

/// Gaussian smearing factor with Lorentz contraction, and optionally its gradient.
///
/// `r` points from the evaluation point to the particle, `p` is the particle
/// 4-momentum and `m_inv` its inverse invariant mass. Returns zero beyond the
/// cutoff, either in the lab or in the particle rest frame. The gradient is
/// with respect to the evaluation point and still lacks the factor `1/σ²`,
/// which [`DensityParameters::norm_factor_grad`] carries.
pub fn unnormalized_smearing_factor(
    r: ThreeVector,
    p: FourVector,
    m_inv: f64,
    dens_par: &DensityParameters,
    compute_gradient: bool,
) -> (f64, ThreeVector) {
    let r_sqr = r.sqr();
    if r_sqr > dens_par.r_cut_sqr() {
        return (0.0, ThreeVector::zero());
    }

    let u = p * m_inv;
    let u3 = u.threevec();
    let u_r_scalar = r.dot(u3);
    let r_rest_sqr = r_sqr + u_r_scalar * u_r_scalar;
    if r_rest_sqr > dens_par.r_cut_sqr() {
        return (0.0, ThreeVector::zero());
    }

    let sf = (-r_rest_sqr * dens_par.two_sig_sqr_inv()).exp() * u.x0;
    let sf_grad = if compute_gradient {
        (r + u3 * u_r_scalar) * sf
    } else {
        ThreeVector::zero()
    };
    (sf, sf_grad)
}

/// Inverse invariant mass of `p`, or `None` when it is too light to smear.
#[inline]
fn smearable_mass_inv(p: FourVector) -> Option<f64> {
    let m = p.abs();
    if m < REALLY_SMALL {
        warn!("Gaussian smearing is undefined for momentum {:?}", p);
        None
    } else {
        Some(1.0 / m)
    }
}

/// A lattice node that accumulates smeared particle contributions.
pub trait SmearedNode {
    /// `factor` already carries the normalized smearing factor and the
    /// particle's density factor.
    fn add_particle(&mut self, part: &ParticleData, factor: f64);
}

/// Lattice node holding the 4-currents of positive and negative charges.
///
/// Currents are additive over particles, the density is not; fill the node with
/// [`SmearedNode::add_particle`] and then call [`Self::compute_density`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DensityOnLattice {
    jmu_pos: FourVector,
    jmu_neg: FourVector,
    density: f64,
}

impl SmearedNode for DensityOnLattice {
    /// Adds `factor · (1, v)` to the current matching the sign of `factor`.
    fn add_particle(&mut self, part: &ParticleData, factor: f64) {
        self.add_velocity(part.velocity(), factor);
    }
}

impl SmearedNode for EnergyMomentumTensor {
    /// Adds `factor · p^μ p^ν / p^0`.
    fn add_particle(&mut self, part: &ParticleData, factor: f64) {
        self.add_four_momentum(part.momentum(), factor);
    }
}

impl DensityOnLattice {
    #[inline]
    fn add_velocity(&mut self, v: ThreeVector, factor: f64) {
        let contribution = FourVector::from_parts(factor, v * factor);
        if factor > 0.0 {
            self.jmu_pos += contribution;
        } else {
            self.jmu_neg += contribution;
        }
    }

    /// Sets the density to `(|j_+| - |j_-|) · norm_factor`.
    pub fn compute_density(&mut self, norm_factor: f64) {
        self.density = (self.jmu_pos.abs() - self.jmu_neg.abs()) * norm_factor;
    }

    /// Net rest-frame density from the last `compute_density` call.
    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn jmu_pos(&self) -> FourVector {
        self.jmu_pos
    }

    pub fn jmu_neg(&self) -> FourVector {
        self.jmu_neg
    }

    /// Net 4-current `j_+ + j_-`.
    pub fn jmu_net(&self) -> FourVector {
        self.jmu_pos + self.jmu_neg
    }
}

pub type DensityLattice = RectangularLattice<DensityOnLattice>;
pub type TmnLattice = RectangularLattice<EnergyMomentumTensor>;

/// Resets `lat` and deposits every particle's smeared contribution.
///
/// Deposit lists are computed per particle in parallel and applied serially in
/// particle order, so the result does not depend on the thread count.
fn deposit_smeared<T>(
    lat: &mut RectangularLattice<T>,
    dens_type: DensityType,
    par: &DensityParameters,
    particles: &Particles,
) where
    T: SmearedNode + Default + Clone + Sync,
{
    lat.reset();

    let norm_factor = par.norm_factor();
    let lat_ro: &RectangularLattice<T> = lat;
    let deposits: Vec<(usize, Vec<(usize, f64)>)> = particles
        .as_slice()
        .par_iter()
        .enumerate()
        .filter_map(|(i, part)| {
            let dens_factor = density_factor(part.ptype(), dens_type);
            if dens_factor.abs() < REALLY_SMALL {
                return None;
            }
            let p = part.momentum();
            let m_inv = smearable_mass_inv(p)?;
            let pos = part.position().threevec();
            let mut cells = Vec::new();
            lat_ro.cells_in_radius(pos, par.r_cut(), |flat, _, center| {
                let sf = norm_factor * unnormalized_smearing_factor(pos - center, p, m_inv, par, false).0;
                if sf > REALLY_SMALL {
                    cells.push((flat, sf * dens_factor));
                }
            });
            Some((i, cells))
        })
        .collect();

    let plist = particles.as_slice();
    for (i, cells) in deposits {
        for (flat, weight) in cells {
            lat.node_at_mut(flat).add_particle(&plist[i], weight);
        }
    }
}

/// Refreshes the density lattice if `update` matches its update policy.
/// Every node's density is finalized at the end.
pub fn update_density_lattice(
    lat: Option<&mut DensityLattice>,
    update: LatticeUpdate,
    dens_type: DensityType,
    par: &DensityParameters,
    particles: &Particles,
) {
    let lat = match lat {
        Some(lat) if lat.when_update() == update => lat,
        _ => return,
    };
    deposit_smeared(lat, dens_type, par, particles);
    lat.iter_mut().for_each(|node| node.compute_density(1.0));
}

/// Refreshes the energy-momentum tensor lattice if `update` matches its
/// update policy. Each particle enters weighted by its density factor, so
/// `DensityType::Hadron` gives the hadronic `T^{μν}`.
pub fn update_tmn_lattice(
    lat: Option<&mut TmnLattice>,
    update: LatticeUpdate,
    dens_type: DensityType,
    par: &DensityParameters,
    particles: &Particles,
) {
    if let Some(lat) = lat.filter(|lat| lat.when_update() == update) {
        deposit_smeared(lat, dens_type, par, particles);
    }
}

fn rho_eckart_impl<'a, I>(
    r: ThreeVector,
    plist: I,
    par: &DensityParameters,
    dens_type: DensityType,
    compute_gradient: bool,
) -> (f64, ThreeVector)
where
    I: IntoIterator<Item = &'a ParticleData>,
{
    let mut jmu_pos = FourVector::zero();
    let mut jmu_neg = FourVector::zero();
    // d j^μ / d r for μ = 0..3, per charge sign
    let mut djmu_dr_pos = [ThreeVector::zero(); 4];
    let mut djmu_dr_neg = [ThreeVector::zero(); 4];

    for part in plist {
        let dens_factor = density_factor(part.ptype(), dens_type);
        if dens_factor.abs() < REALLY_SMALL {
            continue;
        }
        let p = part.momentum();
        let m_inv = match smearable_mass_inv(p) {
            Some(m_inv) => m_inv,
            None => continue,
        };
        let (sf, sf_grad) =
            unnormalized_smearing_factor(part.position().threevec() - r, p, m_inv, par, compute_gradient);
        if sf < REALLY_SMALL {
            continue;
        }

        let weight = dens_factor / p.x0;
        let (jmu, djmu_dr) = if dens_factor > 0.0 {
            (&mut jmu_pos, &mut djmu_dr_pos)
        } else {
            (&mut jmu_neg, &mut djmu_dr_neg)
        };
        *jmu += p * (weight * sf);
        if compute_gradient {
            for (mu, grad) in djmu_dr.iter_mut().enumerate() {
                *grad += sf_grad * (p.component(mu) * weight);
            }
        }
    }

    let rho_pos = jmu_pos.abs();
    let rho_neg = jmu_neg.abs();
    let rho_eck = (rho_pos - rho_neg) * par.norm_factor();

    let mut rho_eck_grad = ThreeVector::zero();
    if compute_gradient {
        rho_eck_grad += abs_gradient(jmu_pos, &djmu_dr_pos, rho_pos);
        rho_eck_grad -= abs_gradient(jmu_neg, &djmu_dr_neg, rho_neg);
        rho_eck_grad = rho_eck_grad * par.norm_factor_grad();
    }
    (rho_eck, rho_eck_grad)
}

/// `d|j|/dr = (dj^μ/dr · j_μ) / |j|`, zero for a vanishing current.
fn abs_gradient(jmu: FourVector, djmu_dr: &[ThreeVector; 4], jmu_abs: f64) -> ThreeVector {
    if jmu_abs < REALLY_SMALL * REALLY_SMALL {
        return ThreeVector::zero();
    }
    let contracted = djmu_dr[0] * jmu.x0 - djmu_dr[1] * jmu.x1 - djmu_dr[2] * jmu.x2 - djmu_dr[3] * jmu.x3;
    contracted / jmu_abs
}

/// Eckart rest-frame density at `r` and, if requested, its gradient [fm⁻³, fm⁻⁴].
///
/// Particles farther than the cutoff radius from `r` do not contribute.
pub fn rho_eckart(
    r: ThreeVector,
    plist: &[ParticleData],
    par: &DensityParameters,
    dens_type: DensityType,
    compute_gradient: bool,
) -> (f64, ThreeVector) {
    rho_eckart_impl(r, plist, par, dens_type, compute_gradient)
}

/// [`rho_eckart`] over a whole ensemble.
pub fn rho_eckart_particles(
    r: ThreeVector,
    particles: &Particles,
    par: &DensityParameters,
    dens_type: DensityType,
    compute_gradient: bool,
) -> (f64, ThreeVector) {
    rho_eckart_impl(r, particles, par, dens_type, compute_gradient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hadron_box_common::{PdgCode, SpeciesCatalog};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn catalog() -> SpeciesCatalog {
        SpeciesCatalog::default_hadrons().unwrap()
    }

    fn particle_at(catalog: &SpeciesCatalog, pdg: i32, id: i32, pos: ThreeVector, p: ThreeVector) -> ParticleData {
        let ptype = Arc::clone(catalog.find(PdgCode(pdg)).unwrap());
        let mass = ptype.mass;
        let mut part = ParticleData::new(ptype, id);
        part.set_4position(FourVector::from_parts(0.0, pos));
        part.set_momentum_on_shell(mass, p);
        part
    }

    #[test]
    fn rcut_correction_matches_known_values() {
        assert!((smearing_factor_rcut_correction(3.0) - 0.97071).abs() < 1e-5);
        assert!((smearing_factor_rcut_correction(4.0) - 0.99887).abs() < 1e-5);
        assert!((smearing_factor_rcut_correction(10.0) - 1.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn rcut_correction_lies_in_unit_interval(a in 0.05f64..12.0) {
            let g = smearing_factor_rcut_correction(a);
            prop_assert!(g > 0.0);
            prop_assert!(g <= 1.0);
        }

        #[test]
        fn rcut_correction_grows_with_cutoff(a in 0.1f64..6.0, da in 0.01f64..1.0) {
            prop_assert!(smearing_factor_rcut_correction(a + da) > smearing_factor_rcut_correction(a));
        }
    }

    #[test]
    fn density_parameters_are_derived_from_sigma_cutoff_and_ntest() {
        let par = DensityParameters::from_smearing(1.0, 4.0, 20);
        assert_eq!(par.r_cut(), 4.0);
        assert_eq!(par.r_cut_sqr(), 16.0);
        assert_eq!(par.two_sig_sqr_inv(), 0.5);
        let g = smearing_factor_rcut_correction(4.0);
        let norm = (2.0 * PI).powf(1.5);
        assert!((par.norm_factor() - 1.0 / (norm * 20.0 * g)).abs() < 1e-15);
        assert!((par.norm_factor_grad() - 1.0 / (norm * 20.0 * g)).abs() < 1e-15);
        let wide = DensityParameters::from_smearing(2.0, 4.0, 1);
        assert!((wide.norm_factor() / wide.norm_factor_grad() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn density_factors_by_type() {
        let c = catalog();
        let proton = c.find(PdgCode::PROTON).unwrap();
        let anti_proton = c.find(PdgCode(-2212)).unwrap();
        let neutron = c.find(PdgCode::NEUTRON).unwrap();
        let pion = c.find(PdgCode::PI_PLUS).unwrap();
        let electron = c.find(PdgCode(11)).unwrap();

        assert_eq!(density_factor(proton, DensityType::Baryon), 1.0);
        assert_eq!(density_factor(anti_proton, DensityType::Baryon), -1.0);
        assert_eq!(density_factor(pion, DensityType::Baryon), 0.0);
        assert_eq!(density_factor(neutron, DensityType::BaryonicIsospin), -1.0);
        assert_eq!(density_factor(pion, DensityType::BaryonicIsospin), 0.0);
        assert_eq!(density_factor(pion, DensityType::Pion), 1.0);
        assert_eq!(density_factor(proton, DensityType::Pion), 0.0);
        assert_eq!(density_factor(electron, DensityType::Hadron), 0.0);
        assert_eq!(density_factor(proton, DensityType::Hadron), 1.0);
        assert_eq!(density_factor(proton, DensityType::None), 0.0);
    }

    #[test]
    fn smearing_factor_is_zero_beyond_cutoff() {
        let par = DensityParameters::from_smearing(1.0, 3.0, 1);
        let p = FourVector::new(1.0, 0.0, 0.0, 0.0);
        let (sf, grad) = unnormalized_smearing_factor(ThreeVector::new(3.01, 0.0, 0.0), p, 1.0, &par, true);
        assert_eq!(sf, 0.0);
        assert_eq!(grad, ThreeVector::zero());
        let (sf, _) = unnormalized_smearing_factor(ThreeVector::new(2.99, 0.0, 0.0), p, 1.0, &par, false);
        assert!(sf > 0.0);
    }

    #[test]
    fn boost_contracts_the_cutoff_along_the_motion() {
        let par = DensityParameters::from_smearing(1.0, 3.0, 1);
        // gamma = 1.25, u = (1.25, 0.75, 0, 0)
        let p = FourVector::new(1.25, 0.75, 0.0, 0.0);
        let along = unnormalized_smearing_factor(ThreeVector::new(2.5, 0.0, 0.0), p, 1.0, &par, false).0;
        let across = unnormalized_smearing_factor(ThreeVector::new(0.0, 2.5, 0.0), p, 1.0, &par, false).0;
        assert_eq!(along, 0.0);
        assert!((across - 1.25 * (-2.5f64 * 2.5 / 2.0).exp()).abs() < 1e-12);
    }

    fn fine_lattice() -> DensityLattice {
        RectangularLattice::new([-5.0; 3], [10.0; 3], [50; 3], false, LatticeUpdate::EveryTimestep).unwrap()
    }

    #[test]
    fn lattice_integral_of_one_particle_at_rest_is_one() {
        let c = catalog();
        let par = DensityParameters::from_smearing(1.0, 3.0, 1);
        let mut lat = fine_lattice();
        let mut particles = Particles::new();
        // (0.1, 0.1, 0.1) is a cell centre
        particles.insert(&particle_at(&c, 2212, 0, ThreeVector::new(0.1, 0.1, 0.1), ThreeVector::zero()));

        update_density_lattice(Some(&mut lat), LatticeUpdate::EveryTimestep, DensityType::Baryon, &par, &particles);
        let integral: f64 = lat.iter().map(|n| n.density()).sum::<f64>() * lat.cell_volume();
        let tolerance = 1.0 - smearing_factor_rcut_correction(3.0);
        assert!((integral - 1.0).abs() < tolerance, "integral = {}", integral);
    }

    #[test]
    fn lattice_charge_of_a_moving_particle_is_conserved() {
        let c = catalog();
        let par = DensityParameters::from_smearing(1.0, 3.0, 1);
        let mut lat = fine_lattice();
        let mut particles = Particles::new();
        // v = 0.6 along x
        particles.insert(&particle_at(&c, 2212, 0, ThreeVector::new(0.1, 0.1, 0.1), ThreeVector::new(0.938 * 0.75, 0.0, 0.0)));

        update_density_lattice(Some(&mut lat), LatticeUpdate::EveryTimestep, DensityType::Baryon, &par, &particles);
        let charge: f64 = lat.iter().map(|n| n.jmu_pos().x0).sum::<f64>() * lat.cell_volume();
        assert!((charge - 1.0).abs() < 0.03, "charge = {}", charge);
        let rest: f64 = lat.iter().map(|n| n.density()).sum::<f64>() * lat.cell_volume();
        assert!((rest - 0.8).abs() < 0.03, "rest-frame integral = {}", rest);
    }

    #[test]
    fn lattice_update_respects_the_update_policy() {
        let c = catalog();
        let par = DensityParameters::from_smearing(1.0, 3.0, 1);
        let mut lat = fine_lattice();
        let mut particles = Particles::new();
        particles.insert(&particle_at(&c, 2212, 0, ThreeVector::zero(), ThreeVector::zero()));

        update_density_lattice(Some(&mut lat), LatticeUpdate::AtOutput, DensityType::Baryon, &par, &particles);
        assert!(lat.iter().all(|n| n.density() == 0.0));
        update_density_lattice(None, LatticeUpdate::EveryTimestep, DensityType::Baryon, &par, &particles);
    }

    #[test]
    fn lattice_update_is_idempotent() {
        let c = catalog();
        let par = DensityParameters::from_smearing(1.0, 3.0, 1);
        let mut lat = fine_lattice();
        let mut particles = Particles::new();
        particles.insert(&particle_at(&c, 2212, 0, ThreeVector::new(1.0, -0.3, 0.2), ThreeVector::new(0.2, 0.1, 0.0)));
        particles.insert(&particle_at(&c, -2212, 1, ThreeVector::new(0.5, 0.0, 0.0), ThreeVector::zero()));

        update_density_lattice(Some(&mut lat), LatticeUpdate::EveryTimestep, DensityType::Baryon, &par, &particles);
        let first: Vec<DensityOnLattice> = lat.iter().copied().collect();
        update_density_lattice(Some(&mut lat), LatticeUpdate::EveryTimestep, DensityType::Baryon, &par, &particles);
        assert!(lat.iter().zip(first.iter()).all(|(a, b)| a == b));
    }

    fn tmn_integral(lat: &TmnLattice, mu: usize, nu: usize) -> f64 {
        lat.iter().map(|t| t.get(mu, nu)).sum::<f64>() * lat.cell_volume()
    }

    #[test]
    fn tmn_lattice_integrates_to_energy_per_testparticle() {
        let c = catalog();
        let par = DensityParameters::from_smearing(1.0, 3.0, 2);
        let mut lat: TmnLattice =
            RectangularLattice::new([-5.0; 3], [10.0; 3], [50; 3], false, LatticeUpdate::EveryTimestep).unwrap();
        let mut particles = Particles::new();
        particles.insert(&particle_at(&c, 2212, 0, ThreeVector::new(0.1, 0.1, 0.1), ThreeVector::zero()));
        particles.insert(&particle_at(&c, 211, 1, ThreeVector::new(-0.9, 0.3, 0.1), ThreeVector::new(0.1, 0.0, 0.0)));
        let total = particles.total_momentum();
        let tolerance = 1.0 - smearing_factor_rcut_correction(3.0);

        update_tmn_lattice(Some(&mut lat), LatticeUpdate::EveryTimestep, DensityType::Hadron, &par, &particles);
        let energy = tmn_integral(&lat, 0, 0);
        assert!((energy - total.x0 / 2.0).abs() < tolerance * total.x0 / 2.0, "T00 integral = {}", energy);
        let px = tmn_integral(&lat, 0, 1);
        assert!((px - total.x1 / 2.0).abs() < tolerance * total.x1 / 2.0, "T01 integral = {}", px);
        assert!(tmn_integral(&lat, 0, 2).abs() < 1e-12);

        // only the proton is a baryon
        update_tmn_lattice(Some(&mut lat), LatticeUpdate::EveryTimestep, DensityType::Baryon, &par, &particles);
        let m_p = particles.as_slice()[0].momentum().x0;
        let baryonic = tmn_integral(&lat, 0, 0);
        assert!((baryonic - m_p / 2.0).abs() < tolerance * m_p / 2.0, "baryonic T00 integral = {}", baryonic);
        assert!(tmn_integral(&lat, 0, 1).abs() < 1e-12);

        let before: Vec<EnergyMomentumTensor> = lat.iter().copied().collect();
        update_tmn_lattice(Some(&mut lat), LatticeUpdate::AtOutput, DensityType::Hadron, &par, &particles);
        assert!(lat.iter().zip(before.iter()).all(|(a, b)| a == b));
    }

    #[test]
    fn massless_particles_are_skipped() {
        let par = DensityParameters::from_smearing(1.0, 3.0, 1);
        let ptype = Arc::new(ParticleType::new("ghost", 2212, 0.0, 0.0, 1, 0, 1, 1));
        let mut ghost = ParticleData::new(ptype, 0);
        ghost.set_momentum_on_shell(0.0, ThreeVector::new(1.0, 0.0, 0.0));
        let mut particles = Particles::new();
        particles.insert(&ghost);

        let mut lat = fine_lattice();
        update_density_lattice(Some(&mut lat), LatticeUpdate::EveryTimestep, DensityType::Baryon, &par, &particles);
        assert!(lat.iter().all(|n| n.jmu_pos() == FourVector::zero()));
        let (rho, _) = rho_eckart_particles(ThreeVector::zero(), &particles, &par, DensityType::Baryon, true);
        assert_eq!(rho, 0.0);
    }

    #[test]
    fn positive_and_negative_currents_stay_separate() {
        let c = catalog();
        let p = particle_at(&c, 2212, 0, ThreeVector::zero(), ThreeVector::new(0.5, 0.0, 0.0));
        let pbar = particle_at(&c, -2212, 1, ThreeVector::zero(), ThreeVector::new(-0.5, 0.0, 0.0));
        let mut node = DensityOnLattice::default();
        node.add_particle(&p, 1.0);
        node.add_particle(&pbar, -1.0);
        node.compute_density(1.0);
        // back-to-back currents of equal size: |j+| - |j-| vanishes even though
        // |j+ + j-| would not
        assert!(node.density().abs() < 1e-12);
        assert!(node.jmu_net().abs().abs() > 0.1);
        assert!(node.jmu_neg().x0 < 0.0);
    }

    #[test]
    fn eckart_density_matches_lattice_at_cell_centres() {
        let c = catalog();
        let par = DensityParameters::from_smearing(1.0, 3.0, 1);
        let plist = vec![
            particle_at(&c, 2212, 0, ThreeVector::new(0.3, 0.0, -0.2), ThreeVector::new(0.3, 0.1, 0.0)),
            particle_at(&c, 2112, 1, ThreeVector::new(-0.4, 0.5, 0.0), ThreeVector::new(0.0, 0.0, -0.6)),
            particle_at(&c, -2212, 2, ThreeVector::new(0.2, 0.2, 0.2), ThreeVector::zero()),
        ];
        let mut particles = Particles::new();
        for p in &plist {
            particles.insert(p);
        }
        let mut lat = fine_lattice();
        update_density_lattice(Some(&mut lat), LatticeUpdate::EveryTimestep, DensityType::Baryon, &par, &particles);

        for &(ix, iy, iz) in &[(25, 25, 25), (22, 27, 24), (30, 20, 26)] {
            let center = lat.cell_center(ix, iy, iz);
            let (rho, _) = rho_eckart(center, &plist, &par, DensityType::Baryon, false);
            let on_lattice = lat.node(ix, iy, iz).density();
            assert!((rho - on_lattice).abs() < 1e-9 * rho.abs().max(1.0), "{} vs {}", rho, on_lattice);
        }
    }

    #[test]
    fn eckart_gradient_matches_finite_difference() {
        let c = catalog();
        let par = DensityParameters::from_smearing(1.0, 4.0, 1);
        let plist = vec![
            particle_at(&c, 2212, 0, ThreeVector::new(0.3, 0.0, -0.2), ThreeVector::new(0.4, 0.1, 0.0)),
            particle_at(&c, 2212, 1, ThreeVector::new(-0.6, 0.4, 0.1), ThreeVector::new(0.0, -0.3, 0.2)),
            particle_at(&c, -2212, 2, ThreeVector::new(1.2, 0.2, 0.2), ThreeVector::zero()),
        ];
        let r = ThreeVector::new(0.1, 0.2, -0.1);
        let (_, grad) = rho_eckart(r, &plist, &par, DensityType::Baryon, true);

        let h = 1e-5;
        let axes = [ThreeVector::new(h, 0.0, 0.0), ThreeVector::new(0.0, h, 0.0), ThreeVector::new(0.0, 0.0, h)];
        for (k, dx) in axes.iter().enumerate() {
            let plus = rho_eckart(r + *dx, &plist, &par, DensityType::Baryon, false).0;
            let minus = rho_eckart(r - *dx, &plist, &par, DensityType::Baryon, false).0;
            let numeric = (plus - minus) / (2.0 * h);
            assert!((grad[k] - numeric).abs() < 1e-6, "component {}: {} vs {}", k, grad[k], numeric);
        }
    }

    #[test]
    fn eckart_overloads_agree() {
        let c = catalog();
        let par = DensityParameters::from_smearing(1.0, 4.0, 2);
        let plist = vec![
            particle_at(&c, 2212, 0, ThreeVector::new(0.3, 0.0, -0.2), ThreeVector::new(0.4, 0.1, 0.0)),
            particle_at(&c, 211, 1, ThreeVector::new(-0.6, 0.4, 0.1), ThreeVector::zero()),
        ];
        let mut particles = Particles::new();
        for p in &plist {
            particles.insert(p);
        }
        let a = rho_eckart(ThreeVector::zero(), &plist, &par, DensityType::Hadron, true);
        let b = rho_eckart_particles(ThreeVector::zero(), &particles, &par, DensityType::Hadron, true);
        assert_eq!(a, b);
    }
}
