//! Infinite matter in a cube with periodic boundaries.
//!
//! [`BoxModus`] fills the box with particles at the start of a run and keeps
//! them inside it afterwards. Initial multiplicities are either given per
//! species or drawn from the thermal densities of a hadron gas; momenta are
//! peaked at 3T, Maxwell-Boltzmann or quantum-statistical; positions are
//! uniform. The ensemble is put at rest before an optional jet particle is
//! added on top.

use crate::distributions::{isotropic_direction, sample_momenta_from_thermal};
use crate::hadgas_eos::{BoltzmannHadronGas, HadronGasEos};
use crate::output::{OutputInterface, WallCrossingAction};
use crate::particles::Particles;
use crate::quantum_sampling::{NumericalQuantumSampling, QuantumSampling, QuantumStatistics};
use anyhow::Result;
use hadron_box_common::{
    BoxConfig, BoxInitialCondition, ExperimentParameters, FourVector, ParticleType, PdgCode,
    SpeciesCatalog, ThreeVector, HBARC, REALLY_SMALL,
};
use log::{debug, info, warn};
use rand::{Rng, RngCore};
use rand_distr::{Distribution, Poisson};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Target precision of chemical potentials and distribution maxima [GeV].
const SOLUTION_PRECISION: f64 = 1e-8;
/// Upper end of the sampled radial momenta in quantum sampling [GeV].
const MAX_QUANTUM_MOMENTUM: f64 = 50.0;

pub struct BoxModus {
    initial_condition: BoxInitialCondition,
    length: f64,
    equilibration_time: f64,
    temperature: f64,
    start_time: f64,
    use_thermal: bool,
    mub: f64,
    mus: f64,
    muq: f64,
    account_for_resonance_widths: bool,
    allow_lepton_boltzmann_fallback: bool,
    init_multipl: BTreeMap<PdgCode, u32>,
    /// Expected counts per species, including testparticles. Filled on the
    /// first thermal initialization and kept for the rest of the run.
    average_multipl: BTreeMap<PdgCode, f64>,
    jet: Option<(Arc<ParticleType>, f64)>,
    testparticles: u32,
    res_lifetime_factor: f64,
    catalog: Arc<SpeciesCatalog>,
    eos: Arc<dyn HadronGasEos>,
    sampler: Arc<dyn QuantumSampling>,
}

impl BoxModus {
    pub fn new(config: &BoxConfig, params: &ExperimentParameters, catalog: Arc<SpeciesCatalog>) -> Result<Self> {
        if params.res_lifetime_factor < 0.0 {
            anyhow::bail!("Resonance lifetime modifier cannot be negative, got {}.", params.res_lifetime_factor);
        }
        if (config.length - params.box_length).abs() > REALLY_SMALL {
            anyhow::bail!(
                "Box length inconsistency: box is {} fm but the run uses {} fm.",
                config.length,
                params.box_length
            );
        }
        if config.temperature <= 0.0 {
            anyhow::bail!("Box temperature must be positive, got {} GeV.", config.temperature);
        }

        let mut init_multipl = BTreeMap::new();
        if !config.use_thermal_multiplicities {
            for (key, &count) in &config.init_multiplicities {
                let pdg: PdgCode = key
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Malformed PDG code '{}' in init_multiplicities.", key))?;
                catalog.try_find(pdg)?;
                init_multipl.insert(pdg, count);
            }
        }

        let jet = match &config.jet {
            Some(jet) => Some((Arc::clone(catalog.try_find(PdgCode(jet.pdg))?), jet.momentum)),
            None => None,
        };

        Ok(Self {
            initial_condition: config.initial_condition,
            length: config.length,
            equilibration_time: config.equilibration_time,
            temperature: config.temperature,
            start_time: config.start_time,
            use_thermal: config.use_thermal_multiplicities,
            mub: config.baryon_chemical_potential,
            mus: config.strange_chemical_potential,
            muq: config.charge_chemical_potential,
            account_for_resonance_widths: config.account_resonance_widths,
            allow_lepton_boltzmann_fallback: config.allow_lepton_boltzmann_fallback,
            init_multipl,
            average_multipl: BTreeMap::new(),
            jet,
            testparticles: params.testparticles,
            res_lifetime_factor: params.res_lifetime_factor,
            catalog,
            eos: Arc::new(BoltzmannHadronGas::new()),
            sampler: Arc::new(NumericalQuantumSampling::new()),
        })
    }

    /// Replaces the hadron gas used for thermal multiplicities and masses.
    pub fn with_eos(mut self, eos: Arc<dyn HadronGasEos>) -> Self {
        self.eos = eos;
        self
    }

    /// Replaces the solver and sampler used for quantum momenta.
    pub fn with_quantum_sampling(mut self, sampler: Arc<dyn QuantumSampling>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Output before this time is skipped; negative when unset [fm].
    pub fn equilibration_time(&self) -> f64 {
        self.equilibration_time
    }

    pub fn average_multiplicities(&self) -> &BTreeMap<PdgCode, f64> {
        &self.average_multipl
    }

    /// Creates the initial particles and returns the start time.
    pub fn initial_conditions<R: Rng>(&mut self, particles: &mut Particles, rng: &mut R) -> Result<f64> {
        if self.use_thermal {
            self.populate_thermal(particles, rng)?;
        } else {
            self.populate_fixed(particles)?;
        }

        let quantum_multiplicities = self.quantum_multiplicities();
        let momentum_total = self.assign_momenta_and_positions(particles, &quantum_multiplicities, rng)?;
        cancel_net_momentum(particles, momentum_total);

        if let Some((jet_type, jet_momentum)) = &self.jet {
            let jet = particles.create_one(jet_type);
            jet.set_formation_time(self.start_time);
            jet.set_4position(FourVector::new(self.start_time, 0.0, 0.0, 0.0));
            jet.set_momentum_on_shell(jet_type.mass, ThreeVector::new(*jet_momentum, 0.0, 0.0));
        }

        for data in particles.iter() {
            debug!("{}", data);
        }
        debug!("Initial total 4-momentum [GeV]: {:?}", particles.total_momentum());
        Ok(self.start_time)
    }

    fn populate_thermal<R: Rng>(&mut self, particles: &mut Particles, rng: &mut R) -> Result<()> {
        let volume = self.length * self.length * self.length;
        let t = self.temperature;
        if self.average_multipl.is_empty() {
            for ptype in self.catalog.list_all() {
                if self.eos.is_eos_particle(ptype) {
                    let lifetime_factor = if ptype.is_stable() { 1.0 } else { self.res_lifetime_factor };
                    let n = lifetime_factor
                        * self.eos.partial_density(
                            ptype,
                            t,
                            self.mub,
                            self.mus,
                            self.muq,
                            self.account_for_resonance_widths,
                        );
                    self.average_multipl.insert(ptype.pdg, n * volume * self.testparticles as f64);
                }
            }
        }

        let (mut nb_init, mut ns_init, mut nq_init) = (0.0, 0.0, 0.0);
        for (&pdg, &mean) in &self.average_multipl {
            let ptype = self.catalog.try_find(pdg)?;
            let count = if mean > 0.0 {
                let poisson = Poisson::new(mean)
                    .map_err(|e| anyhow::anyhow!("Invalid mean multiplicity {} for {}: {}", mean, ptype.name, e))?;
                let draw: f64 = poisson.sample(rng);
                draw as usize
            } else {
                0
            };
            particles.create(count, ptype);
            nb_init += mean * ptype.baryon_number() as f64;
            ns_init += mean * ptype.strangeness as f64;
            nq_init += mean * ptype.charge as f64;
            debug!("{} initial multiplicity {}", ptype.name, count);
        }
        let norm = volume * self.testparticles as f64;
        info!("Initial hadron gas baryon density {} fm^-3", nb_init / norm);
        info!("Initial hadron gas strange density {} fm^-3", ns_init / norm);
        info!("Initial hadron gas charge density {} fm^-3", nq_init / norm);
        Ok(())
    }

    fn populate_fixed(&self, particles: &mut Particles) -> Result<()> {
        for (&pdg, &count) in &self.init_multipl {
            let ptype = self.catalog.try_find(pdg)?;
            let n = count as usize * self.testparticles as usize;
            particles.create(n, ptype);
            debug!("Particle {} initial multiplicity {}", ptype.name, n);
        }
        Ok(())
    }

    /// Physical (not testparticle-scaled) counts that set the density each
    /// species is solved for in quantum sampling.
    fn quantum_multiplicities(&self) -> BTreeMap<PdgCode, f64> {
        if self.use_thermal {
            let ntest = self.testparticles as f64;
            self.average_multipl.iter().map(|(&pdg, &mean)| (pdg, mean / ntest)).collect()
        } else {
            self.init_multipl.iter().map(|(&pdg, &count)| (pdg, count as f64)).collect()
        }
    }

    /// Gives every particle a mass, a momentum, a position and a formation
    /// time. Returns the summed 4-momentum.
    fn assign_momenta_and_positions<R: Rng>(
        &self,
        particles: &mut Particles,
        quantum_multiplicities: &BTreeMap<PdgCode, f64>,
        rng: &mut R,
    ) -> Result<FourVector> {
        let t = self.temperature;
        let mut chemical_potentials = HashMap::new();
        let mut distribution_maxima = HashMap::new();
        let mut momentum_total = FourVector::zero();

        for data in particles.iter_mut() {
            let (mass, momentum_radial) = match self.initial_condition {
                BoxInitialCondition::PeakedMomenta => (data.pole_mass(), 3.0 * t),
                BoxInitialCondition::ThermalMomentaBoltzmann => {
                    let mass = if self.account_for_resonance_widths {
                        self.eos.sample_mass_thermal(data.ptype(), 1.0 / t, rng)
                    } else {
                        data.pole_mass()
                    };
                    (mass, sample_momenta_from_thermal(t, mass, rng))
                }
                BoxInitialCondition::ThermalMomentaQuantum => {
                    let mass = data.pole_mass();
                    let p = self.sample_quantum_momenta(
                        mass,
                        data.ptype(),
                        t,
                        &mut chemical_potentials,
                        &mut distribution_maxima,
                        quantum_multiplicities,
                        rng,
                    )?;
                    (mass, p)
                }
            };
            let direction = isotropic_direction(rng);
            debug!(
                "{}(id {}) radial momentum {}, direction {:?}",
                data.ptype().name,
                data.id(),
                momentum_radial,
                direction
            );
            data.set_momentum_on_shell(mass, direction * momentum_radial);
            momentum_total += data.momentum();

            let pos = ThreeVector::new(
                rng.random_range(0.0..self.length),
                rng.random_range(0.0..self.length),
                rng.random_range(0.0..self.length),
            );
            data.set_4position(FourVector::from_parts(self.start_time, pos));
            data.set_formation_time(self.start_time);
        }
        Ok(momentum_total)
    }

    /// Wraps every particle back into `[0, length)³` and reports each wrap
    /// as a wall crossing to the outputs, skipping dilepton and photon
    /// outputs. Returns the number of wrapped particles.
    ///
    /// All particles are inside the box when this returns, even if an output
    /// fails; the first output error is returned after wrapping.
    pub fn impose_boundary_conditions(
        &self,
        particles: &mut Particles,
        outputs: &mut [Box<dyn OutputInterface>],
    ) -> Result<usize> {
        let mut crossings = Vec::new();
        for data in particles.iter_mut() {
            let mut position = data.position();
            if enforce_periodic_boundaries(&mut position, self.length) {
                let incoming = data.clone();
                data.set_4position(position);
                crossings.push(WallCrossingAction::new(incoming, data.clone()));
            }
        }
        debug!("Moved {} particles back into the box.", crossings.len());

        for output in outputs.iter_mut() {
            if output.is_dilepton_output() || output.is_photon_output() {
                continue;
            }
            for action in &crossings {
                output.at_interaction(action, 0.0)?;
            }
        }
        Ok(crossings.len())
    }

    /// Radial momentum from the Fermi-Dirac, Bose-Einstein or Boltzmann
    /// distribution of `ptype`, with the chemical potential chosen so the
    /// distribution reproduces the species' density in the box.
    ///
    /// Chemical potentials and distribution maxima are looked up in the two
    /// caches first and stored there after computing them.
    #[allow(clippy::too_many_arguments)]
    pub fn sample_quantum_momenta(
        &self,
        mass: f64,
        ptype: &ParticleType,
        temperature: f64,
        chemical_potentials: &mut HashMap<PdgCode, f64>,
        distribution_maxima: &mut HashMap<PdgCode, f64>,
        multiplicities: &BTreeMap<PdgCode, f64>,
        rng: &mut dyn RngCore,
    ) -> Result<f64> {
        let pdg = ptype.pdg;
        let statistics = match QuantumStatistics::of_hadron(pdg) {
            Some(statistics) => statistics,
            None if pdg.is_lepton() && !self.allow_lepton_boltzmann_fallback => anyhow::bail!(
                "{} (pdg {}) is a lepton and has no quantum statistics here. Set \
                 allow_lepton_boltzmann_fallback = true to sample it from a Boltzmann distribution.",
                ptype.name,
                pdg.code()
            ),
            None => QuantumStatistics::Boltzmann,
        };

        let chemical_potential = match chemical_potentials.get(&pdg) {
            Some(&mu) => mu,
            None => {
                if pdg.is_lepton() {
                    warn!(
                        "{} (pdg {}) is a lepton. Its momenta are sampled from a Boltzmann distribution.",
                        ptype.name,
                        pdg.code()
                    );
                }
                let number_of_particles = multiplicities.get(&pdg).copied().unwrap_or(0.0);
                let l_in_gev = self.length / HBARC;
                let number_density = number_of_particles / (l_in_gev * l_in_gev * l_in_gev);
                let spin_degeneracy = pdg.spin_degeneracy() as f64;
                let mu = self
                    .sampler
                    .effective_chemical_potential(
                        spin_degeneracy,
                        mass,
                        number_density,
                        temperature,
                        statistics,
                        SOLUTION_PRECISION,
                    )
                    .map_err(|e| {
                        anyhow::anyhow!(
                            "No chemical potential for {} at T = {} GeV: {}. The number density of bosons \
                             may be too big at this temperature, so that a Bose-Einstein condensate forms. \
                             Try decreasing the number density or increasing the temperature.",
                            ptype.name,
                            temperature,
                            e
                        )
                    })?;
                chemical_potentials.insert(pdg, mu);
                mu
            }
        };

        let distribution_maximum = match distribution_maxima.get(&pdg) {
            Some(&max) => max,
            None => {
                let max = self.sampler.maximum_of_the_distribution(
                    mass,
                    temperature,
                    chemical_potential,
                    statistics,
                    SOLUTION_PRECISION,
                );
                distribution_maxima.insert(pdg, max);
                max
            }
        };

        Ok(self.sampler.sample_momentum(
            mass,
            temperature,
            chemical_potential,
            statistics,
            MAX_QUANTUM_MOMENTUM,
            distribution_maximum,
            rng,
        ))
    }
}

/// Shifts every 3-momentum by `-total/N`, keeping invariant masses.
fn cancel_net_momentum(particles: &mut Particles, momentum_total: FourVector) {
    if particles.is_empty() {
        return;
    }
    let shift = momentum_total.threevec() / particles.len() as f64;
    for data in particles.iter_mut() {
        let p = data.momentum();
        data.set_momentum_on_shell(p.abs(), p.threevec() - shift);
    }
}

/// Wraps the spatial part of `position` into `[0, length)³`. Returns whether
/// any coordinate moved.
pub fn enforce_periodic_boundaries(position: &mut FourVector, length: f64) -> bool {
    let mut wrapped = false;
    for x in [&mut position.x1, &mut position.x2, &mut position.x3] {
        if *x < 0.0 || *x >= length {
            let mut inside = x.rem_euclid(length);
            // rounding can land exactly on the upper wall
            if inside >= length {
                inside = 0.0;
            }
            *x = inside;
            wrapped = true;
        }
    }
    wrapped
}

impl fmt::Display for BoxModus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- Box Modus:")?;
        writeln!(f, "Size of the box: ({} fm)³", self.length)?;
        if self.use_thermal {
            writeln!(
                f,
                "Thermal multiplicities (T = {} GeV, muB = {} GeV, muS = {} GeV, muQ = {} GeV)",
                self.temperature, self.mub, self.mus, self.muq
            )?;
        } else {
            for (pdg, count) in &self.init_multipl {
                let name = self.catalog.find(*pdg).map_or("?", |t| t.name.as_str());
                writeln!(f, "{} initial multiplicity {}", name, count)?;
            }
        }
        match self.initial_condition {
            BoxInitialCondition::PeakedMomenta => {
                writeln!(f, "All initial momenta = 3T = {} GeV", 3.0 * self.temperature)?
            }
            BoxInitialCondition::ThermalMomentaBoltzmann => {
                writeln!(f, "Boltzmann momentum distribution with T = {} GeV.", self.temperature)?
            }
            BoxInitialCondition::ThermalMomentaQuantum => {
                writeln!(f, "Fermi/Bose momentum distribution with T = {} GeV.", self.temperature)?
            }
        }
        if let Some((jet_type, jet_momentum)) = &self.jet {
            writeln!(
                f,
                "Adding a {} as a jet at the box origin with {} GeV initial momentum.",
                jet_type.name, jet_momentum
            )?;
        }
        Ok(())
    }
}
