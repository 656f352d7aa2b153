use hadron_box_common::{FourVector, ParticleType, PdgCode, ThreeVector};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// One particle of the ensemble: species, 4-position and 4-momentum.
#[derive(Debug, Clone)]
pub struct ParticleData {
    id: i32,
    ptype: Arc<ParticleType>,
    position: FourVector,
    momentum: FourVector,
    formation_time: f64,
}

impl ParticleData {
    /// A particle at rest at the origin, carrying its pole mass.
    pub fn new(ptype: Arc<ParticleType>, id: i32) -> Self {
        let mass = ptype.mass;
        Self {
            id,
            ptype,
            position: FourVector::zero(),
            momentum: FourVector::new(mass, 0.0, 0.0, 0.0),
            formation_time: 0.0,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn ptype(&self) -> &ParticleType {
        &self.ptype
    }

    pub fn pdgcode(&self) -> PdgCode {
        self.ptype.pdg
    }

    pub fn pole_mass(&self) -> f64 {
        self.ptype.mass
    }

    pub fn position(&self) -> FourVector {
        self.position
    }

    pub fn momentum(&self) -> FourVector {
        self.momentum
    }

    pub fn formation_time(&self) -> f64 {
        self.formation_time
    }

    pub fn set_4position(&mut self, position: FourVector) {
        self.position = position;
    }

    pub fn set_4momentum(&mut self, momentum: FourVector) {
        self.momentum = momentum;
    }

    /// Sets the 3-momentum and puts the particle on the mass shell of `mass`.
    pub fn set_momentum_on_shell(&mut self, mass: f64, p: ThreeVector) {
        let energy = (mass * mass + p.sqr()).sqrt();
        self.momentum = FourVector::from_parts(energy, p);
    }

    pub fn set_formation_time(&mut self, t: f64) {
        self.formation_time = t;
    }

    /// 3-velocity p / E.
    pub fn velocity(&self) -> ThreeVector {
        self.momentum.velocity()
    }
}

impl fmt::Display for ParticleData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (id {}) x = ({:.4}, {:.4}, {:.4}, {:.4}) p = ({:.4}, {:.4}, {:.4}, {:.4})",
            self.ptype.name,
            self.id,
            self.position.x0,
            self.position.x1,
            self.position.x2,
            self.position.x3,
            self.momentum.x0,
            self.momentum.x1,
            self.momentum.x2,
            self.momentum.x3,
        )
    }
}

/// Flat record written to CSV output.
#[derive(Debug, Serialize)]
pub struct ParticleRecord {
    pub id: i32,
    #[serde(serialize_with = "serialize_pdg")]
    pub pdg: PdgCode,
    pub t: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub energy: f64,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
}

fn serialize_pdg<S: Serializer>(pdg: &PdgCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i32(pdg.code())
}

impl From<&ParticleData> for ParticleRecord {
    fn from(p: &ParticleData) -> Self {
        ParticleRecord {
            id: p.id,
            pdg: p.pdgcode(),
            t: p.position.x0,
            x: p.position.x1,
            y: p.position.x2,
            z: p.position.x3,
            energy: p.momentum.x0,
            px: p.momentum.x1,
            py: p.momentum.x2,
            pz: p.momentum.x3,
        }
    }
}

/// The particle ensemble of one event. Ids are assigned sequentially.
#[derive(Debug, Default, Clone)]
pub struct Particles {
    data: Vec<ParticleData>,
    next_id: i32,
}

impl Particles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `n` particles of the given species at rest at the origin.
    pub fn create(&mut self, n: usize, ptype: &Arc<ParticleType>) {
        self.data.reserve(n);
        for _ in 0..n {
            self.create_one(ptype);
        }
    }

    /// Creates a single particle and returns it for further setup.
    pub fn create_one(&mut self, ptype: &Arc<ParticleType>) -> &mut ParticleData {
        let particle = ParticleData::new(Arc::clone(ptype), self.next_id);
        self.next_id += 1;
        self.data.push(particle);
        let last = self.data.len() - 1;
        &mut self.data[last]
    }

    /// Inserts a copy of `particle` under a fresh id.
    pub fn insert(&mut self, particle: &ParticleData) -> &mut ParticleData {
        let mut p = particle.clone();
        p.id = self.next_id;
        self.next_id += 1;
        self.data.push(p);
        let last = self.data.len() - 1;
        &mut self.data[last]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParticleData> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ParticleData> {
        self.data.iter_mut()
    }

    pub fn as_slice(&self) -> &[ParticleData] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [ParticleData] {
        &mut self.data
    }

    /// Summed 4-momentum of the ensemble.
    pub fn total_momentum(&self) -> FourVector {
        self.data.iter().fold(FourVector::zero(), |acc, p| acc + p.momentum)
    }
}

impl<'a> IntoIterator for &'a Particles {
    type Item = &'a ParticleData;
    type IntoIter = std::slice::Iter<'a, ParticleData>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}
