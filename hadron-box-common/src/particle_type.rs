use crate::constants::WIDTH_CUTOFF;
use crate::pdg::PdgCode;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Static properties of one particle species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleType {
    pub name: String,
    pub pdg: PdgCode,
    /// Pole mass [GeV].
    pub mass: f64,
    /// Width at the pole [GeV].
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub charge: i32,
    #[serde(default)]
    pub strangeness: i32,
    /// Twice the total isospin.
    #[serde(default)]
    pub isospin_twice: i32,
    /// Twice the isospin projection.
    #[serde(default)]
    pub isospin3_twice: i32,
}

impl ParticleType {
    pub fn new(name: &str, pdg: i32, mass: f64, width: f64, charge: i32, strangeness: i32, isospin_twice: i32, isospin3_twice: i32) -> Self {
        Self {
            name: name.to_string(),
            pdg: PdgCode(pdg),
            mass,
            width,
            charge,
            strangeness,
            isospin_twice,
            isospin3_twice,
        }
    }

    pub fn pdgcode(&self) -> PdgCode {
        self.pdg
    }

    pub fn is_stable(&self) -> bool {
        self.width < WIDTH_CUTOFF
    }

    pub fn is_hadron(&self) -> bool {
        self.pdg.is_hadron()
    }

    pub fn is_baryon(&self) -> bool {
        self.pdg.is_baryon()
    }

    pub fn baryon_number(&self) -> i32 {
        self.pdg.baryon_number()
    }

    /// Isospin projection relative to total isospin, I3/I. Zero for isosinglets.
    pub fn isospin3_rel(&self) -> f64 {
        if self.isospin_twice == 0 {
            0.0
        } else {
            self.isospin3_twice as f64 / self.isospin_twice as f64
        }
    }

    /// The charge-conjugated species.
    pub fn antiparticle(&self) -> ParticleType {
        Self {
            name: format!("{}\u{0305}", self.name),
            pdg: self.pdg.antiparticle(),
            mass: self.mass,
            width: self.width,
            charge: -self.charge,
            strangeness: -self.strangeness,
            isospin_twice: self.isospin_twice,
            isospin3_twice: -self.isospin3_twice,
        }
    }
}

/// The set of species known to a run, indexed by PDG code.
#[derive(Debug, Clone)]
pub struct SpeciesCatalog {
    types: Vec<Arc<ParticleType>>,
    index: HashMap<PdgCode, usize>,
}

impl SpeciesCatalog {
    /// Builds a catalog from explicit entries. Antibaryons are added for
    /// every listed baryon that does not already have one.
    pub fn new(entries: Vec<ParticleType>) -> Result<Self> {
        let mut types = Vec::with_capacity(entries.len() * 2);
        let mut index = HashMap::new();

        let mut push = |t: ParticleType, types: &mut Vec<Arc<ParticleType>>| -> Result<()> {
            if index.contains_key(&t.pdg) {
                anyhow::bail!("Duplicate PDG code {} ({}) in species catalog.", t.pdg.code(), t.name);
            }
            index.insert(t.pdg, types.len());
            types.push(Arc::new(t));
            Ok(())
        };

        let listed: Vec<PdgCode> = entries.iter().map(|t| t.pdg).collect();
        for entry in entries {
            let anti = if entry.is_baryon() && !entry.pdg.is_antiparticle() && !listed.contains(&entry.pdg.antiparticle()) {
                Some(entry.antiparticle())
            } else {
                None
            };
            push(entry, &mut types)?;
            if let Some(anti) = anti {
                push(anti, &mut types)?;
            }
        }

        Ok(Self { types, index })
    }

    /// Light hadrons and charged leptons with PDG pole masses.
    pub fn default_hadrons() -> Result<Self> {
        let entries = vec![
            ParticleType::new("π+", 211, 0.138, 0.0, 1, 0, 2, 2),
            ParticleType::new("π0", 111, 0.138, 0.0, 0, 0, 2, 0),
            ParticleType::new("π-", -211, 0.138, 0.0, -1, 0, 2, -2),
            ParticleType::new("K+", 321, 0.494, 0.0, 1, 1, 1, 1),
            ParticleType::new("K0", 311, 0.494, 0.0, 0, 1, 1, -1),
            ParticleType::new("K-", -321, 0.494, 0.0, -1, -1, 1, -1),
            ParticleType::new("K̄0", -311, 0.494, 0.0, 0, -1, 1, 1),
            ParticleType::new("η", 221, 0.548, 1.31e-6, 0, 0, 0, 0),
            ParticleType::new("ρ+", 213, 0.776, 0.149, 1, 0, 2, 2),
            ParticleType::new("ρ0", 113, 0.776, 0.149, 0, 0, 2, 0),
            ParticleType::new("ρ-", -213, 0.776, 0.149, -1, 0, 2, -2),
            ParticleType::new("ω", 223, 0.783, 0.0085, 0, 0, 0, 0),
            ParticleType::new("N+", 2212, 0.938, 0.0, 1, 0, 1, 1),
            ParticleType::new("N0", 2112, 0.938, 0.0, 0, 0, 1, -1),
            ParticleType::new("Δ++", 2224, 1.232, 0.117, 2, 0, 3, 3),
            ParticleType::new("Δ+", 2214, 1.232, 0.117, 1, 0, 3, 1),
            ParticleType::new("Δ0", 2114, 1.232, 0.117, 0, 0, 3, -1),
            ParticleType::new("Δ-", 1114, 1.232, 0.117, -1, 0, 3, -3),
            ParticleType::new("Λ", 3122, 1.116, 0.0, 0, -1, 0, 0),
            ParticleType::new("Σ+", 3222, 1.189, 0.0, 1, -1, 2, 2),
            ParticleType::new("Σ0", 3212, 1.193, 0.0, 0, -1, 2, 0),
            ParticleType::new("Σ-", 3112, 1.197, 0.0, -1, -1, 2, -2),
            ParticleType::new("e-", 11, 0.000511, 0.0, -1, 0, 0, 0),
            ParticleType::new("e+", -11, 0.000511, 0.0, 1, 0, 0, 0),
            ParticleType::new("μ-", 13, 0.1057, 0.0, -1, 0, 0, 0),
            ParticleType::new("μ+", -13, 0.1057, 0.0, 1, 0, 0, 0),
        ];
        Self::new(entries)
    }

    pub fn find(&self, pdg: PdgCode) -> Option<&Arc<ParticleType>> {
        self.index.get(&pdg).map(|&i| &self.types[i])
    }

    /// Like `find`, but unknown codes are an error.
    pub fn try_find(&self, pdg: PdgCode) -> Result<&Arc<ParticleType>> {
        self.find(pdg)
            .ok_or_else(|| anyhow::anyhow!("PDG code {} is not in the species catalog.", pdg.code()))
    }

    pub fn list_all(&self) -> impl Iterator<Item = &Arc<ParticleType>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
