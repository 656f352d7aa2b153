use hadron_box_common::FourVector;

/// Symmetric energy-momentum tensor `T^{μν}` [GeV fm⁻³ once smeared].
///
/// Only the ten independent components are stored, in the order
/// `00 01 02 03 11 12 13 22 23 33`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyMomentumTensor {
    tmn: [f64; 10],
}

impl EnergyMomentumTensor {
    /// Position of `T^{μν}` in the packed component array.
    #[inline]
    pub fn tmn_index(mu: usize, nu: usize) -> usize {
        let (a, b) = if mu <= nu { (mu, nu) } else { (nu, mu) };
        // rows of the upper triangle hold 4, 3, 2 and 1 entries
        const ROW_START: [usize; 4] = [0, 4, 7, 9];
        ROW_START[a] + b - a
    }

    pub fn get(&self, mu: usize, nu: usize) -> f64 {
        self.tmn[Self::tmn_index(mu, nu)]
    }

    /// Energy density `T^{00}`.
    pub fn energy_density(&self) -> f64 {
        self.tmn[0]
    }

    /// Adds `factor · p^μ p^ν / p^0`.
    pub fn add_four_momentum(&mut self, p: FourVector, factor: f64) {
        let weight = factor / p.x0;
        for mu in 0..4 {
            for nu in mu..4 {
                self.tmn[Self::tmn_index(mu, nu)] += weight * p.component(mu) * p.component(nu);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_indices_cover_the_upper_triangle() {
        let mut seen = [false; 10];
        for mu in 0..4 {
            for nu in 0..4 {
                let i = EnergyMomentumTensor::tmn_index(mu, nu);
                assert_eq!(i, EnergyMomentumTensor::tmn_index(nu, mu));
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(EnergyMomentumTensor::tmn_index(1, 1), 4);
        assert_eq!(EnergyMomentumTensor::tmn_index(3, 3), 9);
    }

    #[test]
    fn one_particle_gives_dyadic_product_over_energy() {
        let p = FourVector::new(2.0, 1.0, 0.5, 0.0);
        let mut t = EnergyMomentumTensor::default();
        t.add_four_momentum(p, 0.5);
        assert_eq!(t.energy_density(), 0.5 * 2.0);
        assert_eq!(t.get(0, 1), 0.5 * 1.0);
        assert_eq!(t.get(1, 2), 0.5 * 0.5 * 0.5 / 2.0);
        assert_eq!(t.get(2, 1), t.get(1, 2));
        assert_eq!(t.get(3, 3), 0.0);
        // trace with metric (+,-,-,-) is m² / E times the factor
        let trace = t.get(0, 0) - t.get(1, 1) - t.get(2, 2) - t.get(3, 3);
        assert!((trace - 0.5 * p.sqr() / p.x0).abs() < 1e-12);
    }
}
