use hadron_box_common::ThreeVector;
use rand::Rng;
use rand_distr::{Distribution, Exp1};
use std::f64::consts::PI;

/// Uniformly distributed unit vector.
pub fn isotropic_direction<R: Rng + ?Sized>(rng: &mut R) -> ThreeVector {
    let cos_theta: f64 = rng.random_range(-1.0..1.0);
    let phi: f64 = rng.random_range(0.0..2.0 * PI);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    ThreeVector::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Sum of `shape` unit exponentials times `scale`: a Gamma(shape, scale) draw
/// for integer shape.
#[inline]
fn gamma_int<R: Rng + ?Sized>(shape: u32, scale: f64, rng: &mut R) -> f64 {
    let mut sum = 0.0;
    for _ in 0..shape {
        let e: f64 = Exp1.sample(rng);
        sum += e;
    }
    sum * scale
}

/// Radial momentum [GeV] from the Maxwell-Boltzmann (Jüttner) distribution
/// `p² exp(-E/T)` for a particle of `mass` at `temperature`.
///
/// The kinetic energy `k = E - m` is drawn from the envelope
/// `(k² + 2mk + m²) exp(-k/T)`, a mixture of three Gamma laws, and accepted
/// with probability `p/E`.
pub fn sample_momenta_from_thermal<R: Rng + ?Sized>(temperature: f64, mass: f64, rng: &mut R) -> f64 {
    let w_k2 = 2.0 * temperature * temperature * temperature;
    let w_k1 = 2.0 * mass * temperature * temperature;
    let w_k0 = mass * mass * temperature;
    let w_total = w_k2 + w_k1 + w_k0;

    loop {
        let pick = rng.random::<f64>() * w_total;
        let kinetic = if pick < w_k2 {
            gamma_int(3, temperature, rng)
        } else if pick < w_k2 + w_k1 {
            gamma_int(2, temperature, rng)
        } else {
            gamma_int(1, temperature, rng)
        };
        let energy = kinetic + mass;
        let momentum = (energy * energy - mass * mass).max(0.0).sqrt();
        if energy <= 0.0 {
            continue;
        }
        if rng.random::<f64>() < momentum / energy {
            return momentum;
        }
    }
}

/// Unnormalized momentum distribution `p² / (exp((E - μ)/T) + s)`.
///
/// `s` is +1 for Fermi-Dirac, -1 for Bose-Einstein and 0 for Boltzmann.
pub fn juttner_distribution_func(
    momentum: f64,
    mass: f64,
    temperature: f64,
    chemical_potential: f64,
    statistics_sign: f64,
) -> f64 {
    let energy = (momentum * momentum + mass * mass).sqrt();
    let x = (energy - chemical_potential) / temperature;
    let denominator = if statistics_sign < 0.0 {
        x.exp_m1()
    } else {
        x.exp() + statistics_sign
    };
    if !denominator.is_finite() || denominator <= 0.0 {
        return 0.0;
    }
    momentum * momentum / denominator
}

/// Composite Simpson rule of `f` over `[a, b]` with `steps` intervals
/// (rounded up to even).
pub fn integrate_simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64, steps: usize) -> f64 {
    let n = (steps.max(2) + 1) & !1;
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + i as f64 * h);
    }
    sum * h / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn directions_are_unit_and_centred() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let mut sum = ThreeVector::zero();
        for _ in 0..n {
            let d = isotropic_direction(&mut rng);
            assert!((d.abs() - 1.0).abs() < 1e-12);
            sum += d;
        }
        let mean = sum / n as f64;
        assert!(mean.abs() < 0.03, "mean direction {:?}", mean);
    }

    #[test]
    fn massless_thermal_momentum_averages_three_t() {
        let mut rng = StdRng::seed_from_u64(11);
        let t = 0.2;
        let n = 40_000;
        let mean: f64 = (0..n).map(|_| sample_momenta_from_thermal(t, 0.0, &mut rng)).sum::<f64>() / n as f64;
        assert!((mean - 3.0 * t).abs() < 0.02 * 3.0 * t, "mean = {}", mean);
    }

    #[test]
    fn heavy_thermal_momentum_is_nonrelativistic() {
        // <p> -> sqrt(8 m T / π) for m >> T
        let mut rng = StdRng::seed_from_u64(13);
        let (t, m) = (0.01, 10.0);
        let n = 20_000;
        let mean: f64 = (0..n).map(|_| sample_momenta_from_thermal(t, m, &mut rng)).sum::<f64>() / n as f64;
        let expected = (8.0 * m * t / PI).sqrt();
        assert!((mean - expected).abs() < 0.03 * expected, "mean = {}, expected {}", mean, expected);
    }

    #[test]
    fn distribution_function_by_statistics() {
        let (p, m, t, mu) = (0.3, 0.138, 0.15, 0.0);
        let boltzmann = juttner_distribution_func(p, m, t, mu, 0.0);
        let fermi = juttner_distribution_func(p, m, t, mu, 1.0);
        let bose = juttner_distribution_func(p, m, t, mu, -1.0);
        assert!(fermi < boltzmann && boltzmann < bose);
        let e = (p * p + m * m).sqrt();
        assert!((boltzmann - p * p * (-e / t).exp()).abs() < 1e-15);
        assert_eq!(juttner_distribution_func(40.0, 0.938, 0.001, 0.0, 1.0), 0.0);
    }

    #[test]
    fn simpson_is_exact_for_cubics() {
        let integral = integrate_simpson(|x| x * x * x - 2.0 * x + 1.0, 0.0, 2.0, 3);
        assert!((integral - 2.0).abs() < 1e-12);
    }
}
