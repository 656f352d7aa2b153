use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Index, Mul, Neg, Sub, SubAssign};

/// A spatial 3-vector [fm or GeV, depending on use].
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreeVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ThreeVector {
    /// Creates a new ThreeVector.
    #[inline(always)]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector.
    #[inline(always)]
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[inline(always)]
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Squared length of the vector.
    #[inline(always)]
    pub fn sqr(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Length of the vector.
    #[inline(always)]
    pub fn abs(self) -> f64 {
        self.sqr().sqrt()
    }

    #[inline(always)]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Calculates the squared distance to another point.
    #[inline(always)]
    pub fn distance_squared(self, other: Self) -> f64 {
        (self - other).sqr()
    }
}

impl Index<usize> for ThreeVector {
    type Output = f64;
    fn index(&self, i: usize) -> &f64 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("ThreeVector index {} out of range", i),
        }
    }
}

impl Add for ThreeVector {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl AddAssign for ThreeVector {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for ThreeVector {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl SubAssign for ThreeVector {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Neg for ThreeVector {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for ThreeVector {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Div<f64> for ThreeVector {
    type Output = Self;
    fn div(self, scalar: f64) -> Self {
        Self::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

/// A Minkowski 4-vector with metric (+, -, -, -).
///
/// `x0` is the time (or energy) component; `x1..x3` are spatial.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FourVector {
    pub x0: f64,
    pub x1: f64,
    pub x2: f64,
    pub x3: f64,
}

impl FourVector {
    #[inline(always)]
    pub fn new(x0: f64, x1: f64, x2: f64, x3: f64) -> Self {
        Self { x0, x1, x2, x3 }
    }

    #[inline(always)]
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Builds a 4-vector from a time component and a spatial part.
    #[inline(always)]
    pub fn from_parts(x0: f64, v: ThreeVector) -> Self {
        Self::new(x0, v.x, v.y, v.z)
    }

    #[inline(always)]
    pub fn threevec(self) -> ThreeVector {
        ThreeVector::new(self.x1, self.x2, self.x3)
    }

    /// Minkowski scalar product.
    #[inline(always)]
    pub fn dot(self, other: Self) -> f64 {
        self.x0 * other.x0 - self.x1 * other.x1 - self.x2 * other.x2 - self.x3 * other.x3
    }

    /// Invariant square `x0² - |x|²`.
    #[inline(always)]
    pub fn sqr(self) -> f64 {
        self.dot(self)
    }

    /// Invariant length. Spacelike vectors yield a negative value.
    pub fn abs(self) -> f64 {
        let s = self.sqr();
        if s > -1e-6 {
            s.abs().sqrt()
        } else {
            -(s.abs().sqrt())
        }
    }

    /// Spatial part divided by the time component.
    #[inline(always)]
    pub fn velocity(self) -> ThreeVector {
        self.threevec() / self.x0
    }

    /// Component by index, 0 being the time component.
    pub fn component(self, mu: usize) -> f64 {
        match mu {
            0 => self.x0,
            1 => self.x1,
            2 => self.x2,
            3 => self.x3,
            _ => panic!("FourVector index {} out of range", mu),
        }
    }
}

impl Add for FourVector {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(self.x0 + o.x0, self.x1 + o.x1, self.x2 + o.x2, self.x3 + o.x3)
    }
}

impl AddAssign for FourVector {
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl Sub for FourVector {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(self.x0 - o.x0, self.x1 - o.x1, self.x2 - o.x2, self.x3 - o.x3)
    }
}

impl Mul<f64> for FourVector {
    type Output = Self;
    fn mul(self, s: f64) -> Self {
        Self::new(self.x0 * s, self.x1 * s, self.x2 * s, self.x3 * s)
    }
}

impl Div<f64> for FourVector {
    type Output = Self;
    fn div(self, s: f64) -> Self {
        Self::new(self.x0 / s, self.x1 / s, self.x2 / s, self.x3 / s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minkowski_norm_of_particle_at_rest_is_mass() {
        let p = FourVector::new(0.938, 0.0, 0.0, 0.0);
        assert!((p.abs() - 0.938).abs() < 1e-12);
    }

    #[test]
    fn spacelike_vector_has_negative_abs() {
        let v = FourVector::new(1.0, 2.0, 0.0, 0.0);
        assert!(v.abs() < 0.0);
        assert!((v.abs() + 3.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn velocity_is_momentum_over_energy() {
        let p = FourVector::new(2.0, 1.0, 0.5, 0.0);
        let v = p.velocity();
        assert_eq!(v, ThreeVector::new(0.5, 0.25, 0.0));
    }
}
