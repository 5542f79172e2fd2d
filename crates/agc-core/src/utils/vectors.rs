use std::{fmt::Display, iter::Sum};

use auto_ops::impl_op_ex;
use serde::{Deserialize, Serialize};

/// A three-vector in Cartesian coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Attach a mass, producing the on-shell four-vector with this three-momentum.
    pub fn with_mass(&self, mass: f64) -> Vec4 {
        let e = (mass * mass + self.mag2()).sqrt();
        Vec4::new(self.x, self.y, self.z, e)
    }

    pub fn with_energy(&self, energy: f64) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, energy)
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }
    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }
    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }
    fn add(&self, other: &Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl_op_ex!(+ |a: &Vec3, b: &Vec3| -> Vec3 { a.add(b) });

/// A four-vector `(x, y, z, t)` with metric `(-, -, -, +)`, used as a four-momentum
/// `(px, py, pz, E)`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub t: f64,
}

impl Vec4 {
    pub const fn new(x: f64, y: f64, z: f64, t: f64) -> Self {
        Self { x, y, z, t }
    }

    /// Build a four-momentum from the collider coordinates stored for reconstructed objects.
    pub fn from_pt_eta_phi_mass(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        Vec3::new(pt * phi.cos(), pt * phi.sin(), pt * eta.sinh()).with_mass(mass)
    }

    pub fn px(&self) -> f64 {
        self.x
    }
    pub fn py(&self) -> f64 {
        self.y
    }
    pub fn pz(&self) -> f64 {
        self.z
    }
    pub fn e(&self) -> f64 {
        self.t
    }
    pub fn vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Transverse momentum, $`\sqrt{p_x^2 + p_y^2}`$.
    pub fn pt(&self) -> f64 {
        self.x.hypot(self.y)
    }
    pub fn phi(&self) -> f64 {
        self.vec3().phi()
    }
    pub fn eta(&self) -> f64 {
        let p = self.vec3().mag();
        0.5 * ((p + self.z) / (p - self.z)).ln()
    }
    pub fn mag2(&self) -> f64 {
        self.t * self.t - self.vec3().mag2()
    }

    /// Invariant mass. Space-like vectors (negative `mag2`) return `-sqrt(-mag2)`.
    pub fn m(&self) -> f64 {
        let m2 = self.mag2();
        if m2 < 0.0 {
            -(-m2).sqrt()
        } else {
            m2.sqrt()
        }
    }

    pub fn to_p4_string(&self) -> String {
        format!(
            "[e = {:.5}; p = ({:.5}, {:.5}, {:.5}); m = {:.5}]",
            self.e(),
            self.px(),
            self.py(),
            self.pz(),
            self.m()
        )
    }

    fn add(&self, other: &Self) -> Self {
        Self::new(
            self.x + other.x,
            self.y + other.y,
            self.z + other.z,
            self.t + other.t,
        )
    }
}

impl Display for Vec4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_p4_string())
    }
}

impl_op_ex!(+ |a: &Vec4, b: &Vec4| -> Vec4 { a.add(b) });

impl Sum for Vec4 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Vec4::default(), |acc, p4| acc + p4)
    }
}

impl<'a> Sum<&'a Vec4> for Vec4 {
    fn sum<I: Iterator<Item = &'a Vec4>>(iter: I) -> Self {
        iter.fold(Vec4::default(), |acc, p4| acc + p4)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_vec_sums() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        let c = a + b;
        assert_eq!(c.x, 5.0);
        assert_eq!(c.y, 7.0);
        assert_eq!(c.z, 9.0);
        let total: Vec4 = [a.with_energy(10.0), b.with_energy(20.0)].iter().sum();
        assert_eq!(total, Vec4::new(5.0, 7.0, 9.0, 30.0));
    }

    #[test]
    fn test_three_to_four_momentum_conversion() {
        let target = Vec4::new(1.0, 2.0, 3.0, 10.0);
        let p3 = Vec3::new(1.0, 2.0, 3.0);
        let from_mass = p3.with_mass(target.m());
        assert_relative_eq!(from_mass.e(), target.e(), epsilon = 1e-12);
        assert_eq!(p3.with_energy(10.0), target);
    }

    #[test]
    fn test_four_momentum_basics() {
        let p = Vec4::new(3.0, 4.0, 5.0, 10.0);
        assert_eq!(p.pt(), 5.0);
        assert_relative_eq!(p.m(), 50.0_f64.sqrt());
        assert_relative_eq!(p.mag2(), 50.0);
        assert_relative_eq!(p.phi(), 4.0_f64.atan2(3.0));
    }

    #[test]
    fn test_spacelike_mass_is_negative() {
        let p = Vec4::new(3.0, 4.0, 0.0, 4.0);
        assert_relative_eq!(p.m(), -3.0);
    }

    #[test]
    fn test_collider_coordinates() {
        let p = Vec4::from_pt_eta_phi_mass(40.0, 0.7, -1.2, 10.0);
        assert_relative_eq!(p.pt(), 40.0, epsilon = 1e-12);
        assert_relative_eq!(p.eta(), 0.7, epsilon = 1e-12);
        assert_relative_eq!(p.phi(), -1.2, epsilon = 1e-12);
        assert_relative_eq!(p.m(), 10.0, epsilon = 1e-9);
    }
}
