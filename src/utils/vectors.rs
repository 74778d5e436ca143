use std::{fmt::Display, iter::Sum};

use auto_ops::{impl_op_ex, impl_op_ex_commutative};
use serde::{Deserialize, Serialize};

/// A Cartesian three-vector, used for momenta, vertices and boosts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// The $`x`$-component
    pub x: f64,
    /// The $`y`$-component
    pub y: f64,
    /// The $`z`$-component
    pub z: f64,
}

impl Vec3 {
    /// Create a new [`Vec3`] from its components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
    /// Treat this vector as a three-momentum and build the four-momentum of a particle with the
    /// given `mass`.
    pub fn with_mass(&self, mass: f64) -> Vec4 {
        let e = f64::sqrt(mass.powi(2) + self.mag2());
        Vec4::new(self.x, self.y, self.z, e)
    }
    /// Treat this vector as a three-momentum and attach an `energy`.
    pub fn with_energy(&self, energy: f64) -> Vec4 {
        Vec4::new(self.x, self.y, self.z, energy)
    }
    /// The dot product with another [`Vec3`].
    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
    /// The cross product with another [`Vec3`].
    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }
    /// The squared magnitude.
    pub fn mag2(&self) -> f64 {
        self.dot(self)
    }
    /// The magnitude.
    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }
    /// The magnitude transverse to the $`z`$-axis.
    pub fn perp(&self) -> f64 {
        self.x.hypot(self.y)
    }
    /// The cosine of the polar angle.
    pub fn costheta(&self) -> f64 {
        let mag = self.mag();
        if mag == 0.0 {
            1.0
        } else {
            self.z / mag
        }
    }
    /// The azimuthal angle in $`(-\pi, \pi]`$.
    pub fn phi(&self) -> f64 {
        self.y.atan2(self.x)
    }
    /// The pseudorapidity. Vectors along the beam axis return $`\pm\infty`$.
    pub fn eta(&self) -> f64 {
        let pt = self.perp();
        if pt == 0.0 {
            return if self.z >= 0.0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
        }
        (self.z / pt).asinh()
    }
    /// The unit vector pointing in the same direction.
    pub fn unit(&self) -> Vec3 {
        let mag = self.mag();
        Vec3::new(self.x / mag, self.y / mag, self.z / mag)
    }
}

impl Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:6.3}, {:6.3}, {:6.3}]", self.x, self.y, self.z)
    }
}

impl_op_ex!(+ |a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z) });
impl_op_ex!(-|a: &Vec3, b: &Vec3| -> Vec3 { Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z) });
impl_op_ex!(-|a: &Vec3| -> Vec3 { Vec3::new(-a.x, -a.y, -a.z) });
impl_op_ex_commutative!(*|a: &Vec3, b: &f64| -> Vec3 { Vec3::new(a.x * b, a.y * b, a.z * b) });
impl_op_ex!(/ |a: &Vec3, b: &f64| -> Vec3 { Vec3::new(a.x / b, a.y / b, a.z / b) });

/// A four-momentum $`(p_x, p_y, p_z, E)`$.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    /// The $`x`$-component
    pub x: f64,
    /// The $`y`$-component
    pub y: f64,
    /// The $`z`$-component
    pub z: f64,
    /// The time (energy) component
    pub t: f64,
}

impl Vec4 {
    /// Create a new [`Vec4`] from its momentum components and energy.
    pub const fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self {
            x: px,
            y: py,
            z: pz,
            t: e,
        }
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
    /// The spatial part of the four-vector.
    pub fn vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
    /// The Minkowski square $`E^2 - |\vec{p}|^2`$.
    pub fn m2(&self) -> f64 {
        self.t.powi(2) - self.vec3().mag2()
    }
    /// The invariant mass. Slightly space-like vectors (from rounding) return zero.
    pub fn m(&self) -> f64 {
        self.m2().max(0.0).sqrt()
    }
    /// The transverse momentum.
    pub fn pt(&self) -> f64 {
        self.vec3().perp()
    }
    /// The magnitude of the three-momentum.
    pub fn p(&self) -> f64 {
        self.vec3().mag()
    }
    /// The pseudorapidity.
    pub fn eta(&self) -> f64 {
        self.vec3().eta()
    }
    /// The azimuthal angle.
    pub fn phi(&self) -> f64 {
        self.vec3().phi()
    }
    /// The rapidity $`\frac{1}{2}\ln\frac{E + p_z}{E - p_z}`$.
    pub fn rapidity(&self) -> f64 {
        0.5 * ((self.t + self.z) / (self.t - self.z)).ln()
    }
    /// The velocity of this four-momentum as a [`Vec3`].
    pub fn beta(&self) -> Vec3 {
        self.vec3() / self.t
    }
    /// Lorentz-boost this four-momentum by the velocity `beta`.
    pub fn boost(&self, beta: &Vec3) -> Vec4 {
        let b2 = beta.mag2();
        if b2 == 0.0 {
            return *self;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let p3 = self.vec3();
        let bp = beta.dot(&p3);
        let factor = ((gamma - 1.0) * bp / b2) + gamma * self.t;
        let p3_boosted = p3 + beta * factor;
        Vec4::new(
            p3_boosted.x,
            p3_boosted.y,
            p3_boosted.z,
            gamma * (self.t + bp),
        )
    }
    pub fn to_p4_string(&self) -> String {
        format!(
            "[e = {:.5}; p = ({:.5}, {:.5}, {:.5}); m = {:.5}]",
            self.t,
            self.x,
            self.y,
            self.z,
            self.m()
        )
    }
}

impl Display for Vec4 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_p4_string())
    }
}

impl_op_ex!(+ |a: &Vec4, b: &Vec4| -> Vec4 { Vec4::new(a.x + b.x, a.y + b.y, a.z + b.z, a.t + b.t) });
impl_op_ex!(-|a: &Vec4, b: &Vec4| -> Vec4 { Vec4::new(a.x - b.x, a.y - b.y, a.z - b.z, a.t - b.t) });
impl_op_ex!(-|a: &Vec4| -> Vec4 { Vec4::new(-a.x, -a.y, -a.z, a.t) });

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
