//! Minimal three-vector algebra for particle tracks.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Cartesian three-vector in cm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Vector3 {
    /// x component.
    pub x: f64,
    /// y component.
    pub y: f64,
    /// z component.
    pub z: f64,
}

impl Vector3 {
    /// Constructs a vector from its components.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Scalar product.
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.z.mul_add(other.z, self.x.mul_add(other.x, self.y * other.y))
    }

    /// Euclidean norm.
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Returns the vector scaled to unit length. The zero vector is returned
    /// unchanged.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let n = self.norm();
        if n > 0.0 {
            Self::new(self.x / n, self.y / n, self.z / n)
        } else {
            *self
        }
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Unit direction stored through the four trigonometric factors of its polar
/// decomposition, so that track advancement never re-derives them.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Direction {
    sin_theta: f64,
    cos_theta: f64,
    sin_phi: f64,
    cos_phi: f64,
}

impl Direction {
    /// Builds a direction from polar and azimuthal angles in radians.
    #[must_use]
    pub fn from_angles(theta: f64, phi: f64) -> Self {
        Self {
            sin_theta: theta.sin(),
            cos_theta: theta.cos(),
            sin_phi: phi.sin(),
            cos_phi: phi.cos(),
        }
    }

    /// Builds a direction from an arbitrary non-zero vector.
    #[must_use]
    pub fn from_vector(v: &Vector3) -> Self {
        let u = v.normalized();
        let sin_theta = u.x.hypot(u.y);
        let (sin_phi, cos_phi) = if sin_theta > 0.0 {
            (u.y / sin_theta, u.x / sin_theta)
        } else {
            (0.0, 1.0)
        };

        Self {
            sin_theta,
            cos_theta: u.z,
            sin_phi,
            cos_phi,
        }
    }

    /// The direction as a Cartesian unit vector.
    #[must_use]
    pub fn unit(&self) -> Vector3 {
        Vector3::new(
            self.sin_theta * self.cos_phi,
            self.sin_theta * self.sin_phi,
            self.cos_theta,
        )
    }

    /// Two unit vectors orthogonal to the direction and to each other.
    #[must_use]
    pub fn transverse_basis(&self) -> (Vector3, Vector3) {
        // e1 = d(theta)/dtheta, e2 = d x e1
        let e1 = Vector3::new(
            self.cos_theta * self.cos_phi,
            self.cos_theta * self.sin_phi,
            -self.sin_theta,
        );
        let d = self.unit();
        let e2 = Vector3::new(
            d.y.mul_add(e1.z, -(d.z * e1.y)),
            d.z.mul_add(e1.x, -(d.x * e1.z)),
            d.x.mul_add(e1.y, -(d.y * e1.x)),
        );

        (e1, e2)
    }
}

impl Default for Direction {
    /// Points along positive z.
    fn default() -> Self {
        Self {
            sin_theta: 0.0,
            cos_theta: 1.0,
            sin_phi: 0.0,
            cos_phi: 1.0,
        }
    }
}
