//! First-order multiple scattering.
//!
//! Highland's parameterisation of the Moliere theory: one Gaussian polar
//! width per step, with the correlated angle/offset pair drawn per
//! transverse plane. Direction updates preserve unit norm; lateral offsets
//! stay bounded by `theta_0 * dr`.

use crate::medium::Medium;
use crate::particle::ParticleDef;
use crate::vector::{Direction, Vector3};

/// Highland momentum scale in MeV.
const HIGHLAND_CONST: f64 = 13.6;

/// Moliere-style deflection of the track over one continuous step.
#[derive(Clone, Debug)]
pub struct Scattering {
    particle: ParticleDef,
    radiation_length: f64,
}

impl Scattering {
    /// Creates the scatterer for a particle in a medium; the medium's
    /// density correction is folded into the radiation length.
    #[must_use]
    pub fn new(particle: ParticleDef, medium: &Medium) -> Self {
        Self {
            particle,
            radiation_length: medium.radiation_length_cm(),
        }
    }

    /// Gaussian width of the polar scattering angle over `dr` cm.
    #[must_use]
    pub fn theta0(&self, dr: f64, energy: f64) -> f64 {
        if dr <= 0.0 {
            return 0.0;
        }
        let momentum = self.particle.momentum(energy);
        if momentum <= 0.0 {
            return 0.0;
        }
        let beta = momentum / energy;
        let thickness = dr / self.radiation_length;

        HIGHLAND_CONST / (beta * momentum)
            * self.particle.charge.abs()
            * thickness.sqrt()
            * 0.038_f64.mul_add(thickness.ln(), 1.0).max(0.0)
    }

    /// Applies the deflection of one step of length `dr` from `e_initial`
    /// to `e_final`, consuming four uniform deviates. Returns the updated
    /// position and direction.
    #[must_use]
    pub fn scatter(
        &self,
        dr: f64,
        e_initial: f64,
        _e_final: f64,
        position: Vector3,
        direction: Direction,
        rnd: (f64, f64, f64, f64),
    ) -> (Vector3, Direction) {
        let theta0 = self.theta0(dr, e_initial);
        if theta0 <= 0.0 {
            return (position, direction);
        }

        let (z1, z2) = box_muller(rnd.0, rnd.1);
        let (z3, z4) = box_muller(rnd.2, rnd.3);

        // correlated offset/angle pair per transverse plane
        let offset_x = dr * theta0 * (z1 / 12.0_f64.sqrt() + 0.5 * z2);
        let angle_x = theta0 * z2;
        let offset_y = dr * theta0 * (z3 / 12.0_f64.sqrt() + 0.5 * z4);
        let angle_y = theta0 * z4;

        let (e1, e2) = direction.transverse_basis();
        let moved = position + e1 * offset_x + e2 * offset_y;
        let tilted = direction.unit() + e1 * angle_x + e2 * angle_y;

        (moved, Direction::from_vector(&tilted))
    }
}

fn box_muller(u1: f64, u2: f64) -> (f64, f64) {
    let radius = (-2.0 * u1.max(f64::MIN_POSITIVE).ln()).sqrt();
    let angle = 2.0 * std::f64::consts::PI * u2;

    (radius * angle.cos(), radius * angle.sin())
}
