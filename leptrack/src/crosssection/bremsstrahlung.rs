//! Bremsstrahlung in the complete-screening approximation.

use super::{CrossSection, Kernel, Limits, Process, Spectrum};
use crate::constants::{ALPHA, ME, RE};
use crate::cuts::EnergyCutSettings;
use crate::medium::Medium;
use crate::particle::ParticleDef;

/// Onset scale of the Landau-Pomeranchuk-Migdal suppression per radiation
/// length, in MeV/cm.
const LPM_SCALE: f64 = 7.7e6;

/// Photon radiation off the nuclear Coulomb field, per medium component.
#[derive(Clone, Debug)]
pub struct Bremsstrahlung {
    pub(crate) kernel: Kernel,
    lpm: bool,
}

impl Bremsstrahlung {
    /// Creates the process; `lpm` enables the high-energy suppression of
    /// soft photons.
    #[must_use]
    pub fn new(
        particle: ParticleDef,
        medium: Medium,
        cuts: EnergyCutSettings,
        multiplier: f64,
        lpm: bool,
    ) -> Self {
        Self {
            kernel: Kernel::new(particle, medium, cuts, multiplier),
            lpm,
        }
    }

    /// `4 alpha r_e^2 (m_e/m)^2 Z(Z+1) L` with the muonic radiation
    /// logarithm `L = ln(183 Z^(-1/3) m / m_e)`.
    fn sigma0(&self, index: usize) -> f64 {
        let component = &self.kernel.medium.components[index];
        let z = component.nuclear_charge;
        let mass_ratio = ME / self.kernel.particle.mass;
        let radiation_log = (183.0 * z.powf(-1.0 / 3.0) / mass_ratio).ln();

        4.0 * ALPHA * RE * RE * mass_ratio * mass_ratio * z * (z + 1.0) * radiation_log
    }
}

impl Spectrum for Bremsstrahlung {
    fn components(&self) -> usize {
        self.kernel.medium.components.len()
    }

    fn limits(&self, energy: f64, index: usize) -> Limits {
        let component = &self.kernel.medium.components[index];
        let mass = self.kernel.particle.mass;
        // kinematic endpoint including the nuclear recoil estimate
        let v_max = 1.0
            - 0.75 * std::f64::consts::E.sqrt() * component.nuclear_charge.powf(1.0 / 3.0) * mass
                / energy;
        let v_max = v_max.clamp(0.0, 1.0 - mass / energy);

        Limits::with_cut(0.0, v_max, &self.kernel.cuts, energy)
    }

    fn differential_rate(&self, energy: f64, index: usize, v: f64) -> f64 {
        if v <= 0.0 {
            return 0.0;
        }
        let shape = v.mul_add(v, 4.0 / 3.0 * (1.0 - v));
        let mut rate = self.kernel.medium.atom_density(index) * self.sigma0(index) * shape / v;

        if self.lpm {
            let e_lpm = LPM_SCALE * self.kernel.medium.radiation_length_cm();
            rate *= (v * e_lpm / energy).sqrt().min(1.0);
        }

        rate
    }
}

impl CrossSection for Bremsstrahlung {
    fn process(&self) -> Process {
        Process::Bremsstrahlung
    }

    fn name(&self) -> &'static str {
        "bremsstrahlung"
    }

    fn dedx(&self, energy: f64) -> f64 {
        self.kernel.dedx_integral(self, energy)
    }

    fn dndx(&self, energy: f64) -> f64 {
        self.kernel.dndx_integral(self, energy)
    }

    fn dndx_rnd(&self, energy: f64, _rnd: f64) -> f64 {
        self.kernel.dndx_integral(self, energy)
    }

    fn de2dx(&self, energy: f64) -> f64 {
        self.kernel.de2dx_integral(self, energy)
    }

    fn stochastic_loss(&self, energy: f64, rnd1: f64, rnd2: f64) -> f64 {
        self.kernel.stochastic_loss(self, energy, rnd1, rnd2)
    }
}
