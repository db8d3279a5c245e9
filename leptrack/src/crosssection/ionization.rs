//! Ionisation: restricted Bethe-Bloch mean loss and delta-ray production.

use super::{CrossSection, Kernel, Limits, Process, Spectrum};
use crate::constants::{IONK, ME};
use crate::cuts::EnergyCutSettings;
use crate::medium::Medium;
use crate::particle::ParticleDef;

/// Ionisation treats the medium as a whole rather than per nucleus, so it
/// carries a single sampling channel.
#[derive(Clone, Debug)]
pub struct Ionization {
    pub(crate) kernel: Kernel,
}

impl Ionization {
    /// Creates the process for the given particle/medium/cut triple.
    #[must_use]
    pub fn new(
        particle: ParticleDef,
        medium: Medium,
        cuts: EnergyCutSettings,
        multiplier: f64,
    ) -> Self {
        Self {
            kernel: Kernel::new(particle, medium, cuts, multiplier),
        }
    }

    fn beta_gamma(&self, energy: f64) -> (f64, f64) {
        let mass = self.kernel.particle.mass;
        let gamma = energy / mass;
        let beta2 = 1.0 - 1.0 / (gamma * gamma);

        (beta2.max(1e-12), gamma)
    }

    /// Largest relative transfer to an atomic electron.
    fn v_max(&self, energy: f64) -> f64 {
        let mass = self.kernel.particle.mass;
        let gamma = energy / mass;
        let mass_ratio = ME / mass;
        let t_max = 2.0 * ME * (gamma * gamma - 1.0)
            / (2.0 * gamma).mul_add(mass_ratio, mass_ratio.mul_add(mass_ratio, 1.0));

        (t_max / energy).min(1.0 - mass / energy).max(0.0)
    }

    /// Sternheimer density-effect correction in its asymptotic form.
    fn density_effect(&self, beta2: f64, gamma: f64) -> f64 {
        let medium = &self.kernel.medium;
        let plasma_energy =
            28.816e-6 * (medium.mass_density * medium.density_correction * medium.z_over_a()).sqrt();
        let x = (beta2.sqrt() * gamma * plasma_energy / medium.ionization_potential).ln();

        (2.0 * x - 1.0).max(0.0)
    }
}

impl Spectrum for Ionization {
    fn components(&self) -> usize {
        1
    }

    fn limits(&self, energy: f64, _: usize) -> Limits {
        let v_min = (self.kernel.medium.ionization_potential / energy).min(1.0);
        Limits::with_cut(v_min, self.v_max(energy), &self.kernel.cuts, energy)
    }

    fn differential_rate(&self, energy: f64, _: usize, v: f64) -> f64 {
        let (beta2, _) = self.beta_gamma(energy);
        let v_max = self.v_max(energy);
        if v_max <= 0.0 {
            return 0.0;
        }
        let medium = &self.kernel.medium;
        let prefactor = 0.5 * IONK * medium.z_over_a() * medium.mass_density / beta2;
        // spin-1/2 delta-ray spectrum in the relative transfer v
        let shape = 0.5_f64.mul_add(v * v, (-beta2 * v / v_max) + 1.0);

        prefactor * shape.max(0.0) / (energy * v * v)
    }

    fn continuous_loss(&self, _kernel: &Kernel, energy: f64) -> f64 {
        self.closed_form_dedx(energy)
    }
}

impl CrossSection for Ionization {
    fn process(&self) -> Process {
        Process::Ionization
    }

    fn name(&self) -> &'static str {
        "ionization"
    }

    /// Restricted Bethe-Bloch formula up to the effective cut.
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

impl Ionization {
    pub(crate) fn closed_form_dedx(&self, energy: f64) -> f64 {
        let (beta2, gamma) = self.beta_gamma(energy);
        let limits = self.limits(energy, 0);
        let v_max = limits.v_max;
        if v_max <= 0.0 || limits.v_up <= 0.0 {
            return 0.0;
        }

        let medium = &self.kernel.medium;
        let potential = medium.ionization_potential;
        let t_up = limits.v_up * energy;

        let argument = 2.0 * ME * beta2 * gamma * gamma * t_up / (potential * potential);
        if argument <= 1.0 {
            return 0.0;
        }

        let bracket = 0.5 * argument.ln()
            - 0.5 * beta2 * (1.0 + t_up / (v_max * energy))
            - 0.5 * self.density_effect(beta2, gamma);

        (IONK * medium.z_over_a() * medium.mass_density / beta2 * bracket.max(0.0))
            * self.kernel.multiplier
    }
}
