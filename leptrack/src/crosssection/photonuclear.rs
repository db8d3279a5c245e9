//! Photonuclear interaction of the lepton with target nuclei.

use super::{CrossSection, Kernel, Limits, Process, Spectrum};
use crate::constants::{ALPHA, MPI};
use crate::cuts::EnergyCutSettings;
use crate::medium::Medium;
use crate::particle::ParticleDef;
use std::f64::consts::PI;

/// Real-photon absorption cross section in cm^2 for a photon energy in MeV,
/// after Caldwell's fit.
fn photon_nucleon_cross_section(photon_energy: f64) -> f64 {
    let log_term = (0.0213 * photon_energy / 1e3).ln();

    1.647_f64.mul_add(log_term * log_term, 114.3) * 1e-30
}

/// Inelastic scattering off nuclei via virtual photons.
#[derive(Clone, Debug)]
pub struct Photonuclear {
    pub(crate) kernel: Kernel,
    hard_component: bool,
}

impl Photonuclear {
    /// Creates the process; `hard_component` adds the large-`v` enhancement
    /// of the interaction.
    #[must_use]
    pub fn new(
        particle: ParticleDef,
        medium: Medium,
        cuts: EnergyCutSettings,
        multiplier: f64,
        hard_component: bool,
    ) -> Self {
        Self {
            kernel: Kernel::new(particle, medium, cuts, multiplier),
            hard_component,
        }
    }
}

impl Spectrum for Photonuclear {
    fn components(&self) -> usize {
        self.kernel.medium.components.len()
    }

    fn limits(&self, energy: f64, index: usize) -> Limits {
        let component = &self.kernel.medium.components[index];
        let nucleon = component.nucleon_weight;
        let mass = self.kernel.particle.mass;

        // single-pion production threshold
        let v_min = ((MPI + MPI * MPI / (2.0 * nucleon)) / energy).min(1.0);
        let v_max = if mass < MPI {
            let ratio = mass / nucleon;
            1.0 - nucleon * ratio.mul_add(ratio, 1.0) / (2.0 * energy)
        } else {
            1.0
        };
        let v_max = v_max.min(1.0 - mass / energy).max(0.0);

        Limits::with_cut(v_min, v_max, &self.kernel.cuts, energy)
    }

    fn differential_rate(&self, energy: f64, index: usize, v: f64) -> f64 {
        if v <= 0.0 {
            return 0.0;
        }
        let component = &self.kernel.medium.components[index];
        let photon_energy = v * energy;
        // shadowing reduces the effective nucleon number
        let effective_nucleons = component.atomic_weight.powf(0.91);
        let flux = (1.0 + photon_energy / 200.0).ln();
        let shape = 0.25_f64.mul_add(v * v, 1.0 - v);
        let hard = if self.hard_component { 0.2_f64.mul_add(v, 1.0) } else { 1.0 };

        self.kernel.medium.atom_density(index)
            * effective_nucleons
            * (ALPHA / PI)
            * photon_nucleon_cross_section(photon_energy)
            * flux
            * shape.max(0.0)
            * hard
            / v
    }
}

impl CrossSection for Photonuclear {
    fn process(&self) -> Process {
        Process::Photonuclear
    }

    fn name(&self) -> &'static str {
        "photonuclear"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleKind;

    fn process() -> Photonuclear {
        Photonuclear::new(
            ParticleDef::new(ParticleKind::Muon),
            Medium::from_name("ice", 1.0).unwrap(),
            EnergyCutSettings::new(-1.0, -1.0),
            1.0,
            false,
        )
    }

    #[test]
    fn subdominant_to_pair_production() {
        let photo = process();
        let energy = 1e6;
        let b = photo.dedx(energy) / energy;

        assert!(b > 5e-8, "b = {b}");
        assert!(b < 2e-6, "b = {b}");
    }

    #[test]
    fn no_interaction_below_pion_threshold() {
        let photo = process();
        // at 200 MeV total energy the pion threshold cannot be reached
        assert_eq!(photo.dndx(200.0), 0.0);
    }

    #[test]
    fn hard_component_increases_the_rate() {
        let soft = process();
        let hard = Photonuclear::new(
            ParticleDef::new(ParticleKind::Muon),
            Medium::from_name("ice", 1.0).unwrap(),
            EnergyCutSettings::new(-1.0, -1.0),
            1.0,
            true,
        );

        assert!(hard.dedx(1e6) > soft.dedx(1e6));
    }
}
