//! Direct electron pair production in the nuclear field.

use super::{CrossSection, Kernel, Limits, Process, Spectrum};
use crate::constants::{ALPHA, ME, RE};
use crate::cuts::EnergyCutSettings;
use crate::medium::Medium;
use crate::particle::ParticleDef;
use std::f64::consts::PI;

/// Effective radiation logarithm of the screened pair spectrum.
const PAIR_LOG: f64 = 29.0;

/// `e+ e-` pair production; the dominant soft-loss channel above a TeV.
#[derive(Clone, Debug)]
pub struct EpairProduction {
    pub(crate) kernel: Kernel,
}

impl EpairProduction {
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

    fn sigma0(&self, index: usize) -> f64 {
        let z = self.kernel.medium.components[index].nuclear_charge;
        let scale = ALPHA * RE * ME / self.kernel.particle.mass;

        28.0 / (9.0 * PI) * scale * scale * PAIR_LOG * PAIR_LOG * z * (z + 1.0)
    }
}

impl Spectrum for EpairProduction {
    fn components(&self) -> usize {
        self.kernel.medium.components.len()
    }

    fn limits(&self, energy: f64, index: usize) -> Limits {
        let component = &self.kernel.medium.components[index];
        let mass = self.kernel.particle.mass;
        let v_min = (4.0 * ME / energy).min(1.0);
        let v_max = 1.0
            - 0.75 * std::f64::consts::E.sqrt() * component.nuclear_charge.powf(1.0 / 3.0) * mass
                / energy;
        let v_max = v_max.clamp(0.0, 1.0 - mass / energy);

        Limits::with_cut(v_min, v_max, &self.kernel.cuts, energy)
    }

    fn differential_rate(&self, _energy: f64, index: usize, v: f64) -> f64 {
        if v <= 0.0 {
            return 0.0;
        }
        let survival = (1.0 - v).max(0.0);

        self.kernel.medium.atom_density(index) * self.sigma0(index) * survival.powi(3) / (v * v)
    }
}

impl CrossSection for EpairProduction {
    fn process(&self) -> Process {
        Process::EpairProduction
    }

    fn name(&self) -> &'static str {
        "epair"
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

    fn process(cuts: EnergyCutSettings) -> EpairProduction {
        EpairProduction::new(
            ParticleDef::new(ParticleKind::Muon),
            Medium::from_name("ice", 1.0).unwrap(),
            cuts,
            1.0,
        )
    }

    #[test]
    fn pair_losses_are_dominated_by_soft_events() {
        let epair = process(EnergyCutSettings::new(500.0, -1.0));
        let energy = 1e6;

        // the sampled spectrum falls steeply: low quantiles sit close to the
        // cut, high quantiles well below the kinematic endpoint
        let soft = epair.stochastic_loss(energy, 0.1, 0.5);
        let hard = epair.stochastic_loss(energy, 0.999, 0.5);
        assert!(soft < 1e3, "soft = {soft}");
        assert!(hard > soft);
        assert!(hard < 0.9 * energy);
    }

    #[test]
    fn effective_b_value_is_reasonable() {
        let full = process(EnergyCutSettings::new(-1.0, -1.0));
        let energy = 1e6;
        let b = full.dedx(energy) / energy;

        assert!(b > 5e-7, "b = {b}");
        assert!(b < 6e-6, "b = {b}");
    }

    #[test]
    fn tau_radiates_far_less_than_muon() {
        let muon = process(EnergyCutSettings::new(-1.0, -1.0));
        let tau = EpairProduction::new(
            ParticleDef::new(ParticleKind::Tau),
            Medium::from_name("ice", 1.0).unwrap(),
            EnergyCutSettings::new(-1.0, -1.0),
            1.0,
        );

        assert!(tau.dedx(1e7) < 0.1 * muon.dedx(1e7));
    }
}
