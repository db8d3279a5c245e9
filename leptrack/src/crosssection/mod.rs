//! Energy-loss processes.
//!
//! Every process exposes the same five-function surface: the mean continuous
//! loss `dE/dx`, the total interaction rate `dN/dx` (plus its channel-biased
//! variant), the second loss moment `dE^2/dx`, and a sampler for the
//! stochastic loss of one interaction. A process is described internally by
//! its differential spectrum in the relative loss `v` together with
//! per-component kinematic limits; the shared routines in this module turn
//! the spectrum into the five functions, either by direct integration or
//! through precomputed tables.

mod bremsstrahlung;
mod epair;
mod ionization;
mod photonuclear;

pub use bremsstrahlung::Bremsstrahlung;
pub use epair::EpairProduction;
pub use ionization::Ionization;
pub use photonuclear::Photonuclear;

use crate::constants::{BIG_ENERGY, ENERGY_NODES, INTERPOLATION_ORDER, LOSS_NODES};
use crate::cuts::EnergyCutSettings;
use crate::integral::Integral;
use crate::interpolant::{Axis, Interpolant1D, Interpolant2D};
use crate::medium::Medium;
use crate::particle::ParticleDef;
use arrayvec::ArrayVec;
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

/// Largest supported number of medium components.
pub const MAX_COMPONENTS: usize = 8;

/// Per-component interaction rates in 1/cm, without the process multiplier.
pub type ComponentRates = ArrayVec<f64, MAX_COMPONENTS>;

/// Stable process tags.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum Process {
    /// Ionisation / delta-ray production.
    Ionization = 1,
    /// Bremsstrahlung.
    Bremsstrahlung = 2,
    /// Photonuclear interaction.
    Photonuclear = 3,
    /// Electron pair production.
    EpairProduction = 4,
}

/// Kinematic window of the relative loss at one energy and component.
///
/// `v_up` splits the window into the continuous part `[v_min, v_up]` and the
/// stochastic part `[v_up, v_max]`. A window inverted by the cuts collapses
/// to zero width at `v_min`, which yields a vanishing rate rather than an
/// error.
#[derive(Clone, Copy, Debug)]
pub struct Limits {
    /// Smallest kinematically allowed relative loss.
    pub v_min: f64,
    /// Effective cut between continuous and stochastic treatment.
    pub v_up: f64,
    /// Largest kinematically allowed relative loss.
    pub v_max: f64,
}

impl Limits {
    /// Applies the cut settings to the kinematic window `[v_min, v_max]`.
    #[must_use]
    pub fn with_cut(v_min: f64, v_max: f64, cuts: &EnergyCutSettings, energy: f64) -> Self {
        let v_max = v_max.max(v_min);
        let v_up = v_max.min(cuts.cut(energy)).max(v_min);

        Self { v_min, v_up, v_max }
    }
}

/// The five-function surface every energy-loss process implements.
#[enum_dispatch]
pub trait CrossSection {
    /// Process tag.
    fn process(&self) -> Process;

    /// Process name, used for option dispatch only.
    fn name(&self) -> &'static str;

    /// Mean continuous energy loss in MeV/cm at total energy `energy`.
    fn dedx(&self, energy: f64) -> f64;

    /// Total interaction rate in 1/cm.
    fn dndx(&self, energy: f64) -> f64;

    /// Channel-biased interaction rate; `rnd` seeds the inversion carried
    /// out when the drawn channel is sampled, the returned total is the same
    /// as [`Self::dndx`].
    fn dndx_rnd(&self, energy: f64, rnd: f64) -> f64;

    /// Second moment of the continuous loss in MeV^2/cm.
    fn de2dx(&self, energy: f64) -> f64;

    /// Samples the energy loss of one interaction; `rnd1` fixes the loss
    /// inside the struck component, `rnd2` picks the component.
    fn stochastic_loss(&self, energy: f64, rnd1: f64, rnd2: f64) -> f64;
}

/// Sum of the shipped processes.
#[enum_dispatch(CrossSection)]
#[derive(Clone, Debug)]
pub enum CrossSectionEnum {
    /// Ionisation.
    Ionization,
    /// Bremsstrahlung.
    Bremsstrahlung,
    /// Photonuclear interaction.
    Photonuclear,
    /// Electron pair production.
    EpairProduction,
}

impl CrossSectionEnum {
    /// Builds the per-component rate tables used to answer the sampling
    /// functions in O(1); a no-op when tables exist already.
    pub fn enable_tables(&mut self) {
        // the spectrum snapshot sidesteps borrowing the process both ways
        match self {
            Self::Ionization(x) => {
                let probe = x.clone();
                x.kernel.build_tables(&probe);
            }
            Self::Bremsstrahlung(x) => {
                let probe = x.clone();
                x.kernel.build_tables(&probe);
            }
            Self::Photonuclear(x) => {
                let probe = x.clone();
                x.kernel.build_tables(&probe);
            }
            Self::EpairProduction(x) => {
                let probe = x.clone();
                x.kernel.build_tables(&probe);
            }
        }
    }

    /// Hands over previously cached tables.
    pub fn adopt_tables(&mut self, tables: RateTables) {
        match self {
            Self::Ionization(x) => x.kernel.tables = Some(tables),
            Self::Bremsstrahlung(x) => x.kernel.tables = Some(tables),
            Self::Photonuclear(x) => x.kernel.tables = Some(tables),
            Self::EpairProduction(x) => x.kernel.tables = Some(tables),
        }
    }

    /// The cached tables, if any.
    #[must_use]
    pub fn tables(&self) -> Option<&RateTables> {
        match self {
            Self::Ionization(x) => x.kernel.tables.as_ref(),
            Self::Bremsstrahlung(x) => x.kernel.tables.as_ref(),
            Self::Photonuclear(x) => x.kernel.tables.as_ref(),
            Self::EpairProduction(x) => x.kernel.tables.as_ref(),
        }
    }
}

/// Spectrum description a process provides to the shared kernel.
pub(crate) trait Spectrum {
    /// Number of medium components the process distinguishes.
    fn components(&self) -> usize;

    /// Kinematic window at `energy` for component `index`.
    fn limits(&self, energy: f64, index: usize) -> Limits;

    /// Differential rate `d^2N / (dx dv)` in 1/cm for component `index`,
    /// without the process multiplier.
    fn differential_rate(&self, energy: f64, index: usize, v: f64) -> f64;

    /// Live evaluation of the continuous loss, `mult * E * int v f(v) dv` by
    /// default; ionisation replaces it with the restricted Bethe-Bloch
    /// closed form.
    fn continuous_loss(&self, kernel: &Kernel, energy: f64) -> f64
    where
        Self: Sized,
    {
        kernel.spectrum_dedx(self, energy)
    }
}

/// Precomputed tables of one process: continuous moments over energy and,
/// per component, the rate and the cumulative stochastic weight.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RateTables {
    dedx: Interpolant1D,
    de2dx: Interpolant1D,
    rates: Vec<Interpolant1D>,
    cumulative: Vec<Interpolant2D>,
}

/// Shared state and machinery of every process: the particle/medium/cut
/// triple, the multiplier, the integration workspace and optional tables.
#[derive(Clone, Debug)]
pub(crate) struct Kernel {
    pub particle: ParticleDef,
    pub medium: Medium,
    pub cuts: EnergyCutSettings,
    pub multiplier: f64,
    pub integral: Integral,
    pub tables: Option<RateTables>,
}

impl Kernel {
    pub fn new(
        particle: ParticleDef,
        medium: Medium,
        cuts: EnergyCutSettings,
        multiplier: f64,
    ) -> Self {
        Self {
            particle,
            medium,
            cuts,
            multiplier,
            integral: Integral::default(),
            tables: None,
        }
    }

    /// Continuous loss: the cached table when available, the process's live
    /// evaluation otherwise.
    pub fn dedx_integral(&self, spectrum: &impl Spectrum, energy: f64) -> f64 {
        if self.multiplier <= 0.0 {
            return 0.0;
        }
        if let Some(tables) = &self.tables {
            return tables.dedx.interpolate(energy).max(0.0);
        }

        spectrum.continuous_loss(self, energy)
    }

    /// `mult * E * int v f(v) dv` over the continuous window.
    pub fn spectrum_dedx(&self, spectrum: &impl Spectrum, energy: f64) -> f64 {
        let sum: f64 = (0..spectrum.components())
            .map(|i| {
                let limits = spectrum.limits(energy, i);
                let weighted = |v: f64| v * spectrum.differential_rate(energy, i, v);
                // spectra spanning decades in v integrate best in ln v
                if limits.v_min > 0.0 {
                    self.integral.integrate_with_log(limits.v_min, limits.v_up, weighted)
                } else {
                    self.integral.integrate(limits.v_min, limits.v_up, weighted)
                }
            })
            .filter(|rate| rate.is_finite())
            .sum();

        self.multiplier * energy * sum
    }

    /// `mult * E^2 * int v^2 f(v) dv` over the continuous window.
    pub fn de2dx_integral(&self, spectrum: &impl Spectrum, energy: f64) -> f64 {
        if self.multiplier <= 0.0 {
            return 0.0;
        }
        if let Some(tables) = &self.tables {
            return tables.de2dx.interpolate(energy).max(0.0);
        }

        let sum: f64 = (0..spectrum.components())
            .map(|i| {
                let limits = spectrum.limits(energy, i);
                let weighted = |v: f64| v * v * spectrum.differential_rate(energy, i, v);
                if limits.v_min > 0.0 {
                    self.integral.integrate_with_log(limits.v_min, limits.v_up, weighted)
                } else {
                    self.integral.integrate(limits.v_min, limits.v_up, weighted)
                }
            })
            .filter(|rate| rate.is_finite())
            .sum();

        self.multiplier * energy * energy * sum
    }

    /// Raw per-component rates over the stochastic window.
    pub fn component_rates(&self, spectrum: &impl Spectrum, energy: f64) -> ComponentRates {
        if let Some(tables) = &self.tables {
            return tables
                .rates
                .iter()
                .map(|table| table.interpolate(energy).max(0.0))
                .collect();
        }

        (0..spectrum.components())
            .map(|i| {
                let limits = spectrum.limits(energy, i);
                if limits.v_up >= limits.v_max {
                    return 0.0;
                }
                let rate = self.integral.integrate_with_log(limits.v_up, limits.v_max, |v| {
                    spectrum.differential_rate(energy, i, v)
                });
                if rate.is_finite() {
                    rate.max(0.0)
                } else {
                    0.0
                }
            })
            .collect()
    }

    pub fn dndx_integral(&self, spectrum: &impl Spectrum, energy: f64) -> f64 {
        if self.multiplier <= 0.0 {
            return 0.0;
        }

        self.multiplier * self.component_rates(spectrum, energy).iter().sum::<f64>()
    }

    /// Samples one stochastic loss. `rnd1` is inverted against the struck
    /// component's cumulative rate, `rnd2` picks the component.
    pub fn stochastic_loss(
        &self,
        spectrum: &impl Spectrum,
        energy: f64,
        rnd1: f64,
        rnd2: f64,
    ) -> f64 {
        if self.multiplier <= 0.0 {
            return 0.0;
        }

        let rates = self.component_rates(spectrum, energy);
        let threshold = rnd2 * rates.iter().sum::<f64>();

        let mut running = 0.0;
        for (i, &rate) in rates.iter().enumerate() {
            running += rate;
            if running > threshold && rate > 0.0 {
                let limits = spectrum.limits(energy, i);
                if limits.v_up >= limits.v_max {
                    return energy * limits.v_up;
                }

                if let Some(tables) = &self.tables {
                    let t = tables.cumulative[i].find_limit(energy, rnd1 * rate);
                    let v = limits.v_up * (limits.v_max / limits.v_up).powf(t);
                    return energy * v;
                }

                let inverted = self.integral.integrate_with_log_random_ratio(
                    limits.v_up,
                    limits.v_max,
                    |v| spectrum.differential_rate(energy, i, v),
                    rnd1 * rate,
                );
                return energy * inverted.upper_limit;
            }
        }

        // a window inverted by the cuts on every component means there is
        // nothing to sample
        if (0..spectrum.components()).all(|i| {
            let limits = spectrum.limits(energy, i);
            limits.v_up >= limits.v_max
        }) {
            return 0.0;
        }

        log::warn!(
            "stochastic sampling found no component: energy {energy}, ecut {}, vcut {}",
            self.cuts.e_cut,
            self.cuts.v_cut
        );
        0.0
    }

    /// Builds the rate tables by tabulating the integral paths.
    pub fn build_tables(&mut self, spectrum: &impl Spectrum) {
        if self.tables.is_some() {
            return;
        }

        let low = (self.particle.low * 1.001).max(self.particle.mass * 1.001);
        let energy_axis = || Axis::new(low, BIG_ENERGY, ENERGY_NODES, true);

        let dedx = Interpolant1D::build(energy_axis(), INTERPOLATION_ORDER, false, |e| {
            self.dedx_integral(spectrum, e)
        });
        let de2dx = Interpolant1D::build(energy_axis(), INTERPOLATION_ORDER, false, |e| {
            self.de2dx_integral(spectrum, e)
        });

        let mut rates = Vec::with_capacity(spectrum.components());
        let mut cumulative = Vec::with_capacity(spectrum.components());
        for i in 0..spectrum.components() {
            rates.push(Interpolant1D::build(
                energy_axis(),
                INTERPOLATION_ORDER,
                false,
                |e| self.component_rates(spectrum, e)[i],
            ));
            cumulative.push(Interpolant2D::build(
                energy_axis(),
                Axis::new(0.0, 1.0, LOSS_NODES, false),
                INTERPOLATION_ORDER,
                INTERPOLATION_ORDER,
                false,
                false,
                |e, t| {
                    let limits = spectrum.limits(e, i);
                    if limits.v_up >= limits.v_max || t <= 0.0 {
                        return 0.0;
                    }
                    let v = limits.v_up * (limits.v_max / limits.v_up).powf(t);
                    let value = self.integral.integrate_with_log(limits.v_up, v, |w| {
                        spectrum.differential_rate(e, i, w)
                    });
                    if value.is_finite() {
                        value.max(0.0)
                    } else {
                        0.0
                    }
                },
            ));
        }

        self.tables = Some(RateTables {
            dedx,
            de2dx,
            rates,
            cumulative,
        });
    }
}

/// Parametrisation choices and per-process rate scalings.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ProcessSettings {
    /// Bremsstrahlung parametrisation id; `1` is the shipped
    /// complete-screening form.
    pub brems_id: i64,
    /// Photonuclear parametrisation id; `12` is the shipped soft-photon
    /// form.
    pub photo_id: i64,
    /// Rate scaling of the bremsstrahlung process.
    pub brems_multiplier: f64,
    /// Rate scaling of the photonuclear process.
    pub photo_multiplier: f64,
    /// Rate scaling of the pair-production process.
    pub epair_multiplier: f64,
    /// Rate scaling of the ionisation process.
    pub ioniz_multiplier: f64,
    /// Enables the Landau-Pomeranchuk-Migdal suppression.
    pub lpm: bool,
    /// Enables the hard component of the photonuclear interaction.
    pub hard_component: bool,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            brems_id: 1,
            photo_id: 12,
            brems_multiplier: 1.0,
            photo_multiplier: 1.0,
            epair_multiplier: 1.0,
            ioniz_multiplier: 1.0,
            lpm: false,
            hard_component: false,
        }
    }
}

/// Builds the standard process list for one particle/medium/cut triple.
///
/// An unknown parametrisation id is reported and the affected process is
/// switched off, so the caller observes it as a non-contributing component.
#[must_use]
pub fn standard_cross_sections(
    particle: &ParticleDef,
    medium: &Medium,
    cuts: &EnergyCutSettings,
    settings: &ProcessSettings,
) -> Vec<CrossSectionEnum> {
    let brems_multiplier = if settings.brems_id == 1 {
        settings.brems_multiplier
    } else {
        log::warn!(
            "unknown bremsstrahlung parametrisation {}; the process will not contribute",
            settings.brems_id
        );
        0.0
    };
    let photo_multiplier = if settings.photo_id == 12 {
        settings.photo_multiplier
    } else {
        log::warn!(
            "unknown photonuclear parametrisation {}; the process will not contribute",
            settings.photo_id
        );
        0.0
    };

    vec![
        CrossSectionEnum::from(Ionization::new(
            particle.clone(),
            medium.clone(),
            *cuts,
            settings.ioniz_multiplier,
        )),
        CrossSectionEnum::from(Bremsstrahlung::new(
            particle.clone(),
            medium.clone(),
            *cuts,
            brems_multiplier,
            settings.lpm,
        )),
        CrossSectionEnum::from(Photonuclear::new(
            particle.clone(),
            medium.clone(),
            *cuts,
            photo_multiplier,
            settings.hard_component,
        )),
        CrossSectionEnum::from(EpairProduction::new(
            particle.clone(),
            medium.clone(),
            *cuts,
            settings.epair_multiplier,
        )),
    ]
}
