//! Propagation utility: the sampling layer between the cross sections and
//! the sector loop.
//!
//! Five calculators share one integrand family anchored on the displacement
//! `ds/dE = 1 / sum(dE/dx)`. Each exists in an integral form that evaluates
//! on demand and an interpolant form that tabulates the cumulative integral
//! `F(E)` once and answers both directions in O(1). The [`Utility`] facade
//! aggregates the calculators with the cross-section list and exposes the
//! channel and energy sampling consumed by the sector.

use crate::constants::{
    BIG_ENERGY, ENERGY_NODES, INTERPOLATION_ORDER, IPREC2, IROMB, IMAXS,
    PARTICLE_POSITION_RESOLUTION, SPEED,
};
use crate::crosssection::{CrossSection, CrossSectionEnum, RateTables};
use crate::error::{Error, Result};
use crate::integral::Integral;
use crate::interpolant::{Axis, Interpolant1D};
use crate::particle::ParticleDef;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// The five integrand flavours of the utility layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CalcKind {
    /// Path length per unit energy loss.
    Displacement,
    /// Stochastic interactions per unit energy loss.
    Interaction,
    /// Decays per unit energy loss.
    Decay,
    /// Variance of the continuous loss per unit energy loss.
    ContinuousRandom,
    /// Elapsed time per unit energy loss.
    Time,
}

/// Common integrand family: `weight(E) / sum(dE/dx)`.
fn integrand(
    kind: CalcKind,
    particle: &ParticleDef,
    cross: &[CrossSectionEnum],
    energy: f64,
) -> f64 {
    let total_dedx: f64 = cross.iter().map(|c| c.dedx(energy)).sum();
    if total_dedx <= 0.0 || !total_dedx.is_finite() {
        return 0.0;
    }
    let ds_de = 1.0 / total_dedx;

    match kind {
        CalcKind::Displacement => ds_de,
        CalcKind::Interaction => {
            ds_de * cross.iter().map(|c| c.dndx(energy)).sum::<f64>()
        }
        CalcKind::Decay => {
            if particle.is_stable() {
                return 0.0;
            }
            let gamma_beta_c = particle.momentum(energy) / particle.mass * SPEED;
            ds_de / gamma_beta_c.max(PARTICLE_POSITION_RESOLUTION)
        }
        CalcKind::ContinuousRandom => {
            ds_de * cross.iter().map(|c| c.de2dx(energy)).sum::<f64>()
        }
        CalcKind::Time => {
            let beta_c = particle.momentum(energy) / energy * SPEED;
            ds_de / beta_c.max(PARTICLE_POSITION_RESOLUTION)
        }
    }
}

/// Lower integration bound of `kind`: decay and time integrals stop at the
/// rest mass, the others at the configured energy floor.
fn floor(kind: CalcKind, particle: &ParticleDef) -> f64 {
    match kind {
        CalcKind::Decay | CalcKind::Time => particle.mass,
        _ => particle.low.max(particle.mass),
    }
}

/// On-demand evaluation of one calculator.
#[derive(Clone, Debug)]
pub struct IntegralCalculator {
    kind: CalcKind,
    integral: Integral,
}

impl IntegralCalculator {
    fn new(kind: CalcKind) -> Self {
        Self {
            kind,
            integral: Integral::new(IROMB, IMAXS, IPREC2),
        }
    }

    fn calculate(
        &self,
        particle: &ParticleDef,
        cross: &[CrossSectionEnum],
        e_initial: f64,
        e_final: f64,
    ) -> f64 {
        let lower = e_final.max(floor(self.kind, particle));
        if lower >= e_initial {
            return 0.0;
        }
        // energies span many decades, so all tracking integrals run in ln E
        let value = self
            .integral
            .integrate_with_log(lower, e_initial, |e| integrand(self.kind, particle, cross, e));

        if self.kind == CalcKind::Decay {
            value / particle.lifetime
        } else {
            value
        }
    }

    fn upper_limit(
        &self,
        particle: &ParticleDef,
        cross: &[CrossSectionEnum],
        e_initial: f64,
        weight: f64,
    ) -> f64 {
        let lower = floor(self.kind, particle);
        if lower >= e_initial {
            return lower;
        }
        let target = if self.kind == CalcKind::Decay {
            weight * particle.lifetime
        } else {
            weight
        };

        self.integral
            .integrate_with_log_random_ratio(
                e_initial,
                lower,
                |e| integrand(self.kind, particle, cross, e),
                target,
            )
            .upper_limit
    }
}

/// Tabulated form of one calculator: `F(E) = int_floor^E f` on a log energy
/// axis; differences answer `calculate`, the monotone inverse answers
/// `upper_limit`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InterpolantCalculator {
    kind_tag: u8,
    table: Interpolant1D,
}

impl InterpolantCalculator {
    fn build(kind: CalcKind, particle: &ParticleDef, cross: &[CrossSectionEnum]) -> Self {
        let integral = Integral::new(IROMB, IMAXS, IPREC2);
        let lower = floor(kind, particle) * (1.0 + 1e-6);
        let axis = Axis::new(lower, BIG_ENERGY, ENERGY_NODES, true);
        let table = Interpolant1D::build(axis, INTERPOLATION_ORDER, false, |e| {
            integral.integrate_with_log(lower, e, |x| integrand(kind, particle, cross, x))
        });

        Self {
            kind_tag: kind_to_tag(kind),
            table,
        }
    }

    fn kind(&self) -> CalcKind {
        tag_to_kind(self.kind_tag)
    }

    fn cumulative(&self, energy: f64) -> f64 {
        self.table.interpolate(energy).max(0.0)
    }

    fn calculate(&self, particle: &ParticleDef, e_initial: f64, e_final: f64) -> f64 {
        let value = (self.cumulative(e_initial) - self.cumulative(e_final)).max(0.0);

        if self.kind() == CalcKind::Decay {
            value / particle.lifetime
        } else {
            value
        }
    }

    fn upper_limit(&self, particle: &ParticleDef, e_initial: f64, weight: f64) -> f64 {
        let scaled = if self.kind() == CalcKind::Decay {
            weight * particle.lifetime
        } else {
            weight
        };
        let target = self.cumulative(e_initial) - scaled;
        if target <= 0.0 {
            return self.table.axis().low();
        }

        self.table.find_limit(target)
    }
}

const fn kind_to_tag(kind: CalcKind) -> u8 {
    match kind {
        CalcKind::Displacement => 0,
        CalcKind::Interaction => 1,
        CalcKind::Decay => 2,
        CalcKind::ContinuousRandom => 3,
        CalcKind::Time => 4,
    }
}

fn tag_to_kind(tag: u8) -> CalcKind {
    match tag {
        0 => CalcKind::Displacement,
        1 => CalcKind::Interaction,
        2 => CalcKind::Decay,
        3 => CalcKind::ContinuousRandom,
        _ => CalcKind::Time,
    }
}

/// Either calculator form behind one call surface.
#[derive(Clone, Debug)]
pub enum Calculator {
    /// Evaluate the integral on demand.
    Integral(IntegralCalculator),
    /// Use the precomputed cumulative table.
    Interpolant(InterpolantCalculator),
}

impl Calculator {
    /// The integral of the calculator's weight over `[e_final, e_initial]`.
    pub fn calculate(
        &self,
        particle: &ParticleDef,
        cross: &[CrossSectionEnum],
        e_initial: f64,
        e_final: f64,
    ) -> f64 {
        match self {
            Self::Integral(c) => c.calculate(particle, cross, e_initial, e_final),
            Self::Interpolant(c) => c.calculate(particle, e_initial, e_final),
        }
    }

    /// The energy at which the weight accumulated downwards from
    /// `e_initial` reaches `weight`.
    pub fn upper_limit(
        &self,
        particle: &ParticleDef,
        cross: &[CrossSectionEnum],
        e_initial: f64,
        weight: f64,
    ) -> f64 {
        match self {
            Self::Integral(c) => c.upper_limit(particle, cross, e_initial, weight),
            Self::Interpolant(c) => c.upper_limit(particle, e_initial, weight),
        }
    }
}

/// Construction switches of the utility.
#[derive(Clone, Debug, Default)]
pub struct UtilityOptions {
    /// Evaluate all integrals on demand instead of building tables.
    pub integrate: bool,
    /// Attach the continuous randomiser.
    pub cont_rand: bool,
    /// Attach the exact-time calculator.
    pub exact_time: bool,
    /// Cache file for the interpolation tables.
    pub cache_file: Option<PathBuf>,
}

/// Serialised bundle of every table the utility owns.
#[derive(Deserialize, Serialize)]
struct TableBundle {
    displacement: InterpolantCalculator,
    interaction: InterpolantCalculator,
    decay: InterpolantCalculator,
    cont_rand: Option<InterpolantCalculator>,
    time: Option<InterpolantCalculator>,
    cross_sections: Vec<RateTables>,
}

/// Aggregation of the cross sections and calculators of one sector.
#[derive(Clone, Debug)]
pub struct Utility {
    particle: ParticleDef,
    cross_sections: Vec<CrossSectionEnum>,
    displacement: Calculator,
    interaction: Calculator,
    decay: Calculator,
    cont_rand: Option<Calculator>,
    exact_time: Option<Calculator>,
}

impl Utility {
    /// Builds the utility, tabulating the calculators unless on-demand
    /// integration is requested. With a cache file the tables round-trip
    /// through disk; a stale or unreadable cache is rebuilt.
    #[must_use]
    pub fn new(
        particle: ParticleDef,
        mut cross_sections: Vec<CrossSectionEnum>,
        options: &UtilityOptions,
    ) -> Self {
        if options.integrate {
            return Self {
                displacement: Calculator::Integral(IntegralCalculator::new(CalcKind::Displacement)),
                interaction: Calculator::Integral(IntegralCalculator::new(CalcKind::Interaction)),
                decay: Calculator::Integral(IntegralCalculator::new(CalcKind::Decay)),
                cont_rand: options
                    .cont_rand
                    .then(|| Calculator::Integral(IntegralCalculator::new(CalcKind::ContinuousRandom))),
                exact_time: options
                    .exact_time
                    .then(|| Calculator::Integral(IntegralCalculator::new(CalcKind::Time))),
                particle,
                cross_sections,
            };
        }

        let cached = options
            .cache_file
            .as_deref()
            .and_then(|path| match load_tables(path, &cross_sections, options) {
                Ok(bundle) => bundle,
                Err(error) => {
                    log::warn!("ignoring table cache {}: {error}", path.display());
                    None
                }
            });

        let bundle = cached.unwrap_or_else(|| {
            log::info!(
                "building interpolation tables for {} in {} sections",
                particle.kind,
                cross_sections.len()
            );
            for cross in &mut cross_sections {
                cross.enable_tables();
            }
            let bundle = TableBundle {
                displacement: InterpolantCalculator::build(
                    CalcKind::Displacement,
                    &particle,
                    &cross_sections,
                ),
                interaction: InterpolantCalculator::build(
                    CalcKind::Interaction,
                    &particle,
                    &cross_sections,
                ),
                decay: InterpolantCalculator::build(CalcKind::Decay, &particle, &cross_sections),
                cont_rand: options.cont_rand.then(|| {
                    InterpolantCalculator::build(
                        CalcKind::ContinuousRandom,
                        &particle,
                        &cross_sections,
                    )
                }),
                time: options.exact_time.then(|| {
                    InterpolantCalculator::build(CalcKind::Time, &particle, &cross_sections)
                }),
                cross_sections: cross_sections
                    .iter()
                    .filter_map(|c| c.tables().cloned())
                    .collect(),
            };

            if let Some(path) = options.cache_file.as_deref() {
                if let Err(error) = store_tables(path, &bundle) {
                    log::warn!("could not write table cache {}: {error}", path.display());
                }
            }

            bundle
        });

        for (cross, tables) in cross_sections.iter_mut().zip(bundle.cross_sections) {
            cross.adopt_tables(tables);
        }

        Self {
            displacement: Calculator::Interpolant(bundle.displacement),
            interaction: Calculator::Interpolant(bundle.interaction),
            decay: Calculator::Interpolant(bundle.decay),
            cont_rand: bundle.cont_rand.map(Calculator::Interpolant),
            exact_time: bundle.time.map(Calculator::Interpolant),
            particle,
            cross_sections,
        }
    }

    /// The particle definition the utility was built for.
    #[must_use]
    pub const fn particle(&self) -> &ParticleDef {
        &self.particle
    }

    /// The process list.
    #[must_use]
    pub fn cross_sections(&self) -> &[CrossSectionEnum] {
        &self.cross_sections
    }

    /// The displacement calculator.
    #[must_use]
    pub const fn displacement(&self) -> &Calculator {
        &self.displacement
    }

    /// Summed continuous loss in MeV/cm.
    #[must_use]
    pub fn dedx_total(&self, energy: f64) -> f64 {
        self.cross_sections.iter().map(|c| c.dedx(energy)).sum()
    }

    /// Path length of the continuous slide from `e_initial` down to
    /// `e_final`, in cm at nominal density.
    #[must_use]
    pub fn length_continuous(&self, e_initial: f64, e_final: f64) -> f64 {
        self.displacement
            .calculate(&self.particle, &self.cross_sections, e_initial, e_final)
    }

    /// Energy at which the continuous slide from `e_initial` has covered
    /// `distance`; the energy floor when the track ends first.
    #[must_use]
    pub fn energy_displacement(&self, e_initial: f64, distance: f64) -> f64 {
        let low = self.particle.low.max(self.particle.mass);
        let full = self.length_continuous(e_initial, low);
        if full <= distance {
            return low;
        }

        self.displacement
            .upper_limit(&self.particle, &self.cross_sections, e_initial, distance)
    }

    /// Draws the energy of the next stochastic interaction; the rest mass
    /// acts as the "not reached" sentinel.
    #[must_use]
    pub fn energy_interaction(&self, energy: f64, rnd: f64) -> f64 {
        let weight = -rnd.ln();
        let available = self.interaction.calculate(
            &self.particle,
            &self.cross_sections,
            energy,
            self.particle.mass,
        );

        if weight >= available || available <= 0.0 {
            return self.particle.mass;
        }

        self.interaction
            .upper_limit(&self.particle, &self.cross_sections, energy, weight)
    }

    /// Draws the energy at which the particle decays; the rest mass acts as
    /// the "not reached" sentinel and is always returned for stable
    /// particles. The decay weight scales inversely with the local density
    /// correction.
    #[must_use]
    pub fn energy_decay(&self, energy: f64, rnd: f64, density_correction: f64) -> f64 {
        if self.particle.is_stable() {
            return self.particle.mass;
        }

        let weight = -rnd.ln();
        let available = self
            .decay
            .calculate(&self.particle, &self.cross_sections, energy, self.particle.mass)
            / density_correction;

        if weight >= available || available <= 0.0 {
            return self.particle.mass;
        }

        self.decay.upper_limit(
            &self.particle,
            &self.cross_sections,
            energy,
            weight * density_correction,
        )
    }

    /// Selects the interacting cross section: per-channel rates are drawn
    /// with `rnd.1`, the channel itself with `rnd.0`.
    ///
    /// # Errors
    ///
    /// A vanishing total rate under a positive draw is a programming
    /// mistake and reported as [`Error::Logic`].
    pub fn type_interaction(&self, energy: f64, rnd: (f64, f64)) -> Result<&CrossSectionEnum> {
        let rates: arrayvec::ArrayVec<f64, 8> = self
            .cross_sections
            .iter()
            .map(|c| c.dndx_rnd(energy, rnd.1))
            .collect();
        let total: f64 = rates.iter().sum();
        let threshold = rnd.0 * total;

        let mut running = 0.0;
        for (cross, rate) in self.cross_sections.iter().zip(rates) {
            running += rate;
            if running >= threshold && rate > 0.0 {
                return Ok(cross);
            }
        }

        Err(Error::Logic(format!(
            "no interaction channel at energy {energy} (total rate {total})"
        )))
    }

    /// Samples the loss magnitude of the chosen channel.
    #[must_use]
    pub fn stochastic_loss(
        &self,
        cross: &CrossSectionEnum,
        energy: f64,
        rnd: (f64, f64),
    ) -> f64 {
        cross.stochastic_loss(energy, rnd.0, rnd.1)
    }

    /// Replaces the deterministic continuous-loss endpoint by a draw from
    /// the Gaussian the continuous randomiser prescribes; without a
    /// randomiser the endpoint passes through.
    #[must_use]
    pub fn energy_randomize(&self, e_initial: f64, e_final: f64, rnd: f64) -> f64 {
        let Some(cont_rand) = &self.cont_rand else {
            return e_final;
        };

        let variance =
            cont_rand.calculate(&self.particle, &self.cross_sections, e_initial, e_final);
        if variance <= 0.0 {
            return e_final;
        }

        gauss::sample_truncated(
            e_final,
            variance.sqrt(),
            self.particle.low.max(self.particle.mass),
            e_initial,
            rnd,
        )
    }

    /// Elapsed time over one continuous step: the exact-time integral when
    /// attached, the light-speed approximation otherwise.
    #[must_use]
    pub fn time_elapsed(
        &self,
        e_initial: f64,
        e_final: f64,
        displacement: f64,
        density_correction: f64,
    ) -> f64 {
        self.exact_time.as_ref().map_or(displacement / SPEED, |calc| {
            calc.calculate(&self.particle, &self.cross_sections, e_initial, e_final)
                / density_correction
        })
    }

    /// True when the continuous randomiser is attached.
    #[must_use]
    pub const fn randomizes(&self) -> bool {
        self.cont_rand.is_some()
    }
}

fn load_tables(
    path: &Path,
    cross_sections: &[CrossSectionEnum],
    options: &UtilityOptions,
) -> Result<Option<TableBundle>> {
    if !path.exists() {
        return Ok(None);
    }

    let reader = BufReader::new(File::open(path)?);
    let bundle: TableBundle =
        bincode::deserialize_from(reader).map_err(|e| Error::Tables(e.to_string()))?;

    // a bundle built for a different layout is stale
    if bundle.cross_sections.len() != cross_sections.len()
        || bundle.cont_rand.is_some() != options.cont_rand
        || bundle.time.is_some() != options.exact_time
    {
        return Err(Error::Tables("cached layout does not match".to_string()));
    }

    log::info!("loaded interpolation tables from {}", path.display());
    Ok(Some(bundle))
}

fn store_tables(path: &Path, bundle: &TableBundle) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, bundle).map_err(|e| Error::Tables(e.to_string()))
}

/// Truncated-normal sampling through the inverse error function.
mod gauss {
    use std::f64::consts::FRAC_2_SQRT_PI;

    /// Error function after Abramowitz and Stegun 7.1.26.
    pub fn erf(x: f64) -> f64 {
        let sign = x.signum();
        let x = x.abs();
        let t = 1.0 / 0.3275911_f64.mul_add(x, 1.0);
        let poly = t
            * (0.254829592
                + t * (-0.284496736
                    + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));

        sign * (1.0 - poly * (-x * x).exp())
    }

    /// Inverse of [`erf`] by Newton iteration on a bisection-safe bracket.
    fn erf_inv(y: f64) -> f64 {
        let y = y.clamp(-1.0 + 1e-15, 1.0 - 1e-15);
        let mut lo = -6.0;
        let mut hi = 6.0;
        let mut x = 0.0;

        for _ in 0..80 {
            let value = erf(x);
            if value < y {
                lo = x;
            } else {
                hi = x;
            }

            let derivative = FRAC_2_SQRT_PI * (-x * x).exp();
            let newton = x - (value - y) / derivative;
            x = if newton > lo && newton < hi {
                newton
            } else {
                0.5 * (lo + hi)
            };

            if hi - lo < 1e-12 {
                break;
            }
        }

        x
    }

    /// Gaussian CDF.
    fn cdf(x: f64, mean: f64, sigma: f64) -> f64 {
        0.5 * (1.0 + erf((x - mean) / (sigma * std::f64::consts::SQRT_2)))
    }

    /// Draws from a normal distribution truncated to `[lower, upper]` via
    /// the inverse-CDF transform of the uniform deviate `rnd`.
    pub fn sample_truncated(mean: f64, sigma: f64, lower: f64, upper: f64, rnd: f64) -> f64 {
        if upper <= lower {
            return mean.clamp(upper.min(lower), lower.max(upper));
        }

        let p_lower = cdf(lower, mean, sigma);
        let p_upper = cdf(upper, mean, sigma);
        let p = rnd.mul_add(p_upper - p_lower, p_lower);

        let x = (2.0 * p - 1.0).clamp(-1.0, 1.0);
        sigma.mul_add(std::f64::consts::SQRT_2 * erf_inv(x), mean)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use float_cmp::assert_approx_eq;

        #[test]
        fn erf_matches_reference_points() {
            assert_approx_eq!(f64, erf(0.0), 0.0, epsilon = 1e-7);
            assert_approx_eq!(f64, erf(1.0), 0.842_700_79, epsilon = 1e-6);
            assert_approx_eq!(f64, erf(-1.0), -0.842_700_79, epsilon = 1e-6);
            assert_approx_eq!(f64, erf(3.0), 0.999_977_9, epsilon = 1e-6);
        }

        #[test]
        fn truncated_sampling_respects_the_bounds() {
            for &rnd in &[0.0, 0.01, 0.5, 0.99, 1.0] {
                let x = sample_truncated(10.0, 5.0, 8.0, 11.0, rnd);
                assert!(x >= 8.0 - 1e-9, "x = {x}");
                assert!(x <= 11.0 + 1e-9, "x = {x}");
            }
        }

        #[test]
        fn median_draw_recovers_the_centre() {
            // symmetric bounds around the mean map rnd = 0.5 to the mean
            let x = sample_truncated(0.0, 1.0, -2.0, 2.0, 0.5);
            assert_approx_eq!(f64, x, 0.0, epsilon = 1e-6);
        }
    }
}
