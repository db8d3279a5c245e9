//! The per-sector step loop.
//!
//! A sector couples one geometry region with one medium, one set of cuts
//! and one utility. Each step computes five candidate stopping energies --
//! stochastic interaction, decay, geometry border, energy floor, distance
//! budget -- and resolves them by picking the candidate with the largest
//! final energy, i.e. the one that happens first along the track.

use crate::constants::COMPUTER_PRECISION;
use crate::cuts::EnergyCutSettings;
use crate::error::Result;
use crate::geometry::{GeometryEnum, Location};
use crate::medium::Medium;
use crate::particle::{ParticleDef, ParticleState};
use crate::scattering::Scattering;
use crate::utility::Utility;
use rand::Rng;

/// The five competing stopping candidates of one step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LossKind {
    /// The configured energy floor is reached.
    MinimalEnergy,
    /// The external distance budget is exhausted.
    Distance,
    /// The sector border is reached.
    Border,
    /// The particle decays.
    Decay,
    /// A stochastic interaction occurs.
    Interaction,
}

/// Why a sector pass ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SectorOutcome {
    /// The particle sits on the sector border; the propagator re-selects.
    Border,
    /// The particle dropped to the energy floor.
    Stopped,
    /// The particle decayed.
    Decayed,
    /// The requested distance was covered.
    BudgetReached,
}

/// One region of space with a single medium, cuts and process list.
#[derive(Clone, Debug)]
pub struct Sector {
    geometry: GeometryEnum,
    medium: Medium,
    cuts: EnergyCutSettings,
    particle: ParticleDef,
    utility: Utility,
    scattering: Option<Scattering>,
    location: Location,
    stopping_decay: bool,
}

impl Sector {
    /// Assembles a sector. The utility must have been built for the same
    /// particle, medium and cuts.
    #[must_use]
    pub fn new(
        geometry: GeometryEnum,
        medium: Medium,
        cuts: EnergyCutSettings,
        particle: ParticleDef,
        utility: Utility,
        scattering: Option<Scattering>,
        location: Location,
    ) -> Self {
        Self {
            geometry,
            medium,
            cuts,
            particle,
            utility,
            scattering,
            location,
            stopping_decay: false,
        }
    }

    /// The detector-relative location this sector covers.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// The sector's region.
    #[must_use]
    pub const fn geometry(&self) -> &GeometryEnum {
        &self.geometry
    }

    /// The sector's medium.
    #[must_use]
    pub const fn medium(&self) -> &Medium {
        &self.medium
    }

    /// The sector's cut settings.
    #[must_use]
    pub const fn cuts(&self) -> &EnergyCutSettings {
        &self.cuts
    }

    /// The sampling layer.
    #[must_use]
    pub const fn utility(&self) -> &Utility {
        &self.utility
    }

    /// Advances `particle` until it leaves this sector, stops, decays or
    /// has covered `distance` in total.
    ///
    /// # Errors
    ///
    /// Propagates the logic error raised when channel selection runs
    /// against a vanishing total rate.
    pub fn propagate<R: Rng>(
        &self,
        particle: &mut ParticleState,
        distance: f64,
        rng: &mut R,
    ) -> Result<SectorOutcome> {
        let correction = self.medium.density_correction;

        loop {
            if particle.energy <= self.particle.low {
                return Ok(SectorOutcome::Stopped);
            }
            let remaining = distance - particle.propagated_distance;
            if remaining <= 0.0 {
                return Ok(SectorOutcome::BudgetReached);
            }

            let e_initial = particle.energy;
            let unit = particle.direction.unit();
            let border = self.geometry.distance_to_border(&particle.position, &unit);

            // the candidates, ordered so that ties resolve towards the
            // earlier (more final) outcome
            let candidates = [
                (LossKind::MinimalEnergy, self.particle.low),
                (
                    LossKind::Distance,
                    self.utility
                        .energy_displacement(e_initial, remaining * correction),
                ),
                (
                    LossKind::Border,
                    self.utility
                        .energy_displacement(e_initial, border * correction),
                ),
                (
                    LossKind::Decay,
                    self.utility.energy_decay(e_initial, rng.gen(), correction),
                ),
                (
                    LossKind::Interaction,
                    self.utility.energy_interaction(e_initial, rng.gen()),
                ),
            ];

            let (kind, e_final) = candidates
                .into_iter()
                .fold(candidates[0], |best, candidate| {
                    if candidate.1 > best.1 {
                        candidate
                    } else {
                        best
                    }
                });

            // the border and budget candidates advance by their geometric
            // length exactly, so distance accounting closes without residue
            let forced = match kind {
                LossKind::Distance => Some(remaining),
                LossKind::Border => Some(border),
                _ => None,
            };
            self.continuous_step(particle, e_final, distance, forced, rng);

            match kind {
                LossKind::Interaction => {
                    let energy = particle.energy;
                    let cross = self
                        .utility
                        .type_interaction(energy, (rng.gen(), rng.gen()))?;
                    let loss = self
                        .utility
                        .stochastic_loss(cross, energy, (rng.gen(), rng.gen()));
                    particle.energy = energy - loss;

                    if particle.energy <= self.particle.low {
                        return Ok(self.stop_or_decay(particle, rng));
                    }
                }
                LossKind::Decay => {
                    particle.energy = 0.0;
                    return Ok(SectorOutcome::Decayed);
                }
                LossKind::Border => return Ok(SectorOutcome::Border),
                LossKind::MinimalEnergy => {
                    return Ok(self.stop_or_decay(particle, rng))
                }
                LossKind::Distance => return Ok(SectorOutcome::BudgetReached),
            }
        }
    }

    /// Continuous evolution from the current energy down to `e_final`:
    /// displacement, optional randomisation of the endpoint, advance of
    /// position/time, optional deflection.
    fn continuous_step<R: Rng>(
        &self,
        particle: &mut ParticleState,
        e_final: f64,
        distance: f64,
        forced_displacement: Option<f64>,
        rng: &mut R,
    ) {
        let correction = self.medium.density_correction;
        let e_initial = particle.energy;
        let displacement = forced_displacement.unwrap_or_else(|| {
            self.utility.length_continuous(e_initial, e_final) / correction
        });

        let e_final = if self.utility.randomizes() && e_final > self.particle.low {
            self.utility.energy_randomize(e_initial, e_final, rng.gen())
        } else {
            e_final
        };

        let unit = particle.direction.unit();
        particle.position += unit * displacement;
        particle.time += self
            .utility
            .time_elapsed(e_initial, e_final, displacement, correction);
        particle.propagated_distance += displacement;

        // computer-precision snap against progress-free loops
        if (distance - particle.propagated_distance).abs()
            < distance.abs() * COMPUTER_PRECISION
        {
            particle.propagated_distance = distance;
        }

        if let Some(scattering) = &self.scattering {
            let (position, direction) = scattering.scatter(
                displacement,
                e_initial,
                e_final,
                particle.position,
                particle.direction,
                (rng.gen(), rng.gen(), rng.gen(), rng.gen()),
            );
            particle.position = position;
            particle.direction = direction;
        }

        particle.energy = e_final;
    }

    /// Outcome of reaching the energy floor: with stopping decay enabled an
    /// unstable particle waits out its rest-frame lifetime and decays in
    /// place.
    fn stop_or_decay<R: Rng>(&self, particle: &mut ParticleState, rng: &mut R) -> SectorOutcome {
        if self.stopping_decay && !self.particle.is_stable() {
            let draw: f64 = rng.gen();
            particle.time -= self.particle.lifetime * draw.ln();
            particle.energy = 0.0;
            return SectorOutcome::Decayed;
        }

        SectorOutcome::Stopped
    }

    /// Whether a particle reaching the floor with a finite lifetime decays
    /// on the spot. Off by default.
    pub fn set_stopping_decay(&mut self, enabled: bool) {
        self.stopping_decay = enabled;
    }

    /// The stopping-decay policy.
    #[must_use]
    pub const fn stopping_decay(&self) -> bool {
        self.stopping_decay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crosssection::{standard_cross_sections, ProcessSettings};
    use crate::geometry::Sphere;
    use crate::particle::ParticleKind;
    use crate::utility::UtilityOptions;
    use crate::vector::{Direction, Vector3};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn sector(kind: ParticleKind, settings: &ProcessSettings, radius: f64) -> Sector {
        let particle = ParticleDef::new(kind);
        let medium = Medium::from_name("ice", 1.0).unwrap();
        let cuts = EnergyCutSettings::new(500.0, -1.0);
        let cross = standard_cross_sections(&particle, &medium, &cuts, settings);
        let utility = Utility::new(
            particle.clone(),
            cross,
            &UtilityOptions {
                integrate: true,
                ..UtilityOptions::default()
            },
        );
        let geometry = GeometryEnum::from(Sphere {
            origin: Vector3::default(),
            radius,
            inner_radius: 0.0,
        });

        Sector::new(
            geometry,
            medium,
            cuts,
            particle,
            utility,
            None,
            Location::InsideDetector,
        )
    }

    fn continuous_only() -> ProcessSettings {
        ProcessSettings {
            brems_multiplier: 0.0,
            photo_multiplier: 0.0,
            epair_multiplier: 0.0,
            ioniz_multiplier: 1.0,
            ..ProcessSettings::default()
        }
    }

    #[test]
    fn energy_never_increases_along_the_track() {
        let sector = sector(ParticleKind::Muon, &ProcessSettings::default(), 1e9);
        let mut rng = Pcg64::seed_from_u64(7);
        let mut particle =
            ParticleState::new(1e6, Vector3::default(), Direction::default());

        let mut last_energy = particle.energy;
        let mut last_distance = 0.0;
        for _ in 0..6 {
            let outcome = sector
                .propagate(&mut particle, last_distance + 5e3, &mut rng)
                .unwrap();
            assert!(particle.energy <= last_energy);
            assert!(particle.propagated_distance >= last_distance);
            last_energy = particle.energy;
            last_distance = particle.propagated_distance;
            if outcome != SectorOutcome::BudgetReached {
                break;
            }
        }
    }

    #[test]
    fn border_outcome_lands_on_the_border() {
        let radius = 5e4;
        // ionisation alone cannot stop a 10 TeV muon within 500 m
        let sector = sector(ParticleKind::Muon, &continuous_only(), radius);
        let mut rng = Pcg64::seed_from_u64(1);
        let mut particle =
            ParticleState::new(1e7, Vector3::default(), Direction::default());

        let outcome = sector.propagate(&mut particle, 1e9, &mut rng).unwrap();

        assert_eq!(outcome, SectorOutcome::Border);
        assert!((particle.propagated_distance - radius).abs() < 1.0);
        assert!((particle.position.z - radius).abs() < 1.0);
    }

    #[test]
    fn distance_budget_is_conserved() {
        let sector = sector(ParticleKind::Muon, &continuous_only(), 1e9);
        let mut rng = Pcg64::seed_from_u64(3);
        let target = 1e5;
        let mut particle =
            ParticleState::new(1e6, Vector3::default(), Direction::default());

        let outcome = sector.propagate(&mut particle, target, &mut rng).unwrap();

        assert_eq!(outcome, SectorOutcome::BudgetReached);
        assert!((particle.propagated_distance - target).abs() < 1e-6 * target);
    }

    #[test]
    fn tau_near_rest_decays_immediately() {
        let sector = sector(ParticleKind::Tau, &ProcessSettings::default(), 1e9);
        let mut rng = Pcg64::seed_from_u64(11);
        let mut particle = ParticleState::new(
            ParticleDef::new(ParticleKind::Tau).mass + 1.0,
            Vector3::default(),
            Direction::default(),
        );

        let outcome = sector.propagate(&mut particle, 100.0, &mut rng).unwrap();

        assert_eq!(outcome, SectorOutcome::Decayed);
        assert_eq!(particle.energy, 0.0);
        assert!(particle.propagated_distance < 100.0);
    }

    #[test]
    fn stopping_decay_turns_the_floor_into_a_decay() {
        let mut with_policy = sector(ParticleKind::Muon, &continuous_only(), 1e9);
        with_policy.set_stopping_decay(true);
        let without_policy = sector(ParticleKind::Muon, &continuous_only(), 1e9);

        let run = |sector: &Sector, seed: u64| {
            let mut rng = Pcg64::seed_from_u64(seed);
            // a GeV muon ranges out after a few metres
            let mut particle =
                ParticleState::new(1e3, Vector3::default(), Direction::default());
            let outcome = sector.propagate(&mut particle, 1e6, &mut rng).unwrap();
            (outcome, particle)
        };

        let (outcome, decayed) = run(&with_policy, 4);
        assert_eq!(outcome, SectorOutcome::Decayed);
        assert_eq!(decayed.energy, 0.0);

        let (outcome, stopped) = run(&without_policy, 4);
        assert_eq!(outcome, SectorOutcome::Stopped);
        assert!(stopped.energy > 0.0);
        // the decayed track carries the extra rest-frame wait on its clock
        assert!(decayed.time > stopped.time);
    }

    #[test]
    fn time_advances_with_the_track() {
        let sector = sector(ParticleKind::Muon, &continuous_only(), 1e9);
        let mut rng = Pcg64::seed_from_u64(5);
        let mut particle =
            ParticleState::new(1e6, Vector3::default(), Direction::default());

        sector.propagate(&mut particle, 3e4, &mut rng).unwrap();

        // light-speed approximation: t = s / c
        let expected = particle.propagated_distance / crate::constants::SPEED;
        assert!((particle.time - expected).abs() < 1e-12);
    }
}
