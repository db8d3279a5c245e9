//! Sector handover and the top-level propagation loop.

use crate::config::{Config, RegionCuts, SectorConfig};
use crate::constants::PARTICLE_POSITION_RESOLUTION;
use crate::crosssection::standard_cross_sections;
use crate::cuts::EnergyCutSettings;
use crate::error::{Error, Result};
use crate::geometry::{Geometry, GeometryEnum, Location};
use crate::medium::Medium;
use crate::particle::{ParticleDef, ParticleKind, ParticleState};
use crate::scattering::Scattering;
use crate::sector::{Sector, SectorOutcome};
use crate::utility::{Utility, UtilityOptions};
use rand::Rng;

/// Safety bound on sector handovers of one propagation.
const MAX_HANDOVERS: usize = 100_000;

/// Drives a particle through the sector list until it stops, decays or
/// covers the requested distance.
#[derive(Clone, Debug)]
pub struct Propagator {
    particle: ParticleDef,
    detector: GeometryEnum,
    sectors: Vec<Sector>,
}

impl Propagator {
    /// Assembles a propagator from prebuilt sectors.
    #[must_use]
    pub fn new(particle: ParticleDef, detector: GeometryEnum, sectors: Vec<Sector>) -> Self {
        Self {
            particle,
            detector,
            sectors,
        }
    }

    /// Builds the propagator a configuration describes for one particle
    /// kind: every sector block expands into one sector per
    /// detector-relative region, with the global cut settings filling in
    /// where the block has no override.
    ///
    /// # Errors
    ///
    /// Fails when the configuration lacks a detector or names an unknown
    /// medium.
    pub fn with_config(kind: ParticleKind, config: &Config) -> Result<Self> {
        let particle = ParticleDef::new(kind);
        let detector = config
            .detector
            .clone()
            .ok_or_else(|| Error::Config("no detector specified".to_string()))?;

        let mut sectors = Vec::with_capacity(3 * config.sectors.len());
        for block in &config.sectors {
            let medium = Medium::from_name(&block.medium, block.density_correction)
                .ok_or_else(|| Error::Config(format!("unknown medium: {}", block.medium)))?;

            let regions = [
                (
                    Location::InfrontDetector,
                    block.infront.unwrap_or(config.global_infront),
                ),
                (
                    Location::InsideDetector,
                    block.inside.unwrap_or(config.global_inside),
                ),
                (
                    Location::BehindDetector,
                    block.behind.unwrap_or(config.global_behind),
                ),
            ];

            for (location, region) in regions {
                sectors.push(build_sector(
                    &particle, &medium, block, location, region, config,
                ));
            }
        }

        Ok(Self::new(particle, detector, sectors))
    }

    /// The particle definition the propagator serves.
    #[must_use]
    pub const fn particle(&self) -> &ParticleDef {
        &self.particle
    }

    /// The sector list.
    #[must_use]
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// The sector responsible for the particle's current position and
    /// detector-relative region. Selection probes one position resolution
    /// ahead so that a particle sitting on a border belongs to the sector
    /// it is about to enter.
    #[must_use]
    pub fn current_sector(&self, particle: &ParticleState) -> Option<&Sector> {
        let unit = particle.direction.unit();
        let probe = particle.position + unit * PARTICLE_POSITION_RESOLUTION;
        let region = Location::classify(&self.detector, &probe, &unit);

        self.sectors
            .iter()
            .find(|sector| sector.location() == region && sector.geometry().contains(&probe))
    }

    /// Propagates `particle` up to `distance` cm. Returns the final energy
    /// when the particle covered the distance, the negative propagated
    /// distance when it stopped or decayed earlier.
    ///
    /// # Errors
    ///
    /// Propagates logic errors from channel selection.
    pub fn propagate<R: Rng>(
        &self,
        particle: &mut ParticleState,
        distance: f64,
        rng: &mut R,
    ) -> Result<f64> {
        let distance = distance.max(0.0);

        for _ in 0..MAX_HANDOVERS {
            if particle.energy <= self.particle.low
                || particle.propagated_distance >= distance
            {
                break;
            }

            let Some(sector) = self.current_sector(particle) else {
                log::debug!(
                    "no sector contains ({}, {}, {}); stopping",
                    particle.position.x,
                    particle.position.y,
                    particle.position.z
                );
                break;
            };

            match sector.propagate(particle, distance, rng)? {
                SectorOutcome::Border => {}
                SectorOutcome::Stopped
                | SectorOutcome::Decayed
                | SectorOutcome::BudgetReached => break,
            }
        }

        if particle.propagated_distance == distance {
            Ok(particle.energy)
        } else {
            Ok(-particle.propagated_distance)
        }
    }
}

fn build_sector(
    particle: &ParticleDef,
    medium: &Medium,
    block: &SectorConfig,
    location: Location,
    region: RegionCuts,
    config: &Config,
) -> Sector {
    let cuts = EnergyCutSettings::new(region.e_cut, region.v_cut);
    let cross = standard_cross_sections(particle, medium, &cuts, &config.settings);

    let cache_file = config.path_to_tables.as_ref().map(|dir| {
        let s = &config.settings;
        dir.join(format!(
            "{}_{}_{}_{:?}_{}_{}_{}_{}_{}_{}_{}_{}_{}_{}.lt.bin",
            particle.kind,
            medium.name,
            medium.density_correction,
            location,
            region.e_cut,
            region.v_cut,
            region.cont,
            config.exact_time,
            s.brems_id,
            s.photo_id,
            s.brems_multiplier,
            s.photo_multiplier,
            s.epair_multiplier,
            s.ioniz_multiplier,
        ))
    });

    let options = UtilityOptions {
        integrate: config.integrate,
        cont_rand: region.cont,
        exact_time: config.exact_time,
        cache_file,
    };
    let utility = Utility::new(particle.clone(), cross, &options);
    let scattering = config
        .moliere
        .then(|| Scattering::new(particle.clone(), medium));

    Sector::new(
        block.geometry.clone(),
        medium.clone(),
        cuts,
        particle.clone(),
        utility,
        scattering,
        location,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{Direction, Vector3};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn simple_config() -> Config {
        let text = "\
detector
sphere 1e7

sector
sphere 1e9
medium ice 1.0
";
        let mut config = Config::parse(text).unwrap();
        config.integrate = true;
        config
    }

    #[test]
    fn config_expands_into_three_sectors_per_block() {
        let propagator =
            Propagator::with_config(ParticleKind::Muon, &simple_config()).unwrap();

        assert_eq!(propagator.sectors().len(), 3);
    }

    #[test]
    fn missing_detector_is_a_configuration_error() {
        let config = Config::parse("sector\nsphere 100\nmedium ice 1.0\n").unwrap();

        assert!(Propagator::with_config(ParticleKind::Muon, &config).is_err());
    }

    #[test]
    fn unknown_medium_is_a_configuration_error() {
        let config =
            Config::parse("detector\nsphere 100\nsector\nsphere 100\nmedium jelly 1.0\n")
                .unwrap();

        assert!(Propagator::with_config(ParticleKind::Muon, &config).is_err());
    }

    #[test]
    fn full_distance_returns_the_final_energy() {
        let propagator =
            Propagator::with_config(ParticleKind::Muon, &simple_config()).unwrap();
        let mut rng = Pcg64::seed_from_u64(1);
        let mut particle =
            ParticleState::new(1e6, Vector3::default(), Direction::default());

        let result = propagator.propagate(&mut particle, 5e3, &mut rng).unwrap();

        assert!(result > 0.0);
        assert!(result < 1e6);
        assert_eq!(particle.propagated_distance, 5e3);
    }

    #[test]
    fn stopped_particle_returns_negative_distance() {
        let propagator =
            Propagator::with_config(ParticleKind::Muon, &simple_config()).unwrap();
        let mut rng = Pcg64::seed_from_u64(2);
        // a GeV muon cannot cross 100 km of ice
        let mut particle =
            ParticleState::new(1e3, Vector3::default(), Direction::default());

        let result = propagator.propagate(&mut particle, 1e7, &mut rng).unwrap();

        assert!(result <= 0.0);
        assert!(result.abs() < 1e6);
    }

    #[test]
    fn identical_seeds_reproduce_the_trajectory() {
        let propagator =
            Propagator::with_config(ParticleKind::Muon, &simple_config()).unwrap();

        let run = |seed: u64| {
            let mut rng = Pcg64::seed_from_u64(seed);
            let mut particle =
                ParticleState::new(1e6, Vector3::default(), Direction::default());
            let result = propagator.propagate(&mut particle, 2e3, &mut rng).unwrap();
            (result, particle)
        };

        let (first_result, first) = run(123);
        let (second_result, second) = run(123);

        assert_eq!(first_result.to_bits(), second_result.to_bits());
        assert_eq!(first, second);
    }
}
