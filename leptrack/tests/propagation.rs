#![allow(missing_docs)]

use float_cmp::assert_approx_eq;
use leptrack::config::Config;
use leptrack::particle::{ParticleDef, ParticleKind, ParticleState};
use leptrack::propagator::Propagator;
use leptrack::vector::{Direction, Vector3};
use rand::SeedableRng;
use rand_pcg::Pcg64;

const KM: f64 = 1e5;

fn ice_config(extra: &str) -> Config {
    let text = format!(
        "\
detector
sphere 1e8

sector
sphere 1e9
inside 500 -1 0
medium ice 1.0
{extra}
"
    );
    Config::parse(&text).unwrap()
}

fn along_z(energy: f64) -> ParticleState {
    ParticleState::new(energy, Vector3::default(), Direction::default())
}

#[test]
fn minimum_ionising_muon_through_a_kilometre_of_ice() {
    // tabulated mode: a kilometre of TeV propagation takes many stochastic
    // steps, which is what the tables are for
    let mut config = ice_config("");
    config.seed = 1;
    let propagator = Propagator::with_config(ParticleKind::Muon, &config).unwrap();
    let mut rng = Pcg64::seed_from_u64(config.seed);
    let mut particle = along_z(1e6);

    let result = propagator.propagate(&mut particle, KM, &mut rng).unwrap();

    // a TeV muon survives a kilometre of ice with a few hundred GeV left
    assert!(result > 3e5, "final energy {result}");
    assert!(result < 7e5, "final energy {result}");
    // without scattering the track is straight: z equals the propagated
    // distance to within a millimetre
    assert_approx_eq!(f64, particle.position.z, KM, epsilon = 0.1);
    assert_approx_eq!(f64, particle.propagated_distance, KM, epsilon = 1e-6);
}

#[test]
fn low_energy_muon_stops_within_metres() {
    let config = ice_config("integrate");
    let propagator = Propagator::with_config(ParticleKind::Muon, &config).unwrap();
    let mut rng = Pcg64::seed_from_u64(1);
    let mut particle = along_z(1e3);

    let result = propagator.propagate(&mut particle, 10.0 * KM, &mut rng).unwrap();

    assert!(result <= 0.0, "result {result}");
    let stopping_distance = -result;
    assert!(stopping_distance > 0.0);
    assert!(stopping_distance < 1e4, "stopped after {stopping_distance} cm");
}

#[test]
fn tau_barely_above_rest_decays_on_the_spot() {
    let config = ice_config("integrate");
    let propagator = Propagator::with_config(ParticleKind::Tau, &config).unwrap();
    let mut rng = Pcg64::seed_from_u64(1);
    let tau_mass = ParticleDef::new(ParticleKind::Tau).mass;
    let mut particle = along_z(tau_mass + 1.0);

    let result = propagator.propagate(&mut particle, 100.0, &mut rng).unwrap();

    // decay before the requested metre: negative propagated distance
    assert!(result <= 0.0, "result {result}");
    assert!(particle.propagated_distance < 100.0);
    assert_eq!(particle.energy, 0.0);
}

#[test]
fn pure_continuous_limit_reproduces_the_csda_range() {
    // disabling both cuts removes every stochastic channel
    let text = "\
detector
sphere 1e8

sector
sphere 1e12
inside -1 -1 0
medium ice 1.0
integrate
";
    let config = Config::parse(text).unwrap();
    let propagator = Propagator::with_config(ParticleKind::Muon, &config).unwrap();

    let energy = 1e5;
    let sector = &propagator.sectors()[1];
    let expected_range = sector
        .utility()
        .length_continuous(energy, propagator.particle().low);

    let mut rng = Pcg64::seed_from_u64(1);
    let mut particle = along_z(energy);
    let result = propagator
        .propagate(&mut particle, 1e12, &mut rng)
        .unwrap();

    assert!(result <= 0.0);
    let range = -result;
    assert!(
        (range - expected_range).abs() / expected_range < 1e-5,
        "range {range}, expected {expected_range}"
    );

    // determinism of the continuous limit: a second run is bitwise equal
    let mut rng = Pcg64::seed_from_u64(99);
    let mut second = along_z(energy);
    let repeat = propagator.propagate(&mut second, 1e12, &mut rng).unwrap();
    assert_eq!(result.to_bits(), repeat.to_bits());
}

#[test]
fn sector_handover_between_concentric_cylinders() {
    // disabled cuts make both sectors purely continuous, so the handover
    // arithmetic is deterministic
    let text = "\
detector
sphere 1e7

sector
cylinder 10000 200000
inside -1 -1 0
medium ice 1.0

sector
cylinder 20000 10000 200000
inside -1 -1 0
medium standard_rock 1.0
integrate
";
    let config = Config::parse(text).unwrap();
    let propagator = Propagator::with_config(ParticleKind::Muon, &config).unwrap();
    let mut rng = Pcg64::seed_from_u64(1);

    // start at the centre of the inner cylinder, directed radially outward
    let mut particle = ParticleState::new(
        1e6,
        Vector3::default(),
        Direction::from_angles(std::f64::consts::FRAC_PI_2, 0.0),
    );

    let target = 1.5e4;
    let result = propagator.propagate(&mut particle, target, &mut rng).unwrap();

    // the particle crossed the boundary at 10^4 cm and finished inside the
    // outer shell with distance accounting intact
    assert!(result > 0.0, "result {result}");
    assert!(result < 1e6);
    assert_approx_eq!(f64, particle.propagated_distance, target, epsilon = 1e-6);
    let radial = particle.position.x.hypot(particle.position.y);
    assert_approx_eq!(f64, radial, target, epsilon = 0.5);
}

#[test]
fn table_cache_round_trips_through_disk() {
    let dir = assert_fs::TempDir::new().unwrap();
    let mut config = ice_config("");
    config.path_to_tables = Some(dir.path().to_path_buf());

    // first construction builds and writes, the second deserialises
    let built = Propagator::with_config(ParticleKind::Muon, &config).unwrap();
    assert!(std::fs::read_dir(dir.path()).unwrap().count() > 0);
    let cached = Propagator::with_config(ParticleKind::Muon, &config).unwrap();

    for &energy in &[1e4, 1e6, 1e9] {
        let fresh = built.sectors()[1].utility().length_continuous(energy, 200.0);
        let loaded = cached.sectors()[1].utility().length_continuous(energy, 200.0);
        assert_eq!(fresh.to_bits(), loaded.to_bits());
    }
}

#[test]
fn integral_and_interpolant_calculators_agree() {
    let integral_config = ice_config("integrate");
    let table_config = ice_config("");

    let on_demand = Propagator::with_config(ParticleKind::Muon, &integral_config).unwrap();
    let tabulated = Propagator::with_config(ParticleKind::Muon, &table_config).unwrap();

    let exact = &on_demand.sectors()[1];
    let interpolated = &tabulated.sectors()[1];

    for &energy in &[1e3, 1e4, 1e5, 1e6, 1e8, 1e10] {
        let reference = exact.utility().length_continuous(energy, 200.0);
        let approximated = interpolated.utility().length_continuous(energy, 200.0);

        assert!(
            (reference - approximated).abs() / reference < 1e-3,
            "length at {energy}: {reference} vs {approximated}"
        );
    }
}
