#![allow(missing_docs)]

use leptrack::crosssection::{standard_cross_sections, CrossSection, ProcessSettings};
use leptrack::cuts::EnergyCutSettings;
use leptrack::medium::Medium;
use leptrack::particle::{ParticleDef, ParticleKind};
use leptrack::utility::{Utility, UtilityOptions};
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;

const DRAWS: usize = 200_000;

/// The empirical channel frequencies of `type_interaction` must follow the
/// analytic `dN/dx` ratios; a chi-square against them stays below the 99%
/// quantile.
#[test]
fn channel_sampler_matches_the_rate_ratios() {
    let particle = ParticleDef::new(ParticleKind::Muon);
    let medium = Medium::from_name("ice", 1.0).unwrap();
    let cuts = EnergyCutSettings::new(500.0, -1.0);
    let cross = standard_cross_sections(&particle, &medium, &cuts, &ProcessSettings::default());
    let utility = Utility::new(
        particle,
        cross,
        &UtilityOptions {
            integrate: false,
            ..UtilityOptions::default()
        },
    );

    let energy = 1e5;
    let rates: Vec<f64> = utility
        .cross_sections()
        .iter()
        .map(|c| c.dndx(energy))
        .collect();
    let total: f64 = rates.iter().sum();
    assert!(total > 0.0);

    let mut rng = Pcg64::seed_from_u64(6);
    let mut counts = vec![0_u64; rates.len()];
    for _ in 0..DRAWS {
        let chosen = utility
            .type_interaction(energy, (rng.gen(), rng.gen()))
            .unwrap();
        let index = utility
            .cross_sections()
            .iter()
            .position(|c| c.process() == chosen.process())
            .unwrap();
        counts[index] += 1;
    }

    let mut chi_square = 0.0;
    let mut dof = 0_usize;
    for (count, rate) in counts.iter().zip(&rates) {
        let expected = rate / total * DRAWS as f64;
        if expected < 10.0 {
            assert!(*count < 30, "channel with tiny rate drew {count} times");
            continue;
        }
        dof += 1;
        let delta = *count as f64 - expected;
        chi_square += delta * delta / expected;
    }

    // 99% quantiles of chi-square for 1..=3 degrees of freedom
    let quantile = match dof.saturating_sub(1) {
        0 | 1 => 6.63,
        2 => 9.21,
        _ => 11.34,
    };
    assert!(
        chi_square < quantile,
        "chi-square {chi_square} over {dof} channels"
    );
}
