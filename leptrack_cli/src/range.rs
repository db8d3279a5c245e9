use super::helpers;
use super::{GlobalConfiguration, Subcommand};
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueHint};
use leptrack::config::Config;
use leptrack::geometry::Location;
use leptrack::particle::ParticleKind;
use leptrack::propagator::Propagator;
use prettytable::row;
use std::path::PathBuf;
use std::process::ExitCode;

/// Evaluates the continuous-slowing-down range inside the detector.
#[derive(Parser)]
pub struct Opts {
    /// Path of the configuration file.
    #[arg(value_hint = ValueHint::FilePath)]
    config: PathBuf,
    /// Particle kind.
    #[arg(default_value = "mu", long, value_parser = helpers::parse_particle)]
    particle: ParticleKind,
    /// Initial energies in MeV.
    #[arg(long, num_args = 1.., required = true, value_delimiter = ',')]
    energy: Vec<f64>,
}

impl Subcommand for Opts {
    fn run(&self, _cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let config = Config::from_file(&self.config)
            .with_context(|| format!("reading {}", self.config.display()))?;
        let propagator = Propagator::with_config(self.particle, &config)?;

        let Some(sector) = propagator
            .sectors()
            .iter()
            .find(|sector| sector.location() == Location::InsideDetector)
        else {
            bail!("the configuration defines no inside sector");
        };
        let correction = sector.medium().density_correction;
        let low = propagator.particle().low;

        let mut table = helpers::create_table();
        table.set_titles(row![c->"E [MeV]", c->"range [cm]", c->"range [m]"]);
        for &energy in &self.energy {
            let range = sector.utility().length_continuous(energy, low) / correction;
            table.add_row(row![
                r->format!("{energy:.3e}"),
                r->format!("{range:.6e}"),
                r->format!("{:.3}", range / 100.0)
            ]);
        }
        table.printstd();

        Ok(ExitCode::SUCCESS)
    }
}
