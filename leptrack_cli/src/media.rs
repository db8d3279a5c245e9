use super::helpers;
use super::{GlobalConfiguration, Subcommand};
use anyhow::Result;
use clap::Parser;
use itertools::Itertools;
use leptrack::medium::Medium;
use prettytable::row;
use std::process::ExitCode;

const BUILTIN: [&str; 7] = [
    "air",
    "frejus_rock",
    "ice",
    "iron",
    "lead",
    "standard_rock",
    "water",
];

/// Lists the built-in media and their compositions.
#[derive(Parser)]
pub struct Opts {}

impl Subcommand for Opts {
    fn run(&self, _cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let mut table = helpers::create_table();
        table.set_titles(
            row![c->"medium", c->"rho [g/cm^3]", c->"I [eV]", c->"X0 [g/cm^2]", c->"components"],
        );

        for name in BUILTIN {
            // all BUILTIN names resolve; the expect documents that coupling
            let medium = Medium::from_name(name, 1.0).expect("builtin medium");
            let composition = medium
                .components
                .iter()
                .map(|c| format!("{}({})", c.name, c.atoms_in_molecule))
                .join(" ");

            table.add_row(row![
                l->medium.name,
                r->format!("{:.4}", medium.mass_density),
                r->format!("{:.1}", medium.ionization_potential * 1e6),
                r->format!("{:.2}", medium.radiation_length),
                l->composition
            ]);
        }
        table.printstd();

        Ok(ExitCode::SUCCESS)
    }
}
