use super::helpers;
use super::{GlobalConfiguration, Subcommand};
use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use leptrack::config::Config;
use leptrack::particle::{ParticleKind, ParticleState};
use leptrack::propagator::Propagator;
use leptrack::vector::{Direction, Vector3};
use prettytable::{cell, row, Row};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use rayon::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;

/// Propagates a batch of particles through the configured geometry.
#[derive(Parser)]
pub struct Opts {
    /// Path of the configuration file.
    #[arg(value_hint = ValueHint::FilePath)]
    config: PathBuf,
    /// Particle kind.
    #[arg(default_value = "mu", long, value_parser = helpers::parse_particle)]
    particle: ParticleKind,
    /// Initial energy in MeV.
    #[arg(default_value_t = 1e6, long)]
    energy: f64,
    /// Number of particles.
    #[arg(default_value_t = 1, long)]
    events: usize,
    /// Maximum track length in cm.
    #[arg(default_value_t = 1e9, long)]
    distance: f64,
    /// Override of the configured RNG seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Size of the worker pool; `0` uses all cores.
    #[arg(default_value_t = 0, long)]
    threads: usize,
    /// Print one row per event instead of only the summary.
    #[arg(long)]
    per_event: bool,
}

#[derive(Clone, Copy)]
struct Event {
    result: f64,
    final_energy: f64,
    distance: f64,
    time: f64,
}

impl Subcommand for Opts {
    fn run(&self, _cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let config = Config::from_file(&self.config)
            .with_context(|| format!("reading {}", self.config.display()))?;
        let seed = self.seed.unwrap_or(config.seed);
        let propagator = Propagator::with_config(self.particle, &config)?;

        if self.threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads)
                .build_global()
                .ok();
        }

        // one independent stream per event keeps the batch reproducible
        // under any thread count
        let events: Vec<Event> = (0..self.events)
            .into_par_iter()
            .map(|index| -> Result<Event> {
                let mut rng = Pcg64::seed_from_u64(seed.wrapping_add(index as u64));
                let mut state = ParticleState::new(
                    self.energy,
                    Vector3::default(),
                    Direction::default(),
                );
                let result = propagator.propagate(&mut state, self.distance, &mut rng)?;

                Ok(Event {
                    result,
                    final_energy: state.energy,
                    distance: state.propagated_distance,
                    time: state.time,
                })
            })
            .collect::<Result<_>>()?;

        if self.per_event {
            let mut table = helpers::create_table();
            table.set_titles(row![c->"event", c->"outcome", c->"E_f [MeV]", c->"track [cm]", c->"t [s]"]);
            for (index, event) in events.iter().enumerate() {
                let row = table.add_empty_row();
                row.add_cell(cell!(r->format!("{index}")));
                row.add_cell(cell!(l->outcome_label(event)));
                row.add_cell(cell!(r->format!("{:.6e}", event.final_energy)));
                row.add_cell(cell!(r->format!("{:.6e}", event.distance)));
                row.add_cell(cell!(r->format!("{:.6e}", event.time)));
            }
            table.printstd();
            println!();
        }

        print_summary(&events, self.energy, self.distance);
        Ok(ExitCode::SUCCESS)
    }
}

fn outcome_label(event: &Event) -> &'static str {
    if event.result > 0.0 {
        "transited"
    } else if event.final_energy == 0.0 {
        "decayed"
    } else {
        "stopped"
    }
}

fn print_summary(events: &[Event], initial_energy: f64, distance: f64) {
    let transited = events.iter().filter(|e| e.result > 0.0).count();
    let decayed = events
        .iter()
        .filter(|e| e.result <= 0.0 && e.final_energy == 0.0)
        .count();
    let stopped = events.len() - transited - decayed;

    let mean = |f: &dyn Fn(&Event) -> f64| {
        if events.is_empty() {
            0.0
        } else {
            events.iter().map(|e| f(e)).sum::<f64>() / events.len() as f64
        }
    };

    let mut table = helpers::create_table();
    table.set_titles(row![c->"events", c->"E_i [MeV]", c->"budget [cm]", c->"transited", c->"stopped", c->"decayed", c->"<E_f> [MeV]", c->"<track> [cm]"]);
    table.add_row(Row::new(vec![
        cell!(r->format!("{}", events.len())),
        cell!(r->format!("{initial_energy:.3e}")),
        cell!(r->format!("{distance:.3e}")),
        cell!(r->format!("{transited}")),
        cell!(r->format!("{stopped}")),
        cell!(r->format!("{decayed}")),
        cell!(r->format!("{:.6e}", mean(&|e: &Event| e.final_energy))),
        cell!(r->format!("{:.6e}", mean(&|e: &Event| e.distance))),
    ]));
    table.printstd();
}
