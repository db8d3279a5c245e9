use leptrack::particle::ParticleKind;
use prettytable::format::{FormatBuilder, LinePosition, LineSeparator};
use prettytable::Table;

/// Parses the particle name of the `--particle` option.
pub fn parse_particle(name: &str) -> Result<ParticleKind, String> {
    match name.to_lowercase().as_str() {
        "mu" | "muon" => Ok(ParticleKind::Muon),
        "tau" => Ok(ParticleKind::Tau),
        "e" | "electron" => Ok(ParticleKind::Electron),
        _ => Err(format!("unknown particle: {name}")),
    }
}

/// An empty table with the house format.
#[must_use]
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.set_format(
        FormatBuilder::new()
            .column_separator(' ')
            .separator(LinePosition::Title, LineSeparator::new('-', '+', ' ', ' '))
            .build(),
    );
    table
}
