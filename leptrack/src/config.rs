//! Text configuration surface.
//!
//! One directive per line, whitespace-tokenised; `#` introduces a line
//! comment. Malformed payloads of value directives warn and keep the
//! documented default, unrecognised directives warn and are skipped, and a
//! geometry line with the wrong token count is fatal.

use crate::crosssection::ProcessSettings;
use crate::error::{Error, Result};
use crate::geometry::{BoxRegion, Cylinder, GeometryEnum, Sphere};
use crate::vector::Vector3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cut settings and the continuous-randomisation switch of one
/// detector-relative region.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct RegionCuts {
    /// Absolute cut in MeV; `-1` disables.
    pub e_cut: f64,
    /// Relative cut; `-1` disables.
    pub v_cut: f64,
    /// Continuous randomisation.
    pub cont: bool,
}

/// One `sector` block: a geometry, optional per-region cut overrides and
/// the closing medium line.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SectorConfig {
    /// The sector's region.
    pub geometry: GeometryEnum,
    /// Override of the inside-the-detector cuts.
    pub inside: Option<RegionCuts>,
    /// Override of the infront-of-the-detector cuts.
    pub infront: Option<RegionCuts>,
    /// Override of the behind-the-detector cuts.
    pub behind: Option<RegionCuts>,
    /// Medium name.
    pub medium: String,
    /// Local density correction.
    pub density_correction: f64,
}

/// Parsed configuration.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// RNG seed.
    pub seed: u64,
    /// Parametrisation ids, multipliers and process flags.
    pub settings: ProcessSettings,
    /// Global inside-region cuts used by blocks without an override.
    pub global_inside: RegionCuts,
    /// Global infront-region cuts.
    pub global_infront: RegionCuts,
    /// Global behind-region cuts.
    pub global_behind: RegionCuts,
    /// Moliere scattering.
    pub moliere: bool,
    /// Exact elapsed-time integration.
    pub exact_time: bool,
    /// Evaluate all integrals on demand instead of building tables.
    pub integrate: bool,
    /// Directory of the interpolation-table cache.
    pub path_to_tables: Option<PathBuf>,
    /// Detector geometry.
    pub detector: Option<GeometryEnum>,
    /// Sector blocks in declaration order.
    pub sectors: Vec<SectorConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 1,
            settings: ProcessSettings::default(),
            global_inside: RegionCuts {
                e_cut: 500.0,
                v_cut: -1.0,
                cont: false,
            },
            global_infront: RegionCuts {
                e_cut: -1.0,
                v_cut: 0.001,
                cont: true,
            },
            global_behind: RegionCuts {
                e_cut: -1.0,
                v_cut: -1.0,
                cont: false,
            },
            moliere: false,
            exact_time: false,
            integrate: false,
            path_to_tables: None,
            detector: None,
            sectors: Vec::new(),
        }
    }
}

impl Config {
    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or a geometry line is malformed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&text)
    }

    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Fails on malformed geometry lines and on sector blocks that do not
    /// close with a `medium` line.
    pub fn parse(text: &str) -> Result<Self> {
        let mut config = Self::default();
        let mut lines = text.lines().map(strip_comment);

        while let Some(line) = lines.next() {
            let mut tokens = line.split_whitespace();
            let Some(directive) = tokens.next() else {
                continue;
            };

            match directive.to_lowercase().as_str() {
                "global" => {}
                "seed" => {
                    config.seed = parse_or(tokens.next(), 1, "seed must be an integer");
                }
                "brems" => {
                    config.settings.brems_id =
                        parse_or(tokens.next(), 1, "brems id must be an integer");
                }
                "photo" => {
                    config.settings.photo_id =
                        parse_or(tokens.next(), 12, "photo id must be an integer");
                }
                "brems_multiplier" => {
                    config.settings.brems_multiplier =
                        parse_or(tokens.next(), 1.0, "brems multiplier must be a double");
                }
                "photo_multiplier" => {
                    config.settings.photo_multiplier =
                        parse_or(tokens.next(), 1.0, "photo multiplier must be a double");
                }
                "epair_multiplier" => {
                    config.settings.epair_multiplier =
                        parse_or(tokens.next(), 1.0, "epair multiplier must be a double");
                }
                "ioniz_multiplier" => {
                    config.settings.ioniz_multiplier =
                        parse_or(tokens.next(), 1.0, "ioniz multiplier must be a double");
                }
                "ecut_inside" => {
                    config.global_inside.e_cut =
                        parse_or(tokens.next(), 500.0, "ecut_inside must be a double");
                }
                "ecut_infront" => {
                    config.global_infront.e_cut =
                        parse_or(tokens.next(), -1.0, "ecut_infront must be a double");
                }
                "ecut_behind" => {
                    config.global_behind.e_cut =
                        parse_or(tokens.next(), -1.0, "ecut_behind must be a double");
                }
                "vcut_inside" => {
                    config.global_inside.v_cut =
                        parse_or(tokens.next(), -1.0, "vcut_inside must be a double");
                }
                "vcut_infront" => {
                    config.global_infront.v_cut =
                        parse_or(tokens.next(), 0.001, "vcut_infront must be a double");
                }
                "vcut_behind" => {
                    config.global_behind.v_cut =
                        parse_or(tokens.next(), -1.0, "vcut_behind must be a double");
                }
                "cont_inside" => {
                    config.global_inside.cont =
                        parse_bool_or(tokens.next(), false, "cont_inside must be a bool");
                }
                "cont_infront" => {
                    config.global_infront.cont =
                        parse_bool_or(tokens.next(), true, "cont_infront must be a bool");
                }
                "cont_behind" => {
                    config.global_behind.cont =
                        parse_bool_or(tokens.next(), false, "cont_behind must be a bool");
                }
                "lpm" => config.settings.lpm = true,
                "moliere" => config.moliere = true,
                "exact_time" => config.exact_time = true,
                "integrate" => config.integrate = true,
                "path_to_tables" => {
                    config.path_to_tables = tokens.next().map(PathBuf::from);
                }
                "detector" => {
                    let geometry = parse_geometry_line(&mut lines)?;
                    if config.detector.is_some() {
                        log::warn!("detector already specified; this one is ignored");
                    } else {
                        config.detector = Some(geometry);
                    }
                }
                "sector" => {
                    config.sectors.push(parse_sector_block(&mut lines)?);
                }
                other => {
                    log::warn!("unrecognized option: {other}");
                }
            }
        }

        Ok(config)
    }
}

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or("")
}

fn parse_or<T: std::str::FromStr + Copy>(token: Option<&str>, default: T, message: &str) -> T {
    token.and_then(|t| t.parse().ok()).unwrap_or_else(|| {
        log::warn!("{message}; using the default");
        default
    })
}

fn parse_bool_or(token: Option<&str>, default: bool, message: &str) -> bool {
    match token {
        Some("1") | Some("true") => true,
        Some("0") | Some("false") => false,
        _ => {
            log::warn!("{message}; using the default");
            default
        }
    }
}

/// Advances to the first non-empty line and parses it as a geometry.
fn parse_geometry_line<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
) -> Result<GeometryEnum> {
    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        return parse_geometry(&tokens);
    }

    Err(Error::Config("expected a geometry line".to_string()))
}

/// `cylinder r h | cylinder r r_in h | cylinder ox oy oz r r_in h`,
/// `sphere r | sphere r r_in | sphere ox oy oz r r_in`,
/// `box wx wy wz | box ox oy oz wx wy wz`. Wrong token counts are fatal.
fn parse_geometry(tokens: &[&str]) -> Result<GeometryEnum> {
    let kind = tokens[0].to_lowercase();
    let values = &tokens[1..];

    match kind.as_str() {
        "cylinder" => {
            let (origin, radius, inner_radius, height) = match values.len() {
                2 => (
                    Vector3::default(),
                    required(values[0], "radius")?,
                    0.0,
                    required(values[1], "height")?,
                ),
                3 => (
                    Vector3::default(),
                    required(values[0], "radius")?,
                    optional(values[1], "inner_radius"),
                    required(values[2], "height")?,
                ),
                6 => (
                    parse_origin(&values[..3]),
                    required(values[3], "radius")?,
                    optional(values[4], "inner_radius"),
                    required(values[5], "height")?,
                ),
                count => {
                    return Err(Error::Config(format!(
                        "cylinder takes 2, 3 or 6 values, got {count}"
                    )))
                }
            };
            Ok(GeometryEnum::from(Cylinder {
                origin,
                radius,
                inner_radius,
                height,
            }))
        }
        "sphere" => {
            let (origin, radius, inner_radius) = match values.len() {
                1 => (Vector3::default(), required(values[0], "radius")?, 0.0),
                2 => (
                    Vector3::default(),
                    required(values[0], "radius")?,
                    optional(values[1], "inner_radius"),
                ),
                5 => (
                    parse_origin(&values[..3]),
                    required(values[3], "radius")?,
                    optional(values[4], "inner_radius"),
                ),
                count => {
                    return Err(Error::Config(format!(
                        "sphere takes 1, 2 or 5 values, got {count}"
                    )))
                }
            };
            Ok(GeometryEnum::from(Sphere {
                origin,
                radius,
                inner_radius,
            }))
        }
        "box" => {
            let (origin, widths) = match values.len() {
                3 => (Vector3::default(), &values[..3]),
                6 => (parse_origin(&values[..3]), &values[3..]),
                count => {
                    return Err(Error::Config(format!(
                        "box takes 3 or 6 values, got {count}"
                    )))
                }
            };
            Ok(GeometryEnum::from(BoxRegion {
                origin,
                width_x: required(widths[0], "width")?,
                width_y: required(widths[1], "width")?,
                width_z: required(widths[2], "width")?,
            }))
        }
        other => Err(Error::Config(format!("unknown geometry kind: {other}"))),
    }
}

fn required(token: &str, name: &str) -> Result<f64> {
    token
        .parse()
        .map_err(|_| Error::Config(format!("{name} must be a double, got '{token}'")))
}

fn optional(token: &str, name: &str) -> f64 {
    token.parse().unwrap_or_else(|_| {
        log::warn!("{name} must be a double; using 0");
        0.0
    })
}

fn parse_origin(tokens: &[&str]) -> Vector3 {
    Vector3::new(
        optional(tokens[0], "origin_x"),
        optional(tokens[1], "origin_y"),
        optional(tokens[2], "origin_z"),
    )
}

/// A `sector` block: a geometry line, optional `inside|infront|behind`
/// cut lines and the closing `medium <name> <density_correction>` line.
fn parse_sector_block<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
) -> Result<SectorConfig> {
    let geometry = parse_geometry_line(lines)?;

    let mut inside = None;
    let mut infront = None;
    let mut behind = None;

    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&directive) = tokens.first() else {
            continue;
        };

        match directive.to_lowercase().as_str() {
            "inside" => inside = parse_region_cuts(&tokens[1..], "inside"),
            "infront" => infront = parse_region_cuts(&tokens[1..], "infront"),
            "behind" => behind = parse_region_cuts(&tokens[1..], "behind"),
            "medium" => {
                let name = tokens
                    .get(1)
                    .ok_or_else(|| Error::Config("medium line needs a name".to_string()))?;
                let density_correction = tokens.get(2).map_or(1.0, |t| optional(t, "density correction"));

                return Ok(SectorConfig {
                    geometry,
                    inside,
                    infront,
                    behind,
                    medium: (*name).to_string(),
                    density_correction,
                });
            }
            other => {
                return Err(Error::Config(format!(
                    "sector block must end with 'medium', found '{other}'"
                )))
            }
        }
    }

    Err(Error::Config(
        "sector block is missing its 'medium' line".to_string(),
    ))
}

fn parse_region_cuts(tokens: &[&str], region: &str) -> Option<RegionCuts> {
    if tokens.len() != 3 {
        log::warn!(
            "expected 3 parameters after '{region}'; using the global cut settings"
        );
        return None;
    }

    Some(RegionCuts {
        e_cut: parse_or(Some(tokens[0]), -1.0, "ecut must be a double"),
        v_cut: parse_or(Some(tokens[1]), -1.0, "vcut must be a double"),
        cont: parse_bool_or(Some(tokens[2]), false, "cont must be a bool"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = Config::parse("").unwrap();

        assert_eq!(config.seed, 1);
        assert_eq!(config.settings.brems_id, 1);
        assert_eq!(config.settings.photo_id, 12);
        assert_eq!(config.global_inside.e_cut, 500.0);
        assert_eq!(config.global_infront.v_cut, 0.001);
        assert!(config.global_infront.cont);
        assert!(!config.moliere);
        assert!(config.detector.is_none());
    }

    #[test]
    fn parses_a_complete_file() {
        let text = "\
# example configuration
seed 42
brems 1
photo 12
brems_multiplier 0.9
ecut_inside 400
vcut_inside 1e-3
cont_inside 1
moliere
exact_time
path_to_tables /tmp/tables

detector
cylinder 0 0 0 80000 0 160000

sector
sphere 1e6
inside 400 1e-3 1
medium ice 0.832
";
        let config = Config::parse(text).unwrap();

        assert_eq!(config.seed, 42);
        assert!((config.settings.brems_multiplier - 0.9).abs() < 1e-12);
        assert_eq!(config.global_inside.e_cut, 400.0);
        assert!(config.global_inside.cont);
        assert!(config.moliere);
        assert!(config.exact_time);
        assert_eq!(
            config.path_to_tables.as_deref(),
            Some(std::path::Path::new("/tmp/tables"))
        );
        assert!(config.detector.is_some());

        assert_eq!(config.sectors.len(), 1);
        let sector = &config.sectors[0];
        assert_eq!(sector.medium, "ice");
        assert!((sector.density_correction - 0.832).abs() < 1e-12);
        let inside = sector.inside.unwrap();
        assert_eq!(inside.e_cut, 400.0);
        assert!(inside.cont);
        assert!(sector.infront.is_none());
    }

    #[test]
    fn malformed_value_keeps_the_default() {
        let config = Config::parse("seed not_a_number\necut_inside abc\n").unwrap();

        assert_eq!(config.seed, 1);
        assert_eq!(config.global_inside.e_cut, 500.0);
    }

    #[test]
    fn unrecognized_directive_is_skipped() {
        let config = Config::parse("frobnicate 3\nseed 7\n").unwrap();

        assert_eq!(config.seed, 7);
    }

    #[test]
    fn wrong_geometry_token_count_is_fatal() {
        let result = Config::parse("detector\ncylinder 100\n");

        assert!(result.is_err());
    }

    #[test]
    fn second_detector_is_ignored() {
        let text = "detector\nsphere 100\ndetector\nsphere 200\n";
        let config = Config::parse(text).unwrap();

        assert_eq!(
            config.detector,
            Some(GeometryEnum::from(Sphere {
                origin: Vector3::default(),
                radius: 100.0,
                inner_radius: 0.0,
            }))
        );
    }

    #[test]
    fn sector_block_without_medium_is_fatal() {
        let result = Config::parse("sector\nsphere 100\ninside 500 -1 0\n");

        assert!(result.is_err());
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let text = "
# leading comment
seed 9   # trailing comment

   # indented comment
";
        let config = Config::parse(text).unwrap();

        assert_eq!(config.seed, 9);
    }
}
