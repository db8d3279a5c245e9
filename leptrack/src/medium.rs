//! Media traversed by the particle.
//!
//! A medium is a molecular composite. Each constituent nucleus is kept as a
//! single [`Component`] record instead of parallel per-property arrays, so
//! the composition can never fall out of sync.

use crate::constants::AVOGADRO;
use serde::Serialize;

/// One nuclear species of a medium.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Component {
    /// Element symbol.
    pub name: &'static str,
    /// Nuclear charge.
    pub nuclear_charge: f64,
    /// Atomic weight in g/mol.
    pub atomic_weight: f64,
    /// Average weight of one nucleon in MeV.
    pub nucleon_weight: f64,
    /// Atoms of this species per molecule; fractional for mixtures.
    pub atoms_in_molecule: f64,
}

impl Component {
    const fn new(
        name: &'static str,
        nuclear_charge: f64,
        atomic_weight: f64,
        atoms_in_molecule: f64,
    ) -> Self {
        // free proton for hydrogen, the bound-nucleon average otherwise
        let nucleon_weight = if nuclear_charge < 1.5 { 938.272 } else { 931.494 };

        Self {
            name,
            nuclear_charge,
            atomic_weight,
            nucleon_weight,
            atoms_in_molecule,
        }
    }
}

/// A named composite medium with a per-sector density correction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Medium {
    /// Medium name as used by the configuration surface.
    pub name: String,
    /// Mass density in g/cm^3.
    pub mass_density: f64,
    /// Multiplicative correction of the local density, set per sector.
    pub density_correction: f64,
    /// Mean excitation energy in MeV.
    pub ionization_potential: f64,
    /// Radiation length in g/cm^2.
    pub radiation_length: f64,
    /// Constituent nuclei.
    pub components: Vec<Component>,
}

impl Medium {
    /// Looks up a built-in medium by its configuration name. Matching is
    /// case-insensitive.
    #[must_use]
    pub fn from_name(name: &str, density_correction: f64) -> Option<Self> {
        let builtin = match name.to_lowercase().as_str() {
            "water" => Self::builtin(
                "water",
                1.0,
                75.0e-6,
                36.08,
                vec![Component::new("H", 1.0, 1.00794, 2.0), Component::new("O", 8.0, 15.9994, 1.0)],
            ),
            "ice" => Self::builtin(
                "ice",
                0.917,
                75.0e-6,
                36.08,
                vec![Component::new("H", 1.0, 1.00794, 2.0), Component::new("O", 8.0, 15.9994, 1.0)],
            ),
            "standard_rock" | "standardrock" => Self::builtin(
                "standard_rock",
                2.65,
                136.4e-6,
                26.54,
                vec![Component::new("Rk", 11.0, 22.0, 1.0)],
            ),
            "frejus_rock" | "frejusrock" => Self::builtin(
                "frejus_rock",
                2.74,
                149.0e-6,
                27.06,
                vec![Component::new("Fr", 10.12, 20.34, 1.0)],
            ),
            "iron" => Self::builtin(
                "iron",
                7.874,
                286.0e-6,
                13.84,
                vec![Component::new("Fe", 26.0, 55.845, 1.0)],
            ),
            "lead" => Self::builtin(
                "lead",
                11.35,
                823.0e-6,
                6.37,
                vec![Component::new("Pb", 82.0, 207.2, 1.0)],
            ),
            "air" => Self::builtin(
                "air",
                1.205e-3,
                85.7e-6,
                36.66,
                vec![
                    Component::new("N", 7.0, 14.0067, 1.562),
                    Component::new("O", 8.0, 15.9994, 0.42),
                    Component::new("Ar", 18.0, 39.948, 0.01),
                ],
            ),
            _ => return None,
        };

        Some(Self {
            density_correction,
            ..builtin
        })
    }

    fn builtin(
        name: &str,
        mass_density: f64,
        ionization_potential: f64,
        radiation_length: f64,
        components: Vec<Component>,
    ) -> Self {
        Self {
            name: name.to_string(),
            mass_density,
            density_correction: 1.0,
            ionization_potential,
            radiation_length,
            components,
        }
    }

    /// Weight of one molecule in g/mol.
    #[must_use]
    pub fn molecule_weight(&self) -> f64 {
        self.components
            .iter()
            .map(|c| c.atoms_in_molecule * c.atomic_weight)
            .sum()
    }

    /// Molecules per cm^3 at nominal density.
    #[must_use]
    pub fn molecule_density(&self) -> f64 {
        AVOGADRO * self.mass_density / self.molecule_weight()
    }

    /// Atoms of component `index` per cm^3 at nominal density.
    #[must_use]
    pub fn atom_density(&self, index: usize) -> f64 {
        self.molecule_density() * self.components[index].atoms_in_molecule
    }

    /// Ratio of summed nuclear charge to summed atomic weight.
    #[must_use]
    pub fn z_over_a(&self) -> f64 {
        let charge: f64 = self
            .components
            .iter()
            .map(|c| c.atoms_in_molecule * c.nuclear_charge)
            .sum();
        charge / self.molecule_weight()
    }

    /// Radiation length in cm, including the density correction.
    #[must_use]
    pub fn radiation_length_cm(&self) -> f64 {
        self.radiation_length / (self.mass_density * self.density_correction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn unknown_medium_is_rejected() {
        assert!(Medium::from_name("unobtainium", 1.0).is_none());
    }

    #[test]
    fn water_composition() {
        let medium = Medium::from_name("water", 1.0).unwrap();

        assert_eq!(medium.components.len(), 2);
        assert_approx_eq!(f64, medium.molecule_weight(), 18.0153, epsilon = 1e-3);
        // Z/A of water is close to 10/18
        assert_approx_eq!(f64, medium.z_over_a(), 0.555, epsilon = 1e-3);
    }

    #[test]
    fn ice_is_less_dense_than_water() {
        let water = Medium::from_name("water", 1.0).unwrap();
        let ice = Medium::from_name("ice", 1.0).unwrap();

        assert!(ice.mass_density < water.mass_density);
        assert!(ice.molecule_density() < water.molecule_density());
    }

    #[test]
    fn density_correction_scales_the_radiation_length() {
        let nominal = Medium::from_name("ice", 1.0).unwrap();
        let compressed = Medium::from_name("ice", 2.0).unwrap();

        assert_approx_eq!(
            f64,
            nominal.radiation_length_cm(),
            2.0 * compressed.radiation_length_cm(),
            epsilon = 1e-9
        );
    }
}
