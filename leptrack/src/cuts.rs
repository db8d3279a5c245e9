//! Boundary between continuous and stochastic energy losses.

use serde::{Deserialize, Serialize};

/// The `(e_cut, v_cut)` pair splitting losses into a continuous part below
/// the cut and stochastic sampling above it. A value of `-1` disables the
/// corresponding member; with both disabled every loss is treated
/// continuously.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct EnergyCutSettings {
    /// Absolute cut in MeV, `-1` to disable.
    pub e_cut: f64,
    /// Relative cut, `-1` to disable.
    pub v_cut: f64,
}

impl EnergyCutSettings {
    /// Creates cut settings; see the type-level documentation for the
    /// disabling convention.
    #[must_use]
    pub const fn new(e_cut: f64, v_cut: f64) -> Self {
        Self { e_cut, v_cut }
    }

    /// Effective relative cut at total energy `energy`:
    /// `min(1, max(v_cut, e_cut / energy))` over the enabled members.
    #[must_use]
    pub fn cut(&self, energy: f64) -> f64 {
        let absolute = if self.e_cut > 0.0 {
            Some(self.e_cut / energy)
        } else {
            None
        };
        let relative = if self.v_cut > 0.0 { Some(self.v_cut) } else { None };

        match (absolute, relative) {
            (Some(a), Some(r)) => a.max(r).min(1.0),
            (Some(a), None) => a.min(1.0),
            (None, Some(r)) => r.min(1.0),
            (None, None) => 1.0,
        }
    }
}

impl Default for EnergyCutSettings {
    /// The inside-the-detector default of 500 MeV with no relative cut.
    fn default() -> Self {
        Self::new(500.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn absolute_cut_scales_with_energy() {
        let cuts = EnergyCutSettings::new(500.0, -1.0);

        assert_approx_eq!(f64, cuts.cut(1e6), 5e-4, epsilon = 1e-12);
        assert_approx_eq!(f64, cuts.cut(1e3), 0.5, epsilon = 1e-12);
        // below the cut energy everything is continuous
        assert_approx_eq!(f64, cuts.cut(100.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn relative_cut_takes_over_at_high_energy() {
        let cuts = EnergyCutSettings::new(500.0, 1e-3);

        // e_cut/E dominates while it exceeds v_cut
        assert_approx_eq!(f64, cuts.cut(1e5), 5e-3, epsilon = 1e-12);
        assert_approx_eq!(f64, cuts.cut(1e7), 1e-3, epsilon = 1e-12);
    }

    #[test]
    fn disabled_cuts_are_fully_continuous() {
        let cuts = EnergyCutSettings::new(-1.0, -1.0);

        assert_approx_eq!(f64, cuts.cut(1e6), 1.0, epsilon = 1e-12);
    }
}
