//! Physical and numerical constants.
//!
//! Internal units are MeV, cm and s throughout.

/// Speed of light in cm/s.
pub const SPEED: f64 = 2.997_924_58e10;

/// Avogadro constant in 1/mol.
pub const AVOGADRO: f64 = 6.022_140_76e23;

/// Fine-structure constant.
pub const ALPHA: f64 = 7.297_352_569_3e-3;

/// Classical electron radius in cm.
pub const RE: f64 = 2.817_940_326_2e-13;

/// Electron mass in MeV.
pub const ME: f64 = 0.510_998_95;

/// Muon mass in MeV.
pub const MMU: f64 = 105.658_374_5;

/// Tau mass in MeV.
pub const MTAU: f64 = 1776.86;

/// Charged pion mass in MeV.
pub const MPI: f64 = 139.570_39;

/// Muon lifetime at rest in s.
pub const LMU: f64 = 2.196_981_1e-6;

/// Tau lifetime at rest in s.
pub const LTAU: f64 = 2.903e-13;

/// Bethe-Bloch prefactor `4 pi N_A r_e^2 m_e c^2` in MeV cm^2 / mol.
pub const IONK: f64 = 0.307_075;

/// Relative precision target of the Romberg integration.
pub const IPREC: f64 = 1e-6;

/// Tighter precision used by the propagation-utility integrals.
pub const IPREC2: f64 = IPREC * 1e-2;

/// Romberg extrapolation depth.
pub const IROMB: usize = 5;

/// Maximum number of interval refinements; each refinement triples the
/// number of midpoint samples.
pub const IMAXS: usize = 16;

/// Upper end of all energy tabulations in MeV.
pub const BIG_ENERGY: f64 = 1e14;

/// Relative tolerance below which two track lengths are considered equal.
pub const COMPUTER_PRECISION: f64 = 1e-10;

/// Spatial resolution floor in cm; decay weights are clamped with it.
pub const PARTICLE_POSITION_RESOLUTION: f64 = 1e-3;

/// Polynomial order of all interpolated tabulations.
pub const INTERPOLATION_ORDER: usize = 5;

/// Number of nodes on tabulated energy axes.
pub const ENERGY_NODES: usize = 100;

/// Number of nodes on the relative-loss axis of 2D tabulations.
pub const LOSS_NODES: usize = 100;
