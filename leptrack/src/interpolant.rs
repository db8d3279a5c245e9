//! Tabulated function reconstruction.
//!
//! One- and two-dimensional tables over uniform (optionally log-spaced) axes
//! with Lagrange or rational reconstruction in a window of `order + 1`
//! nodes. The one-dimensional table additionally supports inversion of a
//! monotone tabulation via [`Interpolant1D::find_limit`].

use arrayvec::ArrayVec;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

const MAX_INTERP_ORDER_PLUS_ONE: usize = 8;

/// Uniform axis, stored in mapped coordinates (`ln x` for log axes).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Axis {
    min: f64,
    max: f64,
    nodes: usize,
    log: bool,
}

impl Axis {
    /// Creates an axis over `[min, max]` with the given node count.
    ///
    /// # Panics
    ///
    /// Panics if the bounds are not ordered, if fewer than two nodes are
    /// requested or if a log axis has a non-positive lower bound.
    #[must_use]
    pub fn new(min: f64, max: f64, nodes: usize, log: bool) -> Self {
        assert!(min < max);
        assert!(nodes > 1);
        assert!(!log || min > 0.0);

        let (min, max) = if log { (min.ln(), max.ln()) } else { (min, max) };

        Self {
            min,
            max,
            nodes,
            log,
        }
    }

    /// Number of nodes.
    #[must_use]
    pub const fn nodes(&self) -> usize {
        self.nodes
    }

    /// Lower bound in unmapped coordinates.
    #[must_use]
    pub fn low(&self) -> f64 {
        self.unmap(self.min)
    }

    /// Upper bound in unmapped coordinates.
    #[must_use]
    pub fn high(&self) -> f64 {
        self.unmap(self.max)
    }

    /// Position of node `index` in unmapped coordinates.
    #[must_use]
    pub fn node(&self, index: usize) -> f64 {
        self.unmap(self.coordinate(index))
    }

    fn delta(&self) -> f64 {
        (self.max - self.min) / (self.nodes - 1) as f64
    }

    fn coordinate(&self, index: usize) -> f64 {
        (index as f64).mul_add(self.delta(), self.min)
    }

    fn map(&self, x: f64) -> f64 {
        if self.log {
            x.ln()
        } else {
            x
        }
    }

    fn unmap(&self, t: f64) -> f64 {
        if self.log {
            t.exp()
        } else {
            t
        }
    }

    /// Window of `order + 1` nodes around `x`, clamped into the axis.
    /// Returns the first node index and the fractional offset of `x` from it
    /// in units of the node spacing.
    fn window(&self, x: f64, order: usize) -> (usize, f64) {
        let t = self.map(x).clamp(self.min, self.max);
        let raw = (t - self.min) / self.delta() - (order / 2) as f64;
        let index = if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.nodes - order - 1)
        };
        let fraction = (t - self.coordinate(index)) / self.delta();

        (index, fraction)
    }
}

/// Lagrange basis weight of `node` among the `order + 1` uniform window
/// nodes, evaluated at the fractional offset `u` from the first node.
fn node_weight(node: usize, order: usize, u: f64) -> f64 {
    (0..=order)
        .filter(|&other| other != node)
        .map(|other| (u - other as f64) / (node as f64 - other as f64))
        .product()
}

/// Diagonal rational reconstruction after Stoer and Bulirsch on the window
/// nodes, with `u` the fractional offset from the first node.
fn rational_reconstruct(values: &[f64], u: f64) -> f64 {
    const TINY: f64 = 1e-30;
    let n = values.len();
    let rounded = u.round().clamp(0.0, (n - 1) as f64);
    if (u - rounded).abs() < 1e-12 {
        return values[rounded as usize];
    }

    let mut c: ArrayVec<f64, MAX_INTERP_ORDER_PLUS_ONE> = values.iter().copied().collect();
    let mut d: ArrayVec<f64, MAX_INTERP_ORDER_PLUS_ONE> =
        values.iter().map(|&y| y + TINY).collect();

    let mut nearest = rounded as isize;
    let mut result = values[nearest as usize];
    nearest -= 1;

    for m in 1..n {
        for i in 0..n - m {
            let w = c[i + 1] - d[i];
            let hp = (i + m) as f64 - u;
            let t = (i as f64 - u) * d[i] / hp;
            let den = t - c[i + 1];
            if den == 0.0 {
                // pole on the evaluation point
                return lagrange_reconstruct(values, u);
            }
            let den = w / den;
            d[i] = c[i + 1] * den;
            c[i] = t * den;
        }

        let correction = if 2 * (nearest + 1) < (n - m) as isize {
            c[(nearest + 1) as usize]
        } else {
            let value = d[nearest as usize];
            nearest -= 1;
            value
        };
        result += correction;
    }

    result
}

fn lagrange_reconstruct(values: &[f64], u: f64) -> f64 {
    let order = values.len() - 1;
    values
        .iter()
        .enumerate()
        .map(|(node, &y)| y * node_weight(node, order, u))
        .sum()
}

fn reconstruct(values: &[f64], u: f64, rational: bool) -> f64 {
    if rational {
        rational_reconstruct(values, u)
    } else {
        lagrange_reconstruct(values, u)
    }
}

/// One-dimensional tabulation with windowed reconstruction.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Interpolant1D {
    axis: Axis,
    values: Vec<f64>,
    order: usize,
    rational: bool,
}

impl Interpolant1D {
    /// Tabulates `f` on the axis nodes.
    ///
    /// # Panics
    ///
    /// Panics if the axis has fewer nodes than `order + 1` or if `order`
    /// exceeds the supported maximum.
    pub fn build(axis: Axis, order: usize, rational: bool, f: impl Fn(f64) -> f64) -> Self {
        assert!(order > 0);
        assert!(order < MAX_INTERP_ORDER_PLUS_ONE);
        assert!(axis.nodes() > order);

        let values = (0..axis.nodes()).map(|i| f(axis.node(i))).collect();

        Self {
            axis,
            values,
            order,
            rational,
        }
    }

    /// Constructs a tabulation from precomputed node values.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`Self::build`] or when the value
    /// count does not match the axis.
    #[must_use]
    pub fn from_values(axis: Axis, order: usize, rational: bool, values: Vec<f64>) -> Self {
        assert!(order > 0);
        assert!(order < MAX_INTERP_ORDER_PLUS_ONE);
        assert!(axis.nodes() > order);
        assert_eq!(axis.nodes(), values.len());

        Self {
            axis,
            values,
            order,
            rational,
        }
    }

    /// The tabulation axis.
    #[must_use]
    pub const fn axis(&self) -> &Axis {
        &self.axis
    }

    /// Reconstructs the tabulated function at `x`. Points outside the axis
    /// clamp to the nearest bound.
    #[must_use]
    pub fn interpolate(&self, x: f64) -> f64 {
        let (index, fraction) = self.axis.window(x, self.order);
        let window = &self.values[index..=index + self.order];

        reconstruct(window, fraction, self.rational)
    }

    /// Solves `interpolate(t) = y` for `t`, assuming the tabulated values
    /// are monotone. Ties resolve to the smaller `t`; targets outside the
    /// tabulated range clamp to the corresponding axis bound.
    #[must_use]
    pub fn find_limit(&self, y: f64) -> f64 {
        let increasing = self.values[self.values.len() - 1] >= self.values[0];

        // first segment that brackets the target
        let segment = self
            .values
            .windows(2)
            .position(|pair| {
                let (lo, hi) = if increasing {
                    (pair[0], pair[1])
                } else {
                    (pair[1], pair[0])
                };
                lo <= y && y <= hi
            });

        let Some(segment) = segment else {
            let below = if increasing {
                y < self.values[0]
            } else {
                y > self.values[0]
            };
            return if below { self.axis.low() } else { self.axis.high() };
        };

        let mut lo = self.axis.node(segment);
        let mut hi = self.axis.node(segment + 1);
        let mut t = 0.5 * (lo + hi);

        for _ in 0..64 {
            let value = self.interpolate(t);
            let low_side = if increasing { value < y } else { value > y };
            if low_side {
                lo = t;
            } else {
                hi = t;
            }

            // Newton step from a secant through the bracket, falling back to
            // its midpoint when it leaves the bracket
            let f_lo = self.interpolate(lo);
            let f_hi = self.interpolate(hi);
            let slope = (f_hi - f_lo) / (hi - lo);
            let candidate = if slope != 0.0 { lo + (y - f_lo) / slope } else { 0.5 * (lo + hi) };
            t = if candidate > lo && candidate < hi {
                candidate
            } else {
                0.5 * (lo + hi)
            };

            if (hi - lo).abs() <= 1e-14 * hi.abs().max(1.0) {
                break;
            }
        }

        t
    }
}

/// Two-dimensional tensor-product tabulation; evaluation reconstructs along
/// the second axis first, then across the first.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Interpolant2D {
    x_axis: Axis,
    y_axis: Axis,
    values: Array2<f64>,
    x_order: usize,
    y_order: usize,
    x_rational: bool,
    y_rational: bool,
}

impl Interpolant2D {
    /// Tabulates `f` on the tensor-product grid.
    ///
    /// # Panics
    ///
    /// Panics under the axis/order conditions of [`Interpolant1D::build`].
    pub fn build(
        x_axis: Axis,
        y_axis: Axis,
        x_order: usize,
        y_order: usize,
        x_rational: bool,
        y_rational: bool,
        f: impl Fn(f64, f64) -> f64,
    ) -> Self {
        assert!(x_order > 0 && x_order < MAX_INTERP_ORDER_PLUS_ONE);
        assert!(y_order > 0 && y_order < MAX_INTERP_ORDER_PLUS_ONE);
        assert!(x_axis.nodes() > x_order);
        assert!(y_axis.nodes() > y_order);

        let values = Array2::from_shape_fn((x_axis.nodes(), y_axis.nodes()), |(i, j)| {
            f(x_axis.node(i), y_axis.node(j))
        });

        Self {
            x_axis,
            y_axis,
            values,
            x_order,
            y_order,
            x_rational,
            y_rational,
        }
    }

    /// The first axis.
    #[must_use]
    pub const fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    /// The second axis.
    #[must_use]
    pub const fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    /// Reconstructs the tabulated function at `(x, y)`.
    #[must_use]
    pub fn interpolate(&self, x: f64, y: f64) -> f64 {
        let (x_index, x_fraction) = self.x_axis.window(x, self.x_order);
        let (y_index, y_fraction) = self.y_axis.window(y, self.y_order);

        let rows: ArrayVec<f64, MAX_INTERP_ORDER_PLUS_ONE> = (x_index..=x_index + self.x_order)
            .map(|i| {
                let row = self.values.row(i);
                let window: ArrayVec<f64, MAX_INTERP_ORDER_PLUS_ONE> =
                    (y_index..=y_index + self.y_order).map(|j| row[j]).collect();
                reconstruct(&window, y_fraction, self.y_rational)
            })
            .collect();

        reconstruct(&rows, x_fraction, self.x_rational)
    }

    /// Solves `interpolate(x, t) = target` for `t` at fixed `x`, assuming
    /// the profile along the second axis is monotone.
    #[must_use]
    pub fn find_limit(&self, x: f64, target: f64) -> f64 {
        let profile = |t: f64| self.interpolate(x, t);
        let n = self.y_axis.nodes();
        let first = profile(self.y_axis.node(0));
        let last = profile(self.y_axis.node(n - 1));
        let increasing = last >= first;

        let mut bracket = None;
        let mut previous = first;
        for j in 1..n {
            let value = profile(self.y_axis.node(j));
            let (lo, hi) = if increasing {
                (previous, value)
            } else {
                (value, previous)
            };
            if lo <= target && target <= hi {
                bracket = Some(j - 1);
                break;
            }
            previous = value;
        }

        let Some(segment) = bracket else {
            let below = if increasing { target < first } else { target > first };
            return if below {
                self.y_axis.low()
            } else {
                self.y_axis.high()
            };
        };

        let mut lo = self.y_axis.node(segment);
        let mut hi = self.y_axis.node(segment + 1);
        let mut t = 0.5 * (lo + hi);

        for _ in 0..64 {
            let value = profile(t);
            let low_side = if increasing { value < target } else { value > target };
            if low_side {
                lo = t;
            } else {
                hi = t;
            }
            t = 0.5 * (lo + hi);
            if (hi - lo).abs() <= 1e-14 * hi.abs().max(1.0) {
                break;
            }
        }

        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn reconstructs_a_cubic_exactly() {
        let axis = Axis::new(0.0, 10.0, 21, false);
        let table = Interpolant1D::build(axis, 3, false, |x| x.mul_add(x * x, -2.0 * x));

        for &x in &[0.3, 1.7, 4.9, 8.05, 9.99] {
            assert_approx_eq!(
                f64,
                table.interpolate(x),
                x.mul_add(x * x, -2.0 * x),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn log_axis_tracks_a_power_law() {
        let axis = Axis::new(1.0, 1e6, 60, true);
        let table = Interpolant1D::build(axis, 5, false, |x| x.powf(1.5));

        for &x in &[2.0f64, 42.0, 1.3e3, 7.7e5] {
            let exact = x.powf(1.5);
            let value = table.interpolate(x);
            assert!(((value - exact) / exact).abs() < 1e-5);
        }
    }

    #[test]
    fn clamps_outside_the_axis() {
        let axis = Axis::new(1.0, 2.0, 5, false);
        let table = Interpolant1D::build(axis, 2, false, |x| x);

        assert_approx_eq!(f64, table.interpolate(0.0), 1.0, epsilon = 1e-12);
        assert_approx_eq!(f64, table.interpolate(5.0), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn find_limit_inverts_a_monotone_table() {
        let axis = Axis::new(1.0, 100.0, 50, true);
        let table = Interpolant1D::build(axis, 5, false, f64::ln);

        for &y in &[0.1, 1.0, 3.3, 4.0] {
            let t = table.find_limit(y);
            assert_approx_eq!(f64, t.ln(), y, epsilon = 1e-8);
        }
    }

    #[test]
    fn find_limit_clamps_unreachable_targets() {
        let axis = Axis::new(1.0, 100.0, 50, true);
        let table = Interpolant1D::build(axis, 5, false, f64::ln);

        assert_approx_eq!(f64, table.find_limit(-1.0), 1.0, epsilon = 1e-9);
        assert_approx_eq!(f64, table.find_limit(10.0), 100.0, epsilon = 1e-6);
    }

    #[test]
    fn rational_fit_handles_smooth_ratios() {
        let axis = Axis::new(0.5, 4.0, 30, false);
        let table = Interpolant1D::build(axis, 4, true, |x| 1.0 / (1.0 + x));

        for &x in &[0.75, 1.9, 3.6] {
            let exact = 1.0 / (1.0 + x);
            assert!(((table.interpolate(x) - exact) / exact).abs() < 1e-7);
        }
    }

    #[test]
    fn two_dimensional_reconstruction() {
        let x_axis = Axis::new(1.0, 1e4, 40, true);
        let y_axis = Axis::new(0.0, 1.0, 30, false);
        let table =
            Interpolant2D::build(x_axis, y_axis, 3, 3, false, false, |x, y| x.ln() * (1.0 + y * y));

        for &(x, y) in &[(3.0f64, 0.2), (120.0, 0.77), (9.5e3, 0.5)] {
            let exact = x.ln() * (1.0 + y * y);
            let value = table.interpolate(x, y);
            assert!(((value - exact) / exact).abs() < 1e-4);
        }
    }

    #[test]
    fn two_dimensional_find_limit() {
        let x_axis = Axis::new(1.0, 1e4, 40, true);
        let y_axis = Axis::new(0.0, 1.0, 30, false);
        let table = Interpolant2D::build(x_axis, y_axis, 3, 3, false, false, |x, y| x.ln() * y);

        let x: f64 = 50.0;
        let target = 0.25 * x.ln();
        let t = table.find_limit(x, target);
        assert_approx_eq!(f64, t, 0.25, epsilon = 1e-6);
    }
}
