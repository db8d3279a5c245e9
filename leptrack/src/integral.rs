//! Adaptive Romberg quadrature over open intervals.
//!
//! The integrator refines by midpoint tripling and extrapolates the stage
//! estimates to vanishing step width. Besides the ordinary definite integral
//! it supports a log-substituted variant for integrands that are better
//! conditioned in `ln x`, and an inverting variant that finds the point at
//! which the running integral reaches a requested weight in the same
//! traversal that produces the total.

use crate::constants::{IMAXS, IPREC, IROMB};

/// Result of an inverting integration.
///
/// `integral` is the signed integral over the full requested range;
/// `upper_limit` is the point `xi` between the bounds at which the weight
/// accumulated from the first bound reaches the requested target.
#[derive(Clone, Copy, Debug)]
pub struct Inverted {
    /// Signed integral from the first to the second bound.
    pub integral: f64,
    /// Stopping point of the accumulated weight.
    pub upper_limit: f64,
}

/// Adaptive Romberg integrator.
#[derive(Clone, Debug)]
pub struct Integral {
    romberg: usize,
    max_steps: usize,
    precision: f64,
}

impl Default for Integral {
    fn default() -> Self {
        Self::new(IROMB, IMAXS, IPREC)
    }
}

impl Integral {
    /// Creates an integrator with the given extrapolation depth, maximum
    /// number of refinements and relative precision target.
    ///
    /// # Panics
    ///
    /// Panics if `romberg` is zero or larger than `max_steps`.
    #[must_use]
    pub fn new(romberg: usize, max_steps: usize, precision: f64) -> Self {
        assert!(romberg > 0);
        assert!(romberg <= max_steps);

        Self {
            romberg,
            max_steps,
            precision,
        }
    }

    /// Numerical `int_a^b f`. Bounds may be given in either order; the usual
    /// orientation sign applies. A non-finite integrand value poisons the
    /// result to NaN, which callers treat as "no contribution".
    pub fn integrate(&self, a: f64, b: f64, f: impl Fn(f64) -> f64) -> f64 {
        if a == b {
            return 0.0;
        }
        let (lo, hi, sign) = orient(a, b);
        sign * self.romberg_core(lo, hi, &f, None)
    }

    /// Same as [`Self::integrate`] under the substitution `u = ln x`; both
    /// bounds must be positive.
    pub fn integrate_with_log(&self, a: f64, b: f64, f: impl Fn(f64) -> f64) -> f64 {
        if a == b {
            return 0.0;
        }
        if a <= 0.0 || b <= 0.0 {
            return f64::NAN;
        }
        let (lo, hi, sign) = orient(a.ln(), b.ln());
        let g = |u: f64| {
            let x = u.exp();
            f(x) * x
        };
        sign * self.romberg_core(lo, hi, &g, None)
    }

    /// Integrates `f` from `a` to `b` while accumulating weight from the
    /// `a` side, and reports the point at which the accumulated magnitude
    /// reaches `target`.
    ///
    /// The stopping point is located on the finest midpoint grid of the
    /// converged refinement and polished with a few Newton corrections, so
    /// no repeated full integrations are performed. A `target` at or beyond
    /// the total weight saturates to `b`.
    pub fn integrate_with_random_ratio(
        &self,
        a: f64,
        b: f64,
        f: impl Fn(f64) -> f64,
        target: f64,
    ) -> Inverted {
        if a == b || target <= 0.0 {
            return Inverted {
                integral: 0.0,
                upper_limit: a,
            };
        }

        let (lo, hi, sign) = orient(a, b);
        let mut samples = Vec::new();
        let total = self.romberg_core(lo, hi, &f, Some(&mut samples));
        let from_low = a < b;
        let upper_limit = invert_on_samples(lo, hi, &f, &samples, total, target, from_low);

        Inverted {
            integral: sign * total,
            upper_limit,
        }
    }

    /// Log-substituted variant of [`Self::integrate_with_random_ratio`];
    /// both bounds must be positive.
    pub fn integrate_with_log_random_ratio(
        &self,
        a: f64,
        b: f64,
        f: impl Fn(f64) -> f64,
        target: f64,
    ) -> Inverted {
        if a == b || target <= 0.0 {
            return Inverted {
                integral: 0.0,
                upper_limit: a,
            };
        }
        if a <= 0.0 || b <= 0.0 {
            return Inverted {
                integral: f64::NAN,
                upper_limit: a,
            };
        }

        let g = |u: f64| {
            let x = u.exp();
            f(x) * x
        };
        let inner = self.integrate_with_random_ratio(a.ln(), b.ln(), g, target);

        Inverted {
            integral: inner.integral,
            upper_limit: inner.upper_limit.exp(),
        }
    }

    /// Midpoint-tripling refinement with Romberg extrapolation at `h -> 0`.
    /// When `samples` is given, every integrand evaluation is recorded; the
    /// union over all stages is the uniform midpoint grid of the last stage.
    fn romberg_core(
        &self,
        lo: f64,
        hi: f64,
        f: &dyn Fn(f64) -> f64,
        mut samples: Option<&mut Vec<(f64, f64)>>,
    ) -> f64 {
        let mut stage_sum = 0.0;
        let mut heights = Vec::with_capacity(self.max_steps);
        let mut estimates = Vec::with_capacity(self.max_steps);
        let mut h = 1.0;

        for step in 1..=self.max_steps {
            stage_sum = midpoint_stage(lo, hi, f, step, stage_sum, samples.as_deref_mut());
            if !stage_sum.is_finite() {
                return f64::NAN;
            }

            heights.push(h);
            estimates.push(stage_sum);
            // midpoint error terms scale with h^2; tripling divides them by 9
            h /= 9.0;

            if step >= self.romberg {
                let tail = step - self.romberg;
                let (value, error) =
                    extrapolate_to_zero(&heights[tail..], &estimates[tail..]);
                if error.abs() <= self.precision * value.abs() {
                    return value;
                }
            }
        }

        log::warn!(
            "integral over [{lo}, {hi}] did not converge to {} within {} refinements",
            self.precision,
            self.max_steps
        );
        let tail = self.max_steps - self.romberg;
        extrapolate_to_zero(&heights[tail..], &estimates[tail..]).0
    }
}

fn orient(a: f64, b: f64) -> (f64, f64, f64) {
    if a < b {
        (a, b, 1.0)
    } else {
        (b, a, -1.0)
    }
}

/// One stage of the open midpoint rule. Stage `n` adds `2 * 3^(n-2)` points
/// (one point for `n = 1`) and returns the refined estimate.
fn midpoint_stage(
    lo: f64,
    hi: f64,
    f: &dyn Fn(f64) -> f64,
    stage: usize,
    previous: f64,
    mut samples: Option<&mut Vec<(f64, f64)>>,
) -> f64 {
    let mut record = |x: f64, fx: f64| {
        if let Some(store) = samples.as_deref_mut() {
            store.push((x, fx));
        }
    };

    if stage == 1 {
        let x = 0.5 * (lo + hi);
        let fx = f(x);
        record(x, fx);
        return (hi - lo) * fx;
    }

    let it = 3_usize.pow(u32::try_from(stage - 2).unwrap_or(0));
    let tnm = it as f64;
    let del = (hi - lo) / (3.0 * tnm);
    let ddel = del + del;
    let mut x = lo + 0.5 * del;
    let mut sum = 0.0;

    for _ in 0..it {
        let fx = f(x);
        record(x, fx);
        sum += fx;
        x += ddel;

        let fx = f(x);
        record(x, fx);
        sum += fx;
        x += del;
    }

    (previous + (hi - lo) * sum / tnm) / 3.0
}

/// Neville extrapolation of `(h_i, s_i)` to `h = 0`, returning the value and
/// an error estimate from the last correction.
fn extrapolate_to_zero(heights: &[f64], estimates: &[f64]) -> (f64, f64) {
    let n = heights.len();
    let mut c = estimates.to_vec();
    let mut d = estimates.to_vec();

    // start from the smallest h, which is the last entry
    let mut result = estimates[n - 1];
    let mut error = 0.0;
    let mut position = n - 1;

    for m in 1..n {
        for i in 0..n - m {
            let ho = heights[i];
            let hp = heights[i + m];
            let w = c[i + 1] - d[i];
            let den = ho - hp;
            d[i] = hp * w / den;
            c[i] = ho * w / den;
        }

        error = if 2 * position < n - m {
            c[position]
        } else {
            position -= 1;
            d[position]
        };
        result += error;
    }

    (result, error)
}

/// Locates the point at which the running integral of `f` from one end of
/// `[lo, hi]` reaches `target`, using the recorded midpoint samples of the
/// finest refinement stage and a short Newton polish inside the straddled
/// cell.
fn invert_on_samples(
    lo: f64,
    hi: f64,
    f: &dyn Fn(f64) -> f64,
    samples: &[(f64, f64)],
    total: f64,
    target: f64,
    from_low: bool,
) -> f64 {
    let (start, end) = if from_low { (lo, hi) } else { (hi, lo) };
    if !total.is_finite() || samples.is_empty() {
        return start;
    }
    if target >= total.abs() {
        return end;
    }

    let mut grid = samples.to_vec();
    grid.sort_unstable_by(|left, right| {
        left.0.partial_cmp(&right.0).unwrap_or(std::cmp::Ordering::Equal)
    });
    if !from_low {
        grid.reverse();
    }

    // all samples share the midpoint weight of the finest stage
    let cell = (hi - lo) / grid.len() as f64;
    let midpoint_total: f64 = grid.iter().map(|&(_, fx)| fx).sum::<f64>() * cell;
    // rescale the piecewise-constant weight so it is consistent with the
    // extrapolated total
    let scale = if midpoint_total.abs() > 0.0 {
        (total / midpoint_total).abs()
    } else {
        1.0
    };

    let mut accumulated = 0.0;
    for &(x, fx) in &grid {
        let weight = (fx * cell * scale).abs();
        if accumulated + weight >= target {
            let into_cell = (target - accumulated) / (fx * scale).abs().max(f64::MIN_POSITIVE);
            let step = if from_low { 1.0 } else { -1.0 };
            let cell_start = x - step * 0.5 * cell;
            let mut xi = cell_start + step * into_cell;

            // Newton corrections against the accumulated weight, with the
            // partial cell estimated by the trapezoid through its endpoints
            let f_start = f(cell_start);
            for _ in 0..2 {
                let f_xi = f(xi);
                let partial = 0.5 * (f_start + f_xi).abs() * (xi - cell_start).abs() * scale;
                let excess = accumulated + partial - target;
                let slope = f_xi.abs().max(f64::MIN_POSITIVE) * scale;
                xi -= step * excess / slope;
                let cell_end = cell_start + step * cell;
                xi = if from_low {
                    xi.clamp(cell_start.min(cell_end), cell_start.max(cell_end))
                } else {
                    xi.clamp(cell_end.min(cell_start), cell_end.max(cell_start))
                };
            }

            return xi;
        }
        accumulated += weight;
    }

    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn polynomial_is_exact() {
        let integral = Integral::default();
        let result = integral.integrate(0.0, 2.0, |x| 3.0 * x * x);

        assert_approx_eq!(f64, result, 8.0, epsilon = 1e-8);
    }

    #[test]
    fn reversed_bounds_flip_the_sign() {
        let integral = Integral::default();
        let forward = integral.integrate(1.0, 3.0, f64::sqrt);
        let backward = integral.integrate(3.0, 1.0, f64::sqrt);

        assert_approx_eq!(f64, forward, -backward, epsilon = 1e-10);
    }

    #[test]
    fn log_substitution_matches_plain() {
        let integral = Integral::default();
        let plain = integral.integrate(1.0, 1e4, |x| 1.0 / x);
        let logged = integral.integrate_with_log(1.0, 1e4, |x| 1.0 / x);

        assert_approx_eq!(f64, plain, (1e4_f64).ln(), epsilon = 1e-4);
        assert_approx_eq!(f64, logged, (1e4_f64).ln(), epsilon = 1e-8);
    }

    #[test]
    fn non_finite_integrand_reports_nan() {
        let integral = Integral::default();
        let result = integral.integrate(-1.0, 1.0, |x| 1.0 / x.abs().sqrt() / 0.0);

        assert!(result.is_nan());
    }

    #[test]
    fn random_ratio_recovers_the_quantile() {
        let integral = Integral::default();
        // int_0^x 2 t dt = x^2 over [0, 1]; weight 0.25 is reached at 0.5
        let inverted = integral.integrate_with_random_ratio(0.0, 1.0, |x| 2.0 * x, 0.25);

        assert_approx_eq!(f64, inverted.integral, 1.0, epsilon = 1e-8);
        assert_approx_eq!(f64, inverted.upper_limit, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn random_ratio_accumulates_from_the_first_bound() {
        let integral = Integral::default();
        // accumulating from the top of [0, 1]: weight 0.19 is reached at 0.9
        let inverted = integral.integrate_with_random_ratio(1.0, 0.0, |x| 2.0 * x, 0.19);

        assert_approx_eq!(f64, inverted.integral, -1.0, epsilon = 1e-8);
        assert_approx_eq!(f64, inverted.upper_limit, 0.9, epsilon = 1e-6);
    }

    #[test]
    fn random_ratio_saturates_at_the_far_bound() {
        let integral = Integral::default();
        let inverted = integral.integrate_with_random_ratio(0.0, 1.0, |x| 2.0 * x, 5.0);

        assert_approx_eq!(f64, inverted.upper_limit, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn log_random_ratio_round_trip() {
        let integral = Integral::default();
        let f = |x: f64| 1.0 / x;
        let total = integral.integrate_with_log(1.0, 100.0, f);
        let inverted = integral.integrate_with_log_random_ratio(1.0, 100.0, f, 0.5 * total);

        let partial = integral.integrate_with_log(1.0, inverted.upper_limit, f);
        assert_approx_eq!(f64, partial, 0.5 * total, epsilon = 1e-5);
    }
}
