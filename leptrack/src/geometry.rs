//! Geometric regions tiling the simulation volume.
//!
//! Every shape reduces ray queries to a short list of parameter intervals in
//! which the ray is inside the solid, so hollow shapes fall out of interval
//! subtraction instead of per-surface case analysis. All lengths are cm.

use crate::vector::Vector3;
use arrayvec::ArrayVec;
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

/// Ray-parameter intervals in which a ray is inside a solid; at most two for
/// the supported shapes.
pub type Intervals = ArrayVec<(f64, f64), 2>;

/// Border tolerance along a ray, in cm.
const BORDER_EPS: f64 = 1e-9;

/// Containment and ray queries implemented by every region shape.
#[enum_dispatch]
pub trait Geometry {
    /// True when `point` lies inside the solid (borders included).
    fn contains(&self, point: &Vector3) -> bool;

    /// Sorted ray-parameter intervals of `point + t * direction` inside the
    /// solid; `direction` must be a unit vector.
    fn intervals(&self, point: &Vector3, direction: &Vector3) -> Intervals;
}

/// Sum of the supported region shapes.
#[enum_dispatch(Geometry)]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum GeometryEnum {
    /// Solid or hollow sphere.
    Sphere,
    /// Solid or hollow upright cylinder.
    Cylinder,
    /// Axis-aligned box.
    BoxRegion,
}

impl GeometryEnum {
    /// Distance along `direction` to the next border: the exit distance when
    /// `point` is inside, the entry distance when the ray reaches the solid,
    /// and `0` otherwise.
    #[must_use]
    pub fn distance_to_border(&self, point: &Vector3, direction: &Vector3) -> f64 {
        for &(start, end) in &self.intervals(point, direction) {
            if start <= BORDER_EPS && end > BORDER_EPS {
                return end;
            }
            if start > BORDER_EPS {
                return start;
            }
        }

        0.0
    }

    /// True when the forward ray still reaches the solid.
    #[must_use]
    pub fn will_reach(&self, point: &Vector3, direction: &Vector3) -> bool {
        self.intervals(point, direction)
            .iter()
            .any(|&(_, end)| end > BORDER_EPS)
    }
}

/// Position of a particle relative to the detector region.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum Location {
    /// Outside the detector, moving towards it.
    InfrontDetector,
    /// Inside the detector.
    InsideDetector,
    /// Outside the detector, past it.
    BehindDetector,
}

impl Location {
    /// Classifies `point`/`direction` against the detector geometry.
    #[must_use]
    pub fn classify(detector: &GeometryEnum, point: &Vector3, direction: &Vector3) -> Self {
        if detector.contains(point) {
            Self::InsideDetector
        } else if detector.will_reach(point, direction) {
            Self::InfrontDetector
        } else {
            Self::BehindDetector
        }
    }
}

/// Sphere around `origin`, hollow when `inner_radius > 0`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Sphere {
    /// Center.
    pub origin: Vector3,
    /// Outer radius.
    pub radius: f64,
    /// Inner radius of the cavity; `0` for a solid sphere.
    pub inner_radius: f64,
}

impl Sphere {
    fn shell_interval(origin: &Vector3, radius: f64, point: &Vector3, direction: &Vector3) -> Option<(f64, f64)> {
        let offset = *point - *origin;
        let b = direction.dot(&offset);
        let c = offset.dot(&offset) - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();

        Some((-b - root, -b + root))
    }
}

impl Geometry for Sphere {
    fn contains(&self, point: &Vector3) -> bool {
        let distance = (*point - self.origin).norm();
        distance <= self.radius && distance >= self.inner_radius
    }

    fn intervals(&self, point: &Vector3, direction: &Vector3) -> Intervals {
        let outer = Self::shell_interval(&self.origin, self.radius, point, direction);
        let inner = if self.inner_radius > 0.0 {
            Self::shell_interval(&self.origin, self.inner_radius, point, direction)
        } else {
            None
        };

        subtract(outer, inner)
    }
}

/// Upright cylinder around `origin`, hollow when `inner_radius > 0`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Cylinder {
    /// Center.
    pub origin: Vector3,
    /// Outer radius.
    pub radius: f64,
    /// Inner radius of the cavity; `0` for a solid cylinder.
    pub inner_radius: f64,
    /// Full height along z.
    pub height: f64,
}

impl Cylinder {
    fn barrel_interval(&self, radius: f64, point: &Vector3, direction: &Vector3) -> Option<(f64, f64)> {
        let px = point.x - self.origin.x;
        let py = point.y - self.origin.y;
        let a = direction.x.mul_add(direction.x, direction.y * direction.y);
        let b = direction.x.mul_add(px, direction.y * py);
        let c = px.mul_add(px, py * py) - radius * radius;

        if a == 0.0 {
            // ray parallel to the axis
            return (c <= 0.0).then_some((f64::NEG_INFINITY, f64::INFINITY));
        }

        let discriminant = b * b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let root = discriminant.sqrt();

        Some(((-b - root) / a, (-b + root) / a))
    }
}

impl Geometry for Cylinder {
    fn contains(&self, point: &Vector3) -> bool {
        let px = point.x - self.origin.x;
        let py = point.y - self.origin.y;
        let radial = px.hypot(py);

        radial <= self.radius
            && radial >= self.inner_radius
            && (point.z - self.origin.z).abs() <= 0.5 * self.height
    }

    fn intervals(&self, point: &Vector3, direction: &Vector3) -> Intervals {
        let slab = slab_interval(
            point.z - self.origin.z,
            direction.z,
            -0.5 * self.height,
            0.5 * self.height,
        );
        let Some(slab) = slab else {
            return Intervals::new();
        };

        let outer = self
            .barrel_interval(self.radius, point, direction)
            .and_then(|barrel| intersect(barrel, slab));
        let inner = if self.inner_radius > 0.0 {
            self.barrel_interval(self.inner_radius, point, direction)
        } else {
            None
        };

        subtract(outer, inner)
    }
}

/// Axis-aligned box around `origin` with full edge lengths.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct BoxRegion {
    /// Center.
    pub origin: Vector3,
    /// Full width along x.
    pub width_x: f64,
    /// Full width along y.
    pub width_y: f64,
    /// Full width along z.
    pub width_z: f64,
}

impl Geometry for BoxRegion {
    fn contains(&self, point: &Vector3) -> bool {
        (point.x - self.origin.x).abs() <= 0.5 * self.width_x
            && (point.y - self.origin.y).abs() <= 0.5 * self.width_y
            && (point.z - self.origin.z).abs() <= 0.5 * self.width_z
    }

    fn intervals(&self, point: &Vector3, direction: &Vector3) -> Intervals {
        let slabs = [
            slab_interval(point.x - self.origin.x, direction.x, -0.5 * self.width_x, 0.5 * self.width_x),
            slab_interval(point.y - self.origin.y, direction.y, -0.5 * self.width_y, 0.5 * self.width_y),
            slab_interval(point.z - self.origin.z, direction.z, -0.5 * self.width_z, 0.5 * self.width_z),
        ];

        let mut result = (f64::NEG_INFINITY, f64::INFINITY);
        for slab in slabs {
            let Some(slab) = slab else {
                return Intervals::new();
            };
            let Some(intersection) = intersect(result, slab) else {
                return Intervals::new();
            };
            result = intersection;
        }

        let mut intervals = Intervals::new();
        intervals.push(result);
        intervals
    }
}

/// Ray interval of `offset + t * slope` inside `[lo, hi]`.
fn slab_interval(offset: f64, slope: f64, lo: f64, hi: f64) -> Option<(f64, f64)> {
    if slope == 0.0 {
        return (offset >= lo && offset <= hi).then_some((f64::NEG_INFINITY, f64::INFINITY));
    }

    let t0 = (lo - offset) / slope;
    let t1 = (hi - offset) / slope;

    Some(if t0 <= t1 { (t0, t1) } else { (t1, t0) })
}

fn intersect(a: (f64, f64), b: (f64, f64)) -> Option<(f64, f64)> {
    let start = a.0.max(b.0);
    let end = a.1.min(b.1);

    (start < end).then_some((start, end))
}

/// Removes the cavity interval from the solid interval; yields the up to two
/// remaining pieces in ascending order.
fn subtract(outer: Option<(f64, f64)>, inner: Option<(f64, f64)>) -> Intervals {
    let mut intervals = Intervals::new();
    let Some((t0, t1)) = outer else {
        return intervals;
    };

    match inner {
        Some((s0, s1)) if s0 < t1 && s1 > t0 => {
            if s0 > t0 {
                intervals.push((t0, s0));
            }
            if t1 > s1 {
                intervals.push((s1, t1));
            }
        }
        _ => intervals.push((t0, t1)),
    }

    intervals
}
