//! Proximity queries over live hostiles.
//!
//! Every query is a full scan of the candidates handed in; nothing is
//! cached between calls, so a hostile that died a tick ago is never
//! selected. Ranges are inclusive (`distance <= max_range`), compared on
//! exact squared distances in [`WideFixed`] so far-off hostiles never wrap
//! into range.
//!
//! Exact distance ties resolve to the earliest candidate in iteration
//! order. Hosts that enumerate hostiles in an unstable order get an
//! unstable tie-break.

use crate::math::{cos_degrees, Fixed, Vec3Fixed, WideFixed};
use crate::world::Hostile;

/// Forward-facing cone restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cone {
    /// Cone axis (need not be normalized).
    pub forward: Vec3Fixed,
    /// Half angle in degrees.
    pub half_angle_degrees: Fixed,
}

impl Cone {
    /// Create a cone around `forward`.
    #[must_use]
    pub fn new(forward: Vec3Fixed, half_angle_degrees: Fixed) -> Self {
        Self {
            forward,
            half_angle_degrees,
        }
    }

    /// Whether `point` seen from `origin` lies inside the cone.
    ///
    /// A point at the origin has no direction and is outside any cone
    /// narrower than a hemisphere.
    #[must_use]
    pub fn contains(&self, origin: Vec3Fixed, point: Vec3Fixed) -> bool {
        let axis = self.forward.normalize();
        let to_point = (point - origin).normalize();
        axis.dot(to_point) >= cos_degrees(self.half_angle_degrees)
    }
}

fn range_squared(max_range: Fixed) -> WideFixed {
    let range = WideFixed::from_num(max_range.max(Fixed::ZERO));
    range.saturating_mul(range)
}

fn qualifies<P>(
    origin: Vec3Fixed,
    range_sq: WideFixed,
    candidate: &Hostile,
    predicate: &P,
    cone: Option<&Cone>,
) -> bool
where
    P: Fn(&Hostile) -> bool,
{
    predicate(candidate)
        && origin.distance_squared_wide(candidate.position) <= range_sq
        && cone.map_or(true, |c| c.contains(origin, candidate.position))
}

/// Nearest candidate satisfying `predicate` within `max_range` (and the
/// cone, if given).
#[must_use]
pub fn find_nearest<P>(
    origin: Vec3Fixed,
    max_range: Fixed,
    candidates: &[Hostile],
    predicate: P,
    cone: Option<Cone>,
) -> Option<Hostile>
where
    P: Fn(&Hostile) -> bool,
{
    let range_sq = range_squared(max_range);
    let mut best: Option<(WideFixed, Hostile)> = None;
    for candidate in candidates {
        if !qualifies(origin, range_sq, candidate, &predicate, cone.as_ref()) {
            continue;
        }
        let dist_sq = origin.distance_squared_wide(candidate.position);
        // Strict comparison keeps the first of equidistant candidates
        if best.map_or(true, |(d, _)| dist_sq < d) {
            best = Some((dist_sq, *candidate));
        }
    }
    best.map(|(_, hostile)| hostile)
}

/// Every candidate satisfying `predicate` within `max_range` (and the cone,
/// if given), in iteration order.
#[must_use]
pub fn find_all<P>(
    origin: Vec3Fixed,
    max_range: Fixed,
    candidates: &[Hostile],
    predicate: P,
    cone: Option<Cone>,
) -> Vec<Hostile>
where
    P: Fn(&Hostile) -> bool,
{
    let range_sq = range_squared(max_range);
    candidates
        .iter()
        .filter(|c| qualifies(origin, range_sq, c, &predicate, cone.as_ref()))
        .copied()
        .collect()
}

/// Predicate: alive and staggered (execute targets).
#[must_use]
pub fn is_executable(hostile: &Hostile) -> bool {
    hostile.alive && hostile.staggered
}

/// Predicate: alive.
#[must_use]
pub fn is_alive(hostile: &Hostile) -> bool {
    hostile.alive
}
