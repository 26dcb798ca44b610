//! Point classification by ray casting.
//!
//! The density of a signed polytope at a point is its initial density plus
//! its sign times the winding number of its boundary around the point. Points
//! with odd density are inside.

use std::fmt;
use std::ops::{Add, AddAssign, Mul};

use hypercsg_math::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{HyperplaneId, PolytopeId, SignedPolytope, Space};

/// Number of times to retry picking a ray direction if the random vectors
/// happen to be degenerate.
const MAX_DIRECTION_ATTEMPTS: usize = 8;

/// Range of possible densities at a point.
///
/// When a point is within epsilon of some boundary, the density cannot be
/// determined exactly and the interval contains every value it could take.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Density {
    /// Minimum possible density.
    pub min: i32,
    /// Maximum possible density.
    pub max: i32,
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_determined() {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..={}", self.min, self.max)
        }
    }
}

impl Add for Density {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Density {
            min: self.min + rhs.min,
            max: self.max + rhs.max,
        }
    }
}
impl AddAssign for Density {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
impl Mul<Sign> for Density {
    type Output = Self;

    fn mul(self, rhs: Sign) -> Self::Output {
        match rhs {
            Sign::Pos => self,
            Sign::Neg => Density {
                min: -self.max,
                max: -self.min,
            },
        }
    }
}
impl std::iter::Sum for Density {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Density::ZERO, |a, b| a + b)
    }
}

impl Density {
    /// Density of zero.
    pub const ZERO: Self = Density { min: 0, max: 0 };

    /// Returns an exactly known density.
    pub fn exact(n: i32) -> Self {
        Density { min: n, max: n }
    }

    /// Returns whether the density is known exactly.
    pub fn is_determined(self) -> bool {
        self.min == self.max
    }

    /// Returns the density if it is known exactly.
    pub fn value(self) -> Option<i32> {
        self.is_determined().then_some(self.min)
    }

    /// Returns whether the point is inside under the even-odd rule, or `None`
    /// if the density is not known exactly.
    pub fn is_inside(self) -> Option<bool> {
        self.value().map(|n| n.rem_euclid(2) == 1)
    }

    /// Returns the smallest interval containing both intervals.
    #[must_use]
    pub fn hull(self, other: Self) -> Self {
        Density {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns the smallest interval containing both this interval and zero.
    #[must_use]
    pub fn hull_with_zero(self) -> Self {
        self.hull(Density::ZERO)
    }
}

/// Returns the density of `p` at `point`. Boundaries within `eps` of the point
/// widen the resulting interval.
pub fn classify(space: &Space, p: SignedPolytope, point: &Vector, eps: Float) -> Density {
    Density::exact(p.initial_density) + winding_number(space, p.id, point, eps) * p.sign
}

/// Returns whether `point` is inside `p` under the even-odd rule, or `None` if
/// it is within `eps` of the boundary.
pub fn is_inside(space: &Space, p: SignedPolytope, point: &Vector, eps: Float) -> Option<bool> {
    classify(space, p, point, eps).is_inside()
}

/// Returns the winding number of the boundary of a polytope around a point,
/// relative to the reference orientation of the polytope.
pub fn winding_number(space: &Space, id: PolytopeId, point: &Vector, eps: Float) -> Density {
    let data = &space[id];
    if data.rank == 0 {
        return match space.coords(id) {
            Some(coords) if coords.approx_eq(point, eps) => Density::exact(1),
            Some(_) => Density::ZERO,
            None => {
                tracing::warn!(%id, "cannot classify point against vertex without coordinates");
                Density::exact(1).hull_with_zero()
            }
        };
    }
    Boundary {
        rank: data.rank,
        ndim: data.ndim,
        hyperplanes: &data.hyperplanes,
        facets: &data.facets,
        salt: id.0 as u64,
    }
    .winding_number(space, point, eps)
}

/// Oriented boundary of a polytope with rank at least 1, or a subset of it.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Boundary<'a> {
    pub rank: u8,
    pub ndim: u8,
    pub hyperplanes: &'a [HyperplaneId],
    pub facets: &'a [SignedPolytope],
    /// Mixed into the RNG seed.
    pub salt: u64,
}

impl Boundary<'_> {
    pub fn winding_number(self, space: &Space, point: &Vector, eps: Float) -> Density {
        if self.facets.is_empty() {
            return Density::ZERO;
        }
        if self.rank == 1 {
            return self.winding_number_of_edge(space, point, eps);
        }

        let Some(dir) = self.ray_direction(space) else {
            tracing::warn!(rank = self.rank, "no valid ray direction; point is ambiguous");
            let n = self.facets.len() as i32;
            return Density { min: -n, max: n };
        };

        let mut total = Density::ZERO;
        for &f in self.facets {
            let facet = &space[f.id];
            let Some(j) = extra_hyperplane_index(self.hyperplanes, &facet.hyperplanes) else {
                tracing::debug!(facet = %f.id, "facet does not add exactly one hyperplane");
                continue;
            };
            let h = &space[facet.hyperplanes[j]];
            let dist = h.signed_distance(point);
            let denom = dir.dot(&h.normal);
            // Sign relating the crossing direction to the facet's reference
            // orientation.
            let tau = Sign::from(denom) * parity_sign(self.rank as usize - 1 + j);

            if dist.abs() <= eps {
                let w = winding_number(space, f.id, point, eps);
                if w == Density::ZERO {
                    continue;
                }
                total += if denom.abs() <= eps {
                    (w * Sign::Pos).hull(w * Sign::Neg).hull_with_zero()
                } else {
                    (w * f.sign * tau).hull_with_zero()
                };
                continue;
            }

            if denom.abs() <= Float::EPSILON {
                continue;
            }
            let t = -dist / denom;
            if t < 0.0 {
                continue;
            }
            let q = point + &dir * t;
            if let Some(bbox) = space.bbox(f.id)
                && !bbox.contains(&q, eps * 2.0 + EPSILON)
            {
                continue;
            }
            total += winding_number(space, f.id, &q, eps) * (f.sign * tau);
        }
        total
    }

    fn winding_number_of_edge(self, space: &Space, point: &Vector, eps: Float) -> Density {
        let e = edge_direction(space, self.hyperplanes, self.ndim);
        let mut total = Density::ZERO;
        for &v in self.facets {
            let contribution = Density::exact(v.sign.to_num());
            let Some(coords) = space.coords(v.id) else {
                tracing::warn!(vertex = %v.id, "edge vertex has no coordinates");
                total += contribution.hull_with_zero();
                continue;
            };
            let d = (&coords - point).dot(&e);
            if d.abs() <= eps {
                total += contribution.hull_with_zero();
            } else if d > 0.0 {
                total += contribution;
            }
        }
        total
    }

    /// Returns a unit vector in the affine span of the polytope.
    fn ray_direction(self, space: &Space) -> Option<Vector> {
        let normals = self.hyperplanes.iter().map(|&h| space[h].normal.clone());
        let seed = space.params().seed ^ self.salt;
        let mut rng = StdRng::seed_from_u64(seed);
        (0..MAX_DIRECTION_ATTEMPTS).find_map(|_| {
            let vectors = normals
                .clone()
                .chain((1..self.rank).map(|_| {
                    (0..self.ndim)
                        .map(|_| rng.random_range(-1.0..1.0))
                        .collect::<Vector>()
                }))
                .collect::<Vec<_>>();
            let dir = cross_product(&vectors, self.ndim);
            (dir.mag() > EPSILON).then(|| dir.normalize()).flatten()
        })
    }
}

/// Returns the reference direction of an edge lying on `hyperplanes`: the
/// generalized cross product of their normals.
pub(crate) fn edge_direction(space: &Space, hyperplanes: &[HyperplaneId], ndim: u8) -> Vector {
    let normals = hyperplanes.iter().map(|&h| space[h].normal.clone()).collect::<Vec<_>>();
    cross_product(&normals, ndim)
}

/// Returns the index in `child` of the single hyperplane that `child` has and
/// `parent` lacks, or `None` if `child` is not `parent` plus one hyperplane.
/// Both lists must be sorted.
pub(crate) fn extra_hyperplane_index(
    parent: &[HyperplaneId],
    child: &[HyperplaneId],
) -> Option<usize> {
    if child.len() != parent.len() + 1 {
        return None;
    }
    let j = std::iter::zip(parent, child)
        .position(|(a, b)| a != b)
        .unwrap_or(parent.len());
    (parent[j..] == child[j + 1..]).then_some(j)
}

/// Returns `(-1)^n`.
pub(crate) fn parity_sign(n: usize) -> Sign {
    Sign::from_is_neg(n % 2 == 1)
}
