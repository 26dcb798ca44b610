//! Boolean operations on signed polytopes.
//!
//! Everything is built on one recursive intersection algorithm. The result of
//! intersecting two polytopes is determined by the set of hyperplanes they
//! lie on, so intermediate results are memoized by that set. This keeps
//! geometrically identical pieces as a single shared polytope.
//!
//! Operands often share hyperplanes, for example when a result is combined
//! with one of the polytopes it was built from. Cutting one operand along a
//! hyperplane that bounds the other would classify points exactly on a
//! boundary, so shared hyperplanes are instead carried along the recursion
//! and both operands are sampled on either side of them once a vertex is
//! reached.

use std::collections::{HashMap, HashSet};

use eyre::Result;
use hypercsg_math::prelude::*;
use itertools::Itertools;
use smallvec::SmallVec;

use crate::classify::{classify, extra_hyperplane_index, is_inside, parity_sign};
use crate::orient::finish;
use crate::{HyperplaneId, HyperplaneSet, PolytopeData, PolytopeId, SignedPolytope, Space};

/// Memo table for a single top-level intersection, mapping hyperplane sets to
/// results. `None` means the intersection is empty.
#[derive(Debug, Default)]
struct Ocean {
    results: HashMap<HyperplaneSet, Option<PolytopeId>>,
    /// Hyperplanes that bound elements of both operands, excluding the
    /// hyperplanes of the operands themselves. Sorted.
    coincident: HyperplaneSet,
    /// Elements of either operand, by the hyperplanes they lie on.
    existing: HashMap<HyperplaneSet, SmallVec<[PolytopeId; 2]>>,
}
impl Ocean {
    fn new(space: &Space, a: PolytopeId, b: PolytopeId) -> Self {
        let mut existing = HashMap::<_, SmallVec<[PolytopeId; 2]>>::new();
        let mut used_by_a = HashSet::new();
        let mut used_by_b = HashSet::new();
        for (id, used) in [(a, &mut used_by_a), (b, &mut used_by_b)] {
            for &e in space.all_elements(id).iter().flatten() {
                used.extend(space[e].hyperplanes.iter().copied());
                let ids = existing.entry(space[e].hyperplanes.clone()).or_default();
                if !ids.contains(&e) {
                    ids.push(e);
                }
            }
        }

        let ambient = merge_hyperplanes(&space[a].hyperplanes, &space[b].hyperplanes);
        let coincident = used_by_a
            .intersection(&used_by_b)
            .filter(|h| !ambient.contains(h))
            .copied()
            .sorted()
            .collect();

        Self {
            results: HashMap::new(),
            coincident,
            existing,
        }
    }

    fn is_coincident(&self, h: HyperplaneId) -> bool {
        self.coincident.binary_search(&h).is_ok()
    }

    /// Returns an element of either operand that lies on `key` and has
    /// exactly `facets`, ignoring signs.
    fn find_existing(
        &self,
        space: &Space,
        key: &HyperplaneSet,
        facets: &[SignedPolytope],
    ) -> Option<PolytopeId> {
        self.existing
            .get(key)?
            .iter()
            .copied()
            .find(|&id| same_facets(facets, &space[id].facets))
    }
}

/// Returns the complement of a polytope. This never allocates.
pub fn complement(p: SignedPolytope) -> SignedPolytope {
    p.complement()
}

/// Returns the union of two polytopes.
pub fn union(space: &mut Space, a: SignedPolytope, b: SignedPolytope) -> Result<SignedPolytope> {
    Ok(intersect(space, a.complement(), b.complement())?.complement())
}

/// Returns the region inside `a` but not `b`.
pub fn diff(space: &mut Space, a: SignedPolytope, b: SignedPolytope) -> Result<SignedPolytope> {
    intersect(space, a, b.complement())
}

/// Returns the intersection of two polytopes in the same space.
///
/// The rank of the result is the ambient dimension minus the total
/// codimension of `a` and `b`. An empty result is still a polytope, with no
/// facets and initial density 0.
///
/// # Panics
///
/// Panics if `a` and `b` are in spaces with different numbers of dimensions.
#[tracing::instrument(skip_all, fields(%a, %b))]
pub fn intersect(
    space: &mut Space,
    a: SignedPolytope,
    b: SignedPolytope,
) -> Result<SignedPolytope> {
    let ndim = space[a.id].ndim;
    assert_eq!(
        ndim,
        space[b.id].ndim,
        "cannot intersect polytopes {a} and {b} in different spaces",
    );

    if a.id == b.id {
        if a == b {
            return Ok(a);
        }
        if a == b.complement() {
            return Ok(space.empty(space[a.id].rank, ndim)?);
        }
        tracing::warn!("intersecting a polytope with a differently-signed copy of itself");
    }

    let watermark = space.next_polytope_id();
    let mut ocean = Ocean::new(space, a.id, b.id);
    if !ocean.coincident.is_empty() {
        tracing::debug!(coincident = ocean.coincident.len(), "operands share hyperplanes");
    }
    let ret = match intersect_recursive(space, a, b, &[], &mut ocean)? {
        Some(result) => finish(space, result, watermark),
        None => {
            let key = merge_hyperplanes(&space[a.id].hyperplanes, &space[b.id].hyperplanes);
            let rank = (ndim as usize).saturating_sub(key.len()) as u8;
            space.empty(rank, ndim)?
        }
    };

    tracing::debug!(
        result = %ret,
        new_polytopes = space.next_polytope_id().0 - watermark.0,
        memo_entries = ocean.results.len(),
        "intersected",
    );
    Ok(ret)
}

/// Returns the intersection of `a` and `b` on the flat where they and every
/// hyperplane in `shared` meet.
///
/// When `shared` is nonempty the result is the part of the boundary of
/// `a ∩ b` that lies on those hyperplanes, and `a` and `b` are not
/// themselves restricted to them.
fn intersect_recursive(
    space: &mut Space,
    a: SignedPolytope,
    b: SignedPolytope,
    shared: &[HyperplaneId],
    ocean: &mut Ocean,
) -> Result<Option<SignedPolytope>, IndexOverflow> {
    let init = match shared {
        [] => std::cmp::min(a.initial_density, b.initial_density),
        _ => 0,
    };
    let eps = space.params().vertex_epsilon;

    let bbox_a = space.bbox(a.id);
    let bbox_b = space.bbox(b.id);
    let overlapping = match (&bbox_a, &bbox_b) {
        (Some(bbox_a), Some(bbox_b)) => bbox_a.overlaps(bbox_b, eps),
        _ => false,
    };
    if !overlapping {
        match (a.initial_density, b.initial_density) {
            (0, 0) => return Ok(None),
            (0, _) if shared.is_empty() => return Ok(Some(a)),
            (_, 0) if shared.is_empty() => return Ok(Some(b)),
            _ => (),
        }
    }

    let ndim = space[a.id].ndim;
    let key = merge_hyperplanes(
        &merge_hyperplanes(&space[a.id].hyperplanes, &space[b.id].hyperplanes),
        shared,
    );
    if key.len() > ndim as usize {
        return Ok(None);
    }
    let rank = ndim - key.len() as u8;

    if let Some(&cached) = ocean.results.get(&key) {
        return Ok(cached.map(|id| SignedPolytope::new(id, Sign::Pos, init)));
    }
    if !space.hyperplanes_are_independent(&key) {
        ocean.results.insert(key, None);
        return Ok(None);
    }

    let result = if rank == 0 && shared.is_empty() {
        intersect_vertex(space, a, b, &key)?
    } else if rank == 0 {
        match coincident_vertex(space, a, b, shared, &key) {
            false => None,
            true => match ocean.find_existing(space, &key, &[]) {
                Some(v) => Some(v),
                None => Some(space.add_vertex(ndim, None, key.clone())?),
            },
        }
    } else {
        let mut facets: Vec<SignedPolytope> = vec![];
        for (x, y, s) in facet_pairs(space, a, b, shared, &key, ocean) {
            let Some(f) = intersect_recursive(space, x, y, &s, ocean)? else {
                continue;
            };
            if space[f.id].rank + 1 != rank {
                tracing::warn!(
                    facet = %f,
                    rank,
                    "dropping facet of wrong rank from coplanar input",
                );
                continue;
            }
            if facets.iter().any(|existing| existing.id == f.id) {
                continue;
            }
            facets.push(SignedPolytope::new(f.id, f.sign, 0));
        }

        if facets.is_empty() && init == 0 {
            None
        } else if let Some(id) = ocean.find_existing(space, &key, &facets) {
            Some(id)
        } else {
            let aux = space[a.id].aux.or(space[b.id].aux);
            let data = PolytopeData {
                aux,
                ..PolytopeData::new(rank, ndim, facets, key.clone())
            };
            Some(space.add_polytope(data)?)
        }
    };

    ocean.results.insert(key, result);
    Ok(result.map(|id| SignedPolytope::new(id, Sign::Pos, init)))
}

/// Returns the subproblems whose results are the facets of
/// `intersect_recursive(a, b, shared)`.
///
/// A facet on a coincident hyperplane is never paired with the other
/// operand. The hyperplane is added to `shared` instead, once no matter how
/// many facets lie on it.
fn facet_pairs(
    space: &Space,
    a: SignedPolytope,
    b: SignedPolytope,
    shared: &[HyperplaneId],
    key: &[HyperplaneId],
    ocean: &Ocean,
) -> Vec<(SignedPolytope, SignedPolytope, HyperplaneSet)> {
    let mut ret = vec![];
    let mut newly_shared = HyperplaneSet::new();
    for (p, is_a) in [(a, true), (b, false)] {
        let parent = &space[p.id].hyperplanes;
        for f in space.facets_of(p) {
            let child = &space[f.id].hyperplanes;
            match extra_hyperplane_index(parent, child).map(|j| child[j]) {
                Some(h) if key.contains(&h) => (),
                Some(h) if ocean.is_coincident(h) => {
                    if !newly_shared.contains(&h) {
                        newly_shared.push(h);
                    }
                }
                _ if is_a => ret.push((f, b, shared.into())),
                _ => ret.push((a, f, shared.into())),
            }
        }
    }
    for h in newly_shared {
        ret.push((a, b, merge_hyperplanes(shared, &[h])));
    }
    ret
}

/// Returns the vertex at which `a` and `b` intersect, if they intersect in a
/// single point that is unambiguously inside both.
fn intersect_vertex(
    space: &mut Space,
    a: SignedPolytope,
    b: SignedPolytope,
    key: &HyperplaneSet,
) -> Result<Option<PolytopeId>, IndexOverflow> {
    let ndim = space[a.id].ndim;
    let eps = space.params().vertex_epsilon;
    let classify_eps = space.params().classify_epsilon;

    let existing_vertex = [a, b].into_iter().find(|p| space[p.id].rank == 0);
    let coords = match existing_vertex {
        Some(v) => space.coords(v.id),
        None => space.solve_hyperplanes(key, ndim),
    };
    let Some(coords) = coords else {
        return Ok(None);
    };

    for p in [a, b] {
        if let Some(bbox) = space.bbox(p.id)
            && !bbox.contains(&coords, eps)
        {
            return Ok(None);
        }
    }

    for p in [a, b] {
        let density = classify(space, p, &coords, classify_eps);
        if density.is_inside() != Some(true) {
            if !density.is_determined() {
                tracing::debug!(%p, %coords, %density, "ambiguous vertex candidate");
            }
            return Ok(None);
        }
    }

    match existing_vertex {
        Some(v) => Ok(Some(v.id)),
        None => Ok(Some(space.add_vertex(ndim, Some(coords), key.clone())?)),
    }
}

/// Returns whether the boundary of `a ∩ b` has a vertex at `key`, where
/// `shared` are the hyperplanes through it that bound both operands.
///
/// Both operands are sampled just off the vertex on each side of every
/// shared hyperplane, staying on the rest of `key`. The vertex exists iff the
/// samples inside both operands, counted with the sign of their side, do not
/// cancel out.
fn coincident_vertex(
    space: &Space,
    a: SignedPolytope,
    b: SignedPolytope,
    shared: &[HyperplaneId],
    key: &HyperplaneSet,
) -> bool {
    let ndim = space[a.id].ndim;
    let params = *space.params();
    let Some(coords) = space.solve_hyperplanes(key, ndim) else {
        return false;
    };

    for p in [a, b] {
        if p.initial_density == 0
            && !space
                .bbox(p.id)
                .is_some_and(|bbox| bbox.contains(&coords, params.vertex_epsilon))
        {
            return false;
        }
    }

    let matrix = Matrix::from_rows(key.iter().map(|&h| &space[h].normal));
    let mut total = 0;
    for side in 0_u32..1 << shared.len() {
        let rhs: Vector = key
            .iter()
            .map(|h| match shared.iter().position(|s| s == h) {
                Some(i) if side >> i & 1 == 1 => 1.0,
                Some(_) => -1.0,
                None => 0.0,
            })
            .collect();
        let Some(dir) = matrix.solve(&rhs).and_then(|dir| dir.normalize()) else {
            return false;
        };
        let point = &coords + dir * params.coincident_offset;

        let inside_a = is_inside(space, a, &point, params.classify_epsilon);
        let inside_b = is_inside(space, b, &point, params.classify_epsilon);
        match (inside_a, inside_b) {
            (Some(false), _) | (_, Some(false)) => (),
            (Some(true), Some(true)) => {
                let negative_sides = shared.len() - side.count_ones() as usize;
                total += parity_sign(negative_sides).to_num::<i32>();
            }
            _ => {
                tracing::debug!(%a, %b, %point, "ambiguous sample near coincident vertex");
                return false;
            }
        }
    }
    total != 0
}

/// Returns the sorted union of two sorted hyperplane lists.
pub(crate) fn merge_hyperplanes(a: &[HyperplaneId], b: &[HyperplaneId]) -> HyperplaneSet {
    a.iter().merge(b).dedup().copied().collect()
}

/// Returns whether two facet lists contain the same polytopes, ignoring
/// order and sign.
fn same_facets(a: &[SignedPolytope], b: &[SignedPolytope]) -> bool {
    a.len() == b.len() && a.iter().map(|f| f.id).sorted().eq(b.iter().map(|f| f.id).sorted())
}
