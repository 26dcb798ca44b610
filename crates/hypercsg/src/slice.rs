//! Slicing polytopes by a single hyperplane.
//!
//! This is independent of the intersection engine. Results are memoized by
//! polytope, so pieces of shared elements are shared too.

use std::collections::HashMap;

use eyre::{Result, bail, ensure};
use hypercsg_math::prelude::*;

use crate::classify::winding_number;
use crate::intersect::merge_hyperplanes;
use crate::orient::finish;
use crate::{HyperplaneId, PolytopeData, PolytopeId, SignedPolytope, Space};

/// Pieces of a polytope on each side of a hyperplane.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Slices<T> {
    /// Piece on the positive side of the hyperplane, outside its half-space.
    pub above: Option<T>,
    /// Piece on the negative side of the hyperplane, inside its half-space.
    pub below: Option<T>,
    /// Intersection of the polytope with the hyperplane.
    pub on: Option<T>,
}

#[derive(Debug)]
struct SliceMemo {
    hyperplane: HyperplaneId,
    results: HashMap<PolytopeId, Slices<PolytopeId>>,
}

/// Slices a polytope by a hyperplane.
///
/// Returns an error if a vertex lies on the hyperplane but the element
/// containing it does not lie entirely on the hyperplane.
#[tracing::instrument(skip_all, fields(%p, %hyperplane))]
pub fn slice(
    space: &mut Space,
    p: SignedPolytope,
    hyperplane: HyperplaneId,
) -> Result<Slices<SignedPolytope>> {
    ensure!(
        !space[p.id].is_facetless() || space[p.id].rank == 0,
        "cannot slice facetless polytope {p}",
    );

    let watermark = space.next_polytope_id();
    let mut memo = SliceMemo::new(hyperplane);
    let pieces = memo.slice(space, p.id)?;

    let mut settle = |piece: Option<PolytopeId>| {
        piece.map(|id| {
            let signed = SignedPolytope::new(id, p.sign, p.initial_density);
            finish(space, signed, watermark)
        })
    };
    let ret = Slices {
        above: settle(pieces.above),
        below: settle(pieces.below),
        on: settle(pieces.on),
    };
    tracing::debug!(
        above = ret.above.is_some(),
        below = ret.below.is_some(),
        on = ret.on.is_some(),
        "sliced",
    );
    Ok(ret)
}

/// Replaces each facet of a polytope with its pieces on either side of a
/// hyperplane. Lower-rank elements are split as needed but the polytope
/// itself is not.
#[tracing::instrument(skip_all, fields(%p, %hyperplane))]
pub fn slice_facets(
    space: &mut Space,
    p: SignedPolytope,
    hyperplane: HyperplaneId,
) -> Result<SignedPolytope> {
    let rank = space[p.id].rank;
    ensure!(rank >= 1, "cannot slice facets of vertex {p}");
    slice_elements(space, p, rank - 1, hyperplane, None)
}

/// Splits every rank-`rank` element of a polytope that straddles a
/// hyperplane into its pieces on either side, and rebuilds every
/// higher-rank element to use the pieces. New pieces below the hyperplane
/// receive `aux`; other pieces keep the auxiliary data of the element they
/// came from.
#[tracing::instrument(skip_all, fields(%p, rank, %hyperplane))]
pub fn slice_elements(
    space: &mut Space,
    p: SignedPolytope,
    rank: u8,
    hyperplane: HyperplaneId,
    aux: Option<u64>,
) -> Result<SignedPolytope> {
    ensure!(
        rank < space[p.id].rank,
        "cannot slice rank-{rank} elements of rank-{} polytope {p}",
        space[p.id].rank,
    );

    let watermark = space.next_polytope_id();
    let mut memo = SliceMemo::new(hyperplane);
    let mut rebuilt = HashMap::new();
    let pieces = rebuild_elements(space, p.id, rank, aux, &mut memo, &mut rebuilt)?;
    let [id] = pieces.as_slice() else {
        bail!("polytope {p} was split unexpectedly");
    };
    let signed = SignedPolytope::new(*id, p.sign, p.initial_density);
    Ok(finish(space, signed, watermark))
}

/// Returns the replacements for `id` after splitting rank-`rank` elements.
fn rebuild_elements(
    space: &mut Space,
    id: PolytopeId,
    rank: u8,
    aux: Option<u64>,
    memo: &mut SliceMemo,
    rebuilt: &mut HashMap<PolytopeId, Vec<PolytopeId>>,
) -> Result<Vec<PolytopeId>> {
    if let Some(ret) = rebuilt.get(&id) {
        return Ok(ret.clone());
    }

    let element_rank = space[id].rank;
    let ret = if element_rank < rank {
        vec![id]
    } else if element_rank == rank {
        let pieces = memo.slice(space, id)?;
        match (pieces.above, pieces.below) {
            (Some(above), Some(below)) if above != id && below != id => {
                space.set_aux(below, aux);
                vec![above, below]
            }
            _ => vec![id],
        }
    } else {
        let mut changed = false;
        let mut facets = vec![];
        for f in space[id].facets.clone() {
            let replacements = rebuild_elements(space, f.id, rank, aux, memo, rebuilt)?;
            changed |= replacements != [f.id];
            facets.extend(replacements.into_iter().map(|r| SignedPolytope::new(r, f.sign, 0)));
        }
        if changed {
            let old = &space[id];
            let data = PolytopeData {
                aux: old.aux,
                ..PolytopeData::new(old.rank, old.ndim, facets, old.hyperplanes.clone())
            };
            vec![space.add_polytope(data)?]
        } else {
            vec![id]
        }
    };

    rebuilt.insert(id, ret.clone());
    Ok(ret)
}

impl SliceMemo {
    fn new(hyperplane: HyperplaneId) -> Self {
        Self {
            hyperplane,
            results: HashMap::new(),
        }
    }

    fn slice(&mut self, space: &mut Space, id: PolytopeId) -> Result<Slices<PolytopeId>> {
        if let Some(&ret) = self.results.get(&id) {
            return Ok(ret);
        }
        let ret = match space[id].rank {
            0 => self.slice_vertex(space, id)?,
            1 => self.slice_edge(space, id)?,
            _ => self.slice_element(space, id)?,
        };
        self.results.insert(id, ret);
        Ok(ret)
    }

    fn slice_vertex(&self, space: &Space, id: PolytopeId) -> Result<Slices<PolytopeId>> {
        let Some(coords) = space.coords(id) else {
            bail!("cannot slice vertex {id} with unknown coordinates");
        };
        let dist = space[self.hyperplane].signed_distance(&coords);
        let eps = space.params().vertex_epsilon;
        Ok(if dist.abs() <= eps {
            Slices {
                on: Some(id),
                ..Default::default()
            }
        } else if dist > 0.0 {
            Slices {
                above: Some(id),
                ..Default::default()
            }
        } else {
            Slices {
                below: Some(id),
                ..Default::default()
            }
        })
    }

    fn slice_edge(&mut self, space: &mut Space, id: PolytopeId) -> Result<Slices<PolytopeId>> {
        let vertices = space[id].facets.clone();
        if vertices.is_empty() {
            bail!("cannot slice facetless edge {id}");
        }

        let mut above = vec![];
        let mut below = vec![];
        let mut on_count = 0;
        for v in &vertices {
            let pieces = self.slice(space, v.id)?;
            if pieces.on.is_some() {
                on_count += 1;
            } else if pieces.above.is_some() {
                above.push(*v);
            } else {
                below.push(*v);
            }
        }
        if on_count == vertices.len() {
            return Ok(Slices {
                on: Some(id),
                ..Default::default()
            });
        }
        if on_count > 0 {
            bail!(
                "edge {id} has a vertex on the cut plane; slicing through vertices is unsupported"
            );
        }
        if below.is_empty() {
            return Ok(Slices {
                above: Some(id),
                ..Default::default()
            });
        }
        if above.is_empty() {
            return Ok(Slices {
                below: Some(id),
                ..Default::default()
            });
        }

        // The line containing the edge crosses the hyperplane at one point,
        // which may or may not be inside the edge.
        let ndim = space[id].ndim;
        let key = merge_hyperplanes(&space[id].hyperplanes, &[self.hyperplane]);
        let eps = space.params().vertex_epsilon;
        let crossing = space
            .solve_hyperplanes(&key, ndim)
            .filter(|q| winding_number(space, id, q, eps).is_inside() == Some(true));
        let cut = match crossing {
            Some(q) => Some(space.add_vertex(ndim, Some(q), key)?),
            None => None,
        };

        let mut make_piece = |mut vertices: Vec<SignedPolytope>| -> Result<PolytopeId> {
            let total: i32 = vertices.iter().map(|v| v.sign.to_num::<i32>()).sum();
            if let Some(cut) = cut {
                vertices.push(SignedPolytope::new(cut, Sign::from_is_neg(total > 0), 0));
            }
            let old = &space[id];
            let data = PolytopeData {
                aux: old.aux,
                ..PolytopeData::new(1, old.ndim, vertices, old.hyperplanes.clone())
            };
            Ok(space.add_polytope(data)?)
        };
        Ok(Slices {
            above: Some(make_piece(above)?),
            below: Some(make_piece(below)?),
            on: cut,
        })
    }

    fn slice_element(&mut self, space: &mut Space, id: PolytopeId) -> Result<Slices<PolytopeId>> {
        let facets = space[id].facets.clone();
        if facets.is_empty() {
            bail!("cannot slice facetless polytope {id}");
        }

        let mut above = vec![];
        let mut below = vec![];
        let mut cut_facets = vec![];
        let mut flush_count = 0;
        for f in &facets {
            let pieces = self.slice(space, f.id)?;
            if pieces.on == Some(f.id) {
                flush_count += 1;
                continue;
            }
            if let Some(a) = pieces.above {
                above.push(SignedPolytope::new(a, f.sign, 0));
            }
            if let Some(b) = pieces.below {
                below.push(SignedPolytope::new(b, f.sign, 0));
            }
            if let Some(c) = pieces.on {
                cut_facets.push(SignedPolytope::new(c, f.sign, 0));
            }
        }

        if flush_count == facets.len() {
            return Ok(Slices {
                on: Some(id),
                ..Default::default()
            });
        }
        if flush_count > 0 {
            bail!(
                "polytope {id} has a facet in the cut plane; slicing along facets is unsupported"
            );
        }
        if below.is_empty() {
            return Ok(Slices {
                above: Some(id),
                ..Default::default()
            });
        }
        if above.is_empty() {
            return Ok(Slices {
                below: Some(id),
                ..Default::default()
            });
        }

        let old = &space[id];
        let (rank, ndim, aux) = (old.rank, old.ndim, old.aux);
        let hyperplanes = old.hyperplanes.clone();

        let cut = if cut_facets.is_empty() {
            None
        } else {
            let key = merge_hyperplanes(&hyperplanes, &[self.hyperplane]);
            let data = PolytopeData::new(rank - 1, ndim, cut_facets, key);
            let cut = space.add_polytope(data)?;
            above.push(SignedPolytope::new(cut, Sign::Pos, 0));
            below.push(SignedPolytope::new(cut, Sign::Neg, 0));
            Some(cut)
        };

        let mut make_piece = |facets: Vec<SignedPolytope>| {
            let data = PolytopeData {
                aux,
                ..PolytopeData::new(rank, ndim, facets, hyperplanes.clone())
            };
            space.add_polytope(data)
        };
        Ok(Slices {
            above: Some(make_piece(above)?),
            below: Some(make_piece(below)?),
            on: cut,
        })
    }
}
