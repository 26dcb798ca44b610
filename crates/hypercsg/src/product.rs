//! Cartesian product of polytopes.

use std::collections::HashMap;

use eyre::Result;
use hypercsg_math::prelude::*;

use crate::orient::finish;
use crate::{HyperplaneId, HyperplaneSet, PolytopeData, PolytopeId, SignedPolytope, Space};

#[derive(Debug, Default)]
struct ProductMemo {
    products: HashMap<(PolytopeId, PolytopeId), PolytopeId>,
    /// Hyperplanes of the left operand, embedded in the product space.
    left_hyperplanes: HashMap<HyperplaneId, HyperplaneId>,
    /// Hyperplanes of the right operand, embedded in the product space.
    right_hyperplanes: HashMap<HyperplaneId, HyperplaneId>,
}

/// Returns the Cartesian product of two polytopes. The result lives in a space
/// whose dimension is the sum of the dimensions of the operands' spaces, with
/// the axes of `a` first.
#[tracing::instrument(skip_all, fields(%a, %b))]
pub fn cross(space: &mut Space, a: SignedPolytope, b: SignedPolytope) -> Result<SignedPolytope> {
    let ndim_a = space[a.id].ndim;
    let ndim_b = space[b.id].ndim;
    eyre::ensure!(
        ndim_a as usize + ndim_b as usize <= MAX_NDIM as usize,
        "product of {ndim_a}D and {ndim_b}D polytopes exceeds {MAX_NDIM} dimensions",
    );

    let watermark = space.next_polytope_id();
    let mut memo = ProductMemo::default();
    let id = cross_recursive(space, a.id, b.id, &mut memo)?;
    let product = SignedPolytope::new(id, a.sign * b.sign, a.initial_density * b.initial_density);
    let ret = finish(space, product, watermark);

    tracing::debug!(
        result = %ret,
        new_polytopes = space.next_polytope_id().0 - watermark.0,
        "crossed",
    );
    Ok(ret)
}

fn cross_recursive(
    space: &mut Space,
    a: PolytopeId,
    b: PolytopeId,
    memo: &mut ProductMemo,
) -> Result<PolytopeId, IndexOverflow> {
    if let Some(&id) = memo.products.get(&(a, b)) {
        return Ok(id);
    }

    let ndim_a = space[a].ndim;
    let ndim = ndim_a + space[b].ndim;
    let rank = space[a].rank + space[b].rank;

    let mut hyperplanes = HyperplaneSet::new();
    for h in space[a].hyperplanes.clone() {
        hyperplanes.push(embed_hyperplane(space, h, 0, ndim, &mut memo.left_hyperplanes)?);
    }
    for h in space[b].hyperplanes.clone() {
        hyperplanes.push(embed_hyperplane(space, h, ndim_a, ndim, &mut memo.right_hyperplanes)?);
    }

    let mut facets = vec![];
    for f in space[a].facets.clone() {
        let id = cross_recursive(space, f.id, b, memo)?;
        facets.push(SignedPolytope::new(id, f.sign, 0));
    }
    for g in space[b].facets.clone() {
        let id = cross_recursive(space, a, g.id, memo)?;
        facets.push(SignedPolytope::new(id, g.sign, 0));
    }

    let mut data = PolytopeData::new(rank, ndim, facets, hyperplanes);
    if rank == 0 {
        data.coords = space
            .coords(a)
            .zip(space.coords(b))
            .map(|(coords_a, coords_b)| Vector::concat(coords_a, ndim_a, coords_b));
    }
    data.aux = space[a].aux.or(space[b].aux);
    let id = space.add_polytope(data)?;
    memo.products.insert((a, b), id);
    Ok(id)
}

fn embed_hyperplane(
    space: &mut Space,
    h: HyperplaneId,
    first_axis: u8,
    ndim: u8,
    memo: &mut HashMap<HyperplaneId, HyperplaneId>,
) -> Result<HyperplaneId, IndexOverflow> {
    if let Some(&id) = memo.get(&h) {
        return Ok(id);
    }
    let embedded = space[h].embedded(first_axis, ndim);
    let id = space.add_hyperplane(embedded)?;
    memo.insert(h, id);
    Ok(id)
}
