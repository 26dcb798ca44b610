//! Simplicial decomposition, signed volume, and area normals.

use hypercsg_math::prelude::*;
use hypercsg_math::util::factorial;
use smallvec::SmallVec;

use crate::{HyperplaneId, PolytopeId, SignedPolytope, Space};

/// Oriented simplex. Swapping two vertices reverses its orientation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Simplex(pub SmallVec<[PolytopeId; 5]>);

impl Simplex {
    /// Returns the coordinates of each vertex, or `None` if any of them are
    /// unknown.
    pub fn coords(&self, space: &Space) -> Option<Vec<Vector>> {
        self.0.iter().map(|&v| space.coords(v)).collect()
    }

    /// Returns the vectors from the first vertex to each other vertex.
    fn edge_vectors(&self, space: &Space) -> Option<Vec<Vector>> {
        let coords = self.coords(space)?;
        let (first, rest) = coords.split_first()?;
        Some(rest.iter().map(|v| v - first).collect())
    }
}

/// Splits a polytope into simplices whose signed sum is the polytope. The
/// simplices are a fan from a single base vertex.
pub fn simplicial_subdivide(space: &Space, id: PolytopeId) -> Vec<Simplex> {
    if space[id].rank == 0 {
        return vec![Simplex(smallvec::smallvec![id])];
    }
    match base_vertex(space, id) {
        Some(apex) => cone_simplices(space, apex, &space[id].facets),
        None => vec![],
    }
}

/// Returns the vertex reached by always taking the first facet.
fn base_vertex(space: &Space, mut id: PolytopeId) -> Option<PolytopeId> {
    while space[id].rank > 0 {
        id = space[id].facets.first()?.id;
    }
    Some(id)
}

/// Returns simplices covering the cone from `apex` over `facets`, skipping
/// facets that contain the apex.
pub(crate) fn cone_simplices(
    space: &Space,
    apex: PolytopeId,
    facets: &[SignedPolytope],
) -> Vec<Simplex> {
    let mut ret = vec![];
    for f in facets {
        if space[f.id].rank == 0 {
            // Edges are common enough to skip the recursion.
            if f.id != apex {
                ret.push(oriented_simplex([apex, f.id].into_iter().collect(), f.sign));
            }
            continue;
        }
        if space.vertices_of(f.id).binary_search(&apex).is_ok() {
            continue;
        }
        for sub in simplicial_subdivide(space, f.id) {
            let verts = std::iter::once(apex).chain(sub.0).collect();
            ret.push(oriented_simplex(verts, f.sign));
        }
    }
    ret
}

fn oriented_simplex(mut verts: SmallVec<[PolytopeId; 5]>, sign: Sign) -> Simplex {
    if sign == Sign::Neg {
        verts.swap(0, 1);
    }
    Simplex(verts)
}

/// Returns the signed `k`-volume of a rank-`k` polytope, measured within its
/// affine hull.
pub fn volume(space: &Space, p: SignedPolytope) -> Float {
    let data = &space[p.id];
    if data.rank == 0 {
        return p.sign.to_num();
    }
    let simplices = simplicial_subdivide(space, p.id);
    simplices_volume(space, &simplices, &data.hyperplanes, data.rank, data.ndim) * p.sign
}

/// Returns the total signed volume of a set of rank-`rank` simplices lying on
/// `hyperplanes`.
pub(crate) fn simplices_volume(
    space: &Space,
    simplices: &[Simplex],
    hyperplanes: &[HyperplaneId],
    rank: u8,
    ndim: u8,
) -> Float {
    if hyperplanes.len() + rank as usize != ndim as usize {
        tracing::warn!(
            rank,
            ndim,
            hyperplane_count = hyperplanes.len(),
            "cannot compute volume of polytope with wrong number of hyperplanes",
        );
        return 0.0;
    }
    let normals = hyperplanes
        .iter()
        .map(|&h| space[h].normal.clone())
        .collect::<Vec<_>>();
    let scale = factorial(rank) * gram_determinant(&normals).sqrt();

    let mut total = 0.0;
    for s in simplices {
        let Some(edges) = s.edge_vectors(space) else {
            tracing::warn!(?s, "skipping simplex with unknown vertex coordinates");
            continue;
        };
        total += Matrix::from_cols(edges.iter().chain(&normals)).determinant();
    }
    total / scale
}

/// Returns a vector normal to a rank-`(n-1)` polytope in `n`-space whose
/// magnitude is its area. It points toward the outside of any polytope that
/// the facet bounds with positive orientation.
pub fn area_normal(space: &Space, p: SignedPolytope) -> Vector {
    let data = &space[p.id];
    if data.rank + 1 != data.ndim {
        tracing::warn!(
            rank = data.rank,
            ndim = data.ndim,
            "area normal requires a hyperplane facet",
        );
        return Vector::zero(data.ndim);
    }
    let mut total = Vector::zero(data.ndim);
    for s in simplicial_subdivide(space, p.id) {
        if let Some(edges) = s.edge_vectors(space) {
            total += cross_product(&edges, data.ndim);
        }
    }
    total / factorial(data.rank) * p.sign.to_num::<f64>()
}
