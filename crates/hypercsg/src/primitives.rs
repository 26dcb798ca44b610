//! Constructors for simple convex polytopes.
//!
//! Every constructor returns an oriented polytope with initial density 0.

use std::collections::HashMap;
use std::f64::consts::PI;

use eyre::{Result, bail, ensure};
use hypercsg_math::prelude::*;
use itertools::Itertools;
use smallvec::smallvec;

use crate::orient::finish;
use crate::{
    HyperplaneData, HyperplaneId, HyperplaneSet, PolytopeData, PolytopeId, SignedPolytope, Space,
};

/// Constructs an axis-aligned box.
///
/// Returns an error if any half-extent is not positive or if the box would
/// have more than [`MAX_NDIM`] dimensions.
#[tracing::instrument(skip(space))]
pub fn make_hypercube(
    space: &mut Space,
    center: &Vector,
    half_extents: &Vector,
) -> Result<SignedPolytope> {
    let ndim = std::cmp::max(center.ndim(), half_extents.ndim());
    ensure!(ndim <= MAX_NDIM, "hypercube has too many dimensions: {ndim}");
    ensure!(
        half_extents.iter_ndim(ndim).all(|r| r > 0.0),
        "hypercube half-extents must be positive: {half_extents}",
    );

    let watermark = space.next_polytope_id();
    // Hyperplanes for the negative and positive side along each axis.
    let mut hyperplanes = vec![];
    for axis in 0..ndim {
        let (c, r) = (center.get(axis), half_extents.get(axis));
        let unit = Vector::unit(axis).pad(ndim);
        let low = HyperplaneData::from_equation(-&unit, -(c - r));
        let high = HyperplaneData::from_equation(unit, c + r);
        let (Some(low), Some(high)) = (low, high) else {
            bail!("degenerate hypercube hyperplane along axis {axis}");
        };
        hyperplanes.push([space.add_hyperplane(low)?, space.add_hyperplane(high)?]);
    }

    let mut builder = HypercubeBuilder {
        center,
        half_extents,
        ndim,
        hyperplanes,
        elements: HashMap::new(),
    };
    let id = builder.build(space, vec![0; ndim as usize])?;
    Ok(finish(space, SignedPolytope::from(id), watermark))
}

struct HypercubeBuilder<'a> {
    center: &'a Vector,
    half_extents: &'a Vector,
    ndim: u8,
    hyperplanes: Vec<[HyperplaneId; 2]>,
    /// Elements keyed by which side of each axis they are on: `-1`, `1`, or
    /// `0` for both.
    elements: HashMap<Vec<i8>, PolytopeId>,
}

impl HypercubeBuilder<'_> {
    fn build(&mut self, space: &mut Space, sides: Vec<i8>) -> Result<PolytopeId, IndexOverflow> {
        if let Some(&id) = self.elements.get(&sides) {
            return Ok(id);
        }

        let hyperplanes: HyperplaneSet = sides
            .iter()
            .enumerate()
            .filter(|&(_, &side)| side != 0)
            .map(|(axis, &side)| self.hyperplanes[axis][(side > 0) as usize])
            .collect();
        let rank = sides.iter().filter(|&&side| side == 0).count() as u8;

        let id = if rank == 0 {
            let coords = (0..self.ndim)
                .map(|i| self.center.get(i) + sides[i as usize] as Float * self.half_extents.get(i))
                .collect();
            space.add_vertex(self.ndim, Some(coords), hyperplanes)?
        } else {
            let mut facets = vec![];
            for axis in (0..sides.len()).filter(|&i| sides[i] == 0) {
                for side in [-1, 1] {
                    let mut facet_sides = sides.clone();
                    facet_sides[axis] = side;
                    let facet = self.build(space, facet_sides)?;
                    facets.push(SignedPolytope::new(facet, Sign::from(side), 0));
                }
            }
            space.add_polytope(PolytopeData::new(rank, self.ndim, facets, hyperplanes))?
        };
        self.elements.insert(sides, id);
        Ok(id)
    }
}

/// Constructs a simplex from `n + 1` points in `n`-dimensional space.
///
/// Returns an error if the points do not all have the same dimension or do
/// not span the space.
#[tracing::instrument(skip_all, fields(vertex_count = vertices.len()))]
pub fn make_simplex(space: &mut Space, vertices: &[Vector]) -> Result<SignedPolytope> {
    ensure!(vertices.len() >= 2, "simplex needs at least 2 vertices");
    let ndim = (vertices.len() - 1) as u8;
    ensure!(ndim <= MAX_NDIM, "simplex has too many dimensions: {ndim}");
    ensure!(
        vertices.iter().all(|v| v.ndim() == ndim),
        "simplex with {} vertices needs {ndim}-dimensional points",
        vertices.len(),
    );

    let watermark = space.next_polytope_id();
    let eps = space.params().vertex_epsilon;
    // Hyperplane `i` is opposite vertex `i`.
    let mut hyperplanes = vec![];
    for (i, v) in vertices.iter().enumerate() {
        let others = vertices
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, p)| p.clone())
            .collect_vec();
        let Some(mut h) = HyperplaneData::from_spanning_points(others, ndim) else {
            bail!("simplex vertices are affinely dependent");
        };
        let dist = h.signed_distance(v);
        ensure!(dist.abs() > eps, "simplex vertices are affinely dependent");
        if dist > 0.0 {
            h = h.flip();
        }
        hyperplanes.push(space.add_hyperplane(h)?);
    }

    let mut builder = SimplexBuilder {
        vertices,
        ndim,
        hyperplanes,
        elements: HashMap::new(),
    };
    let all = (1_u32 << vertices.len()) - 1;
    let id = builder.build(space, all)?;
    Ok(finish(space, SignedPolytope::from(id), watermark))
}

struct SimplexBuilder<'a> {
    vertices: &'a [Vector],
    ndim: u8,
    hyperplanes: Vec<HyperplaneId>,
    /// Elements keyed by the bitmask of vertices they contain.
    elements: HashMap<u32, PolytopeId>,
}

impl SimplexBuilder<'_> {
    fn build(&mut self, space: &mut Space, mask: u32) -> Result<PolytopeId, IndexOverflow> {
        if let Some(&id) = self.elements.get(&mask) {
            return Ok(id);
        }

        let members = (0..self.vertices.len()).filter(|&i| mask & (1 << i) != 0).collect_vec();
        let hyperplanes: HyperplaneSet = (0..self.vertices.len())
            .filter(|&i| mask & (1 << i) == 0)
            .map(|i| self.hyperplanes[i])
            .collect();

        let id = if let [i] = members.as_slice() {
            space.add_vertex(self.ndim, Some(self.vertices[*i].clone()), hyperplanes)?
        } else {
            let mut facets = vec![];
            for &i in &members {
                let facet = self.build(space, mask & !(1 << i))?;
                facets.push(SignedPolytope::from(facet));
            }
            let rank = (members.len() - 1) as u8;
            space.add_polytope(PolytopeData::new(rank, self.ndim, facets, hyperplanes))?
        };
        self.elements.insert(mask, id);
        Ok(id)
    }
}

/// Constructs a regular `{p/q}` polygon centered at the origin with the given
/// circumradius.
///
/// Star polygons (`q > 1`) are not supported and return an error.
#[tracing::instrument(skip(space))]
pub fn make_regular_polygon(
    space: &mut Space,
    p: u32,
    q: u32,
    radius: Float,
) -> Result<SignedPolytope> {
    ensure!(p >= 3, "polygon must have at least 3 sides, not {p}");
    ensure!(q >= 1, "invalid polygon density {q}");
    if q > 1 {
        bail!("star polygon {{{p}/{q}}} is not supported");
    }
    ensure!(radius > 0.0, "polygon radius must be positive");

    let watermark = space.next_polytope_id();
    let inradius = radius * (PI / p as Float).cos();
    let angle = |k: Float| 2.0 * PI * k / p as Float;

    // Edge `k` goes from vertex `k` to vertex `k + 1`.
    let mut edge_hyperplanes = vec![];
    for k in 0..p {
        let theta = angle(k as Float + 0.5);
        let h = space.add_hyperplane_from_equation(vector![theta.cos(), theta.sin()], inradius)?;
        edge_hyperplanes.push(h);
    }
    let mut vertices = vec![];
    for k in 0..p as usize {
        let theta = angle(k as Float);
        let coords = vector![radius * theta.cos(), radius * theta.sin()];
        let prev = edge_hyperplanes[(k + p as usize - 1) % p as usize];
        let hyperplanes = smallvec![prev, edge_hyperplanes[k]];
        vertices.push(space.add_vertex(2, Some(coords), hyperplanes)?);
    }
    let mut edges = vec![];
    for k in 0..p as usize {
        let facets = vec![
            SignedPolytope::new(vertices[k], Sign::Neg, 0),
            SignedPolytope::new(vertices[(k + 1) % p as usize], Sign::Pos, 0),
        ];
        let data = PolytopeData::new(1, 2, facets, smallvec![edge_hyperplanes[k]]);
        edges.push(SignedPolytope::from(space.add_polytope(data)?));
    }
    let polygon = space.add_polytope(PolytopeData::new(2, 2, edges, smallvec![]))?;
    Ok(finish(space, SignedPolytope::from(polygon), watermark))
}

/// Returns the vertices of a regular `ndim`-simplex centered at the origin
/// with unit circumradius.
pub fn regular_simplex_vertices(ndim: u8) -> Vec<Vector> {
    let n = ndim as Float;
    let a = (1.0 + 1.0 / n).sqrt();
    let b = ((n + 1.0).sqrt() + 1.0) / n.powf(1.5);
    let ones = vector![1.0; ndim as usize];
    (0..ndim)
        .map(|i| Vector::unit(i).pad(ndim) * a - &ones * b)
        .chain([&ones / n.sqrt()])
        .collect()
}

#[cfg(test)]
mod tests {
    use hypercsg_math::assert_approx_eq;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::orient::is_oriented_deep;
    use crate::simplicial::volume;

    #[test]
    fn test_hypercube_elements() {
        for ndim in 1..=5_u8 {
            let mut space = Space::new();
            let cube = make_hypercube(&mut space, &Vector::zero(ndim), &vector![1.0; ndim as usize])
                .expect("cube");
            // Number of rank-k elements is C(n, k) * 2^(n-k).
            let expected = (0..=ndim as u32)
                .map(|k| {
                    let n = ndim as u32;
                    let binomial = (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1));
                    binomial as usize * (1 << (n - k))
                })
                .collect_vec();
            assert_eq!(space.element_counts(cube.id), expected);
            assert!(is_oriented_deep(&space, cube.id));
            assert_eq!(space.hyperplane_count(), 2 * ndim as usize);
        }
    }

    #[test]
    fn test_regular_simplex() {
        for ndim in 1..=4 {
            let verts = regular_simplex_vertices(ndim);
            for v in &verts {
                assert_approx_eq!(v.mag(), 1.0);
            }
            assert_approx_eq!(verts.iter().sum::<Vector>(), Vector::zero(ndim));

            let mut space = Space::new();
            let simplex = make_simplex(&mut space, &verts).expect("simplex");
            assert!(volume(&space, simplex) > 0.0);
            assert!(is_oriented_deep(&space, simplex.id));
            assert_eq!(space.element_counts(simplex.id)[0], ndim as usize + 1);
        }
    }

    #[test]
    fn test_degenerate_simplex() {
        let mut space = Space::new();
        let verts = [vector![0.0, 0.0], vector![1.0, 1.0], vector![2.0, 2.0]];
        assert!(make_simplex(&mut space, &verts).is_err());
    }

    #[test]
    fn test_regular_polygon() {
        let mut space = Space::new();
        let hexagon = make_regular_polygon(&mut space, 6, 1, 1.0).expect("hexagon");
        assert_approx_eq!(volume(&space, hexagon), 1.5 * 3.0_f64.sqrt());
        assert_eq!(space.element_counts(hexagon.id), vec![6, 6, 1]);

        assert!(make_regular_polygon(&mut space, 5, 2, 1.0).is_err());
        assert!(make_regular_polygon(&mut space, 2, 1, 1.0).is_err());
    }
}
