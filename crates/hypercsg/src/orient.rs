//! Orientation of facet signs.
//!
//! Every element of rank at least 1 is oriented so that the signed sum of
//! its ridges is zero (each ridge is entered by one facet and exited by
//! another) and so that its outermost contours have positive volume relative
//! to its reference orientation. Contours nested inside other contours
//! alternate in sign, so holes have negative volume.
//!
//! The reference orientation of a rank-`k` element lying on hyperplanes with
//! normals `n_1, ..., n_m` (sorted by hyperplane ID) is the one for which
//! `det[f_1, ..., f_k, n_1, ..., n_m] > 0`. A facet is positively oriented
//! when its outward normal followed by its reference orientation is a
//! positive orientation of its parent.

use std::collections::HashMap;

use hypercsg_math::prelude::*;
use itertools::Itertools;
use smallvec::SmallVec;

use crate::classify::{Boundary, edge_direction};
use crate::simplicial::{cone_simplices, simplices_volume, volume};
use crate::{BoundingBox, PolytopeId, SignedPolytope, Space};

/// Orients every element of `p` and pushes the sign of `p` down into its
/// facets, so that the result has positive sign.
///
/// Every element of `p` is modified in place, so this must only be called on
/// polytopes that nothing else refers to yet.
#[tracing::instrument(skip_all, fields(p = %p))]
pub fn orient_deep(space: &mut Space, p: SignedPolytope) -> SignedPolytope {
    orient_deep_functional(space, p.id);
    orient_deep_cosmetic(space, p.id);
    let mut ret = settle_sign(space, p);
    if ret.sign == Sign::Neg {
        space.flip_facets(ret.id, |_| true);
        ret.sign = Sign::Pos;
    }
    ret
}

/// Fixes the facet signs of every element of a polytope, including itself.
pub fn orient_deep_functional(space: &mut Space, id: PolytopeId) {
    orient_functional_from(space, id, PolytopeId(0));
}

/// Reorders facets of every element of a polytope so that edges list their
/// vertices as `(-, +)` and 2-faces list their edges in cyclic order.
pub fn orient_deep_cosmetic(space: &mut Space, id: PolytopeId) {
    orient_cosmetic_from(space, id, PolytopeId(0));
}

/// Orients every element of `p` created at or after `watermark` and returns
/// an equivalent signed polytope whose volume has the sign implied by its
/// initial density: positive when it is bounded and negative when it is the
/// complement of a bounded region.
///
/// Elements created before `watermark` are assumed to be oriented already
/// and are never modified.
pub(crate) fn finish(
    space: &mut Space,
    p: SignedPolytope,
    watermark: PolytopeId,
) -> SignedPolytope {
    orient_functional_from(space, p.id, watermark);
    orient_cosmetic_from(space, p.id, watermark);
    let mut ret = settle_sign(space, p);
    if ret.sign == Sign::Neg && p.id >= watermark {
        space.flip_facets(ret.id, |_| true);
        ret.sign = Sign::Pos;
    }
    ret
}

/// Returns `p` with the sign that gives it the orientation implied by its
/// initial density.
fn settle_sign(space: &Space, p: SignedPolytope) -> SignedPolytope {
    let data = &space[p.id];
    if data.rank == 0 || data.is_facetless() {
        return SignedPolytope::new(p.id, Sign::Pos, p.initial_density);
    }
    let desired = if p.initial_density == 0 {
        Sign::Pos
    } else {
        Sign::Neg
    };
    let current = Sign::from(volume(space, SignedPolytope::from(p.id)));
    SignedPolytope::new(p.id, current * desired, p.initial_density)
}

fn orient_functional_from(space: &mut Space, id: PolytopeId, watermark: PolytopeId) {
    let elements = space.all_elements(id);
    for bucket in elements.iter().skip(1) {
        for &e in bucket.iter().filter(|&&e| e >= watermark) {
            match space[e].rank {
                1 => orient_edge(space, e),
                _ => orient_element(space, e),
            }
        }
    }
}

fn orient_cosmetic_from(space: &mut Space, id: PolytopeId, watermark: PolytopeId) {
    let elements = space.all_elements(id);
    for &e in elements.get(1).into_iter().flatten().filter(|&&e| e >= watermark) {
        sort_edge_vertices(space, e);
    }
    for &e in elements.get(2).into_iter().flatten().filter(|&&e| e >= watermark) {
        order_face_edges(space, e);
    }
}

/// Sorts the vertices of an edge along its reference direction and assigns
/// alternating signs starting with `-`.
///
/// # Panics
///
/// Panics if the edge has an odd number of vertices.
fn orient_edge(space: &mut Space, id: PolytopeId) {
    let data = &space[id];
    if data.facets.is_empty() {
        return;
    }
    assert!(
        data.facets.len() % 2 == 0,
        "edge {id} has an odd number of vertices: {}",
        data.facets.iter().join(", "),
    );

    let Some(coords) = data
        .facets
        .iter()
        .map(|v| Some((v.id, space.coords(v.id)?)))
        .collect::<Option<Vec<_>>>()
    else {
        tracing::warn!(%id, "cannot orient edge with unknown vertex coordinates");
        return;
    };

    let axis = edge_direction(space, &data.hyperplanes, data.ndim)
        .normalize()
        .filter(|v| v.mag2() > 0.5)
        .or_else(|| farthest_pair_axis(&coords));
    let Some(axis) = axis else {
        tracing::warn!(%id, "cannot orient degenerate edge");
        return;
    };

    let new_facets = coords
        .iter()
        .map(|(v, pos)| (pos.dot(&axis), *v))
        .sorted_by(|(a, v1), (b, v2)| a.total_cmp(b).then(v1.cmp(v2)))
        .enumerate()
        .map(|(i, (_, v))| SignedPolytope::new(v, Sign::from_is_neg(i % 2 == 0), 0))
        .collect();
    space.reorder_facets(id, new_facets);
}

/// Returns the direction between the two points that are farthest apart.
fn farthest_pair_axis(points: &[(PolytopeId, Vector)]) -> Option<Vector> {
    let (a, b) = points
        .iter()
        .tuple_combinations()
        .max_by(|(a1, b1), (a2, b2)| (&a1.1 - &b1.1).mag2().total_cmp(&(&a2.1 - &b2.1).mag2()))?;
    let (low, high) = if a.0 < b.0 { (a, b) } else { (b, a) };
    (&high.1 - &low.1).normalize()
}

/// Orients the facets of an element of rank at least 2, assuming its facets
/// are already oriented.
///
/// # Panics
///
/// Panics if a ridge does not border exactly two facets or if the facet signs
/// cannot be made consistent.
fn orient_element(space: &mut Space, id: PolytopeId) {
    let data = &space[id];
    let mut facets = data.facets.clone();
    if facets.is_empty() {
        return;
    }

    // Map each ridge to the facets it borders, along with its sign in each.
    let mut ridges: HashMap<PolytopeId, SmallVec<[(usize, Sign); 2]>> = HashMap::new();
    for (i, f) in facets.iter().enumerate() {
        for r in &space[f.id].facets {
            ridges.entry(r.id).or_default().push((i, r.sign));
        }
    }
    for (r, bordering) in &ridges {
        assert_eq!(
            bordering.len(),
            2,
            "ridge {r} of {id} borders {} facets instead of 2",
            bordering.len(),
        );
    }

    // Flood fill signs across ridges. Each connected component is a contour.
    let mut signs: Vec<Option<Sign>> = vec![None; facets.len()];
    let mut contours: Vec<Vec<usize>> = vec![];
    for start in 0..facets.len() {
        if signs[start].is_some() {
            continue;
        }
        signs[start] = Some(facets[start].sign);
        let mut contour = vec![];
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            contour.push(i);
            let s_i = signs[i].unwrap_or(Sign::Pos);
            for r in &space[facets[i].id].facets {
                let Some(&(j, rho_j)) = ridges[&r.id].iter().find(|&&(j, _)| j != i) else {
                    continue;
                };
                let want = -(s_i * r.sign * rho_j);
                match signs[j] {
                    None => {
                        signs[j] = Some(want);
                        stack.push(j);
                    }
                    Some(s) => assert_eq!(
                        s, want,
                        "inconsistent orientation of facet {} of {id} across ridge {}",
                        facets[j].id, r.id,
                    ),
                }
            }
        }
        contour.sort_unstable();
        contours.push(contour);
    }
    for (f, s) in std::iter::zip(&mut facets, &signs) {
        f.sign = s.unwrap_or(Sign::Pos);
    }

    // Give each contour positive volume on its own.
    for contour in &contours {
        let contour_facets = contour.iter().map(|&i| facets[i]).collect_vec();
        let v = contour_volume(space, id, &contour_facets);
        if v.abs() < EPSILON {
            tracing::warn!(%id, volume = v, "contour has near-zero volume");
        }
        if v < 0.0 {
            for &i in contour {
                facets[i].sign = -facets[i].sign;
            }
        }
    }

    // Flip contours nested at odd depth.
    if contours.len() > 1 {
        let depths = nesting_depths(space, id, &facets, &contours);
        for (contour, depth) in std::iter::zip(&contours, depths) {
            if depth % 2 == 1 {
                for &i in contour {
                    facets[i].sign = -facets[i].sign;
                }
            }
        }
    }

    space.reorder_facets(id, facets);
}

/// Returns the signed volume enclosed by a closed set of facets of `id`.
fn contour_volume(space: &Space, id: PolytopeId, contour: &[SignedPolytope]) -> Float {
    let data = &space[id];
    let Some(apex) = contour.first().and_then(|f| space.vertices_of(f.id).first().copied()) else {
        return 0.0;
    };
    let simplices = cone_simplices(space, apex, contour);
    simplices_volume(space, &simplices, &data.hyperplanes, data.rank, data.ndim)
}

/// Returns how many other contours enclose each contour.
fn nesting_depths(
    space: &Space,
    id: PolytopeId,
    facets: &[SignedPolytope],
    contours: &[Vec<usize>],
) -> Vec<usize> {
    let data = &space[id];
    let eps = space.params().classify_epsilon;

    let bboxes = contours
        .iter()
        .map(|contour| {
            contour
                .iter()
                .filter_map(|&i| space.bbox(facets[i].id))
                .reduce(|a, b| a.union(&b))
        })
        .collect_vec();
    let axis = bboxes
        .iter()
        .flatten()
        .cloned()
        .reduce(|a, b| a.union(&b))
        .map_or(0, |b: BoundingBox| b.largest_axis());

    // A contour can only enclose contours that start after it along the axis.
    let order = (0..contours.len())
        .sorted_by(|&a, &b| {
            let min_a = bboxes[a].as_ref().map_or(Float::INFINITY, |bbox| bbox.min.get(axis));
            let min_b = bboxes[b].as_ref().map_or(Float::INFINITY, |bbox| bbox.min.get(axis));
            min_a.total_cmp(&min_b).then(a.cmp(&b))
        })
        .collect_vec();

    let mut depths = vec![0; contours.len()];
    for (k, &c) in order.iter().enumerate() {
        let samples = contours[c]
            .iter()
            .flat_map(|&i| space.vertices_of(facets[i].id))
            .unique()
            .filter_map(|v| space.coords(v))
            .collect_vec();
        for &outer in &order[..k] {
            let outer_facets = contours[outer].iter().map(|&i| facets[i]).collect_vec();
            let boundary = Boundary {
                rank: data.rank,
                ndim: data.ndim,
                hyperplanes: &data.hyperplanes,
                facets: &outer_facets,
                salt: id.0 as u64,
            };
            let inside = samples
                .iter()
                .find_map(|point| boundary.winding_number(space, point, eps).is_inside());
            match inside {
                Some(true) => depths[c] += 1,
                Some(false) => (),
                None => tracing::warn!(%id, "cannot determine nesting of contours"),
            }
        }
    }
    depths
}

/// Puts the `-` vertex of a two-vertex edge first.
fn sort_edge_vertices(space: &mut Space, id: PolytopeId) {
    let facets = &space[id].facets;
    if let [a, b] = facets.as_slice()
        && a.sign == Sign::Pos
        && b.sign == Sign::Neg
    {
        let new_facets = vec![*b, *a];
        space.reorder_facets(id, new_facets);
    }
}

/// Reorders the edges of a 2-face so that each contour is listed in cyclic
/// order. Faces with edges that do not have exactly two vertices are left
/// unchanged.
fn order_face_edges(space: &mut Space, id: PolytopeId) {
    let facets = space[id].facets.clone();
    let mut segments = Vec::with_capacity(facets.len());
    for f in &facets {
        let [a, b] = space[f.id].facets.as_slice() else {
            return;
        };
        let (tail, head) = if a.sign == Sign::Neg { (a.id, b.id) } else { (b.id, a.id) };
        segments.push(match f.sign {
            Sign::Pos => (tail, head),
            Sign::Neg => (head, tail),
        });
    }

    let mut outgoing: HashMap<PolytopeId, Vec<usize>> = HashMap::new();
    for (i, &(start, _)) in segments.iter().enumerate() {
        outgoing.entry(start).or_default().push(i);
    }
    let mut used = vec![false; segments.len()];
    let mut order = Vec::with_capacity(segments.len());
    for first in 0..segments.len() {
        let mut i = first;
        while !used[i] {
            used[i] = true;
            order.push(i);
            let end = segments[i].1;
            match outgoing.get(&end).and_then(|next| next.iter().find(|&&j| !used[j])) {
                Some(&j) => i = j,
                None => break,
            }
        }
    }
    space.reorder_facets(id, order.into_iter().map(|i| facets[i]).collect());
}

/// Returns whether the facets of a polytope have consistent signs: the
/// signed sum of every ridge over all facets is zero.
pub fn is_oriented_shallow(space: &Space, id: PolytopeId) -> bool {
    let data = &space[id];
    match data.rank {
        0 => true,
        1 => data.facets.iter().map(|v| v.sign.to_num::<i32>()).sum::<i32>() == 0,
        _ => {
            let mut sums: HashMap<PolytopeId, i32> = HashMap::new();
            for f in &data.facets {
                for r in &space[f.id].facets {
                    *sums.entry(r.id).or_default() += (f.sign * r.sign).to_num::<i32>();
                }
            }
            sums.values().all(|&n| n == 0)
        }
    }
}

/// Returns whether every element of a polytope, including itself, has
/// consistent facet signs.
pub fn is_oriented_deep(space: &Space, id: PolytopeId) -> bool {
    space
        .all_elements(id)
        .iter()
        .flatten()
        .all(|&e| is_oriented_shallow(space, e))
}

#[cfg(test)]
mod tests {
    use hypercsg_math::assert_approx_eq;

    use super::*;
    use crate::primitives::make_hypercube;
    use crate::{PolytopeData, intersect};

    #[test]
    fn test_orient_scrambled_cube() {
        let mut space = Space::new();
        let cube =
            make_hypercube(&mut space, &Vector::zero(3), &vector![1.0, 1.0, 1.0]).expect("cube");
        let v = volume(&space, cube);

        // Scramble every facet sign.
        let elements = space.all_elements(cube.id);
        for &e in elements.iter().flatten() {
            space.flip_facets(e, |i| i % 3 == 0);
        }
        assert!(!is_oriented_deep(&space, cube.id));

        let fixed = orient_deep(&mut space, cube);
        assert!(is_oriented_deep(&space, fixed.id));
        assert_eq!(fixed.sign, Sign::Pos);
        assert_approx_eq!(volume(&space, fixed), v);
    }

    #[test]
    fn test_square_with_hole() {
        let mut space = Space::new();
        let outer =
            make_hypercube(&mut space, &Vector::zero(2), &vector![2.0, 2.0]).expect("square");
        let inner =
            make_hypercube(&mut space, &Vector::zero(2), &vector![1.0, 1.0]).expect("square");
        let annulus = intersect::diff(&mut space, outer, inner).expect("diff");
        assert_approx_eq!(volume(&space, annulus), 12.0);

        // Rebuild the same polygon from scratch with every edge positive.
        let edges = space.facets_of(annulus).iter().map(|f| SignedPolytope::from(f.id)).collect();
        let data = PolytopeData::new(2, 2, edges, SmallVec::new());
        let id = space.add_polytope(data).expect("polytope");
        let rebuilt = orient_deep(&mut space, SignedPolytope::from(id));
        assert!(is_oriented_shallow(&space, rebuilt.id));
        assert_approx_eq!(volume(&space, rebuilt), 12.0);
    }
}
