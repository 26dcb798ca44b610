//! Conversion between 3D boundary meshes and polytopes.

use std::collections::{BTreeMap, HashMap};

use float_ord::FloatOrd;
use hypercsg_math::prelude::*;
use itertools::Itertools;
use smallvec::smallvec;

use crate::classify::edge_direction;
use crate::orient::{finish, is_oriented_shallow};
use crate::{HyperplaneData, HyperplaneId, PolytopeData, PolytopeId, SignedPolytope, Space};

/// Boundary mesh of a 3D solid.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Mesh {
    /// Vertex coordinates.
    pub verts: Vec<Vector>,
    /// For each face, a list of closed contours of indices into `verts`. Outer
    /// contours are counterclockwise when seen from outside the solid and
    /// holes are clockwise.
    pub faces: Vec<Vec<Vec<usize>>>,
}

/// Error converting between a mesh and a polytope.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum MeshError {
    #[error("vertex {index} has {ndim} coordinates instead of 3")]
    WrongDimension { index: usize, ndim: u8 },
    #[error("face {face} references vertex {vertex} but there are only {count} vertices")]
    VertexOutOfRange {
        face: usize,
        vertex: usize,
        count: usize,
    },
    #[error("face {face} has a contour with fewer than 3 vertices")]
    DegenerateContour { face: usize },
    #[error("face {face} has zero area")]
    DegenerateFace { face: usize },
    #[error("segment {a}-{b} borders {count} faces instead of 2")]
    NonManifold { a: usize, b: usize, count: usize },
    #[error("segment {a}-{b} joins two coplanar faces")]
    CoplanarSegment { a: usize, b: usize },
    #[error("vertex {vertex} touches {count} distinct face planes; at most 3 are supported")]
    TooManyHyperplanesAtVertex { vertex: usize, count: usize },
    #[error("vertex {vertex} touches only {count} distinct face planes")]
    TooFewHyperplanesAtVertex { vertex: usize, count: usize },
    #[error("polytope is rank {rank} in {ndim}D space instead of a 3D solid")]
    NotSolid { rank: u8, ndim: u8 },
    #[error("vertex {0} has no coordinates")]
    UnknownCoordinates(PolytopeId),
    #[error("mesh does not bound a consistently oriented solid")]
    Unoriented,
    #[error(transparent)]
    IndexOverflow(#[from] IndexOverflow),
}

/// Builds a 3D polytope from a boundary mesh.
///
/// Faces that lie in the same plane share a hyperplane. Every vertex must
/// touch exactly three distinct face planes.
#[tracing::instrument(skip_all, fields(verts = mesh.verts.len(), faces = mesh.faces.len()))]
pub fn mesh_to_polytope(space: &mut Space, mesh: &Mesh) -> Result<SignedPolytope, MeshError> {
    for (index, v) in mesh.verts.iter().enumerate() {
        if v.ndim() != 3 {
            return Err(MeshError::WrongDimension { index, ndim: v.ndim() });
        }
    }
    for (face, contours) in mesh.faces.iter().enumerate() {
        for contour in contours {
            if contour.len() < 3 {
                return Err(MeshError::DegenerateContour { face });
            }
            if let Some(&vertex) = contour.iter().find(|&&v| v >= mesh.verts.len()) {
                let count = mesh.verts.len();
                return Err(MeshError::VertexOutOfRange { face, vertex, count });
            }
        }
    }

    let watermark = space.next_polytope_id();
    let eps = space.params().vertex_epsilon;

    // Fit a plane to each face, sharing hyperplanes between coplanar faces.
    let mut planes: Vec<(HyperplaneData, HyperplaneId)> = vec![];
    let mut face_planes = vec![];
    for (face, contours) in mesh.faces.iter().enumerate() {
        let plane = fit_plane(&mesh.verts, contours).ok_or(MeshError::DegenerateFace { face })?;
        let existing = planes.iter().find(|(p, _)| {
            p.normal.approx_eq(&plane.normal, eps) && (p.offset - plane.offset).abs() <= eps
        });
        let h = match existing {
            Some(&(_, h)) => h,
            None => {
                let h = space.add_hyperplane(plane.clone())?;
                planes.push((plane, h));
                h
            }
        };
        face_planes.push(h);
    }

    // Canonical segments, each bordering exactly two faces.
    let mut segments: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
    for (face, contours) in mesh.faces.iter().enumerate() {
        for contour in contours {
            for (&a, &b) in contour.iter().circular_tuple_windows() {
                segments.entry((a.min(b), a.max(b))).or_default().push(face);
            }
        }
    }
    for (&(a, b), faces) in &segments {
        if faces.len() != 2 {
            let count = faces.len();
            return Err(MeshError::NonManifold { a, b, count });
        }
        if face_planes[faces[0]] == face_planes[faces[1]] {
            return Err(MeshError::CoplanarSegment { a, b });
        }
    }

    // Vertices
    let mut vertex_planes: HashMap<usize, Vec<HyperplaneId>> = HashMap::new();
    for (face, contours) in mesh.faces.iter().enumerate() {
        for &v in contours.iter().flatten() {
            vertex_planes.entry(v).or_default().push(face_planes[face]);
        }
    }
    let mut vertex_ids = HashMap::new();
    for (vertex, mut hyperplanes) in vertex_planes.into_iter().sorted_by_key(|(v, _)| *v) {
        hyperplanes.sort_unstable();
        hyperplanes.dedup();
        let count = hyperplanes.len();
        if count > 3 {
            tracing::warn!(vertex, count, "vertex touches too many face planes");
            return Err(MeshError::TooManyHyperplanesAtVertex { vertex, count });
        }
        if count < 3 {
            return Err(MeshError::TooFewHyperplanesAtVertex { vertex, count });
        }
        let coords = mesh.verts[vertex].clone();
        let id = space.add_vertex(3, Some(coords), hyperplanes.into_iter().collect())?;
        vertex_ids.insert(vertex, id);
    }

    // Edges
    let mut edge_ids = HashMap::new();
    for (&(a, b), faces) in &segments {
        let facets = vec![
            SignedPolytope::new(vertex_ids[&a], Sign::Neg, 0),
            SignedPolytope::new(vertex_ids[&b], Sign::Pos, 0),
        ];
        let hyperplanes = smallvec![face_planes[faces[0]], face_planes[faces[1]]];
        let id = space.add_polytope(PolytopeData::new(1, 3, facets, hyperplanes))?;
        edge_ids.insert((a, b), id);
    }

    // Faces
    let mut faces = vec![];
    for (face, contours) in mesh.faces.iter().enumerate() {
        let facets = contours
            .iter()
            .flat_map(|contour| contour.iter().circular_tuple_windows())
            .map(|(&a, &b)| SignedPolytope::from(edge_ids[&(a.min(b), a.max(b))]))
            .collect();
        let data = PolytopeData::new(2, 3, facets, smallvec![face_planes[face]]);
        faces.push(SignedPolytope::from(space.add_polytope(data)?));
    }

    let cell = space.add_polytope(PolytopeData::new(3, 3, faces, smallvec![]))?;
    let ret = finish(space, SignedPolytope::from(cell), watermark);
    if !is_oriented_shallow(space, ret.id) {
        return Err(MeshError::Unoriented);
    }
    Ok(ret)
}

/// Returns the plane of a face using Newell's method, with the normal
/// pointing toward the side from which the outer contours are
/// counterclockwise.
fn fit_plane(verts: &[Vector], contours: &[Vec<usize>]) -> Option<HyperplaneData> {
    let mut normal = Vector::zero(3);
    for contour in contours {
        let origin = &verts[contour[0]];
        for (&a, &b) in contour.iter().skip(1).tuple_windows() {
            let u = &verts[a] - origin;
            let v = &verts[b] - origin;
            normal += cross_product(&[u, v], 3);
        }
    }
    let normal = normal.normalize()?;
    let points = contours.iter().flatten().map(|&v| &verts[v]).collect_vec();
    let offset = points.iter().map(|p| normal.dot(p)).sum::<Float>() / points.len() as Float;
    HyperplaneData::from_equation(normal, offset)
}

/// Returns the boundary mesh of a 3D solid.
#[tracing::instrument(skip_all, fields(%p))]
pub fn polytope_to_mesh(space: &Space, p: SignedPolytope) -> Result<Mesh, MeshError> {
    let data = &space[p.id];
    if data.rank != 3 || data.ndim != 3 {
        return Err(MeshError::NotSolid {
            rank: data.rank,
            ndim: data.ndim,
        });
    }

    let vertex_ids = space.vertices_of(p.id);
    let verts = vertex_ids
        .iter()
        .map(|&v| space.coords(v).ok_or(MeshError::UnknownCoordinates(v)))
        .collect::<Result<Vec<_>, _>>()?;
    let index_of = |v: PolytopeId| vertex_ids.binary_search(&v).ok();

    let mut faces = vec![];
    for face in space.facets_of(p) {
        // Directed segments, counterclockwise when seen from outside.
        let mut segments = vec![];
        for edge in space.facets_of(face) {
            for (tail, head) in edge_segments(space, edge.id)? {
                let (Some(tail), Some(head)) = (index_of(tail), index_of(head)) else {
                    continue;
                };
                segments.push(match edge.sign {
                    Sign::Pos => (tail, head),
                    Sign::Neg => (head, tail),
                });
            }
        }
        faces.push(chain_segments(&segments));
    }

    Ok(Mesh { verts, faces })
}

/// Returns the segments of an edge, each directed from its `-` vertex to its
/// `+` vertex.
fn edge_segments(
    space: &Space,
    edge: PolytopeId,
) -> Result<Vec<(PolytopeId, PolytopeId)>, MeshError> {
    let data = &space[edge];
    let axis = edge_direction(space, &data.hyperplanes, data.ndim);
    let mut sorted = vec![];
    for v in &data.facets {
        let coords = space.coords(v.id).ok_or(MeshError::UnknownCoordinates(v.id))?;
        sorted.push((coords.dot(&axis), *v));
    }
    sorted.sort_by_key(|(t, _)| FloatOrd(*t));
    Ok(sorted
        .chunks_exact(2)
        .map(|pair| match pair[0].1.sign {
            Sign::Neg => (pair[0].1.id, pair[1].1.id),
            Sign::Pos => (pair[1].1.id, pair[0].1.id),
        })
        .collect())
}

/// Chains directed segments into closed contours.
fn chain_segments(segments: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut outgoing: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, &(tail, _)) in segments.iter().enumerate() {
        outgoing.entry(tail).or_default().push(i);
    }
    let mut used = vec![false; segments.len()];
    let mut contours = vec![];
    for first in 0..segments.len() {
        if used[first] {
            continue;
        }
        let mut contour = vec![];
        let mut i = first;
        loop {
            used[i] = true;
            let (tail, head) = segments[i];
            contour.push(tail);
            match outgoing.get(&head).and_then(|next| next.iter().find(|&&j| !used[j])) {
                Some(&j) => i = j,
                None => break,
            }
        }
        contours.push(contour);
    }
    contours
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_chain_segments() {
        let contours = chain_segments(&[(2, 0), (0, 1), (5, 3), (1, 2), (3, 4), (4, 5)]);
        assert_eq!(contours, vec![vec![2, 0, 1], vec![5, 3, 4]]);
    }

    #[test]
    fn test_mesh_errors() {
        let mut space = Space::new();
        let verts = vec![
            vector![0.0, 0.0, 0.0],
            vector![1.0, 0.0, 0.0],
            vector![0.0, 1.0, 0.0],
            vector![0.0, 0.0, 1.0],
        ];

        // Missing a face
        let open = Mesh {
            verts: verts.clone(),
            faces: vec![vec![vec![0, 2, 1]], vec![vec![0, 1, 3]], vec![vec![0, 3, 2]]],
        };
        assert!(matches!(
            mesh_to_polytope(&mut space, &open),
            Err(MeshError::NonManifold { count: 1, .. }),
        ));

        let out_of_range = Mesh {
            verts: verts.clone(),
            faces: vec![vec![vec![0, 2, 9]]],
        };
        assert_eq!(
            mesh_to_polytope(&mut space, &out_of_range),
            Err(MeshError::VertexOutOfRange {
                face: 0,
                vertex: 9,
                count: 4,
            }),
        );

        let flat = Mesh {
            verts: vec![vector![0.0, 0.0]],
            faces: vec![],
        };
        assert_eq!(
            mesh_to_polytope(&mut space, &flat),
            Err(MeshError::WrongDimension { index: 0, ndim: 2 }),
        );
    }

    #[test]
    fn test_octahedron_vertices_touch_four_planes() {
        let mut space = Space::new();
        let verts = vec![
            vector![1.0, 0.0, 0.0],
            vector![-1.0, 0.0, 0.0],
            vector![0.0, 1.0, 0.0],
            vector![0.0, -1.0, 0.0],
            vector![0.0, 0.0, 1.0],
            vector![0.0, 0.0, -1.0],
        ];
        let faces = [
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ];
        let mesh = Mesh {
            verts,
            faces: faces.iter().map(|f| vec![f.to_vec()]).collect(),
        };
        assert!(matches!(
            mesh_to_polytope(&mut space, &mesh),
            Err(MeshError::TooManyHyperplanesAtVertex { count: 4, .. }),
        ));
    }
}
