use std::sync::Once;

use hypercsg_math::assert_approx_eq;
use hypercsg_math::prelude::*;
use itertools::Itertools;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::classify::is_inside;
use crate::import::{ImportErrorKind, import_polytope};
use crate::intersect::{complement, diff, intersect, union};
use crate::mesh::{mesh_to_polytope, polytope_to_mesh};
use crate::orient::is_oriented_deep;
use crate::primitives::make_hypercube;
use crate::simplicial::volume;
use crate::topology::topological_fingerprint;
use crate::{Mesh, SignedPolytope, Space};

static INIT_LOGGING: Once = Once::new();

/// Installs a tracing subscriber and error report handler for tests. Use
/// `RUST_LOG=hypercsg=debug` to see the spans of each operation.
fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        use tracing_subscriber::prelude::*;

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .with(tracing_error::ErrorLayer::default())
            .try_init();
        let _ = color_eyre::install();
    });
}

fn cube(space: &mut Space, center: [Float; 3], half_extent: Float) -> SignedPolytope {
    let center: Vector = center.into_iter().collect();
    make_hypercube(space, &center, &vector![half_extent; 3]).expect("error constructing cube")
}

/// `A = [-3, 1]^3` and `B = [-1, 3]^3`.
fn overlapping_cubes(space: &mut Space) -> (SignedPolytope, SignedPolytope) {
    let a = cube(space, [-1.0, -1.0, -1.0], 2.0);
    let b = cube(space, [1.0, 1.0, 1.0], 2.0);
    (a, b)
}

#[test]
fn test_overlapping_cubes() -> eyre::Result<()> {
    init_test_logging();
    let mut space = Space::new();
    let (a, b) = overlapping_cubes(&mut space);

    let i = intersect(&mut space, a, b)?;
    assert_eq!(space.element_counts(i.id), vec![8, 12, 6, 1]);
    assert_approx_eq!(volume(&space, i), 8.0);

    let u = union(&mut space, a, b)?;
    assert_eq!(u.initial_density, 0);
    assert_approx_eq!(volume(&space, u), 120.0);
    assert_eq!(space.vertices_of(u.id).len(), 20);

    let d = diff(&mut space, a, b)?;
    assert_approx_eq!(volume(&space, d), 56.0);

    for p in [i, u, d] {
        assert!(is_oriented_deep(&space, p.id), "{}", space.dump_to_string(p));
    }

    let eps = space.params().classify_epsilon;
    let origin = vector![0.0, 0.0, 0.0];
    let only_b = vector![2.0, 2.0, 2.0];
    assert_eq!(is_inside(&space, u, &origin, eps), Some(true));
    assert_eq!(is_inside(&space, u, &only_b, eps), Some(true));
    assert_eq!(is_inside(&space, d, &origin, eps), Some(false));
    assert_eq!(is_inside(&space, d, &only_b, eps), Some(false));
    assert_eq!(is_inside(&space, d, &vector![-2.0, -2.0, -2.0], eps), Some(true));

    Ok(())
}

#[test]
fn test_complement_volume() -> eyre::Result<()> {
    init_test_logging();
    let mut space = Space::new();
    let (a, b) = overlapping_cubes(&mut space);

    assert_approx_eq!(volume(&space, complement(a)), -64.0);

    // Both outside means outside the union.
    let outside = intersect(&mut space, complement(a), complement(b))?;
    assert_eq!(outside.initial_density, 1);
    assert_approx_eq!(volume(&space, outside), -120.0);
    Ok(())
}

#[test]
fn test_tesseract_volume_additivity() -> eyre::Result<()> {
    init_test_logging();
    let mut space = Space::new();
    let a = make_hypercube(&mut space, &vector![1.0; 4], &vector![1.0; 4])?;
    let b = make_hypercube(&mut space, &vector![2.0; 4], &vector![1.0; 4])?;

    let i = intersect(&mut space, a, b)?;
    let u = union(&mut space, a, b)?;
    let d = diff(&mut space, a, b)?;
    assert_approx_eq!(volume(&space, i), 1.0);
    assert_approx_eq!(volume(&space, u), 31.0);
    assert_approx_eq!(volume(&space, d), 15.0);
    assert_approx_eq!(volume(&space, i) + volume(&space, d), volume(&space, a));

    assert_eq!(space.element_counts(i.id), vec![16, 32, 24, 8, 1]);
    for p in [i, u, d] {
        assert!(is_oriented_deep(&space, p.id));
    }
    Ok(())
}

#[test]
fn test_chained_operations_reuse_operands() -> eyre::Result<()> {
    init_test_logging();
    let mut space = Space::new();
    let (a, b) = overlapping_cubes(&mut space);
    let c = cube(&mut space, [0.0, 0.0, 0.0], 0.5);

    // (A u B) \ C, then intersect again with A.
    let u = union(&mut space, a, b)?;
    let hollow = diff(&mut space, u, c)?;
    assert_approx_eq!(volume(&space, hollow), 119.0);

    let rest = intersect(&mut space, hollow, a)?;
    assert_approx_eq!(volume(&space, rest), 63.0);

    // Operands are never modified.
    assert_approx_eq!(volume(&space, a), 64.0);
    assert_approx_eq!(volume(&space, u), 120.0);
    assert!(is_oriented_deep(&space, rest.id));
    Ok(())
}

#[test]
fn test_operation_with_own_result() -> eyre::Result<()> {
    init_test_logging();
    let mut space = Space::new();
    let (a, b) = overlapping_cubes(&mut space);
    let u = union(&mut space, a, b)?;
    let i = intersect(&mut space, a, b)?;
    let d = diff(&mut space, a, b)?;

    // The faces of `A` lie on the same hyperplanes as faces of `A u B`.
    let back_to_a = intersect(&mut space, u, a)?;
    assert_approx_eq!(volume(&space, back_to_a), 64.0);
    assert_eq!(back_to_a.id, a.id);

    let still_i = intersect(&mut space, i, a)?;
    assert_approx_eq!(volume(&space, still_i), 8.0);
    assert_eq!(still_i.id, i.id);

    let reunited = union(&mut space, d, b)?;
    assert_approx_eq!(volume(&space, reunited), 120.0);

    let nothing = intersect(&mut space, d, i)?;
    assert!(space[nothing.id].is_facetless());
    assert_eq!(nothing.initial_density, 0);

    for p in [back_to_a, still_i, reunited] {
        assert!(is_oriented_deep(&space, p.id), "{}", space.dump_to_string(p));
    }

    let eps = space.params().classify_epsilon;
    assert_eq!(is_inside(&space, reunited, &vector![0.0, 0.0, 0.0], eps), Some(true));
    assert_eq!(is_inside(&space, reunited, &vector![2.0, -2.0, 0.0], eps), Some(false));
    Ok(())
}

#[test]
fn test_reject_vertex_on_too_many_hyperplanes() {
    init_test_logging();
    // Square pyramid with apex at vertex 4.
    let text = "
        5 0-cells:
          -1 -1 0
           1 -1 0
           1  1 0
          -1  1 0
           0  0 1
        8 1-cells:
          !0 !1
          !1 !2
          !2 !3
          !3 !0
          !0 !4
          !1 !4
          !2 !4
          !3 !4
        5 2-cells:
          !0 !1 !2 !3
          !0 !5 !4
          !1 !6 !5
          !2 !7 !6
          !3 !4 !7
        1 3-cells:
          !0 !1 !2 !3 !4
    ";
    let mut space = Space::new();
    let err = import_polytope(&mut space, text).expect_err("apex lies on four planes");
    assert_eq!(
        err.kind,
        ImportErrorKind::TooManyHyperplanesAtVertex {
            vertex: 4,
            count: 4,
            ndim: 3,
        },
    );
    assert!(err.to_string().starts_with(&format!("line {}: vertex 4", err.line)));
    assert_eq!(space.polytope_count(), 0);
}

#[test]
fn test_non_convex_operand() -> eyre::Result<()> {
    init_test_logging();
    let mut space = Space::new();
    let l = mesh_to_polytope(&mut space, &l_prism_mesh())?;
    // Covers the inner corner of the L and sticks out above and below it.
    let c = make_hypercube(&mut space, &vector![1.0, 1.0, 0.5], &vector![0.5, 0.5, 1.0])?;

    let i = intersect(&mut space, l, c)?;
    let u = union(&mut space, l, c)?;
    let d = diff(&mut space, l, c)?;
    assert_approx_eq!(volume(&space, i), 0.75);
    assert_approx_eq!(volume(&space, u), 4.25);
    assert_approx_eq!(volume(&space, d), 2.25);
    for p in [i, u, d] {
        assert!(is_oriented_deep(&space, p.id), "{}", space.dump_to_string(p));
    }

    // The intersection is itself an L-shaped prism.
    assert_eq!(space.element_counts(i.id), vec![12, 18, 8, 1]);
    assert_eq!(topological_fingerprint(&space, i.id), topological_fingerprint(&space, l.id));

    let eps = space.params().classify_epsilon;
    let notch = vector![1.25, 1.25, 0.5];
    assert_eq!(is_inside(&space, i, &notch, eps), Some(false));
    assert_eq!(is_inside(&space, u, &notch, eps), Some(true));
    assert_eq!(is_inside(&space, d, &vector![0.25, 0.25, 0.5], eps), Some(true));
    assert_eq!(is_inside(&space, d, &vector![0.75, 0.75, 0.5], eps), Some(false));

    // Round trip through the mesh format keeps the non-convex face intact.
    let mesh = polytope_to_mesh(&space, i)?;
    let again = mesh_to_polytope(&mut space, &mesh)?;
    assert_approx_eq!(volume(&space, again), 0.75);
    Ok(())
}

fn tetrahedron_mesh() -> Mesh {
    Mesh {
        verts: vec![
            vector![0.0, 0.0, 0.0],
            vector![1.0, 0.0, 0.0],
            vector![0.0, 1.0, 0.0],
            vector![0.0, 0.0, 1.0],
        ],
        faces: [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]]
            .iter()
            .map(|f| vec![f.to_vec()])
            .collect(),
    }
}

fn cube_mesh() -> Mesh {
    let verts = (0..8)
        .map(|i| vector![(i & 1) as Float, ((i >> 1) & 1) as Float, ((i >> 2) & 1) as Float])
        .collect();
    let faces = [
        [0, 2, 3, 1],
        [4, 5, 7, 6],
        [0, 1, 5, 4],
        [2, 6, 7, 3],
        [0, 4, 6, 2],
        [1, 3, 7, 5],
    ];
    Mesh {
        verts,
        faces: faces.iter().map(|f| vec![f.to_vec()]).collect(),
    }
}

/// Prism over an L-shaped hexagon.
fn l_prism_mesh() -> Mesh {
    let outline = [[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0], [1.0, 2.0], [0.0, 2.0]];
    let n = outline.len();
    let verts = [0.0, 1.0]
        .into_iter()
        .flat_map(|z| outline.iter().map(move |&[x, y]| vector![x, y, z]))
        .collect();
    let mut faces = vec![(0..n).rev().collect(), (n..2 * n).collect()];
    for i in 0..n {
        let j = (i + 1) % n;
        faces.push(vec![i, j, j + n, i + n]);
    }
    Mesh {
        verts,
        faces: faces.into_iter().map(|f| vec![f]).collect(),
    }
}

fn newell_normal(mesh: &Mesh, contour: &[usize]) -> Vector {
    let origin = &mesh.verts[contour[0]];
    contour[1..]
        .windows(2)
        .map(|w| cross_product(&[&mesh.verts[w[0]] - origin, &mesh.verts[w[1]] - origin], 3))
        .sum()
}

#[test]
fn test_mesh_round_trip() -> eyre::Result<()> {
    init_test_logging();
    for (mesh, expected_volume, convex) in [
        (tetrahedron_mesh(), 1.0 / 6.0, true),
        (cube_mesh(), 1.0, true),
        (l_prism_mesh(), 3.0, false),
    ] {
        let mut space = Space::new();
        let p = mesh_to_polytope(&mut space, &mesh)?;
        assert_approx_eq!(volume(&space, p), expected_volume);
        assert!(is_oriented_deep(&space, p.id));

        let out = polytope_to_mesh(&space, p)?;
        assert_eq!(out.verts.len(), mesh.verts.len());
        assert_eq!(out.faces.len(), mesh.faces.len());
        for (face_out, face_in) in std::iter::zip(
            out.faces.iter().map(|f| f.iter().map(|c| c.len()).sum::<usize>()).sorted(),
            mesh.faces.iter().map(|f| f.iter().map(|c| c.len()).sum::<usize>()).sorted(),
        ) {
            assert_eq!(face_out, face_in);
        }

        // Faces are counterclockwise when seen from outside.
        if convex {
            let center = out.verts.iter().sum::<Vector>() / out.verts.len() as Float;
            for face in &out.faces {
                let contour = &face[0];
                let face_center =
                    contour.iter().map(|&v| &out.verts[v]).sum::<Vector>() / contour.len() as Float;
                assert!(newell_normal(&out, contour).dot(face_center - &center) > 0.0);
            }
        }

        let q = mesh_to_polytope(&mut space, &out)?;
        assert_approx_eq!(volume(&space, q), expected_volume);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn proptest_boolean_laws(x in -4.0..4.0_f64, y in -4.0..4.0_f64, z in -4.0..4.0_f64) {
        let mut space = Space::new();
        let (a, b) = overlapping_cubes(&mut space);
        let i = intersect(&mut space, a, b).expect("intersect");
        let u = union(&mut space, a, b).expect("union");
        let d = diff(&mut space, a, b).expect("diff");
        let not_u = intersect(&mut space, complement(a), complement(b)).expect("intersect");

        let eps = space.params().classify_epsilon;
        let point = vector![x, y, z];
        let inside = |p| is_inside(&space, p, &point, eps);
        let (Some(in_a), Some(in_b)) = (inside(a), inside(b)) else {
            return Err(TestCaseError::reject("point on boundary"));
        };

        prop_assert_eq!(inside(i), Some(in_a && in_b));
        prop_assert_eq!(inside(u), Some(in_a || in_b));
        prop_assert_eq!(inside(d), Some(in_a && !in_b));
        // De Morgan
        prop_assert_eq!(inside(not_u), Some(!(in_a || in_b)));
        prop_assert_eq!(inside(complement(u)), inside(not_u));
    }
}
