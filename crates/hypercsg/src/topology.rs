//! Combinatorial summaries of polytopes.
//!
//! Polytopes with different summaries are never combinatorially equivalent.
//! Equal summaries are strong evidence of equivalence but not proof.

use std::collections::HashMap;

use itertools::Itertools;

use crate::{PolytopeId, Space};

/// Returns a description of every element of a polytope, bucketed by rank in
/// the same order as [`Space::all_elements()`].
///
/// A vertex is described by the number of edges meeting at it, like `v3`.
/// Any other element lists how many facets of each description it has, like
/// `(4(2v3))` for a face of a cube.
pub fn element_summaries(space: &Space, id: PolytopeId) -> Vec<Vec<String>> {
    let elements = space.all_elements(id);
    let incidences = space.all_incidences(id);

    let mut by_id = HashMap::<PolytopeId, String>::new();
    let mut ret = vec![];
    for (rank, bucket) in elements.iter().enumerate() {
        let summaries = bucket
            .iter()
            .enumerate()
            .map(|(i, &e)| {
                let summary = if rank == 0 {
                    let degree = incidences.0[0][i].get(1).map_or(0, |edges| edges.len());
                    format!("v{degree}")
                } else {
                    let facet_kinds = space[e]
                        .facets
                        .iter()
                        .filter_map(|f| by_id.get(&f.id))
                        .counts()
                        .into_iter()
                        .sorted()
                        .map(|(kind, n)| format!("{n}{kind}"))
                        .join(" ");
                    format!("({facet_kinds})")
                };
                by_id.insert(e, summary.clone());
                summary
            })
            .collect_vec();
        ret.push(summaries);
    }
    ret
}

/// Returns a multi-line description of a polytope listing, from the top rank
/// down, how many elements there are of each kind.
///
/// ```text
/// 2-cells: 1
///   1 x (4(2v2))
/// 1-cells: 4
///   4 x (2v2)
/// 0-cells: 4
///   4 x v2
/// ```
pub fn topological_fingerprint(space: &Space, id: PolytopeId) -> String {
    element_summaries(space, id)
        .iter()
        .enumerate()
        .rev()
        .flat_map(|(rank, summaries)| {
            let header = format!("{rank}-cells: {}", summaries.len());
            let kinds = summaries
                .iter()
                .counts()
                .into_iter()
                .sorted()
                .map(|(kind, n)| format!("  {n} x {kind}"));
            std::iter::once(header).chain(kinds)
        })
        .join("\n")
}

#[cfg(test)]
mod tests {
    use hypercsg_math::prelude::*;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::intersect::{diff, intersect};
    use crate::primitives::make_hypercube;
    use crate::schlafli::make_regular_polytope_product_from_str;

    #[test]
    fn test_square_fingerprint() {
        let mut space = Space::new();
        let square = make_hypercube(&mut space, &vector![0.0, 0.0], &vector![1.0, 1.0])
            .expect("square");
        let expected = "\
2-cells: 1
  1 x (4(2v2))
1-cells: 4
  4 x (2v2)
0-cells: 4
  4 x v2";
        assert_eq!(topological_fingerprint(&space, square.id), expected);
    }

    #[test]
    fn test_prism_summaries() {
        let mut space = Space::new();
        let prism = make_regular_polytope_product_from_str(&mut space, "{3}x{}").expect("prism");
        let summaries = element_summaries(&space, prism.id);
        assert_eq!(summaries.iter().map(|s| s.len()).collect_vec(), vec![6, 9, 5, 1]);
        assert_eq!(summaries[3], vec!["(2(3(2v3)) 3(4(2v3)))".to_owned()]);
    }

    #[test]
    fn test_fingerprint_tells_shapes_apart() {
        let mut space = Space::new();
        let a = make_hypercube(&mut space, &vector![0.0, 0.0, 0.0], &vector![1.0, 1.0, 1.0])
            .expect("cube");
        let b = make_hypercube(&mut space, &vector![1.0, 1.0, 1.0], &vector![1.0, 1.0, 1.0])
            .expect("cube");

        // Any box has the same fingerprint as any other.
        let i = intersect(&mut space, a, b).expect("intersect");
        assert_eq!(topological_fingerprint(&space, i.id), topological_fingerprint(&space, a.id));

        // Notching out a corner adds 6 vertices but keeps every vertex simple.
        let d = diff(&mut space, a, b).expect("diff");
        let fingerprint = topological_fingerprint(&space, d.id);
        assert_ne!(fingerprint, topological_fingerprint(&space, a.id));
        assert!(fingerprint.starts_with("3-cells: 1\n"), "{fingerprint}");
        assert!(fingerprint.contains("0-cells: 14\n  14 x v3"), "{fingerprint}");
    }
}
