use std::collections::VecDeque;

use tinyset::Set64;

use super::*;

/// Elements of a polytope, including the polytope itself, bucketed by rank.
/// Each bucket is sorted by ID.
pub type ElementLists = Vec<Vec<PolytopeId>>;

/// Incidence lists for all elements of a polytope.
///
/// `self.0[r][i][s]` lists the indices (into the rank-`s` bucket of the
/// corresponding [`ElementLists`]) of the rank-`s` elements incident to the
/// `i`th rank-`r` element. Each list is sorted. An element is not incident to
/// itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incidences(pub Vec<Vec<Vec<Vec<usize>>>>);

impl Incidences {
    /// Returns the indices of elements of rank `other_rank` incident to the
    /// `index`th element of rank `rank`.
    pub fn get(&self, rank: u8, index: usize, other_rank: u8) -> &[usize] {
        &self.0[rank as usize][index][other_rank as usize]
    }
}

impl Space {
    /// Returns the coordinates of a vertex, or `None` if the polytope is not a
    /// vertex or its hyperplanes do not determine a unique point.
    pub fn coords(&self, id: PolytopeId) -> Option<Vector> {
        let p = &self[id];
        if p.rank != 0 {
            return None;
        }
        if let Some(coords) = &p.coords {
            return Some(coords.clone());
        }

        let cached = self.cached_coords.lock().get(&id).cloned();
        if let Some(ret) = cached {
            return ret;
        }

        let ret = self.solve_hyperplanes(&p.hyperplanes, p.ndim);
        if ret.is_none() {
            tracing::debug!(%id, "vertex hyperplanes are singular");
        }
        self.cached_coords.lock().insert(id, ret.clone());
        ret
    }

    /// Returns the unique point on all of `hyperplanes`, or `None` if there is
    /// not exactly one.
    pub fn solve_hyperplanes(&self, hyperplanes: &[HyperplaneId], ndim: u8) -> Option<Vector> {
        if hyperplanes.len() != ndim as usize {
            return None;
        }
        let matrix = Matrix::from_rows(hyperplanes.iter().map(|&h| &self[h].normal));
        let rhs: Vector = hyperplanes.iter().map(|&h| self[h].offset).collect();
        matrix.solve(rhs)
    }

    /// Returns whether the normals of `hyperplanes` are linearly independent,
    /// so that together they cut out a flat of the expected rank.
    pub fn hyperplanes_are_independent(&self, hyperplanes: &[HyperplaneId]) -> bool {
        let normals = hyperplanes.iter().map(|&h| self[h].normal.clone()).collect_vec();
        gram_determinant(&normals) > EPSILON * EPSILON
    }

    /// Returns the bounding box of a polytope, or `None` if it has no vertices
    /// with known coordinates.
    pub fn bbox(&self, id: PolytopeId) -> Option<BoundingBox> {
        let cached = self.cached_bboxes.lock().get(&id).cloned();
        if let Some(ret) = cached {
            return ret;
        }

        let p = &self[id];
        let ret = if p.rank == 0 {
            self.coords(id).map(BoundingBox::from_point)
        } else {
            p.facets
                .iter()
                .filter_map(|f| self.bbox(f.id))
                .reduce(|a, b| a.union(&b))
        };
        self.cached_bboxes.lock().insert(id, ret.clone());
        ret
    }

    /// Returns every element of a polytope, including itself, bucketed by
    /// rank.
    pub fn all_elements(&self, id: PolytopeId) -> Arc<ElementLists> {
        let cached = self.cached_elements.lock().get(&id).cloned();
        if let Some(ret) = cached {
            return ret;
        }

        let mut buckets = vec![vec![]; self[id].rank as usize + 1];
        let mut seen = Set64::<PolytopeId>::new();
        let mut queue = VecDeque::from([id]);
        seen.insert(id);
        while let Some(e) = queue.pop_front() {
            buckets[self[e].rank as usize].push(e);
            for f in &self[e].facets {
                if seen.insert(f.id) {
                    queue.push_back(f.id);
                }
            }
        }
        for bucket in &mut buckets {
            bucket.sort_unstable();
        }

        let ret = Arc::new(buckets);
        self.cached_elements.lock().insert(id, Arc::clone(&ret));
        ret
    }

    /// Returns the IDs of the vertices of a polytope.
    pub fn vertices_of(&self, id: PolytopeId) -> Vec<PolytopeId> {
        self.all_elements(id)[0].clone()
    }

    /// Returns the number of elements of each rank, from vertices up to the
    /// polytope itself.
    pub fn element_counts(&self, id: PolytopeId) -> Vec<usize> {
        self.all_elements(id).iter().map(|bucket| bucket.len()).collect()
    }

    /// Returns the average of the vertex coordinates of a polytope, or `None`
    /// if it has no vertices with known coordinates.
    pub fn cg_of_verts(&self, id: PolytopeId) -> Option<Vector> {
        let coords = self
            .vertices_of(id)
            .into_iter()
            .filter_map(|v| self.coords(v))
            .collect_vec();
        let count = coords.len();
        (count > 0).then(|| coords.into_iter().sum::<Vector>() / count as Float)
    }

    /// Returns the incidence lists between all elements of a polytope.
    ///
    /// # Panics
    ///
    /// Panics if the two passes over the element lists disagree, which means
    /// the structure was modified while it was being read.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn all_incidences(&self, id: PolytopeId) -> Arc<Incidences> {
        let cached = self.cached_incidences.lock().get(&id).cloned();
        if let Some(ret) = cached {
            return ret;
        }

        let elements = self.all_elements(id);
        let rank_count = elements.len();

        // First pass: count.
        let mut counts = elements
            .iter()
            .map(|bucket| vec![vec![0_usize; rank_count]; bucket.len()])
            .collect_vec();
        self.for_each_incidence(&elements, |r, i, s, j| {
            counts[r][i][s] += 1;
            counts[s][j][r] += 1;
        });

        // Second pass: fill.
        let mut lists = counts
            .iter()
            .map(|per_element| {
                per_element
                    .iter()
                    .map(|per_rank| per_rank.iter().map(|&n| Vec::with_capacity(n)).collect_vec())
                    .collect_vec()
            })
            .collect_vec();
        self.for_each_incidence(&elements, |r, i, s, j| {
            lists[r][i][s].push(j);
            lists[s][j][r].push(i);
        });

        for (r, per_element) in lists.iter_mut().enumerate() {
            for (i, per_rank) in per_element.iter_mut().enumerate() {
                for (s, list) in per_rank.iter_mut().enumerate() {
                    assert_eq!(
                        list.len(),
                        counts[r][i][s],
                        "incidence count mismatch for rank {r} element {i} with rank {s}",
                    );
                    list.sort_unstable();
                }
            }
        }

        let ret = Arc::new(Incidences(lists));
        self.cached_incidences.lock().insert(id, Arc::clone(&ret));
        ret
    }

    /// Calls `f(r, i, s, j)` for each pair where the `j`th element of rank `s`
    /// lies on the boundary of the `i`th element of rank `r`, with `s < r`.
    fn for_each_incidence(
        &self,
        elements: &ElementLists,
        mut f: impl FnMut(usize, usize, usize, usize),
    ) {
        for (r, bucket) in elements.iter().enumerate() {
            for (i, &e) in bucket.iter().enumerate() {
                let sub_elements = self.all_elements(e);
                for (s, sub_bucket) in sub_elements.iter().enumerate().take(r) {
                    for sub in sub_bucket {
                        let Ok(j) = elements[s].binary_search(sub) else {
                            continue;
                        };
                        f(r, i, s, j);
                    }
                }
            }
        }
    }
}
