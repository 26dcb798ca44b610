use super::*;

/// Polytope stored in a [`Space`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolytopeData {
    /// Rank of the polytope: 0 for vertices, 1 for edges, etc.
    pub rank: u8,
    /// Number of dimensions of the ambient space.
    pub ndim: u8,
    /// Oriented facets, which each have rank `rank - 1`.
    pub facets: Vec<SignedPolytope>,
    /// Sorted set of `ndim - rank` hyperplanes whose intersection is the
    /// affine hull of the polytope.
    pub hyperplanes: HyperplaneSet,
    /// Optional user data, propagated through slicing.
    pub aux: Option<u64>,
    /// Explicit coordinates, for vertices only.
    pub coords: Option<Vector>,
}

impl PolytopeData {
    /// Constructs a polytope with no auxiliary data.
    pub fn new(
        rank: u8,
        ndim: u8,
        facets: Vec<SignedPolytope>,
        hyperplanes: HyperplaneSet,
    ) -> Self {
        Self {
            rank,
            ndim,
            facets,
            hyperplanes,
            aux: None,
            coords: None,
        }
    }

    /// Constructs a vertex.
    pub fn vertex(ndim: u8, coords: Option<Vector>, hyperplanes: HyperplaneSet) -> Self {
        Self {
            coords,
            ..Self::new(0, ndim, vec![], hyperplanes)
        }
    }

    /// Returns whether the polytope is a vertex.
    pub fn is_vertex(&self) -> bool {
        self.rank == 0
    }

    /// Returns whether the polytope has no facets. For rank at least 1, this
    /// means it is either empty or all of its affine hull, depending on its
    /// initial density.
    pub fn is_facetless(&self) -> bool {
        self.facets.is_empty()
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vector,
    /// Maximum corner.
    pub max: Vector,
}

impl BoundingBox {
    /// Returns the bounding box of a single point.
    pub fn from_point(point: Vector) -> Self {
        Self {
            min: point.clone(),
            max: point,
        }
    }

    /// Returns the smallest bounding box containing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(&other.min),
            max: self.max.max(&other.max),
        }
    }

    /// Returns whether two boxes overlap, with `eps` slack on every side.
    pub fn overlaps(&self, other: &Self, eps: Float) -> bool {
        let ndim = std::cmp::max(self.min.ndim(), other.min.ndim());
        (0..ndim).all(|i| {
            self.min.get(i) <= other.max.get(i) + eps && other.min.get(i) <= self.max.get(i) + eps
        })
    }

    /// Returns whether the box contains a point, with `eps` slack on every
    /// side.
    pub fn contains(&self, point: impl VectorRef, eps: Float) -> bool {
        (0..self.min.ndim())
            .all(|i| self.min[i] - eps <= point.get(i) && point.get(i) <= self.max[i] + eps)
    }

    /// Returns the size of the box along an axis.
    pub fn extent(&self, axis: u8) -> Float {
        self.max.get(axis) - self.min.get(axis)
    }

    /// Returns the axis along which the box is largest.
    pub fn largest_axis(&self) -> u8 {
        (0..self.min.ndim())
            .max_by(|&a, &b| self.extent(a).total_cmp(&self.extent(b)))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let a = BoundingBox::from_point(vector![0.0, 0.0])
            .union(&BoundingBox::from_point(vector![1.0, 2.0]));
        // Just past the right edge, within tolerance.
        let b = BoundingBox::from_point(vector![1.0 + 1e-9, 1.0]);
        let c = BoundingBox::from_point(vector![1.5, 1.0]);
        let d = BoundingBox::from_point(vector![1.0 + 1e-9, 3.0]);

        assert!(a.overlaps(&b, 1e-6));
        assert!(!a.overlaps(&c, 1e-6));
        assert!(!a.overlaps(&d, 1e-6));
        assert!(a.contains(vector![0.5, 2.0], 0.0));
        assert!(!a.contains(vector![0.5, 2.5], 0.0));
        assert_eq!(a.largest_axis(), 1);
    }
}
