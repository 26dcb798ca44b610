use super::*;

/// Affine hyperplane bounding the half-space `normal · p <= offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperplaneData {
    /// Unit normal vector, pointing away from the half-space.
    pub normal: Vector,
    /// Distance of the hyperplane from the origin along `normal`.
    pub offset: Float,
    /// Points that the hyperplane was constructed from, if any.
    pub spanning_points: Option<Vec<Vector>>,
}

impl fmt::Display for HyperplaneData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms = self
            .normal
            .iter()
            .zip(AXIS_NAMES.chars())
            .map(|(coef, axis)| format!("{coef}{axis}"))
            .join(" + ");
        write!(f, "{terms} = {}", self.offset)
    }
}

impl HyperplaneData {
    /// Constructs a hyperplane from a normal vector (which need not be
    /// normalized) and an offset along it. Returns `None` if the normal vector
    /// is zero.
    pub fn from_equation(normal: impl VectorRef, offset: Float) -> Option<Self> {
        let mag = normal.mag();
        let normal = normal.normalize()?;
        Some(Self {
            normal,
            offset: offset / mag,
            spanning_points: None,
        })
    }

    /// Constructs the hyperplane through `ndim` points in `ndim`-dimensional
    /// space. The normal vector is oriented such that the points, in order,
    /// have positive orientation when the normal is appended. Returns `None`
    /// if the points are affinely dependent.
    pub fn from_spanning_points(points: Vec<Vector>, ndim: u8) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let edges = rest.iter().map(|p| p - first).collect_vec();
        let normal = cross_product(&edges, ndim).normalize()?;
        let offset = normal.dot(first);
        Some(Self {
            normal,
            offset,
            spanning_points: Some(points),
        })
    }

    /// Returns the number of dimensions of the space containing the hyperplane.
    pub fn ndim(&self) -> u8 {
        self.normal.ndim()
    }

    /// Returns the signed distance from the hyperplane to a point, which is
    /// positive outside the half-space.
    pub fn signed_distance(&self, point: impl VectorRef) -> Float {
        self.normal.dot(point) - self.offset
    }

    /// Returns the same hyperplane embedded in a larger space, with its axes
    /// starting at `first_axis` and zeros everywhere else.
    #[must_use]
    pub fn embedded(&self, first_axis: u8, ndim: u8) -> Self {
        let normal = Vector::concat(Vector::EMPTY, first_axis, &self.normal).pad(ndim);
        let spanning_points = None;
        Self {
            normal,
            offset: self.offset,
            spanning_points,
        }
    }

    /// Returns the hyperplane with the opposite orientation.
    #[must_use]
    pub fn flip(&self) -> Self {
        Self {
            normal: -&self.normal,
            offset: -self.offset,
            spanning_points: self.spanning_points.clone(),
        }
    }
}
