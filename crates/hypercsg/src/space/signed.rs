use super::*;

/// Oriented reference to a polytope in a [`Space`], along with the density of
/// space far away from it.
///
/// The density at a point is `initial_density + sign * winding_number`.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct SignedPolytope {
    /// Unoriented ID.
    pub id: PolytopeId,
    /// Orientation.
    pub sign: Sign,
    /// Density infinitely far away from the polytope: 0 for bounded
    /// polytopes and 1 for the complement of a bounded polytope.
    pub initial_density: i32,
}
impl fmt::Debug for SignedPolytope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let SignedPolytope {
            id,
            sign,
            initial_density,
        } = self;
        write!(f, "{sign}{id:?}@{initial_density}")
    }
}
impl fmt::Display for SignedPolytope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let SignedPolytope {
            id,
            sign,
            initial_density,
        } = self;
        write!(f, "{sign}{id}@{initial_density}")
    }
}
impl From<PolytopeId> for SignedPolytope {
    fn from(id: PolytopeId) -> Self {
        SignedPolytope {
            id,
            sign: Sign::Pos,
            initial_density: 0,
        }
    }
}
impl Neg for SignedPolytope {
    type Output = Self;

    fn neg(mut self) -> Self::Output {
        self.sign = -self.sign;
        self
    }
}
hypercsg_math::impl_mul_sign!(impl Mul<Sign> for SignedPolytope);

impl SignedPolytope {
    /// Constructs a signed polytope.
    pub fn new(id: PolytopeId, sign: Sign, initial_density: i32) -> Self {
        Self {
            id,
            sign,
            initial_density,
        }
    }

    /// Returns the complement: the density is replaced by one minus the
    /// density everywhere. This never allocates a new polytope.
    #[must_use]
    pub fn complement(self) -> Self {
        Self {
            id: self.id,
            sign: -self.sign,
            initial_density: 1 - self.initial_density,
        }
    }
}
