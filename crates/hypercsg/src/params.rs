//! Numeric tolerances and other parameters for CSG operations.

use hypercsg_math::{EPSILON, Float};

/// Parameters shared by every operation in a [`crate::Space`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CsgParams {
    /// Tolerance used when classifying candidate vertices during
    /// intersection. A point closer than this to a boundary is ambiguous.
    pub classify_epsilon: Float,
    /// Tolerance for coordinate equality and bounding box slack.
    pub vertex_epsilon: Float,
    /// Distance from a candidate vertex at which the operands are sampled
    /// when they share hyperplanes through it. Must be well above
    /// `classify_epsilon` and well below the smallest feature size.
    pub coincident_offset: Float,
    /// Seed for the random directions used by point classification.
    pub seed: u64,
}

impl Default for CsgParams {
    fn default() -> Self {
        Self {
            classify_epsilon: 1e-9,
            vertex_epsilon: EPSILON,
            coincident_offset: 1e-5,
            seed: 0x5EED_CAFE,
        }
    }
}
