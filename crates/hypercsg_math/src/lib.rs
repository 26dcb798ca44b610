//! Multidimensional vector and matrix primitives for polytope CSG.

pub use {approx, num_traits as num, smallvec};

/// Floating-point type used for geometry.
pub type Float = f64;

/// Small floating-point value used for comparisons and tiny offsets.
pub const EPSILON: Float = 0.000001;

/// Names for axes up to 10 dimensions.
pub const AXIS_NAMES: &str = "XYZWVUTSRQ";

/// Maximum number of dimensions.
pub const MAX_NDIM: u8 = 10;

/// Asserts that both arguments are approximately equal.
#[macro_export]
macro_rules! assert_approx_eq {
    ($a:expr, $b:expr $(,)?) => {
        $crate::approx::assert_abs_diff_eq!($a, $b, epsilon = $crate::EPSILON)
    };
}

#[macro_use]
mod vector;
#[macro_use]
pub mod collections;

pub mod matrix;
pub mod sign;
pub mod util;

pub use sign::Sign;

/// Structs, traits, and constants.
pub mod prelude {
    pub use crate::collections::{GenericVec, IndexOutOfRange, IndexOverflow};
    pub use crate::matrix::*;
    pub use crate::sign::Sign;
    pub use crate::traits::*;
    pub use crate::vector::*;
    pub use crate::{AXIS_NAMES, EPSILON, Float, MAX_NDIM, vector};
}
pub use prelude::*;

/// Traits only.
pub mod traits {
    pub use approx::AbsDiffEq;
    pub use tinyset::Fits64;

    pub use crate::collections::IndexNewtype;
    pub use crate::vector::VectorRef;
}
