//! Constructive solid geometry on oriented polytopes of arbitrary dimension.
//!
//! Polytopes live in a [`Space`] arena and are described by their oriented
//! boundary. A [`SignedPolytope`] adds an orientation and a background density
//! so that intersection, union, difference, and complement can all be
//! expressed in terms of one recursive intersection algorithm.

pub mod classify;
pub mod import;
pub mod intersect;
pub mod mesh;
pub mod orient;
pub mod params;
pub mod primitives;
pub mod product;
pub mod schlafli;
pub mod simplicial;
pub mod slice;
pub mod space;
pub mod topology;

pub use classify::Density;
pub use import::ImportError;
pub use mesh::{Mesh, MeshError};
pub use params::CsgParams;
pub use simplicial::Simplex;
pub use space::*;

/// Structs, traits, and constants.
pub mod prelude {
    pub use crate::classify::Density;
    pub use crate::import::ImportError;
    pub use crate::mesh::{Mesh, MeshError};
    pub use crate::params::CsgParams;
    pub use crate::space::*;
}

#[cfg(test)]
mod tests;
