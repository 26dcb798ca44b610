//! Collection types indexed by typed IDs.

#[macro_use]
pub mod generic_vec;

pub use generic_vec::{GenericVec, IndexIter, IndexNewtype, IndexOutOfRange, IndexOverflow};
