//! Small numeric helpers.

use super::Float;

/// Returns `n!` as a float. Used to turn simplex determinants into volumes.
pub fn factorial(n: u8) -> Float {
    (1..=n).map(Float::from).product()
}
