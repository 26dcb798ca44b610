//! Orientation signs.

use std::fmt;
use std::ops::{Mul, Neg};

use num_traits::Signed;

/// Orientation of a facet relative to its parent, or of a polytope relative
/// to its reference orientation.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Sign {
    #[default]
    Pos,
    Neg,
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sign::Pos => "+",
            Sign::Neg => "-",
        })
    }
}

impl Neg for Sign {
    type Output = Self;

    fn neg(self) -> Self {
        Sign::from_is_neg(self == Sign::Pos)
    }
}

/// Zero counts as positive.
impl<T: Signed> From<T> for Sign {
    fn from(value: T) -> Self {
        Sign::from_is_neg(value.is_negative())
    }
}

impl Sign {
    /// Returns `1` or `-1`.
    pub fn to_num<T: Signed>(self) -> T {
        match self {
            Sign::Pos => T::one(),
            Sign::Neg => -T::one(),
        }
    }

    /// Returns `Neg` if `is_neg` is true, or `Pos` otherwise.
    pub fn from_is_neg(is_neg: bool) -> Self {
        if is_neg { Sign::Neg } else { Sign::Pos }
    }
}

/// Implements `Mul<Sign>` for a type that implements `Neg<Output = Self>`.
#[macro_export]
macro_rules! impl_mul_sign {
    (impl $($tok:tt)*) => {
        impl $($tok)* {
            type Output = Self;

            fn mul(self, rhs: $crate::Sign) -> Self {
                match rhs {
                    $crate::Sign::Pos => self,
                    $crate::Sign::Neg => -self,
                }
            }
        }
    };
}

impl_mul_sign!(impl Mul<Sign> for Sign);
impl_mul_sign!(impl Mul<Sign> for i32);
impl_mul_sign!(impl Mul<Sign> for f64);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_sign_arithmetic() {
        assert_eq!(Sign::Neg * Sign::Neg, Sign::Pos);
        assert_eq!(Sign::Pos * Sign::Neg, Sign::Neg);
        assert_eq!(-Sign::Pos, Sign::Neg);
        assert_eq!(3 * Sign::Neg, -3);
        assert_eq!(1.5 * Sign::Pos, 1.5);
        assert_eq!(Sign::from(-2.5_f64), Sign::Neg);
        assert_eq!(Sign::from(0_i32), Sign::Pos);
        assert_eq!(Sign::Neg.to_num::<i32>(), -1);
        assert_eq!(Sign::Neg.to_string(), "-");
    }
}
