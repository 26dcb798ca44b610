//! Coordinate vectors of any dimension up to [`crate::MAX_NDIM`].
//!
//! Vectors of different lengths can be mixed freely: missing components are
//! zero, so a 2D point is also a 3D point with `z = 0`.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Range, Sub};

use itertools::Itertools;
use smallvec::SmallVec;

use crate::Float;

/// Constructs a [`Vector`] from components, like `vec![]`.
#[macro_export]
macro_rules! vector {
    [$($tok:tt)*] => {
        $crate::Vector($crate::smallvec::smallvec![$($tok)*])
    };
}

/// Point or direction. Components past the end are zero.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Vector(pub SmallVec<[Float; 4]>);

/// Anything that can be read as a [`Vector`] without cloning it.
pub trait VectorRef: Sized + fmt::Debug {
    /// Number of stored components.
    fn ndim(&self) -> u8;
    /// Component `idx`, or zero past the end.
    fn get(&self, idx: u8) -> Float;

    /// Iterates over the stored components.
    fn iter(&self) -> VectorIter<&Self> {
        self.iter_ndim(self.ndim())
    }
    /// Iterates over exactly `ndim` components, padding or truncating.
    fn iter_ndim(&self, ndim: u8) -> VectorIter<&Self> {
        VectorIter {
            range: 0..ndim,
            vector: self,
        }
    }

    /// Dot product. Trailing components of the longer vector are ignored
    /// since they would be multiplied by zero.
    fn dot(&self, rhs: impl VectorRef) -> Float {
        self.iter().zip(rhs.iter()).map(|(l, r)| l * r).sum()
    }

    /// Copy padded with zeros to at least `ndim` components.
    #[must_use]
    fn pad(&self, ndim: u8) -> Vector {
        self.iter().pad_using(ndim as usize, |_| 0.0).collect()
    }

    /// Euclidean length.
    fn mag(&self) -> Float {
        self.mag2().sqrt()
    }
    /// Squared Euclidean length.
    fn mag2(&self) -> Float {
        self.dot(self)
    }

    /// Unit vector in the same direction, or `None` for the zero vector.
    #[must_use]
    fn normalize(&self) -> Option<Vector> {
        let mult = self.mag().recip();
        mult.is_finite().then(|| self.iter().map(|x| x * mult).collect())
    }

    /// Returns whether every component differs by at most `epsilon`.
    fn approx_eq(&self, other: impl VectorRef, epsilon: Float) -> bool {
        padded_pair(self, other).all(|(l, r)| (l - r).abs() <= epsilon)
    }
}

/// Iterator over the components of a vector, yielding zeros past the end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VectorIter<V> {
    range: Range<u8>,
    vector: V,
}
impl<V: VectorRef> Iterator for VectorIter<V> {
    type Item = Float;

    fn next(&mut self) -> Option<Float> {
        let i = self.range.next()?;
        Some(self.vector.get(i))
    }
}

impl VectorRef for Vector {
    fn ndim(&self) -> u8 {
        self.0.len() as u8
    }

    fn get(&self, idx: u8) -> Float {
        self.0.get(idx as usize).copied().unwrap_or(0.0)
    }
}

impl<V: VectorRef> VectorRef for &V {
    fn ndim(&self) -> u8 {
        V::ndim(self)
    }

    fn get(&self, idx: u8) -> Float {
        V::get(self, idx)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

/// Iterates over two vectors componentwise, padding the shorter one.
fn padded_pair<A: VectorRef, B: VectorRef>(a: A, b: B) -> impl Iterator<Item = (Float, Float)> {
    let ndim = std::cmp::max(a.ndim(), b.ndim());
    (0..ndim).map(move |i| (a.get(i), b.get(i)))
}

macro_rules! impl_vector_ops {
    (impl for $type_name:ty) => {
        impl<V: VectorRef> Add<V> for $type_name {
            type Output = Vector;

            fn add(self, rhs: V) -> Vector {
                padded_pair(self, rhs).map(|(l, r)| l + r).collect()
            }
        }
        impl<V: VectorRef> Sub<V> for $type_name {
            type Output = Vector;

            fn sub(self, rhs: V) -> Vector {
                padded_pair(self, rhs).map(|(l, r)| l - r).collect()
            }
        }
        impl Neg for $type_name {
            type Output = Vector;

            fn neg(self) -> Vector {
                self.iter().map(|x| -x).collect()
            }
        }
        impl Mul<Float> for $type_name {
            type Output = Vector;

            fn mul(self, rhs: Float) -> Vector {
                self.iter().map(|x| x * rhs).collect()
            }
        }
        impl Div<Float> for $type_name {
            type Output = Vector;

            fn div(self, rhs: Float) -> Vector {
                self.iter().map(|x| x / rhs).collect()
            }
        }
    };
}
impl_vector_ops!(impl for Vector);
impl_vector_ops!(impl for &Vector);

impl<V: VectorRef> AddAssign<V> for Vector {
    fn add_assign(&mut self, rhs: V) {
        if self.ndim() < rhs.ndim() {
            self.0.resize(rhs.ndim() as usize, 0.0);
        }
        for (l, r) in self.0.iter_mut().zip(rhs.iter()) {
            *l += r;
        }
    }
}

impl Index<u8> for Vector {
    type Output = Float;

    fn index(&self, index: u8) -> &Float {
        &self.0[index as usize]
    }
}
impl IndexMut<u8> for Vector {
    fn index_mut(&mut self, index: u8) -> &mut Float {
        let ndim = self.ndim();
        match self.0.get_mut(index as usize) {
            Some(x) => x,
            None => panic!("axis {index} is out of range for {ndim}D vector"),
        }
    }
}

impl Vector {
    /// Vector with no components.
    pub const EMPTY: Self = Self(SmallVec::new_const());

    /// Origin with `ndim` explicit components.
    pub fn zero(ndim: u8) -> Self {
        Self(smallvec::smallvec![0.0; ndim as usize])
    }
    /// Unit vector along `axis`.
    pub fn unit(axis: u8) -> Self {
        let mut ret = Self::zero(axis + 1);
        ret[axis] = 1.0;
        ret
    }

    /// Joins the first `a_ndim` components of `a` with all of `b`. Used to
    /// build points of a Cartesian product.
    pub fn concat(a: impl VectorRef, a_ndim: u8, b: impl VectorRef) -> Self {
        a.iter_ndim(a_ndim).chain(b.iter()).collect()
    }

    /// Componentwise minimum.
    #[must_use]
    pub fn min(&self, other: impl VectorRef) -> Self {
        padded_pair(self, other).map(|(l, r)| l.min(r)).collect()
    }
    /// Componentwise maximum.
    #[must_use]
    pub fn max(&self, other: impl VectorRef) -> Self {
        padded_pair(self, other).map(|(l, r)| l.max(r)).collect()
    }
}

impl approx::AbsDiffEq for Vector {
    type Epsilon = Float;

    fn default_epsilon() -> Float {
        crate::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Float) -> bool {
        self.approx_eq(other, epsilon)
    }
}

impl FromIterator<Float> for Vector {
    fn from_iter<T: IntoIterator<Item = Float>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<V: VectorRef> Sum<V> for Vector {
    fn sum<I: Iterator<Item = V>>(iter: I) -> Self {
        iter.fold(Self::EMPTY, |mut acc, v| {
            acc += v;
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_mixed_dimension_arithmetic() {
        let v1 = vector![1.0, 2.0, -10.0];
        let v2 = vector![-5.0];
        assert_eq!(&v1 + &v2, vector![-4.0, 2.0, -10.0]);
        assert_eq!(&v2 - &v1, vector![-6.0, -2.0, 10.0]);
        assert_eq!(-&v2 * 2.0, vector![10.0]);
        assert_eq!(v1.dot(vector![-5.0, 16.0]), 27.0);
    }

    #[test]
    fn test_sum_and_normalize() {
        let points = [vector![1.0], vector![0.0, 3.0], vector![2.0, 0.0, 1.0]];
        assert_eq!(points.iter().sum::<Vector>(), vector![3.0, 3.0, 1.0]);
        let unit = vector![0.0, 3.0, 4.0].normalize().expect("nonzero");
        assert!(unit.approx_eq(vector![0.0, 0.6, 0.8], 1e-12));
        assert_eq!(Vector::zero(3).normalize(), None);
        assert!(vector![1.0, 0.0].approx_eq(vector![1.0 + 1e-9], 1e-6));
    }

    #[test]
    fn test_concat_and_bounds() {
        let a = vector![1.0];
        let b = vector![2.0, 3.0];
        assert_eq!(Vector::concat(&a, 2, &b), vector![1.0, 0.0, 2.0, 3.0]);
        assert_eq!(a.min(&b), vector![1.0, 0.0]);
        assert_eq!(a.max(&b), vector![2.0, 3.0]);
        assert_eq!(Vector::unit(2), vector![0.0, 0.0, 1.0]);
        assert_eq!(vector![1.5, -2.0].to_string(), "(1.5, -2)");
    }
}
