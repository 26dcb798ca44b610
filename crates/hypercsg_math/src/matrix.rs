//! N-dimensional matrix math.

use std::ops::*;

use super::{Float, Vector, VectorRef};

/// Pivots smaller than this are treated as zero during elimination.
const PIVOT_EPSILON: Float = 1e-10;

/// N-by-N square matrix. Indexing out of bounds returns the corresponding
/// element from the infinite identity matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    /// Number of dimensions of the matrix.
    ndim: u8,
    /// Elements stored in **column-major** order.
    elems: Vec<Float>,
}
impl Matrix {
    /// 0-by-0 matrix that functions as the identity matrix.
    pub const EMPTY_IDENT: Self = Matrix {
        ndim: 0,
        elems: vec![],
    };

    /// Constructs a matrix with all zeros.
    pub fn zero(ndim: u8) -> Self {
        Self {
            ndim,
            elems: vec![0.0; ndim as usize * ndim as usize],
        }
    }
    /// Constructs an identity matrix.
    pub fn ident(ndim: u8) -> Self {
        let mut ret = Self::zero(ndim);
        for i in 0..ndim {
            *ret.get_mut(i, i) = 1.0;
        }
        ret
    }
    /// Constructs a matrix from a list of columns, where the number of columns
    /// determines the size of the matrix. Columns are padded or truncated to
    /// that size.
    pub fn from_cols<V: VectorRef>(cols: impl IntoIterator<Item = V>) -> Self {
        let cols: Vec<V> = cols.into_iter().collect();
        let ndim = cols.len() as u8;
        let elems = cols.iter().flat_map(|col| col.iter_ndim(ndim)).collect();
        Matrix { ndim, elems }
    }
    /// Constructs a matrix from a list of rows, where the number of rows
    /// determines the size of the matrix.
    pub fn from_rows<V: VectorRef>(rows: impl IntoIterator<Item = V>) -> Self {
        Self::from_cols(rows).transpose()
    }
    /// Constructs a matrix from a function for each element.
    pub fn from_fn(ndim: u8, f: impl Fn(u8, u8) -> Float) -> Self {
        let elems = (0..ndim)
            .flat_map(|col| (0..ndim).map(move |row| (col, row)))
            .map(|(col, row)| f(col, row))
            .collect();
        Matrix { ndim, elems }
    }

    /// Returns the number of dimensions (size) of the matrix.
    pub fn ndim(&self) -> u8 {
        self.ndim
    }

    /// Returns an element from the matrix. If either `col` or `row` is out of
    /// bounds, returns the corresponding element from the infinite identity
    /// matrix.
    pub fn get(&self, col: u8, row: u8) -> Float {
        let ndim = self.ndim;
        if col < ndim && row < ndim {
            self.elems[col as usize * ndim as usize + row as usize]
        } else if col == row {
            1.0
        } else {
            0.0
        }
    }
    /// Returns a mutable reference to an element from the matrix.
    ///
    /// # Panics
    ///
    /// This method panics if `col >= self.ndim() || row >= self.ndim()`.
    pub fn get_mut(&mut self, col: u8, row: u8) -> &mut Float {
        let ndim = self.ndim;
        assert!(col < ndim, "column index {col} out of range for {ndim}x{ndim} matrix");
        assert!(row < ndim, "row index {row} out of range for {ndim}x{ndim} matrix");
        &mut self.elems[col as usize * ndim as usize + row as usize]
    }

    /// Returns a column of the matrix.
    pub fn col(&self, col: u8) -> Vector {
        (0..self.ndim).map(|row| self.get(col, row)).collect()
    }
    /// Returns a row of the matrix.
    pub fn row(&self, row: u8) -> Vector {
        (0..self.ndim).map(|col| self.get(col, row)).collect()
    }

    /// Returns the transpose of the matrix.
    #[must_use]
    pub fn transpose(&self) -> Matrix {
        Matrix::from_fn(self.ndim, |col, row| self.get(row, col))
    }

    /// Returns the determinant of the matrix, computed by Gaussian elimination
    /// with partial pivoting.
    pub fn determinant(&self) -> Float {
        let n = self.ndim;
        let mut m = self.clone();
        let mut det = 1.0;
        for i in 0..n {
            let Some(pivot_row) = (i..n).max_by(|&a, &b| {
                m.get(i, a).abs().total_cmp(&m.get(i, b).abs())
            }) else {
                return 0.0;
            };
            let pivot = m.get(i, pivot_row);
            if pivot == 0.0 {
                return 0.0;
            }
            if pivot_row != i {
                m.swap_rows(i, pivot_row);
                det = -det;
            }
            det *= pivot;
            for row in i + 1..n {
                let factor = m.get(i, row) / pivot;
                if factor != 0.0 {
                    for col in i..n {
                        let delta = factor * m.get(col, i);
                        *m.get_mut(col, row) -= delta;
                    }
                }
            }
        }
        det
    }

    /// Solves `self * x = rhs` for `x`, or returns `None` if the matrix is
    /// singular.
    pub fn solve(&self, rhs: impl VectorRef) -> Option<Vector> {
        let n = self.ndim;
        let mut m = self.clone();
        let mut b = rhs.pad(n);
        for i in 0..n {
            let pivot_row = (i..n).max_by(|&a, &b| {
                m.get(i, a).abs().total_cmp(&m.get(i, b).abs())
            })?;
            if m.get(i, pivot_row).abs() < PIVOT_EPSILON {
                log::trace!("singular {n}x{n} matrix at column {i}");
                return None;
            }
            if pivot_row != i {
                m.swap_rows(i, pivot_row);
                b.0.swap(i as usize, pivot_row as usize);
            }
            let pivot = m.get(i, i);
            for row in i + 1..n {
                let factor = m.get(i, row) / pivot;
                if factor != 0.0 {
                    for col in i..n {
                        let delta = factor * m.get(col, i);
                        *m.get_mut(col, row) -= delta;
                    }
                    let delta = factor * b[i];
                    b[row] -= delta;
                }
            }
        }
        // Back substitution
        let mut x = Vector::zero(n);
        for i in (0..n).rev() {
            let sum: Float = (i + 1..n).map(|col| m.get(col, i) * x[col]).sum();
            x[i] = (b[i] - sum) / m.get(i, i);
        }
        x.0.iter().all(|c| c.is_finite()).then_some(x)
    }

    fn swap_rows(&mut self, a: u8, b: u8) {
        for col in 0..self.ndim {
            let tmp = self.get(col, a);
            *self.get_mut(col, a) = self.get(col, b);
            *self.get_mut(col, b) = tmp;
        }
    }
}

impl Mul<Vector> for &Matrix {
    type Output = Vector;

    fn mul(self, rhs: Vector) -> Self::Output {
        (0..self.ndim)
            .map(|row| self.row(row).dot(&rhs))
            .collect()
    }
}

/// Returns the generalized cross product of `ndim - 1` vectors in `ndim`-space:
/// the vector `c` such that `c · x = det[x, vectors...]` for every `x`.
///
/// With no vectors in 1-space this is the unit vector `(1)`. Vectors beyond
/// `ndim - 1` are ignored and missing vectors are treated as zero.
pub fn cross_product(vectors: &[Vector], ndim: u8) -> Vector {
    (0..ndim)
        .map(|axis| {
            let cols = std::iter::once(Vector::unit(axis).pad(ndim)).chain(
                (0..ndim.saturating_sub(1) as usize)
                    .map(|i| {
                        vectors
                            .get(i)
                            .map(|v| v.pad(ndim))
                            .unwrap_or_else(|| Vector::zero(ndim))
                    }),
            );
            Matrix::from_cols(cols).determinant()
        })
        .collect()
}

/// Returns the determinant of the Gram matrix of a set of vectors, which is the
/// squared volume of the parallelotope they span.
pub fn gram_determinant(vectors: &[Vector]) -> Float {
    let n = vectors.len() as u8;
    Matrix::from_fn(n, |i, j| vectors[i as usize].dot(&vectors[j as usize])).determinant()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_determinant() {
        let m = Matrix::from_cols([
            vector![2.0, 0.0, 1.0],
            vector![1.0, 3.0, 0.0],
            vector![0.0, 1.0, 4.0],
        ]);
        // 2*(3*4 - 0*1) - 1*(0*4 - 1*1) + 0 = 24 + 1
        assert_approx_eq!(m.determinant(), 25.0);
        assert_approx_eq!(Matrix::ident(5).determinant(), 1.0);
        assert_approx_eq!(Matrix::EMPTY_IDENT.determinant(), 1.0);

        let singular = Matrix::from_cols([vector![1.0, 2.0], vector![2.0, 4.0]]);
        assert_approx_eq!(singular.determinant(), 0.0);
    }

    #[test]
    fn test_solve() {
        let m = Matrix::from_rows([vector![1.0, 1.0], vector![1.0, -1.0]]);
        let x = m.solve(vector![3.0, 1.0]).expect("nonsingular");
        assert_approx_eq!(x, vector![2.0, 1.0]);

        let singular = Matrix::from_rows([vector![1.0, 1.0], vector![2.0, 2.0]]);
        assert_eq!(singular.solve(vector![1.0, 1.0]), None);
    }

    #[test]
    fn test_cross_product() {
        let x = vector![1.0, 0.0, 0.0];
        let y = vector![0.0, 1.0, 0.0];
        assert_approx_eq!(cross_product(&[x.clone(), y.clone()], 3), vector![0.0, 0.0, 1.0]);
        assert_approx_eq!(cross_product(&[y, x], 3), vector![0.0, 0.0, -1.0]);
        assert_approx_eq!(cross_product(&[vector![1.0, 0.0]], 2), vector![0.0, -1.0]);
        assert_approx_eq!(cross_product(&[], 1), vector![1.0]);
    }

    #[test]
    fn test_gram_determinant() {
        let a = vector![3.0, 0.0, 0.0];
        let b = vector![0.0, 2.0, 0.0];
        assert_approx_eq!(gram_determinant(&[a, b]), 36.0);
        assert_approx_eq!(gram_determinant(&[]), 1.0);
    }
}
