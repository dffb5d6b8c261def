//! Dense, dynamically sized matrix and vector kernel.
//!
//! [`Mat`] is an owned, row-major `rows × cols` array of [`Real`]. Every
//! operation that combines operands checks their shapes and returns
//! [`MatError::DimensionMismatch`] instead of truncating or padding.
//! Storage is acquired with `try_reserve_exact`, so an unsatisfiable
//! allocation surfaces as [`MatError::AllocationFailure`] rather than an
//! abort.
//!
//! The kernel backs the normal-equation solves of the ICP engine and the
//! principal-component analysis of point clouds (see [`eigen`]).

use std::fmt;
use std::ops::{Index, IndexMut};

use nalgebra::DMatrix;
use thiserror::Error;

use crate::Real;

pub mod eigen;

pub use eigen::{pca, symmetric_eigen, tridiagonalize, Pca, SymmetricEigen, Tridiagonal};

/// Pivot magnitude below which a matrix is treated as singular.
pub const SINGULAR_EPS: Real = 1e-10;

/// Errors raised by the matrix kernel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatError {
    #[error("cannot allocate a {rows}x{cols} matrix")]
    AllocationFailure { rows: usize, cols: usize },
    #[error("dimension mismatch: {op} on {lhs:?} and {rhs:?}")]
    DimensionMismatch {
        op: &'static str,
        lhs: (usize, usize),
        rhs: (usize, usize),
    },
    #[error("matrix is singular")]
    Singular,
    #[error("eigen decomposition did not converge")]
    NoConvergence,
}

fn alloc_zeroed(rows: usize, cols: usize) -> Result<Vec<Real>, MatError> {
    let len = rows
        .checked_mul(cols)
        .ok_or(MatError::AllocationFailure { rows, cols })?;
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| MatError::AllocationFailure { rows, cols })?;
    data.resize(len, 0.0);
    Ok(data)
}

/// Owned row-major matrix.
#[derive(Clone, PartialEq)]
pub struct Mat {
    rows: usize,
    cols: usize,
    data: Vec<Real>,
}

impl Mat {
    /// Allocate a zero-filled `rows × cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self, MatError> {
        Ok(Self {
            rows,
            cols,
            data: alloc_zeroed(rows, cols)?,
        })
    }

    /// Allocate a `dim × dim` identity matrix.
    pub fn identity(dim: usize) -> Result<Self, MatError> {
        let mut m = Self::zeros(dim, dim)?;
        for i in 0..dim {
            m[(i, i)] = 1.0;
        }
        Ok(m)
    }

    /// Build a matrix from row-major data; `data.len()` must equal `rows * cols`.
    pub fn from_row_slice(rows: usize, cols: usize, data: &[Real]) -> Result<Self, MatError> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(MatError::DimensionMismatch {
                op: "from_row_slice",
                lhs: (rows, cols),
                rhs: (data.len(), 1),
            });
        }
        let mut m = Self::zeros(rows, cols)?;
        m.data.copy_from_slice(data);
        Ok(m)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[Real] {
        &self.data
    }

    /// One row as a slice.
    pub fn row(&self, r: usize) -> &[Real] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Copy `source` into `self`; both must have the same shape.
    pub fn copy_from(&mut self, source: &Mat) -> Result<(), MatError> {
        if self.shape() != source.shape() {
            return Err(MatError::DimensionMismatch {
                op: "copy_from",
                lhs: self.shape(),
                rhs: source.shape(),
            });
        }
        self.data.copy_from_slice(&source.data);
        Ok(())
    }

    /// Transpose into a newly allocated matrix.
    pub fn transpose(&self) -> Result<Mat, MatError> {
        let mut out = Mat::zeros(self.cols, self.rows)?;
        for r in 0..self.rows {
            for c in 0..self.cols {
                out[(c, r)] = self[(r, c)];
            }
        }
        Ok(out)
    }

    /// Matrix product `self * rhs`.
    pub fn mul(&self, rhs: &Mat) -> Result<Mat, MatError> {
        if self.cols != rhs.rows {
            return Err(MatError::DimensionMismatch {
                op: "mul",
                lhs: self.shape(),
                rhs: rhs.shape(),
            });
        }
        let mut out = Mat::zeros(self.rows, rhs.cols)?;
        for r in 0..self.rows {
            let a_row = self.row(r);
            for (k, &a) in a_row.iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                let b_row = rhs.row(k);
                let out_row = &mut out.data[r * rhs.cols..(r + 1) * rhs.cols];
                for (o, &b) in out_row.iter_mut().zip(b_row) {
                    *o += a * b;
                }
            }
        }
        Ok(out)
    }

    /// Matrix-vector product `self * v`.
    pub fn mul_vec(&self, v: &Vector) -> Result<Vector, MatError> {
        if self.cols != v.len() {
            return Err(MatError::DimensionMismatch {
                op: "mul_vec",
                lhs: self.shape(),
                rhs: (v.len(), 1),
            });
        }
        let mut out = Vector::zeros(self.rows)?;
        for r in 0..self.rows {
            out[r] = self.row(r).iter().zip(v.as_slice()).map(|(a, b)| a * b).sum();
        }
        Ok(out)
    }

    /// Inverse in a newly allocated matrix.
    pub fn inverse(&self) -> Result<Mat, MatError> {
        let mut out = self.clone();
        out.invert_in_place()?;
        Ok(out)
    }

    /// Gauss-Jordan inversion with partial pivoting.
    ///
    /// On error `self` is left unspecified.
    pub fn invert_in_place(&mut self) -> Result<(), MatError> {
        if self.rows != self.cols {
            return Err(MatError::DimensionMismatch {
                op: "invert",
                lhs: self.shape(),
                rhs: self.shape(),
            });
        }
        let n = self.rows;
        let mut inv = Mat::identity(n)?;
        for col in 0..n {
            let pivot_row = (col..n)
                .max_by(|&a, &b| self[(a, col)].abs().total_cmp(&self[(b, col)].abs()))
                .unwrap_or(col);
            if self[(pivot_row, col)].abs() < SINGULAR_EPS {
                return Err(MatError::Singular);
            }
            if pivot_row != col {
                self.swap_rows(pivot_row, col);
                inv.swap_rows(pivot_row, col);
            }
            let pivot = self[(col, col)];
            for c in 0..n {
                self[(col, c)] /= pivot;
                inv[(col, c)] /= pivot;
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = self[(r, col)];
                if factor == 0.0 {
                    continue;
                }
                for c in 0..n {
                    let (a, b) = (self[(col, c)], inv[(col, c)]);
                    self[(r, c)] -= factor * a;
                    inv[(r, c)] -= factor * b;
                }
            }
        }
        *self = inv;
        Ok(())
    }

    /// Determinant via LU decomposition with partial pivoting.
    pub fn determinant(&self) -> Result<Real, MatError> {
        if self.rows != self.cols {
            return Err(MatError::DimensionMismatch {
                op: "determinant",
                lhs: self.shape(),
                rhs: self.shape(),
            });
        }
        let n = self.rows;
        let mut lu = self.clone();
        let mut det = 1.0;
        for col in 0..n {
            let pivot_row = (col..n)
                .max_by(|&a, &b| lu[(a, col)].abs().total_cmp(&lu[(b, col)].abs()))
                .unwrap_or(col);
            let pivot = lu[(pivot_row, col)];
            if pivot == 0.0 {
                return Ok(0.0);
            }
            if pivot_row != col {
                lu.swap_rows(pivot_row, col);
                det = -det;
            }
            det *= pivot;
            for r in col + 1..n {
                let factor = lu[(r, col)] / pivot;
                for c in col..n {
                    let v = lu[(col, c)];
                    lu[(r, c)] -= factor * v;
                }
            }
        }
        Ok(det)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    /// Copy into a nalgebra matrix.
    pub fn to_dmatrix(&self) -> DMatrix<Real> {
        DMatrix::from_row_slice(self.rows, self.cols, &self.data)
    }

    /// Copy from a nalgebra matrix.
    pub fn from_dmatrix(m: &DMatrix<Real>) -> Result<Self, MatError> {
        let mut out = Mat::zeros(m.nrows(), m.ncols())?;
        for r in 0..m.nrows() {
            for c in 0..m.ncols() {
                out[(r, c)] = m[(r, c)];
            }
        }
        Ok(out)
    }
}

impl Index<(usize, usize)> for Mat {
    type Output = Real;

    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &Real {
        debug_assert!(r < self.rows && c < self.cols);
        &self.data[r * self.cols + c]
    }
}

impl IndexMut<(usize, usize)> for Mat {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut Real {
        debug_assert!(r < self.rows && c < self.cols);
        &mut self.data[r * self.cols + c]
    }
}

impl fmt::Debug for Mat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mat {}x{} [", self.rows, self.cols)?;
        for r in 0..self.rows {
            let row: Vec<String> = self.row(r).iter().map(|v| format!("{v:10.5}")).collect();
            writeln!(f, "  {}", row.join(" "))?;
        }
        write!(f, "]")
    }
}

/// Owned dense vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    data: Vec<Real>,
}

impl Vector {
    pub fn zeros(len: usize) -> Result<Self, MatError> {
        Ok(Self {
            data: alloc_zeroed(len, 1)?,
        })
    }

    pub fn from_slice(values: &[Real]) -> Result<Self, MatError> {
        let mut v = Self::zeros(values.len())?;
        v.data.copy_from_slice(values);
        Ok(v)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[Real] {
        &self.data
    }

    /// Inner product; both vectors must have the same length.
    pub fn dot(&self, other: &Vector) -> Result<Real, MatError> {
        if self.len() != other.len() {
            return Err(MatError::DimensionMismatch {
                op: "dot",
                lhs: (self.len(), 1),
                rhs: (other.len(), 1),
            });
        }
        Ok(self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum())
    }

    pub fn norm(&self) -> Real {
        self.data.iter().map(|v| v * v).sum::<Real>().sqrt()
    }
}

impl Index<usize> for Vector {
    type Output = Real;

    #[inline]
    fn index(&self, i: usize) -> &Real {
        &self.data[i]
    }
}

impl IndexMut<usize> for Vector {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut Real {
        &mut self.data[i]
    }
}
