//! Symmetric eigen-decomposition and principal-component analysis.
//!
//! The decomposition runs in two stages: Householder reduction to a
//! symmetric tridiagonal matrix, followed by implicit QL iteration with
//! Wilkinson-style shifts on that tridiagonal form. Only the lower triangle
//! of the input is read.

use super::{Mat, MatError, Vector};
use crate::Real;

/// Maximum QL sweeps per eigenvalue before giving up.
const MAX_QL_SWEEPS: usize = 30;

/// Householder tridiagonal form `A = Q T Qᵀ`.
#[derive(Debug, Clone)]
pub struct Tridiagonal {
    /// Diagonal of `T`.
    pub d: Vector,
    /// Sub-diagonal of `T`: `e[i] = T[(i, i-1)]`, `e[0] = 0`.
    pub e: Vector,
    /// Orthogonal transformation `Q`.
    pub q: Mat,
}

/// Eigenpairs of a symmetric matrix, ordered by descending eigenvalue.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    pub values: Vector,
    /// Column `i` is the unit eigenvector for `values[i]`.
    pub vectors: Mat,
}

/// Principal components of a point cloud.
#[derive(Debug, Clone)]
pub struct Pca {
    /// Per-dimension mean of the samples.
    pub mean: Vector,
    /// Row `i` is the `i`-th principal axis.
    pub axes: Mat,
    /// Variance along each axis, descending.
    pub variances: Vector,
}

impl Pca {
    /// Fraction of the total variance carried by each axis.
    pub fn explained_ratio(&self) -> Vec<Real> {
        let total: Real = self.variances.as_slice().iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.variances.len()];
        }
        self.variances.as_slice().iter().map(|v| v / total).collect()
    }
}

fn require_square(a: &Mat, op: &'static str) -> Result<usize, MatError> {
    if a.rows() != a.cols() {
        return Err(MatError::DimensionMismatch {
            op,
            lhs: a.shape(),
            rhs: a.shape(),
        });
    }
    Ok(a.rows())
}

/// Householder reduction of a symmetric matrix to tridiagonal form.
pub fn tridiagonalize(a: &Mat) -> Result<Tridiagonal, MatError> {
    let n = require_square(a, "tridiagonalize")?;
    let mut q = a.clone();
    let mut d = Vector::zeros(n)?;
    let mut e = Vector::zeros(n)?;
    householder_reduce(&mut q, &mut d.data, &mut e.data);
    Ok(Tridiagonal { d, e, q })
}

/// Eigen-decomposition of a symmetric matrix.
pub fn symmetric_eigen(a: &Mat) -> Result<SymmetricEigen, MatError> {
    let Tridiagonal { mut d, mut e, mut q } = tridiagonalize(a)?;
    ql_implicit(&mut d.data, &mut e.data, &mut q)?;

    let n = d.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| d[j].total_cmp(&d[i]));

    let mut values = Vector::zeros(n)?;
    let mut vectors = Mat::zeros(n, n)?;
    for (dst, &src) in order.iter().enumerate() {
        values[dst] = d[src];
        for r in 0..n {
            vectors[(r, dst)] = q[(r, src)];
        }
    }
    Ok(SymmetricEigen { values, vectors })
}

/// Principal-component analysis of `input` (one sample per row).
pub fn pca(input: &Mat) -> Result<Pca, MatError> {
    let (samples, dims) = input.shape();
    if samples == 0 || dims == 0 {
        return Err(MatError::DimensionMismatch {
            op: "pca",
            lhs: input.shape(),
            rhs: (1, 1),
        });
    }

    let mut mean = Vector::zeros(dims)?;
    for r in 0..samples {
        for (c, v) in input.row(r).iter().enumerate() {
            mean[c] += v;
        }
    }
    for c in 0..dims {
        mean[c] /= samples as Real;
    }

    let mut cov = Mat::zeros(dims, dims)?;
    for r in 0..samples {
        let row = input.row(r);
        for i in 0..dims {
            let di = row[i] - mean[i];
            for j in 0..=i {
                cov[(i, j)] += di * (row[j] - mean[j]);
            }
        }
    }
    for i in 0..dims {
        for j in 0..=i {
            let v = cov[(i, j)] / samples as Real;
            cov[(i, j)] = v;
            cov[(j, i)] = v;
        }
    }

    let eig = symmetric_eigen(&cov)?;
    let axes = eig.vectors.transpose()?;
    let mut variances = eig.values;
    // Round-off can push the smallest variances slightly negative.
    for i in 0..variances.len() {
        variances[i] = variances[i].max(0.0);
    }
    Ok(Pca {
        mean,
        axes,
        variances,
    })
}

fn householder_reduce(v: &mut Mat, d: &mut [Real], e: &mut [Real]) {
    let n = d.len();
    if n == 0 {
        return;
    }
    for j in 0..n {
        d[j] = v[(n - 1, j)];
    }

    for i in (1..n).rev() {
        let mut scale = 0.0;
        let mut h = 0.0;
        for dk in d.iter().take(i) {
            scale += dk.abs();
        }
        if scale == 0.0 {
            e[i] = d[i - 1];
            for j in 0..i {
                d[j] = v[(i - 1, j)];
                v[(i, j)] = 0.0;
                v[(j, i)] = 0.0;
            }
        } else {
            for dk in d.iter_mut().take(i) {
                *dk /= scale;
                h += *dk * *dk;
            }
            let mut f = d[i - 1];
            let mut g = h.sqrt();
            if f > 0.0 {
                g = -g;
            }
            e[i] = scale * g;
            h -= f * g;
            d[i - 1] = f - g;
            for ej in e.iter_mut().take(i) {
                *ej = 0.0;
            }

            for j in 0..i {
                f = d[j];
                v[(j, i)] = f;
                g = e[j] + v[(j, j)] * f;
                for k in j + 1..i {
                    g += v[(k, j)] * d[k];
                    e[k] += v[(k, j)] * f;
                }
                e[j] = g;
            }
            f = 0.0;
            for j in 0..i {
                e[j] /= h;
                f += e[j] * d[j];
            }
            let hh = f / (h + h);
            for j in 0..i {
                e[j] -= hh * d[j];
            }
            for j in 0..i {
                f = d[j];
                g = e[j];
                for k in j..i {
                    v[(k, j)] -= f * e[k] + g * d[k];
                }
                d[j] = v[(i - 1, j)];
                v[(i, j)] = 0.0;
            }
        }
        d[i] = h;
    }

    // Accumulate the transformations.
    for i in 0..n - 1 {
        v[(n - 1, i)] = v[(i, i)];
        v[(i, i)] = 1.0;
        let h = d[i + 1];
        if h != 0.0 {
            for k in 0..=i {
                d[k] = v[(k, i + 1)] / h;
            }
            for j in 0..=i {
                let mut g = 0.0;
                for k in 0..=i {
                    g += v[(k, i + 1)] * v[(k, j)];
                }
                for k in 0..=i {
                    v[(k, j)] -= g * d[k];
                }
            }
        }
        for k in 0..=i {
            v[(k, i + 1)] = 0.0;
        }
    }
    for j in 0..n {
        d[j] = v[(n - 1, j)];
        v[(n - 1, j)] = 0.0;
    }
    v[(n - 1, n - 1)] = 1.0;
    e[0] = 0.0;
}

fn ql_implicit(d: &mut [Real], e: &mut [Real], v: &mut Mat) -> Result<(), MatError> {
    let n = d.len();
    if n == 0 {
        return Ok(());
    }
    for i in 1..n {
        e[i - 1] = e[i];
    }
    e[n - 1] = 0.0;

    let mut f = 0.0;
    let mut tst1: Real = 0.0;
    let eps = Real::EPSILON;
    for l in 0..n {
        tst1 = tst1.max(d[l].abs() + e[l].abs());
        let mut m = l;
        while m < n - 1 {
            if e[m].abs() <= eps * tst1 {
                break;
            }
            m += 1;
        }

        if m > l {
            let mut sweeps = 0;
            loop {
                sweeps += 1;
                if sweeps > MAX_QL_SWEEPS {
                    return Err(MatError::NoConvergence);
                }

                let mut g = d[l];
                let mut p = (d[l + 1] - g) / (2.0 * e[l]);
                let mut r = p.hypot(1.0);
                if p < 0.0 {
                    r = -r;
                }
                d[l] = e[l] / (p + r);
                d[l + 1] = e[l] * (p + r);
                let dl1 = d[l + 1];
                let mut h = g - d[l];
                for di in d.iter_mut().skip(l + 2) {
                    *di -= h;
                }
                f += h;

                p = d[m];
                let mut c = 1.0;
                let mut c2 = c;
                let mut c3 = c;
                let el1 = e[l + 1];
                let mut s = 0.0;
                let mut s2 = 0.0;
                for i in (l..m).rev() {
                    c3 = c2;
                    c2 = c;
                    s2 = s;
                    g = c * e[i];
                    h = c * p;
                    r = p.hypot(e[i]);
                    e[i + 1] = s * r;
                    s = e[i] / r;
                    c = p / r;
                    p = c * d[i] - s * g;
                    d[i + 1] = h + s * (c * g + s * d[i]);
                    for k in 0..n {
                        h = v[(k, i + 1)];
                        v[(k, i + 1)] = s * v[(k, i)] + c * h;
                        v[(k, i)] = c * v[(k, i)] - s * h;
                    }
                }
                p = -s * s2 * c3 * el1 * e[l] / dl1;
                e[l] = s * p;
                d[l] = c * p;

                if e[l].abs() <= eps * tst1 {
                    break;
                }
            }
        }
        d[l] += f;
        e[l] = 0.0;
    }
    Ok(())
}
