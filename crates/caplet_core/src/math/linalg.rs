//! Dense row-major linear algebra on `Vec<Vec<f64>>`.
//!
//! The matrices in caplet stripping are small (tens to a few hundred
//! rows), so plain nested vectors are used throughout. All functions return
//! owned results; callers never receive aliases into another matrix.

/// Row-major dense matrix.
pub type Matrix = Vec<Vec<f64>>;

/// `rows × cols` zero matrix.
pub fn zeros(rows: usize, cols: usize) -> Matrix {
    vec![vec![0.0; cols]; rows]
}

/// `n × n` identity matrix.
pub fn identity(n: usize) -> Matrix {
    let mut m = zeros(n, n);
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

/// Number of columns (zero for an empty matrix).
#[inline]
pub fn cols(a: &[Vec<f64>]) -> usize {
    a.first().map_or(0, Vec::len)
}

/// Transpose.
pub fn transpose(a: &[Vec<f64>]) -> Matrix {
    let (rows, n_cols) = (a.len(), cols(a));
    let mut t = zeros(n_cols, rows);
    for (i, row) in a.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            t[j][i] = v;
        }
    }
    t
}

/// Matrix product `a · b`.
///
/// Zero entries of `a` are skipped, which keeps products with the sparse
/// cap-vega matrix cheap.
pub fn mat_mul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Matrix {
    let n_cols = cols(b);
    let mut c = zeros(a.len(), n_cols);
    for (i, row) in a.iter().enumerate() {
        for (k, &aik) in row.iter().enumerate() {
            if aik == 0.0 {
                continue;
            }
            for (cij, &bkj) in c[i].iter_mut().zip(&b[k]) {
                *cij += aik * bkj;
            }
        }
    }
    c
}

/// Matrix-vector product `a · x`.
pub fn mat_vec(a: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    a.iter()
        .map(|row| row.iter().zip(x).map(|(aij, xj)| aij * xj).sum())
        .collect()
}

/// `aᵀ · x` without materialising the transpose.
pub fn transpose_mat_vec(a: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; cols(a)];
    for (row, &xi) in a.iter().zip(x) {
        for (yj, &aij) in y.iter_mut().zip(row) {
            *yj += aij * xi;
        }
    }
    y
}

/// Gram matrix `aᵀ · a`.
pub fn gram(a: &[Vec<f64>]) -> Matrix {
    let n = cols(a);
    let mut g = zeros(n, n);
    for row in a {
        for i in 0..n {
            if row[i] == 0.0 {
                continue;
            }
            for j in i..n {
                g[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..n {
        for j in 0..i {
            g[i][j] = g[j][i];
        }
    }
    g
}

/// Element-wise sum `a + b`. Shapes must agree.
pub fn add(a: &[Vec<f64>], b: &[Vec<f64>]) -> Matrix {
    a.iter()
        .zip(b)
        .map(|(ra, rb)| ra.iter().zip(rb).map(|(x, y)| x + y).collect())
        .collect()
}

/// Scalar multiple `s · a`.
pub fn scale(a: &[Vec<f64>], s: f64) -> Matrix {
    a.iter()
        .map(|row| row.iter().map(|v| v * s).collect())
        .collect()
}

/// Kronecker product `a ⊗ b`.
pub fn kronecker(a: &[Vec<f64>], b: &[Vec<f64>]) -> Matrix {
    let (ra, ca) = (a.len(), cols(a));
    let (rb, cb) = (b.len(), cols(b));
    let mut k = zeros(ra * rb, ca * cb);
    for i in 0..ra {
        for j in 0..ca {
            let aij = a[i][j];
            if aij == 0.0 {
                continue;
            }
            for p in 0..rb {
                for q in 0..cb {
                    k[i * rb + p][j * cb + q] = aij * b[p][q];
                }
            }
        }
    }
    k
}

/// Quadratic form `xᵀ · p · x`.
pub fn quadratic_form(p: &[Vec<f64>], x: &[f64]) -> f64 {
    p.iter()
        .zip(x)
        .map(|(row, &xi)| xi * row.iter().zip(x).map(|(pij, xj)| pij * xj).sum::<f64>())
        .sum()
}

/// Dot product.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Sum of squares.
#[inline]
pub fn sum_of_squares(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Largest absolute entry of a matrix.
pub fn max_abs(a: &[Vec<f64>]) -> f64 {
    a.iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |m, v| m.max(v.abs()))
}

/// Solve `a x = b` for symmetric positive definite `a` using Cholesky decomposition.
///
/// Returns `None` when `a` is not positive definite.
pub fn solve_cholesky(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    // A = L Lᵀ
    let mut l = zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // Lᵀ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

/// Solve `a x = b` for square `a` using LU decomposition with partial pivoting.
///
/// Returns `None` when a pivot falls below `1e-14` relative to the largest entry.
pub fn solve_lu(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }
    let threshold = 1e-14 * max_abs(a).max(f64::MIN_POSITIVE);

    let mut m: Matrix = a.to_vec();
    let mut rhs = b.to_vec();

    for k in 0..n {
        let pivot_row = (k..n).max_by(|&i, &j| m[i][k].abs().total_cmp(&m[j][k].abs()))?;
        if !(m[pivot_row][k].abs() > threshold) {
            return None;
        }
        m.swap(k, pivot_row);
        rhs.swap(k, pivot_row);

        for i in (k + 1)..n {
            let factor = m[i][k] / m[k][k];
            if factor == 0.0 {
                continue;
            }
            for j in k..n {
                m[i][j] -= factor * m[k][j];
            }
            rhs[i] -= factor * rhs[k];
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = rhs[i];
        for j in (i + 1)..n {
            sum -= m[i][j] * x[j];
        }
        x[i] = sum / m[i][i];
    }
    Some(x)
}
