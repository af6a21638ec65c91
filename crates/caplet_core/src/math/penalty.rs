//! Difference operators and quadratic roughness penalties.
//!
//! A penalty matrix `P = λ·DᵀD` adds `xᵀPx = λ‖Dx‖²` to a least-squares
//! objective, where `D` takes finite differences of the parameter vector.
//! All matrices built here are symmetric positive semi-definite.
//!
//! ```
//! use caplet_core::math::penalty::{difference_matrix, penalty_matrix};
//! use caplet_core::math::linalg::quadratic_form;
//!
//! let d = difference_matrix(4, 2);
//! let p = penalty_matrix(&d, 10.0);
//! // A straight line has no curvature
//! assert!(quadratic_form(&p, &[1.0, 2.0, 3.0, 4.0]).abs() < 1e-12);
//! ```

use crate::math::linalg::{
    add, gram, identity, kronecker, mat_vec, scale, sum_of_squares, zeros, Matrix,
};
use crate::types::ValidationError;

/// Uniform `order`-th difference matrix, `(n − order) × n`.
///
/// Order 0 is the identity. Orders `>= n` give an empty matrix.
pub fn difference_matrix(n: usize, order: usize) -> Matrix {
    if order == 0 {
        return identity(n);
    }
    if order >= n {
        return Vec::new();
    }
    let lower = difference_matrix(n - 1, order - 1);
    // D_k = D_{k-1}(n-1) · D_1(n)
    let mut d = zeros(n - order, n);
    for (i, row) in lower.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            d[i][j] -= v;
            d[i][j + 1] += v;
        }
    }
    d
}

/// Difference matrix on a non-uniform ascending grid `xs`.
///
/// Order 1 rows are `(v[i+1] − v[i]) / (x[i+1] − x[i])`; order 2 rows are the
/// three-point second-derivative estimate. Orders above 2 are rejected.
pub fn scaled_difference_matrix(xs: &[f64], order: usize) -> Result<Matrix, ValidationError> {
    let n = xs.len();
    match order {
        0 => Ok(identity(n)),
        1 => {
            let mut d = zeros(n.saturating_sub(1), n);
            for i in 0..n.saturating_sub(1) {
                let h = xs[i + 1] - xs[i];
                d[i][i] = -1.0 / h;
                d[i][i + 1] = 1.0 / h;
            }
            Ok(d)
        }
        2 => {
            let mut d = zeros(n.saturating_sub(2), n);
            for i in 1..n.saturating_sub(1) {
                let h0 = xs[i] - xs[i - 1];
                let h1 = xs[i + 1] - xs[i];
                let s = 2.0 / (h0 + h1);
                d[i - 1][i - 1] = s / h0;
                d[i - 1][i] = -s * (1.0 / h0 + 1.0 / h1);
                d[i - 1][i + 1] = s / h1;
            }
            Ok(d)
        }
        _ => Err(ValidationError::invalid(format!(
            "difference order {order} is not supported on a non-uniform grid"
        ))),
    }
}

/// `λ·DᵀD` for a non-empty difference matrix.
pub fn penalty_matrix(d: &[Vec<f64>], lambda: f64) -> Matrix {
    scale(&gram(d), lambda)
}

/// `λ·DᵀD`, or the `n × n` zero matrix if `d` has no rows.
pub fn penalty_matrix_sized(d: &[Vec<f64>], lambda: f64, n: usize) -> Matrix {
    if d.is_empty() {
        zeros(n, n)
    } else {
        penalty_matrix(d, lambda)
    }
}

/// Penalty on a tensor grid with flat index `i·n_y + j`.
///
/// `P = Pₓ ⊗ I_y + I_x ⊗ P_y`, so each direction is penalised independently.
pub fn tensor_penalty_matrix(p_x: &[Vec<f64>], p_y: &[Vec<f64>]) -> Matrix {
    let (nx, ny) = (p_x.len(), p_y.len());
    add(
        &kronecker(p_x, &identity(ny)),
        &kronecker(&identity(nx), p_y),
    )
}

/// Penalty built from independent groups of a flat parameter vector.
///
/// Each group lists `(flat index, coordinate)` pairs sorted by coordinate;
/// differences of the requested order are taken within the group using the
/// coordinates as grid spacing. Groups too short for `order` fall back to
/// the highest order they support; single-element groups contribute nothing.
pub fn grouped_penalty_matrix(
    n: usize,
    groups: &[Vec<(usize, f64)>],
    order: usize,
    lambda: f64,
) -> Result<Matrix, ValidationError> {
    let mut p = zeros(n, n);
    if let Some(&(bad, _)) = groups.iter().flatten().find(|&&(i, _)| i >= n) {
        return Err(ValidationError::invalid(format!(
            "penalty index {bad} out of range for {n} parameters"
        )));
    }
    if lambda == 0.0 {
        return Ok(p);
    }
    for group in groups {
        if group.len() < 2 {
            continue;
        }
        let coords: Vec<f64> = group.iter().map(|&(_, x)| x).collect();
        let local_order = order.min(group.len() - 1);
        let d = scaled_difference_matrix(&coords, local_order)?;
        let local = gram(&d);
        for (a, &(ia, _)) in group.iter().enumerate() {
            for (b, &(ib, _)) in group.iter().enumerate() {
                p[ia][ib] += lambda * local[a][b];
            }
        }
    }
    Ok(p)
}

/// Discrete roughness `‖Dₖ v‖²` of a sequence with uniform `order`-th differences.
pub fn roughness(values: &[f64], order: usize) -> f64 {
    let d = difference_matrix(values.len(), order);
    sum_of_squares(&mat_vec(&d, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linalg::quadratic_form;
    use approx::assert_relative_eq;

    // ========================================
    // Difference Matrices
    // ========================================

    #[test]
    fn test_first_difference() {
        assert_eq!(
            difference_matrix(3, 1),
            vec![vec![-1.0, 1.0, 0.0], vec![0.0, -1.0, 1.0]]
        );
    }

    #[test]
    fn test_second_difference() {
        assert_eq!(difference_matrix(3, 2), vec![vec![1.0, -2.0, 1.0]]);
    }

    #[test]
    fn test_order_too_high_is_empty() {
        assert!(difference_matrix(2, 2).is_empty());
    }

    #[test]
    fn test_scaled_matches_uniform_on_unit_grid() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(scaled_difference_matrix(&xs, 2).unwrap(), difference_matrix(4, 2));
        assert_eq!(scaled_difference_matrix(&xs, 1).unwrap(), difference_matrix(4, 1));
    }

    #[test]
    fn test_scaled_second_difference_kills_lines() {
        let xs = [0.1, 0.4, 1.0, 2.5];
        let d = scaled_difference_matrix(&xs, 2).unwrap();
        let line: Vec<f64> = xs.iter().map(|x| 0.3 - 0.7 * x).collect();
        for v in mat_vec(&d, &line) {
            assert_relative_eq!(v, 0.0, epsilon = 1e-12);
        }
    }

    // ========================================
    // Penalty Matrices
    // ========================================

    #[test]
    fn test_tensor_penalty_shape() {
        let px = penalty_matrix(&difference_matrix(3, 2), 1.0);
        let py = penalty_matrix(&difference_matrix(2, 1), 1.0);
        let p = tensor_penalty_matrix(&px, &py);
        assert_eq!(p.len(), 6);
        // Constant surfaces carry no penalty
        assert_relative_eq!(quadratic_form(&p, &[0.2; 6]), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_grouped_penalty_symmetric_psd() {
        let groups = vec![
            vec![(0, 0.5), (1, 1.0), (2, 2.0)],
            vec![(3, 0.5), (4, 1.0)],
            vec![(5, 3.0)],
        ];
        let p = grouped_penalty_matrix(6, &groups, 2, 2.0).unwrap();
        for i in 0..6 {
            for j in 0..6 {
                assert_relative_eq!(p[i][j], p[j][i], epsilon = 1e-14);
            }
        }
        let x = [0.3, -0.1, 0.5, 0.2, 0.9, 4.0];
        assert!(quadratic_form(&p, &x) >= 0.0);
        // isolated parameter is unpenalised
        assert!(p[5].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_grouped_penalty_rejects_bad_index() {
        let groups = vec![vec![(0, 0.0), (7, 1.0)]];
        assert!(grouped_penalty_matrix(3, &groups, 1, 1.0).is_err());
    }

    #[test]
    fn test_roughness() {
        assert_relative_eq!(roughness(&[0.0, 1.0, 0.0], 2), 4.0);
        assert_relative_eq!(roughness(&[1.0, 2.0, 3.0], 2), 0.0);
    }
}
