//! Small linear-algebra helpers for the predictor recurrence.

use nalgebra::{Cholesky, DMatrix, DVector};

/// Outer product `a · bᵀ`.
pub(crate) fn outer(a: &DVector<f64>, b: &DVector<f64>) -> DMatrix<f64> {
    a * b.transpose()
}

/// Ridge term `λ·I` of size `n`.
pub(crate) fn ridge(n: usize, lambda: f64) -> DMatrix<f64> {
    DMatrix::identity(n, n) * lambda
}

/// Solve `P = cross_cov · cov⁻¹` for symmetric `cov`.
///
/// Solves `cov · Pᵀ = cross_covᵀ` through a Cholesky factorisation instead of
/// forming the inverse. Returns `None` when `cov` is not positive-definite
/// or when the result is not finite. With `rank_check` set, a pivot within
/// rounding of zero also counts as singular; only an unregularised `cov`
/// needs it, since `λ > 0` keeps every pivot away from zero.
pub(crate) fn solve_weights(
    cross_cov: &DMatrix<f64>,
    cov: &DMatrix<f64>,
    rank_check: bool,
) -> Option<DMatrix<f64>> {
    let n = cov.nrows();
    let scale = cov.diagonal().max();
    if !(scale > 0.0) || !scale.is_finite() {
        return None;
    }

    let chol = Cholesky::new(cov.clone())?;

    // Rank deficiency can survive factorisation as a pivot of order ε·scale
    if rank_check {
        let tolerance = n as f64 * f64::EPSILON * scale;
        let l = chol.l_dirty();
        if (0..n).any(|i| l[(i, i)] * l[(i, i)] <= tolerance) {
            return None;
        }
    }

    let weights = chol.solve(&cross_cov.transpose()).transpose();
    weights.iter().all(|w| w.is_finite()).then_some(weights)
}
