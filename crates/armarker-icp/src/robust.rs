use armarker_core::Real;

/// Smallest Tukey scale `K²` (pixels²).
pub const MIN_TUKEY_K2: Real = 16.0;

/// Robust loss kernels for iteratively re-weighted least squares (IRLS).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum RobustKernel {
    /// No robustness, pure L2 (quadratic).
    #[default]
    None,
    /// Tukey biweight on squared residuals with scale `k2`.
    Tukey { k2: Real },
}

impl RobustKernel {
    /// Return the robust loss `rho(e2)` and the IRLS weight for a squared
    /// residual. Points outside the Tukey support get weight zero.
    pub fn rho_and_weight(self, e2: Real) -> (Real, Real) {
        match self {
            RobustKernel::None => (e2, 1.0),
            RobustKernel::Tukey { k2 } => {
                if e2 > k2 {
                    (k2 / 6.0, 0.0)
                } else {
                    let a = 1.0 - e2 / k2;
                    (k2 / 6.0 * (1.0 - a * a * a), a * a)
                }
            }
        }
    }

    /// Tukey kernel scaled from the residual distribution.
    ///
    /// `K² = 4 · e2_(m)` where `e2_(m)` is the `m`-th smallest squared
    /// residual, `m = ⌊n · p⌋ − 1` clamped to `[3, n − 1]`; `K²` is at least
    /// [`MIN_TUKEY_K2`].
    pub fn tukey_from_residuals(e2: &[Real], inlier_probability: Real) -> Self {
        if e2.is_empty() {
            return RobustKernel::Tukey { k2: MIN_TUKEY_K2 };
        }
        let mut sorted = e2.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let m = inlier_index(sorted.len(), inlier_probability);
        let k2 = (sorted[m] * 4.0).max(MIN_TUKEY_K2);
        RobustKernel::Tukey { k2 }
    }
}

/// Index of the residual that sets the Tukey scale.
pub fn inlier_index(n: usize, inlier_probability: Real) -> usize {
    let m = ((n as Real * inlier_probability) as usize).saturating_sub(1);
    m.max(3).min(n.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Real, b: Real, tol: Real) {
        assert!(
            (a - b).abs() <= tol,
            "values differ: {} vs {} (tol={})",
            a,
            b,
            tol
        );
    }

    #[test]
    fn plain_kernel_is_l2() {
        let (rho, w) = RobustKernel::None.rho_and_weight(2.5);
        approx_eq(rho, 2.5, 1e-12);
        approx_eq(w, 1.0, 1e-12);
    }

    #[test]
    fn tukey_is_quadratic_near_zero() {
        let kernel = RobustKernel::Tukey { k2: 100.0 };
        let (rho, w) = kernel.rho_and_weight(0.01);
        // rho ≈ e2 / 2 for e2 << K²
        approx_eq(rho, 0.005, 1e-6);
        approx_eq(w, 1.0, 1e-3);
    }

    #[test]
    fn tukey_saturates_outside_support() {
        let kernel = RobustKernel::Tukey { k2: 16.0 };
        let (rho, w) = kernel.rho_and_weight(1000.0);
        approx_eq(rho, 16.0 / 6.0, 1e-12);
        approx_eq(w, 0.0, 0.0);
        let (rho_edge, w_edge) = kernel.rho_and_weight(16.0);
        approx_eq(rho_edge, 16.0 / 6.0, 1e-12);
        approx_eq(w_edge, 0.0, 1e-12);
    }

    #[test]
    fn tukey_weight_decreases_with_residual() {
        let kernel = RobustKernel::Tukey { k2: 50.0 };
        let (_, w_small) = kernel.rho_and_weight(1.0);
        let (_, w_large) = kernel.rho_and_weight(40.0);
        assert!(w_small > w_large);
    }

    #[test]
    fn scale_follows_median_residual() {
        let e2: Vec<Real> = (0..20).map(|i| i as Real * 10.0).collect();
        // m = 20 * 0.5 - 1 = 9 → e2 = 90 → K² = 360
        match RobustKernel::tukey_from_residuals(&e2, 0.5) {
            RobustKernel::Tukey { k2 } => approx_eq(k2, 360.0, 1e-12),
            other => panic!("unexpected kernel {other:?}"),
        }
    }

    #[test]
    fn scale_has_floor() {
        let e2 = vec![0.0; 12];
        assert_eq!(
            RobustKernel::tukey_from_residuals(&e2, 0.5),
            RobustKernel::Tukey { k2: MIN_TUKEY_K2 }
        );
    }

    #[test]
    fn inlier_index_is_clamped() {
        assert_eq!(inlier_index(4, 0.5), 3);
        assert_eq!(inlier_index(40, 0.5), 19);
        assert_eq!(inlier_index(2, 0.5), 1);
    }
}
