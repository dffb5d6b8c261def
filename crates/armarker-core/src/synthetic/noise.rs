//! Deterministic noise helpers for synthetic datasets.
//!
//! The functions here avoid `thread_rng` and do not depend on the internal
//! algorithm of any RNG crate. This keeps synthetic datasets stable across
//! versions and platforms.

use crate::{Pt2, Real, Vec2};

/// Deterministic uniform pixel noise in `[-max_abs_px, +max_abs_px]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UniformPixelNoise {
    /// Base seed controlling the pseudo-random sequence.
    pub seed: u64,
    /// Maximum absolute per-axis noise (pixels).
    pub max_abs_px: Real,
}

impl UniformPixelNoise {
    /// Sample a deterministic 2D noise vector for a `(stream, index)` key.
    #[inline]
    pub fn sample(&self, stream: usize, index: usize) -> Vec2 {
        let max_abs = self.max_abs_px.abs();
        if max_abs == 0.0 {
            return Vec2::zeros();
        }
        let (u, v) = unit_pair(self.seed, stream, index);
        Vec2::new((u - 0.5) * 2.0 * max_abs, (v - 0.5) * 2.0 * max_abs)
    }

    #[inline]
    pub fn apply(&self, stream: usize, index: usize, uv: Pt2) -> Pt2 {
        uv + self.sample(stream, index)
    }
}

/// Deterministic zero-mean Gaussian pixel noise (Box-Muller).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GaussianPixelNoise {
    pub seed: u64,
    /// Per-axis standard deviation (pixels).
    pub sigma_px: Real,
}

impl GaussianPixelNoise {
    #[inline]
    pub fn sample(&self, stream: usize, index: usize) -> Vec2 {
        if self.sigma_px == 0.0 {
            return Vec2::zeros();
        }
        let (u, v) = unit_pair(self.seed, stream, index);
        // Keep u1 away from zero so ln() stays finite.
        let u1 = u.max(1e-300);
        let r = (-2.0 * u1.ln()).sqrt() * self.sigma_px;
        let theta = 2.0 * std::f64::consts::PI * v;
        Vec2::new(r * theta.cos(), r * theta.sin())
    }

    #[inline]
    pub fn apply(&self, stream: usize, index: usize, uv: Pt2) -> Pt2 {
        uv + self.sample(stream, index)
    }
}

#[inline]
fn unit_pair(seed: u64, stream: usize, index: usize) -> (Real, Real) {
    let key = mix_key(seed, stream, index);
    let u = u64_to_unit_f64(splitmix64(key));
    let v = u64_to_unit_f64(splitmix64(key ^ 0x94D0_49BB_1331_11EB));
    (u, v)
}

#[inline]
fn mix_key(seed: u64, stream: usize, index: usize) -> u64 {
    // SplitMix64 stream selection via a stable integer mix.
    seed ^ (stream as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (index as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[inline]
fn u64_to_unit_f64(x: u64) -> Real {
    // Top 53 bits to a double in [0, 1).
    let mantissa = x >> 11;
    (mantissa as Real) * (1.0 / ((1u64 << 53) as Real))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_pixel_noise_is_deterministic() {
        let noise = UniformPixelNoise {
            seed: 123,
            max_abs_px: 0.5,
        };

        let a = noise.sample(0, 0);
        let b = noise.sample(0, 0);
        let c = noise.sample(0, 1);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.x.abs() <= 0.5);
        assert!(a.y.abs() <= 0.5);
    }

    #[test]
    fn gaussian_noise_has_expected_spread() {
        let noise = GaussianPixelNoise {
            seed: 7,
            sigma_px: 0.5,
        };
        let n = 4000;
        let (mut sum, mut sum_sq) = (0.0, 0.0);
        for i in 0..n {
            let s = noise.sample(1, i);
            sum += s.x + s.y;
            sum_sq += s.x * s.x + s.y * s.y;
        }
        let count = (2 * n) as Real;
        let mean = sum / count;
        let sigma = (sum_sq / count - mean * mean).sqrt();
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((sigma - 0.5).abs() < 0.05, "sigma {sigma}");
    }

    #[test]
    fn zero_sigma_is_noise_free() {
        let noise = GaussianPixelNoise::default();
        assert_eq!(noise.apply(0, 3, Pt2::new(1.0, 2.0)), Pt2::new(1.0, 2.0));
    }
}
