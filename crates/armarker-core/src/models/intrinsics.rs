use nalgebra::{Matrix3, Matrix3x4, RealField, Vector2};
use serde::{Deserialize, Serialize};

/// Intrinsics that map normalized image coordinates to pixel coordinates.
pub trait IntrinsicsModel<S: RealField + Copy> {
    /// Convert normalized coordinates (`x/z`, `y/z`) into pixel coordinates.
    fn normalized_to_pixel(&self, n: &Vector2<S>) -> Vector2<S>;
    /// Convert pixel coordinates into normalized coordinates.
    fn pixel_to_normalized(&self, pixel: &Vector2<S>) -> Vector2<S>;
}

/// Standard pinhole intrinsics with optional skew.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FxFyCxCySkew<S: RealField + Copy> {
    /// Focal length in pixels along X.
    pub fx: S,
    /// Focal length in pixels along Y.
    pub fy: S,
    /// Principal point X coordinate in pixels.
    pub cx: S,
    /// Principal point Y coordinate in pixels.
    pub cy: S,
    /// Skew term (typically 0).
    pub skew: S,
}

impl<S: RealField + Copy> FxFyCxCySkew<S> {
    /// Return the 3x3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Matrix3<S> {
        Matrix3::new(
            self.fx,
            self.skew,
            self.cx,
            S::zero(),
            self.fy,
            self.cy,
            S::zero(),
            S::zero(),
            S::one(),
        )
    }

    /// Return the 3x4 projection matrix `K [I | 0]`.
    pub fn projection_matrix(&self) -> Matrix3x4<S> {
        let mut p = Matrix3x4::zeros();
        p.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.k_matrix());
        p
    }
}

impl<S: RealField + Copy> IntrinsicsModel<S> for FxFyCxCySkew<S> {
    fn normalized_to_pixel(&self, n: &Vector2<S>) -> Vector2<S> {
        let u = self.fx * n.x + self.skew * n.y + self.cx;
        let v = self.fy * n.y + self.cy;
        Vector2::new(u, v)
    }

    fn pixel_to_normalized(&self, pixel: &Vector2<S>) -> Vector2<S> {
        let ny = (pixel.y - self.cy) / self.fy;
        let nx = (pixel.x - self.cx - self.skew * ny) / self.fx;
        Vector2::new(nx, ny)
    }
}
