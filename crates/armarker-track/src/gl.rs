//! OpenGL matrix conversion.

use armarker_core::{Mat34, Real};

/// Column-major right-handed OpenGL model-view matrix for a camera-frame
/// pose.
///
/// The camera frame looks down `+Z` with `+Y` down; OpenGL looks down `−Z`
/// with `+Y` up, so the second and third rows are negated. The translation
/// is multiplied by `scale` unless `scale` is zero.
pub fn camera_view_rh(pose: &Mat34, scale: Real) -> [Real; 16] {
    let mut m = [0.0; 16];
    for c in 0..4 {
        m[c * 4] = pose[(0, c)];
        m[1 + c * 4] = -pose[(1, c)];
        m[2 + c * 4] = -pose[(2, c)];
    }
    m[15] = 1.0;
    if scale != 0.0 {
        m[12] *= scale;
        m[13] *= scale;
        m[14] *= scale;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use armarker_core::synthetic::marker;

    #[test]
    fn identity_flips_y_and_z() {
        let mut pose = Mat34::identity();
        pose[(0, 3)] = 1.0;
        pose[(1, 3)] = 2.0;
        pose[(2, 3)] = 3.0;
        let m = camera_view_rh(&pose, 0.0);
        assert_eq!(
            m,
            [
                1.0, 0.0, 0.0, 0.0, //
                0.0, -1.0, 0.0, 0.0, //
                0.0, 0.0, -1.0, 0.0, //
                1.0, -2.0, -3.0, 1.0,
            ]
        );
    }

    #[test]
    fn translation_is_scaled() {
        let pose = marker::pose_from_euler((0.1, 0.2, 0.3), (10.0, 20.0, 300.0));
        let m = camera_view_rh(&pose, 0.001);
        assert!((m[12] - 0.01).abs() < 1e-12);
        assert!((m[13] + 0.02).abs() < 1e-12);
        assert!((m[14] + 0.3).abs() < 1e-12);
        // Rotation untouched by the scale.
        assert_eq!(m[0], pose[(0, 0)]);
        assert_eq!(m[5], -pose[(1, 1)]);
    }
}
