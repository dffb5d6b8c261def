//! Synthetic square-marker geometry.

use crate::{pose_from_iso, transform_point, CameraProjection, Iso3, Mat34, Pt2, Pt3, Real};
use anyhow::Result;
use nalgebra::{Rotation3, Translation3};

pub use crate::square_corners;

/// Rigid transform from roll/pitch/yaw (radians) and a translation.
pub fn pose_from_euler(angles: (Real, Real, Real), t: (Real, Real, Real)) -> Mat34 {
    let rot = Rotation3::from_euler_angles(angles.0, angles.1, angles.2);
    pose_from_iso(&Iso3::from_parts(
        Translation3::new(t.0, t.1, t.2),
        rot.into(),
    ))
}

/// Marker-to-composite transforms for an `nx × ny` planar grid of markers.
///
/// Markers are ordered row-major (Y major) and centred on the composite
/// origin.
pub fn grid_layout(nx: usize, ny: usize, spacing: Real) -> Vec<Mat34> {
    let ox = (nx.saturating_sub(1)) as Real * spacing * 0.5;
    let oy = (ny.saturating_sub(1)) as Real * spacing * 0.5;
    let mut out = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let x = i as Real * spacing - ox;
            let y = oy - j as Real * spacing;
            out.push(pose_from_euler((0.0, 0.0, 0.0), (x, y, 0.0)));
        }
    }
    out
}

/// Project world points through `pose` (world → camera), requiring every
/// point to be in front of the camera.
pub fn project_points(camera: &CameraProjection, pose: &Mat34, world: &[Pt3]) -> Result<Vec<Pt2>> {
    let mut out = Vec::with_capacity(world.len());
    for (idx, pw) in world.iter().enumerate() {
        let pc = transform_point(pose, pw);
        let Some(uv) = camera.project(&pc.coords) else {
            anyhow::bail!("point {idx} not projectable (z={:.6})", pc.z);
        };
        out.push(uv);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{quad_area, FxFyCxCySkew};

    #[test]
    fn corners_span_width() {
        let c = square_corners(2.0);
        assert_eq!(c[0], Pt3::new(-1.0, 1.0, 0.0));
        assert_eq!(c[2], Pt3::new(1.0, -1.0, 0.0));
    }

    #[test]
    fn grid_is_centred() {
        let layout = grid_layout(3, 2, 10.0);
        assert_eq!(layout.len(), 6);
        let sum: Real = layout.iter().map(|m| m[(0, 3)] + m[(1, 3)]).sum();
        assert!(sum.abs() < 1e-12);
        assert_eq!(layout[0][(0, 3)], -10.0);
        assert_eq!(layout[0][(1, 3)], 5.0);
    }

    #[test]
    fn projected_square_has_positive_area() {
        let k = FxFyCxCySkew {
            fx: 800.0,
            fy: 800.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        };
        let cam = CameraProjection::from_intrinsics(&k);
        let pose = pose_from_euler((0.0, 0.0, 0.0), (0.0, 0.0, 400.0));
        let px = project_points(&cam, &pose, &square_corners(80.0)).unwrap();
        let quad = [px[0], px[1], px[2], px[3]];
        // 80 mm at 400 mm with f = 800 px spans 160 px.
        assert!((quad_area(&quad) - 160.0 * 160.0).abs() < 1e-6);
    }

    #[test]
    fn projection_fails_behind_camera() {
        let cam = CameraProjection::from_intrinsics(&FxFyCxCySkew {
            fx: 500.0,
            fy: 500.0,
            cx: 0.0,
            cy: 0.0,
            skew: 0.0,
        });
        let pose = pose_from_euler((0.0, 0.0, 0.0), (0.0, 0.0, -5.0));
        assert!(project_points(&cam, &pose, &square_corners(1.0)).is_err());
    }
}
