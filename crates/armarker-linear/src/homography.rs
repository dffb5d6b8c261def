use armarker_core::{Mat3, Pt2};
use nalgebra::DMatrix;

use crate::{math::normalize_points_2d, LinearError};

/// Estimate H such that x' ~ H x using the normalized DLT.
///
/// Needs at least 4 correspondences. The result is scaled so that
/// `H[(2, 2)] = 1` whenever that entry is not vanishing.
pub fn dlt_homography(world: &[Pt2], image: &[Pt2]) -> Result<Mat3, LinearError> {
    let n = world.len();
    if image.len() != n {
        return Err(LinearError::LengthMismatch {
            world: n,
            image: image.len(),
        });
    }
    if n < 4 {
        return Err(LinearError::NotEnoughPoints { needed: 4, got: n });
    }

    let (world_n, t_w) = normalize_points_2d(world).ok_or(LinearError::Degenerate)?;
    let (image_n, t_i) = normalize_points_2d(image).ok_or(LinearError::Degenerate)?;

    let mut a = DMatrix::<f64>::zeros(2 * n, 9);

    for (i, (pw, pi)) in world_n.iter().zip(image_n.iter()).enumerate() {
        let (x, y) = (pw.x, pw.y);
        let (u, v) = (pi.x, pi.y);

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    // With exactly 4 points A is 8×9; pad so the SVD exposes the null space.
    if a.nrows() < 9 {
        let rows = a.nrows();
        a = a.insert_rows(rows, 9 - rows, 0.0);
    }

    // Solve A h = 0 via SVD (smallest singular value)
    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(LinearError::SvdFailed)?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |acc, (i, &s)| if s < acc.1 { (i, s) } else { acc });
    let h = v_t.row(min_idx);

    let mut h_norm = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h_norm[(r, c)] = h[3 * r + c];
        }
    }

    let t_i_inv = t_i.try_inverse().ok_or(LinearError::Degenerate)?;
    let mut h_mat = t_i_inv * h_norm * t_w;

    // normalise such that H[2,2] = 1
    let scale = h_mat[(2, 2)];
    if scale.abs() > f64::EPSILON {
        h_mat /= scale;
    }

    Ok(h_mat)
}
