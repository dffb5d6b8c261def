//! First-order low-pass filtering of poses between frames.

use armarker_core::{pose_from_iso, pose_to_iso, Iso3, Mat34, Real};
use nalgebra::Translation3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Expected update rate in Hz.
    pub sample_rate: Real,
    /// Cutoff frequency in Hz.
    pub cutoff_freq: Real,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sample_rate: 30.0,
            cutoff_freq: 15.0,
        }
    }
}

impl FilterConfig {
    /// Blend factor `dt / (RC + dt)`.
    pub fn alpha(&self) -> Real {
        let dt = 1.0 / self.sample_rate;
        let rc = 1.0 / (2.0 * std::f64::consts::PI * self.cutoff_freq);
        dt / (rc + dt)
    }
}

/// Rotation is slerped and translation lerped towards each new pose.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFilter {
    alpha: Real,
    state: Option<Iso3>,
}

impl PoseFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            alpha: config.alpha().clamp(0.0, 1.0),
            state: None,
        }
    }

    /// Forget history; the next pose passes through unchanged.
    pub fn reset(&mut self) {
        self.state = None;
    }

    pub fn apply(&mut self, pose: &Mat34) -> Mat34 {
        let target = pose_to_iso(pose);
        let next = match self.state {
            None => target,
            Some(prev) => {
                let rotation = prev
                    .rotation
                    .try_slerp(&target.rotation, self.alpha, 1e-9)
                    .unwrap_or(target.rotation);
                let t = prev.translation.vector.lerp(&target.translation.vector, self.alpha);
                Iso3::from_parts(Translation3::from(t), rotation)
            }
        };
        self.state = Some(next);
        pose_from_iso(&next)
    }
}
