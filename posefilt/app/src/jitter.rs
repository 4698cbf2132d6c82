use common::PoseFrame;
use glam::DVec3;
use std::collections::HashMap;

/// Mean frame-to-frame keypoint displacement of the raw and the filtered stream.
#[derive(Debug, Default)]
pub struct JitterMeter {
    raw_prev: HashMap<(usize, usize), DVec3>,
    filtered_prev: HashMap<(usize, usize), DVec3>,
    raw_total: f64,
    filtered_total: f64,
    samples: u64,
}

impl JitterMeter {
    pub fn observe(&mut self, raw: &PoseFrame, filtered: &PoseFrame) {
        for (pose_index, (raw_pose, filtered_pose)) in
            raw.poses.iter().zip(&filtered.poses).enumerate()
        {
            for (keypoint_index, (r, f)) in raw_pose
                .keypoints
                .iter()
                .zip(&filtered_pose.keypoints)
                .enumerate()
            {
                if !r.is_finite() || !f.is_finite() {
                    continue;
                }
                let key = (pose_index, keypoint_index);
                let (r, f) = (r.position(), f.position());
                let prev = (self.raw_prev.insert(key, r), self.filtered_prev.insert(key, f));
                if let (Some(rp), Some(fp)) = prev {
                    self.raw_total += r.distance(rp);
                    self.filtered_total += f.distance(fp);
                    self.samples += 1;
                }
            }
        }
    }

    pub fn raw_mean(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.raw_total / self.samples as f64
        }
    }

    pub fn filtered_mean(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.filtered_total / self.samples as f64
        }
    }

    /// Fraction of raw frame-to-frame motion removed by filtering.
    pub fn reduction(&self) -> f64 {
        if self.raw_total <= 0.0 {
            0.0
        } else {
            1.0 - self.filtered_total / self.raw_total
        }
    }
}
