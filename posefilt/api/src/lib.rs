mod source;
pub use source::{FrameSink, PoseSource};

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// A single named body landmark as produced by the pose model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    pub score: f64,
    #[serde(default)]
    pub name: String,
}

impl Keypoint {
    pub fn new(name: impl Into<String>, x: f64, y: f64, score: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            score,
            name: name.into(),
        }
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    /// Position as a 3D vector; 2D keypoints sit on the z = 0 plane.
    pub fn position(&self) -> DVec3 {
        DVec3::new(self.x, self.y, self.z.unwrap_or(0.0))
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self {
            keypoints,
            score: None,
        }
    }
}

/// One detector output: every pose seen at `timestamp` (milliseconds, caller clock).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub timestamp: f64,
    #[serde(default)]
    pub poses: Vec<Pose>,
}

impl PoseFrame {
    pub fn keypoint_count(&self) -> usize {
        self.poses.iter().map(|p| p.keypoints.len()).sum()
    }
}
