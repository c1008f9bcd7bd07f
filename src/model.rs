//! # Core Data Model
//!
//! The plain-data types shared by every operator: ticks, detections, point
//! clouds, poses, tracked objects, and the landmarks Fusion builds out of
//! them. Nothing in this module talks to the bus; it is pure domain state.

use serde::{Deserialize, Serialize};

/// One discrete clock step, starting at 1.
pub type Tick = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub id: String,
    pub description: String,
}

impl DetectedObject {
    pub fn is_error(&self) -> bool {
        self.id == "ERROR"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedDetection {
    pub time: Tick,
    #[serde(rename = "detectedObjects")]
    pub objects: Vec<DetectedObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloudPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedCloudPoints {
    pub id: String,
    pub time: Tick,
    pub points: Vec<CloudPoint>,
}

impl StampedCloudPoints {
    pub fn is_error(&self) -> bool {
        self.id == "ERROR"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub id: String,
    pub description: String,
    pub time: Tick,
    pub coords: Vec<CloudPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub time: Tick,
    pub x: f64,
    pub y: f64,
    pub yaw_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: String,
    pub description: String,
    pub coords: Vec<CloudPoint>,
}

/// Element-wise average of two coordinate sequences. When the lengths
/// differ the averaged prefix covers `min(|old|, |new|)` and the remainder
/// of the longer sequence is appended verbatim, in order.
pub fn average_coords(old: &[CloudPoint], new: &[CloudPoint]) -> Vec<CloudPoint> {
    let common = old.len().min(new.len());
    let mut merged = Vec::with_capacity(old.len().max(new.len()));
    for i in 0..common {
        merged.push(CloudPoint {
            x: (old[i].x + new[i].x) / 2.0,
            y: (old[i].y + new[i].y) / 2.0,
        });
    }
    if old.len() > common {
        merged.extend_from_slice(&old[common..]);
    } else if new.len() > common {
        merged.extend_from_slice(&new[common..]);
    }
    merged
}

/// Rotate `(x, y)` by `yaw_deg` degrees about the origin, then translate by
/// the pose's `(x, y)`.
pub fn transform_to_world(pose: &Pose, local: CloudPoint) -> CloudPoint {
    let yaw = pose.yaw_deg.to_radians();
    let (sin_yaw, cos_yaw) = yaw.sin_cos();
    CloudPoint {
        x: cos_yaw * local.x - sin_yaw * local.y + pose.x,
        y: sin_yaw * local.x + cos_yaw * local.y + pose.y,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Up,
    Down,
    Error,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_equal_length_is_componentwise_mean() {
        let old = vec![CloudPoint { x: 1.0, y: 1.0 }];
        let new = vec![CloudPoint { x: 3.0, y: 3.0 }];
        let merged = average_coords(&old, &new);
        assert_eq!(merged, vec![CloudPoint { x: 2.0, y: 2.0 }]);
    }

    #[test]
    fn average_unequal_length_appends_longer_tail() {
        let old = vec![
            CloudPoint { x: 0.0, y: 0.0 },
            CloudPoint { x: 10.0, y: 10.0 },
        ];
        let new = vec![CloudPoint { x: 2.0, y: 2.0 }];
        let merged = average_coords(&old, &new);
        assert_eq!(
            merged,
            vec![CloudPoint { x: 1.0, y: 1.0 }, CloudPoint { x: 10.0, y: 10.0 }]
        );
    }

    #[test]
    fn transform_identity_yaw_is_pure_translation() {
        let pose = Pose {
            time: 1,
            x: 5.0,
            y: -2.0,
            yaw_deg: 0.0,
        };
        let world = transform_to_world(&pose, CloudPoint { x: 1.0, y: 1.0 });
        assert!((world.x - 6.0).abs() < 1e-9);
        assert!((world.y - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn transform_90_degrees_rotates_then_translates() {
        let pose = Pose {
            time: 2,
            x: 0.0,
            y: 0.0,
            yaw_deg: 90.0,
        };
        let world = transform_to_world(&pose, CloudPoint { x: 1.0, y: 0.0 });
        assert!((world.x - 0.0).abs() < 1e-9);
        assert!((world.y - 1.0).abs() < 1e-9);

        let world2 = transform_to_world(&pose, CloudPoint { x: 0.0, y: 1.0 });
        assert!((world2.x - (-1.0)).abs() < 1e-9);
        assert!((world2.y - 0.0).abs() < 1e-9);
    }
}
