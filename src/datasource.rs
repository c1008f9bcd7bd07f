//! # Dataset loading
//!
//! Thin JSON glue around the three input datasets named by `SystemConfig`:
//! camera detections (keyed by `camera_key`), the shared LiDAR point-cloud
//! database, and the pose replay. Not part of the core — same status as
//! `config.rs` — but kept in the teacher's `serde_json::from_reader` idiom.

use crate::error::CoreError;
use crate::model::{CloudPoint, Pose, StampedCloudPoints, StampedDetection};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn load_camera_dataset(
    path: &Path,
) -> Result<HashMap<String, Vec<StampedDetection>>, CoreError> {
    read_json(path)
}

pub fn load_pose_dataset(path: &Path) -> Result<Vec<Pose>, CoreError> {
    let raw: Vec<RawPose> = read_json(path)?;
    Ok(raw.into_iter().map(Pose::from).collect())
}

pub fn load_lidar_dataset(path: &Path) -> Result<Vec<StampedCloudPoints>, CoreError> {
    let raw: Vec<RawCloudRecord> = read_json(path)?;
    Ok(raw.into_iter().map(StampedCloudPoints::from).collect())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, CoreError> {
    let file = File::open(path).map_err(|source| CoreError::DatasetRead {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|source| CoreError::DatasetParse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Deserialize)]
struct RawPose {
    time: u64,
    x: f64,
    y: f64,
    yaw: f64,
}

impl From<RawPose> for Pose {
    fn from(raw: RawPose) -> Self {
        Pose {
            time: raw.time,
            x: raw.x,
            y: raw.y,
            yaw_deg: raw.yaw,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCloudRecord {
    id: String,
    time: u64,
    #[serde(rename = "cloudPoints")]
    cloud_points: Vec<[f64; 2]>,
}

impl From<RawCloudRecord> for StampedCloudPoints {
    fn from(raw: RawCloudRecord) -> Self {
        StampedCloudPoints {
            id: raw.id,
            time: raw.time,
            points: raw
                .cloud_points
                .into_iter()
                .map(|[x, y]| CloudPoint { x, y })
                .collect(),
        }
    }
}
