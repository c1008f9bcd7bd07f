//! # Configuration
//!
//! `serde`-derived structs loaded via `serde_json::from_reader`, the same
//! pattern the teacher's `runtime::config` module uses for its
//! `SystemConfig`/`InstanceConfig` — a `#[derive(Deserialize)]` tree with
//! `#[serde(default = "fn")]` for optional numeric fields.

use crate::error::CoreError;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfiguration {
    pub id: String,
    pub frequency: u64,
    pub camera_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CamerasConfig {
    pub camera_datas_path: PathBuf,
    #[serde(rename = "CamerasConfigurations")]
    pub cameras_configurations: Vec<CameraConfiguration>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LidarConfiguration {
    pub id: String,
    pub frequency: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiDarWorkersConfig {
    pub lidars_data_path: PathBuf,
    #[serde(rename = "LidarConfigurations")]
    pub lidar_configurations: Vec<LidarConfiguration>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    #[serde(rename = "TickTime")]
    pub tick_time_secs: u64,
    #[serde(rename = "Duration")]
    pub duration: u64,
    #[serde(rename = "poseJsonFile")]
    pub pose_json_file: PathBuf,
    #[serde(rename = "Cameras")]
    pub cameras: CamerasConfig,
    #[serde(rename = "LiDarWorkers")]
    pub lidar_workers: LiDarWorkersConfig,
}

impl SystemConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let file = File::open(path).map_err(|source| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|source| CoreError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Number of sensor operators (cameras + LiDAR workers + pose) — the
    /// count `ClockState` tracks as `active_sensor_count`. Callers add one
    /// more for Fusion when sizing the readiness barrier the Clock's timer
    /// waits on before emitting tick 1.
    pub fn sensor_count(&self) -> usize {
        self.cameras.cameras_configurations.len() + self.lidar_workers.lidar_configurations.len() + 1
    }
}
