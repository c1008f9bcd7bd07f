//! # Output serialization
//!
//! Turns a [`crate::operators::fusion::FusionReport`] into the two JSON
//! shapes the external interface names: `output_file.json` on a clean run,
//! `error_output.json` on a crash.

use crate::model::{Landmark, Pose, StampedDetection, Tick, TrackedObject};
use crate::operators::fusion::FusionReport;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
struct SummaryOutput {
    #[serde(rename = "systemRuntime")]
    system_runtime: Tick,
    #[serde(rename = "numDetectedObjects")]
    num_detected_objects: u64,
    #[serde(rename = "numTrackedObjects")]
    num_tracked_objects: u64,
    #[serde(rename = "numLandmarks")]
    num_landmarks: u64,
    landmarks: Vec<Landmark>,
}

#[derive(Debug, Serialize)]
struct CrashOutput {
    error: String,
    #[serde(rename = "faultySensor")]
    faulty_sensor: String,
    #[serde(rename = "lastCamerasFrame")]
    last_cameras_frame: HashMap<String, StampedDetection>,
    #[serde(rename = "lastLiDarWorkerTrackersFrame")]
    last_lidar_worker_trackers_frame: HashMap<String, Vec<TrackedObject>>,
    poses: Vec<Pose>,
    #[serde(rename = "systemRuntime")]
    system_runtime: Tick,
    #[serde(rename = "numDetectedObjects")]
    num_detected_objects: u64,
    #[serde(rename = "numTrackedObjects")]
    num_tracked_objects: u64,
    #[serde(rename = "numLandmarks")]
    num_landmarks: u64,
    landmarks: Vec<Landmark>,
}

/// Writes the appropriate output file into `dir` and returns its path.
pub fn write_report(dir: &Path, report: &FusionReport) -> std::io::Result<std::path::PathBuf> {
    match report {
        FusionReport::Summary {
            system_runtime,
            num_detected_objects,
            num_tracked_objects,
            landmarks,
        } => {
            let out = SummaryOutput {
                system_runtime: *system_runtime,
                num_detected_objects: *num_detected_objects,
                num_tracked_objects: *num_tracked_objects,
                num_landmarks: landmarks.len() as u64,
                landmarks: landmarks.clone(),
            };
            let path = dir.join("output_file.json");
            write_json(&path, &out)?;
            Ok(path)
        }
        FusionReport::Crash {
            error,
            faulty_sensor,
            last_cameras_frame,
            last_lidar_frame,
            poses,
            system_runtime,
            num_detected_objects,
            num_tracked_objects,
            landmarks,
        } => {
            let out = CrashOutput {
                error: error.clone(),
                faulty_sensor: faulty_sensor.clone(),
                last_cameras_frame: last_cameras_frame.clone(),
                last_lidar_worker_trackers_frame: last_lidar_frame.clone(),
                poses: poses.clone(),
                system_runtime: *system_runtime,
                num_detected_objects: *num_detected_objects,
                num_tracked_objects: *num_tracked_objects,
                num_landmarks: landmarks.len() as u64,
                landmarks: landmarks.clone(),
            };
            let path = dir.join("error_output.json");
            write_json(&path, &out)?;
            Ok(path)
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CloudPoint;

    #[test]
    fn writes_summary_output_with_computed_landmark_count() {
        let dir = tempfile::tempdir().unwrap();
        let report = FusionReport::Summary {
            system_runtime: 5,
            num_detected_objects: 2,
            num_tracked_objects: 2,
            landmarks: vec![Landmark {
                id: "A".into(),
                description: "tree".into(),
                coords: vec![CloudPoint { x: 1.0, y: 1.0 }],
            }],
        };

        let path = write_report(dir.path(), &report).unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("\"numLandmarks\": 1"));
        assert!(written.contains("\"systemRuntime\": 5"));
    }

    #[test]
    fn writes_crash_output_with_faulty_sensor() {
        let dir = tempfile::tempdir().unwrap();
        let report = FusionReport::Crash {
            error: "cam fault".into(),
            faulty_sensor: "Camera1".into(),
            last_cameras_frame: HashMap::new(),
            last_lidar_frame: HashMap::new(),
            poses: vec![],
            system_runtime: 2,
            num_detected_objects: 1,
            num_tracked_objects: 0,
            landmarks: vec![],
        };

        let path = write_report(dir.path(), &report).unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("\"faultySensor\": \"Camera1\""));
        assert!(path.ends_with("error_output.json"));
    }
}
