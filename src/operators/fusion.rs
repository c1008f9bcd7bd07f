//! # Fusion operator
//!
//! The sink: merges every LiDAR worker's tracked objects into world-frame
//! landmarks using the latest pose, and is the one participant that writes
//! output — a normal summary on a clean `Terminated`, a crash snapshot on
//! `Crashed`.

use super::{is_final_broadcast, CLOCK_ID};
use crate::bus::MessageBus;
use crate::messages::{BroadcastKind, EventKind, EventResult, Message, MessageType};
use crate::model::{
    average_coords, transform_to_world, Landmark, Pose as PoseSample, StampedDetection, Tick,
    TrackedObject,
};
use crate::participant::{ControlFlow, Participant};
use crate::stats::Statistics;
use std::collections::HashMap;
use std::sync::Arc;

/// What Fusion hands back to the runtime when the system shuts down —
/// either a clean summary or a crash snapshot, decided by which broadcast
/// triggered termination.
#[derive(Debug, Clone)]
pub enum FusionReport {
    Summary {
        system_runtime: Tick,
        num_detected_objects: u64,
        num_tracked_objects: u64,
        landmarks: Vec<Landmark>,
    },
    Crash {
        error: String,
        faulty_sensor: String,
        last_cameras_frame: HashMap<String, StampedDetection>,
        last_lidar_frame: HashMap<String, Vec<TrackedObject>>,
        poses: Vec<PoseSample>,
        system_runtime: Tick,
        num_detected_objects: u64,
        num_tracked_objects: u64,
        landmarks: Vec<Landmark>,
    },
}

pub struct Fusion {
    id: String,
    landmarks: HashMap<String, Landmark>,
    pose_history: Vec<PoseSample>,
    poses_by_time: HashMap<Tick, PoseSample>,
    current_tick: Tick,
    last_camera_frame: HashMap<String, StampedDetection>,
    last_lidar_frame: HashMap<String, Vec<TrackedObject>>,
    stats: Arc<Statistics>,
    report: Option<FusionReport>,
}

impl Fusion {
    pub fn new(id: impl Into<String>, stats: Arc<Statistics>) -> Self {
        Fusion {
            id: id.into(),
            landmarks: HashMap::new(),
            pose_history: Vec::new(),
            poses_by_time: HashMap::new(),
            current_tick: 0,
            last_camera_frame: HashMap::new(),
            last_lidar_frame: HashMap::new(),
            stats,
            report: None,
        }
    }

    /// Consumes the operator and returns whatever report it assembled.
    /// `None` if the operator never observed a final broadcast.
    pub fn into_report(self) -> Option<FusionReport> {
        self.report
    }

    fn on_pose(&mut self, _time: Tick, pose: PoseSample) {
        self.pose_history.push(pose);
        self.poses_by_time.insert(pose.time, pose);
    }

    fn on_camera_frame(&mut self, detection: StampedDetection, sender: String) {
        self.last_camera_frame.insert(sender, detection);
    }

    /// Transforms every tracked object's local coordinates into the world
    /// frame using the pose sharing its exact `time`, then merges it into
    /// the running landmark set by id. An object with no matching pose is
    /// skipped entirely: no landmark created or refined, no counter bump.
    fn on_tracked_objects(&mut self, batch: Vec<TrackedObject>, sender: String) {
        self.last_lidar_frame.insert(sender, batch.clone());

        for object in batch {
            let pose = match self.poses_by_time.get(&object.time) {
                Some(p) => *p,
                None => continue,
            };

            let world_coords: Vec<_> = object
                .coords
                .iter()
                .map(|&local| transform_to_world(&pose, local))
                .collect();

            match self.landmarks.get_mut(&object.id) {
                Some(existing) => {
                    existing.coords = average_coords(&existing.coords, &world_coords);
                }
                None => {
                    self.stats.add_landmark();
                    self.landmarks.insert(
                        object.id.clone(),
                        Landmark {
                            id: object.id,
                            description: object.description,
                            coords: world_coords,
                        },
                    );
                }
            }
        }
    }

    fn landmarks_sorted(&self) -> Vec<Landmark> {
        let mut out: Vec<_> = self.landmarks.values().cloned().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    fn finish_clean(&mut self) {
        let landmarks = self.landmarks_sorted();
        log::info!(
            "clean shutdown at tick {}: {} landmarks",
            self.current_tick,
            landmarks.len()
        );
        self.report = Some(FusionReport::Summary {
            system_runtime: self.current_tick,
            num_detected_objects: self.stats.detected(),
            num_tracked_objects: self.stats.tracked(),
            landmarks,
        });
    }

    fn finish_crash(&mut self, error_maker: String, message: String) {
        log::error!("crash snapshot at tick {}: {error_maker}: {message}", self.current_tick);
        self.report = Some(FusionReport::Crash {
            error: message,
            faulty_sensor: error_maker,
            last_cameras_frame: self.last_camera_frame.clone(),
            last_lidar_frame: self.last_lidar_frame.clone(),
            poses: self.pose_history.clone(),
            system_runtime: self.current_tick,
            num_detected_objects: self.stats.detected(),
            num_tracked_objects: self.stats.tracked(),
            landmarks: self.landmarks_sorted(),
        });
    }
}

impl Participant for Fusion {
    fn id(&self) -> &str {
        &self.id
    }

    fn initialize(&mut self, bus: &MessageBus) {
        bus.subscribe_broadcast(MessageType::Tick, &self.id);
        bus.subscribe_broadcast(MessageType::Terminated, &self.id);
        bus.subscribe_broadcast(MessageType::Crashed, &self.id);
        bus.subscribe_event(MessageType::Pose, &self.id);
        bus.subscribe_event(MessageType::DetectObjectsForFusion, &self.id);
        bus.subscribe_event(MessageType::TrackedObjects, &self.id);
    }

    fn handle(&mut self, _bus: &MessageBus, msg: Message) -> ControlFlow {
        match msg {
            Message::Broadcast(BroadcastKind::Tick(t)) => {
                self.current_tick = t;
                ControlFlow::Continue
            }
            Message::Broadcast(BroadcastKind::Terminated { sender }) => {
                if is_final_broadcast(&sender) {
                    self.finish_clean();
                    ControlFlow::Terminate
                } else {
                    ControlFlow::Continue
                }
            }
            Message::Broadcast(BroadcastKind::Crashed {
                sender,
                error_maker,
                message,
            }) => {
                if is_final_broadcast(&sender) {
                    self.finish_crash(error_maker, message);
                    ControlFlow::Terminate
                } else {
                    ControlFlow::Continue
                }
            }
            Message::Event(EventKind::Pose { time, pose }, promise) => {
                self.on_pose(time, pose);
                promise.resolve(EventResult::Ok);
                ControlFlow::Continue
            }
            Message::Event(EventKind::DetectObjectsForFusion { detection, sender }, _promise) => {
                // The spec leaves this event's promise unresolved; it
                // exists only so Fusion always has a last-known camera
                // frame on hand for a crash snapshot.
                self.on_camera_frame(detection, sender);
                ControlFlow::Continue
            }
            Message::Event(EventKind::TrackedObjects { batch, sender }, promise) => {
                self.on_tracked_objects(batch, sender);
                promise.resolve(EventResult::Ok);
                ControlFlow::Continue
            }
            Message::Event(EventKind::DetectObjects(_), _) => ControlFlow::Continue,
        }
    }
}
