//! # LiDAR operator
//!
//! Matches camera detections, once their availability tick is reached,
//! against a shared read-only point-cloud database indexed by `(id,
//! time)`, producing `TrackedObject`s.

use super::is_final_broadcast;
use crate::bus::MessageBus;
use crate::messages::{BroadcastKind, EventKind, Message, MessageType};
use crate::model::{Status, StampedCloudPoints, StampedDetection, Tick, TrackedObject};
use crate::participant::{ControlFlow, Participant};
use crate::stats::Statistics;
use std::sync::Arc;

pub struct Lidar {
    id: String,
    frequency: Tick,
    db: Arc<Vec<StampedCloudPoints>>,
    max_db_time: Tick,
    status: Status,
    current_tick: Tick,
    pending: Vec<StampedDetection>,
    stats: Arc<Statistics>,
}

impl Lidar {
    pub fn new(
        id: impl Into<String>,
        frequency: Tick,
        mut db: Vec<StampedCloudPoints>,
        stats: Arc<Statistics>,
    ) -> Self {
        db.sort_by_key(|r| r.time);
        let max_db_time = db.iter().map(|r| r.time).max().unwrap_or(0);
        Lidar {
            id: id.into(),
            frequency,
            db: Arc::new(db),
            max_db_time,
            status: Status::Up,
            current_tick: 0,
            pending: Vec::new(),
            stats,
        }
    }

    fn on_tick(&mut self, bus: &MessageBus, t: Tick) -> ControlFlow {
        self.current_tick = t;
        if self.status.is_terminal() {
            return ControlFlow::Continue;
        }

        if t > self.max_db_time {
            self.status = Status::Down;
            log::info!("{}: past last database tick ({}), going DOWN", self.id, self.max_db_time);
            bus.send_broadcast(BroadcastKind::Terminated {
                sender: self.id.clone(),
            });
            return ControlFlow::Continue;
        }

        let freq = self.frequency;
        let (ready, still_pending): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|s| s.time + freq <= t);
        self.pending = still_pending;

        for detection in ready {
            self.process(bus, detection);
            if self.status.is_terminal() {
                break;
            }
        }

        ControlFlow::Continue
    }

    fn on_detect(&mut self, bus: &MessageBus, detection: StampedDetection) -> ControlFlow {
        if self.status.is_terminal() {
            return ControlFlow::Continue;
        }
        if detection.time + self.frequency <= self.current_tick {
            self.process(bus, detection);
        } else {
            self.pending.push(detection);
        }
        ControlFlow::Continue
    }

    /// Matches every object in `detection` against the database, in
    /// detection order. Aborts the whole batch the instant an `ERROR`
    /// record at or before `detection.time` is encountered.
    fn process(&mut self, bus: &MessageBus, detection: StampedDetection) {
        let mut batch = Vec::with_capacity(detection.objects.len());
        let db = self.db.clone();

        for object in &detection.objects {
            let mut best: Option<&StampedCloudPoints> = None;
            for record in db.iter() {
                if record.time > detection.time {
                    continue;
                }
                if record.is_error() {
                    log::error!("{}: ERROR record at or before time {}", self.id, detection.time);
                    bus.send_broadcast(BroadcastKind::Crashed {
                        sender: self.id.clone(),
                        error_maker: self.id.clone(),
                        message: "LiDar Error".to_string(),
                    });
                    self.status = Status::Error;
                    return;
                }
                if record.id == object.id {
                    // Ascending-time order means later matches overwrite
                    // earlier ones, naturally preferring the largest time
                    // and, on ties, the one encountered last.
                    best = Some(record);
                }
            }

            if let Some(record) = best {
                batch.push(TrackedObject {
                    id: object.id.clone(),
                    description: object.description.clone(),
                    time: detection.time,
                    coords: record.points.clone(),
                });
            }
        }

        self.stats.add_tracked(batch.len() as u64);
        if !batch.is_empty() {
            bus.send_event(EventKind::TrackedObjects {
                batch,
                sender: self.id.clone(),
            });
        }
    }
}

impl Participant for Lidar {
    fn id(&self) -> &str {
        &self.id
    }

    fn initialize(&mut self, bus: &MessageBus) {
        bus.subscribe_broadcast(MessageType::Tick, &self.id);
        bus.subscribe_event(MessageType::DetectObjects, &self.id);
        bus.subscribe_broadcast(MessageType::Terminated, &self.id);
        bus.subscribe_broadcast(MessageType::Crashed, &self.id);
    }

    fn handle(&mut self, bus: &MessageBus, msg: Message) -> ControlFlow {
        match msg {
            Message::Broadcast(BroadcastKind::Tick(t)) => self.on_tick(bus, t),
            Message::Event(EventKind::DetectObjects(detection), _promise) => {
                self.on_detect(bus, detection)
            }
            Message::Broadcast(BroadcastKind::Terminated { sender }) => {
                if is_final_broadcast(&sender) {
                    ControlFlow::Terminate
                } else {
                    ControlFlow::Continue
                }
            }
            Message::Broadcast(BroadcastKind::Crashed { sender, .. }) => {
                if is_final_broadcast(&sender) {
                    ControlFlow::Terminate
                } else {
                    ControlFlow::Continue
                }
            }
            _ => ControlFlow::Continue,
        }
    }
}
