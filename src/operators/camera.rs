//! # Camera operator
//!
//! Replays a time-ordered sequence of `StampedDetection`s, releasing each
//! one `period` ticks after its detection time — modeling real sensor
//! processing latency so LiDAR only ever receives a detection once it
//! could plausibly have matched it to a scan.

use super::is_final_broadcast;
use crate::bus::MessageBus;
use crate::messages::{BroadcastKind, EventKind, Message, MessageType};
use crate::model::{Status, Tick};
use crate::participant::{ControlFlow, Participant};
use crate::stats::Statistics;
use std::sync::Arc;

pub struct Camera {
    id: String,
    period: Tick,
    frames: Vec<crate::model::StampedDetection>,
    cursor: usize,
    status: Status,
    stats: Arc<Statistics>,
}

impl Camera {
    pub fn new(
        id: impl Into<String>,
        period: Tick,
        mut frames: Vec<crate::model::StampedDetection>,
        stats: Arc<Statistics>,
    ) -> Self {
        frames.sort_by_key(|f| f.time);
        Camera {
            id: id.into(),
            period,
            frames,
            cursor: 0,
            status: Status::Up,
            stats,
        }
    }

    fn on_tick(&mut self, bus: &MessageBus, t: Tick) -> ControlFlow {
        if self.status.is_terminal() {
            return ControlFlow::Continue;
        }

        if self.cursor == self.frames.len() {
            self.status = Status::Down;
            log::info!("{}: data exhausted at tick {t}, going DOWN", self.id);
            bus.send_broadcast(BroadcastKind::Terminated {
                sender: self.id.clone(),
            });
            return ControlFlow::Continue;
        }

        // Scan (without consuming the cursor) for a malfunction reported at
        // this tick's detection time.
        let mut scan = self.cursor;
        while scan < self.frames.len() && self.frames[scan].time == t {
            if let Some(obj) = self.frames[scan].objects.iter().find(|o| o.is_error()) {
                log::error!("{}: ERROR object at tick {t}: {}", self.id, obj.description);
                bus.send_broadcast(BroadcastKind::Crashed {
                    sender: self.id.clone(),
                    error_maker: self.id.clone(),
                    message: obj.description.clone(),
                });
                self.status = Status::Error;
                return ControlFlow::Continue;
            }
            scan += 1;
        }

        // Release every frame whose availability (detection time + period)
        // has now been reached; drop strictly older, already-missed frames.
        while self.cursor < self.frames.len() {
            let frame = &self.frames[self.cursor];
            let availability = frame.time + self.period;
            if availability > t {
                break;
            }
            if availability == t {
                let detection = frame.clone();
                self.stats.add_detected(detection.objects.len() as u64);
                bus.send_event(EventKind::DetectObjects(detection.clone()));
                bus.send_event(EventKind::DetectObjectsForFusion {
                    detection,
                    sender: self.id.clone(),
                });
            }
            self.cursor += 1;
        }

        ControlFlow::Continue
    }
}

impl Participant for Camera {
    fn id(&self) -> &str {
        &self.id
    }

    fn initialize(&mut self, bus: &MessageBus) {
        bus.subscribe_broadcast(MessageType::Tick, &self.id);
        bus.subscribe_broadcast(MessageType::Terminated, &self.id);
        bus.subscribe_broadcast(MessageType::Crashed, &self.id);
    }

    fn handle(&mut self, bus: &MessageBus, msg: Message) -> ControlFlow {
        match msg {
            Message::Broadcast(BroadcastKind::Tick(t)) => self.on_tick(bus, t),
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
            Message::Event(_, _) => ControlFlow::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DetectedObject;

    fn frame(time: Tick, id: &str) -> crate::model::StampedDetection {
        crate::model::StampedDetection {
            time,
            objects: vec![DetectedObject {
                id: id.into(),
                description: "tree".into(),
            }],
        }
    }

    #[test]
    fn releases_frame_after_latency_period() {
        let bus = MessageBus::new();
        let lidar_mbox = bus.register("lidar");
        bus.subscribe_event(MessageType::DetectObjects, "lidar");
        let fusion_mbox = bus.register("Fusion");
        bus.subscribe_event(MessageType::DetectObjectsForFusion, "Fusion");

        let stats = Arc::new(Statistics::new());
        let mut camera = Camera::new("Camera1", 1, vec![frame(1, "A")], stats.clone());
        camera.initialize(&bus);

        // Tick 1: detection time == 1, availability == 2; nothing released yet.
        assert_eq!(camera.on_tick(&bus, 1), ControlFlow::Continue);
        assert!(lidar_mbox.try_recv().is_none());

        // Tick 2: availability reached.
        camera.on_tick(&bus, 2);
        let msg = lidar_mbox.try_recv();
        assert!(matches!(msg, Some(Message::Event(EventKind::DetectObjects(_), _))));
        let fusion_msg = fusion_mbox.try_recv();
        assert!(matches!(
            fusion_msg,
            Some(Message::Event(EventKind::DetectObjectsForFusion { .. }, _))
        ));
        assert_eq!(stats.detected(), 1);
    }

    #[test]
    fn error_object_triggers_crash_and_status_error() {
        let bus = MessageBus::new();
        let crash_mbox = bus.register("watcher");
        bus.subscribe_broadcast(MessageType::Crashed, "watcher");

        let stats = Arc::new(Statistics::new());
        let bad_frame = crate::model::StampedDetection {
            time: 2,
            objects: vec![DetectedObject {
                id: "ERROR".into(),
                description: "cam fault".into(),
            }],
        };
        let mut camera = Camera::new("Camera1", 1, vec![bad_frame], stats);
        camera.initialize(&bus);
        camera.on_tick(&bus, 2);

        assert_eq!(camera.status, Status::Error);
        let msg = crash_mbox.await_message().unwrap();
        match msg {
            Message::Broadcast(BroadcastKind::Crashed { message, .. }) => {
                assert_eq!(message, "cam fault");
            }
            _ => panic!("expected crash broadcast"),
        }
    }

    #[test]
    fn data_exhaustion_sends_terminated_and_sets_down() {
        let bus = MessageBus::new();
        let watcher = bus.register("watcher");
        bus.subscribe_broadcast(MessageType::Terminated, "watcher");

        let stats = Arc::new(Statistics::new());
        let mut camera = Camera::new("Camera1", 1, vec![frame(1, "A")], stats);
        camera.initialize(&bus);
        camera.on_tick(&bus, 2); // consumes the only frame
        camera.on_tick(&bus, 3); // cursor now == len

        assert_eq!(camera.status, Status::Down);
        let msg = watcher.await_message().unwrap();
        assert!(matches!(
            msg,
            Message::Broadcast(BroadcastKind::Terminated { .. })
        ));
    }
}
