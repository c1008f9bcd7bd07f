//! # Pose operator
//!
//! Replays a time-ordered sequence of robot poses, emitting the one
//! matching the current tick (if any) as a `Pose` event to Fusion.

use super::is_final_broadcast;
use crate::bus::MessageBus;
use crate::messages::{BroadcastKind, EventKind, Message, MessageType};
use crate::model::{Pose as PoseSample, Status, Tick};
use crate::participant::{ControlFlow, Participant};

pub struct Pose {
    id: String,
    poses: Vec<PoseSample>,
    cursor: usize,
    status: Status,
}

impl Pose {
    pub fn new(id: impl Into<String>, mut poses: Vec<PoseSample>) -> Self {
        poses.sort_by_key(|p| p.time);
        Pose {
            id: id.into(),
            poses,
            cursor: 0,
            status: Status::Up,
        }
    }

    fn on_tick(&mut self, bus: &MessageBus, t: Tick) -> ControlFlow {
        if self.status.is_terminal() {
            return ControlFlow::Continue;
        }

        // Poses strictly older than this tick were never matched; leave
        // them behind without emitting.
        while self.cursor < self.poses.len() && self.poses[self.cursor].time < t {
            self.cursor += 1;
        }

        if self.cursor < self.poses.len() && self.poses[self.cursor].time == t {
            let pose = self.poses[self.cursor];
            bus.send_event(EventKind::Pose { time: t, pose });
            self.cursor += 1;
        }

        if self.cursor == self.poses.len() {
            self.status = Status::Down;
            log::info!("{}: every pose consumed, going DOWN", self.id);
            bus.send_broadcast(BroadcastKind::Terminated {
                sender: self.id.clone(),
            });
        }

        ControlFlow::Continue
    }
}

impl Participant for Pose {
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
            _ => ControlFlow::Continue,
        }
    }
}
