//! # Messages
//!
//! The finite message alphabet the bus dispatches. Rather than a dynamic
//! type-keyed handler table, this is a tagged sum with compile-time
//! exhaustiveness — the approach the spec's design notes call out as an
//! acceptable re-architecture of a type-keyed dispatch table.

use crate::bus::promise::Promise;
use crate::model::{Pose, StampedDetection, Tick, TrackedObject};

/// Identifies a participant for logging, sender attribution, and crash
/// snapshots. Cheap to clone; compared by value.
pub type ParticipantId = String;

/// One-of-N messages: delivered to exactly one subscriber, round-robin,
/// and carry a `Promise` the sender may use to await completion.
#[derive(Debug, Clone)]
pub enum EventKind {
    /// A camera's detections for one tick, for LiDAR to match against its
    /// point-cloud database.
    DetectObjects(StampedDetection),
    /// The same detections, routed to Fusion purely so it has a last-known
    /// camera frame to put in a crash snapshot. The spec does not require
    /// this event's promise ever be resolved.
    DetectObjectsForFusion {
        detection: StampedDetection,
        sender: ParticipantId,
    },
    /// A pose sample reaching Fusion.
    Pose { time: Tick, pose: Pose },
    /// A batch of tracked objects from one LiDAR worker, reaching Fusion.
    TrackedObjects {
        batch: Vec<TrackedObject>,
        sender: ParticipantId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Ok,
}

/// Fan-out messages: delivered to every current subscriber of their kind.
#[derive(Debug, Clone)]
pub enum BroadcastKind {
    Tick(Tick),
    Terminated {
        sender: ParticipantId,
    },
    Crashed {
        sender: ParticipantId,
        error_maker: ParticipantId,
        message: String,
    },
}

/// A message in a participant's mailbox: either a broadcast, or an event
/// along with the promise the bus created for it.
#[derive(Debug, Clone)]
pub enum Message {
    Broadcast(BroadcastKind),
    Event(EventKind, Promise<EventResult>),
}

/// The finite set of message "types" subscriptions are keyed on —
/// `subscribers[τ]` in the spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    DetectObjects,
    DetectObjectsForFusion,
    Pose,
    TrackedObjects,
    Tick,
    Terminated,
    Crashed,
}

impl EventKind {
    pub fn message_type(&self) -> MessageType {
        match self {
            EventKind::DetectObjects(_) => MessageType::DetectObjects,
            EventKind::DetectObjectsForFusion { .. } => MessageType::DetectObjectsForFusion,
            EventKind::Pose { .. } => MessageType::Pose,
            EventKind::TrackedObjects { .. } => MessageType::TrackedObjects,
        }
    }
}

impl BroadcastKind {
    pub fn message_type(&self) -> MessageType {
        match self {
            BroadcastKind::Tick(_) => MessageType::Tick,
            BroadcastKind::Terminated { .. } => MessageType::Terminated,
            BroadcastKind::Crashed { .. } => MessageType::Crashed,
        }
    }
}
