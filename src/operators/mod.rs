//! # Sensor Operators
//!
//! Five operator kinds cooperate over the bus: Camera, LiDAR, Pose, Clock,
//! and Fusion. Each owns its private cursor/status state and implements
//! [`crate::participant::Participant`].

pub mod camera;
pub mod clock;
pub mod fusion;
pub mod lidar;
pub mod pose;

/// The Clock's well-known participant id. Every sensor operator checks
/// broadcasts against this to tell "the system-wide final broadcast from
/// Clock" apart from "a peer sensor announcing its own exhaustion", which
/// share the same `BroadcastKind` variants.
pub const CLOCK_ID: &str = "Clock";

/// The Fusion operator's well-known participant id.
pub const FUSION_ID: &str = "Fusion";

/// True when a `Terminated`/`Crashed` broadcast's sender is the Clock,
/// i.e. this is the system-wide final broadcast rather than a peer
/// sensor's own exhaustion/fault notice.
pub fn is_final_broadcast(sender: &str) -> bool {
    sender == CLOCK_ID
}
