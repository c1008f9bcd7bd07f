//! # Clock operator
//!
//! Runs on two threads: the regular participant loop (registered on the
//! bus, reacting to sensors' `Terminated`/`Crashed` broadcasts) and a
//! dedicated timer task that owns the actual tick cadence. They share
//! `ClockState` — an atomic active-sensor countdown plus a latched crash.

use super::CLOCK_ID;
use crate::bus::MessageBus;
use crate::messages::{BroadcastKind, Message, MessageType};
use crate::participant::{ControlFlow, Participant, ReadyBarrier};
use crate::model::Tick;
use crate::stats::Statistics;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub struct ClockState {
    active_sensor_count: AtomicI64,
    crash: Mutex<Option<(String, String)>>,
}

impl ClockState {
    pub fn new(sensor_count: usize) -> Self {
        ClockState {
            active_sensor_count: AtomicI64::new(sensor_count as i64),
            crash: Mutex::new(None),
        }
    }
}

pub struct Clock {
    id: String,
    state: Arc<ClockState>,
}

impl Clock {
    pub fn new(state: Arc<ClockState>) -> Self {
        Clock {
            id: CLOCK_ID.to_string(),
            state,
        }
    }
}

impl Participant for Clock {
    fn id(&self) -> &str {
        &self.id
    }

    fn initialize(&mut self, bus: &MessageBus) {
        bus.subscribe_broadcast(MessageType::Terminated, &self.id);
        bus.subscribe_broadcast(MessageType::Crashed, &self.id);
    }

    fn handle(&mut self, _bus: &MessageBus, msg: Message) -> ControlFlow {
        match msg {
            Message::Broadcast(BroadcastKind::Terminated { sender }) => {
                if sender == self.id {
                    // Our own timer task's final broadcast: time to stop
                    // this loop too.
                    return ControlFlow::Terminate;
                }
                self.state.active_sensor_count.fetch_sub(1, Ordering::SeqCst);
                ControlFlow::Continue
            }
            Message::Broadcast(BroadcastKind::Crashed { sender, error_maker, message }) => {
                if sender == self.id {
                    return ControlFlow::Terminate;
                }
                let mut crash = self.state.crash.lock().unwrap();
                if crash.is_none() {
                    log::error!("latching crash from {error_maker}: {message}");
                    *crash = Some((error_maker, message));
                }
                ControlFlow::Continue
            }
            _ => ControlFlow::Continue,
        }
    }
}

/// The Clock's dedicated timer task. Blocks on `ready` (every sensor plus
/// Fusion has signalled) before emitting tick 1.
pub fn run_timer(
    bus: Arc<MessageBus>,
    state: Arc<ClockState>,
    stats: Arc<Statistics>,
    tick_period: Duration,
    duration: Tick,
    ready: ReadyBarrier,
) {
    ready.wait();

    let mut current: Tick = 0;
    loop {
        if current >= duration {
            break;
        }
        if state.active_sensor_count.load(Ordering::SeqCst) <= 0 {
            break;
        }
        if state.crash.lock().unwrap().is_some() {
            break;
        }

        current += 1;
        bus.send_broadcast(BroadcastKind::Tick(current));
        stats.add_tick();
        thread::sleep(tick_period);
    }

    let crash = state.crash.lock().unwrap().clone();
    match crash {
        Some((error_maker, message)) => {
            log::warn!("stopping at tick {current}: crash latched from {error_maker}");
            bus.send_broadcast(BroadcastKind::Crashed {
                sender: CLOCK_ID.to_string(),
                error_maker,
                message,
            });
        }
        None => {
            log::info!("stopping at tick {current}: no active sensors or duration reached");
            bus.send_broadcast(BroadcastKind::Terminated {
                sender: CLOCK_ID.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[test]
    fn sensor_termination_decrements_active_count() {
        let bus = MessageBus::new();
        let state = Arc::new(ClockState::new(2));
        let mut clock = Clock::new(state.clone());
        clock.initialize(&bus);

        clock.handle(
            &bus,
            Message::Broadcast(BroadcastKind::Terminated {
                sender: "Camera1".into(),
            }),
        );
        assert_eq!(state.active_sensor_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn own_final_broadcast_terminates_the_participant_loop() {
        let bus = MessageBus::new();
        let state = Arc::new(ClockState::new(1));
        let mut clock = Clock::new(state);
        clock.initialize(&bus);

        let flow = clock.handle(
            &bus,
            Message::Broadcast(BroadcastKind::Terminated { sender: CLOCK_ID.into() }),
        );
        assert_eq!(flow, ControlFlow::Terminate);
    }

    #[test]
    fn timer_stops_when_active_sensor_count_hits_zero() {
        let bus = Arc::new(MessageBus::new());
        let watcher = bus.register("watcher");
        bus.subscribe_broadcast(MessageType::Terminated, "watcher");

        let state = Arc::new(ClockState::new(0));
        let stats = Arc::new(Statistics::new());
        let ready = ReadyBarrier::new(0);

        run_timer(
            bus.clone(),
            state,
            stats.clone(),
            StdDuration::from_millis(1),
            100,
            ready,
        );

        assert_eq!(stats.ticks(), 0);
        let msg = watcher.await_message().unwrap();
        assert!(matches!(
            msg,
            Message::Broadcast(BroadcastKind::Terminated { sender }) if sender == CLOCK_ID
        ));
    }

    #[test]
    fn timer_broadcasts_crash_when_latched() {
        let bus = Arc::new(MessageBus::new());
        let watcher = bus.register("watcher");
        bus.subscribe_broadcast(MessageType::Crashed, "watcher");

        let state = Arc::new(ClockState::new(1));
        *state.crash.lock().unwrap() = Some(("Camera1".to_string(), "boom".to_string()));
        let stats = Arc::new(Statistics::new());
        let ready = ReadyBarrier::new(0);

        run_timer(
            bus.clone(),
            state,
            stats,
            StdDuration::from_millis(1),
            100,
            ready,
        );

        let msg = watcher.await_message().unwrap();
        match msg {
            Message::Broadcast(BroadcastKind::Crashed { sender, error_maker, message }) => {
                assert_eq!(sender, CLOCK_ID);
                assert_eq!(error_maker, "Camera1");
                assert_eq!(message, "boom");
            }
            _ => panic!("expected crash broadcast"),
        }
    }
}
