//! # Participant runtime
//!
//! The loop every operator runs: register with the bus, initialize
//! (declare subscriptions, install handlers, signal readiness), then block
//! on the mailbox and dispatch each message until told to terminate.

use crate::bus::MessageBus;
use crate::messages::Message;
use std::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Terminate,
}

pub trait Participant {
    fn id(&self) -> &str;

    /// Declare subscriptions and any other one-time setup. Called once,
    /// immediately after registration, before any message is dispatched.
    fn initialize(&mut self, bus: &MessageBus);

    /// Handle one message taken from this participant's mailbox.
    fn handle(&mut self, bus: &MessageBus, msg: Message) -> ControlFlow;
}

/// Runs a participant's full lifecycle on the calling thread: register,
/// initialize, signal readiness, loop on `await_message` dispatching to
/// `handle`, then unregister on termination or mailbox closure.
pub fn run<P: Participant>(bus: &MessageBus, mut participant: P, ready: &ReadyBarrier) {
    let mailbox = bus.register(participant.id());
    participant.initialize(bus);
    ready.signal();

    loop {
        match mailbox.await_message() {
            None => break,
            Some(msg) => {
                if let ControlFlow::Terminate = participant.handle(bus, msg) {
                    break;
                }
            }
        }
    }

    bus.unregister(participant.id());
}

/// Registers and initializes `participant` synchronously on the calling
/// thread — so its subscriptions are in place — then hands its message
/// loop off to a new OS thread. Returning only after `initialize()` has
/// run avoids a startup race where a broadcast sent the instant threads
/// start could be missed by a participant that hasn't subscribed yet.
pub fn spawn<P: Participant + Send + 'static>(
    bus: Arc<MessageBus>,
    mut participant: P,
    ready: &ReadyBarrier,
) -> std::thread::JoinHandle<()> {
    let mailbox = bus.register(participant.id());
    participant.initialize(&bus);
    ready.signal();

    std::thread::spawn(move || {
        loop {
            match mailbox.await_message() {
                None => break,
                Some(msg) => {
                    if let ControlFlow::Terminate = participant.handle(&bus, msg) {
                        break;
                    }
                }
            }
        }
        bus.unregister(participant.id());
    })
}

/// A hand-rolled countdown barrier: every sensor operator plus Fusion
/// signals once at the end of `initialize()`; the Clock's timer task
/// blocks in `wait()` until the count reaches zero. Unlike
/// `std::sync::Barrier`, only one side (the Clock) ever waits — everyone
/// else just decrements and moves on.
pub struct ReadyBarrier {
    state: Arc<(Mutex<usize>, Condvar)>,
}

impl ReadyBarrier {
    pub fn new(count: usize) -> Self {
        ReadyBarrier {
            state: Arc::new((Mutex::new(count), Condvar::new())),
        }
    }

    pub fn signal(&self) {
        let (lock, condvar) = &*self.state;
        let mut remaining = lock.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
        }
        if *remaining == 0 {
            condvar.notify_all();
        }
    }

    pub fn wait(&self) {
        let (lock, condvar) = &*self.state;
        let guard = lock.lock().unwrap();
        let _guard = condvar.wait_while(guard, |remaining| *remaining > 0).unwrap();
    }
}

impl Clone for ReadyBarrier {
    fn clone(&self) -> Self {
        ReadyBarrier {
            state: self.state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn barrier_releases_only_after_every_signal() {
        let barrier = ReadyBarrier::new(3);
        let waiter = barrier.clone();
        let handle = thread::spawn(move || {
            waiter.wait();
        });

        thread::sleep(Duration::from_millis(10));
        assert!(!handle.is_finished());

        barrier.signal();
        barrier.signal();
        thread::sleep(Duration::from_millis(10));
        assert!(!handle.is_finished());

        barrier.signal();
        handle.join().unwrap();
    }

    #[test]
    fn zero_count_barrier_does_not_block() {
        let barrier = ReadyBarrier::new(0);
        barrier.wait();
    }
}
