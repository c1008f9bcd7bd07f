//! # MessageBus
//!
//! A process-wide router. State is one `Mutex`-guarded table of mailboxes
//! plus two subscriber lists (events: round-robin order; broadcasts:
//! fan-out order) — the same "one lock around a shared table" shape the
//! teacher uses for `SomeIpRuntime::services: Arc<RwLock<HashMap<...>>>`,
//! collapsed to a single `Mutex` since subscriber-list mutation and mailbox
//! lookup need to be atomic together here.
//!
//! Each participant's mailbox is a plain `std::sync::mpsc` channel
//! (unbounded, per the spec's design note on mailbox backpressure).

pub mod promise;

use crate::messages::{BroadcastKind, EventKind, EventResult, Message, MessageType, ParticipantId};
use promise::Promise;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

struct Inner {
    mailboxes: HashMap<ParticipantId, Sender<Message>>,
    event_subscribers: HashMap<MessageType, VecDeque<ParticipantId>>,
    broadcast_subscribers: HashMap<MessageType, Vec<ParticipantId>>,
}

pub struct MessageBus {
    inner: Mutex<Inner>,
}

/// The receiving half of a registered participant's mailbox.
pub struct Mailbox {
    receiver: Receiver<Message>,
}

impl Mailbox {
    /// Blocks until a message is available, removes and returns it. Returns
    /// `None` once the bus has dropped this mailbox's sender (the bus is
    /// shutting down and this participant should exit its loop).
    pub fn await_message(&self) -> Option<Message> {
        self.receiver.recv().ok()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        MessageBus {
            inner: Mutex::new(Inner {
                mailboxes: HashMap::new(),
                event_subscribers: HashMap::new(),
                broadcast_subscribers: HashMap::new(),
            }),
        }
    }

    pub fn register(&self, id: &str) -> Mailbox {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.inner.lock().unwrap();
        inner.mailboxes.insert(id.to_string(), tx);
        Mailbox { receiver: rx }
    }

    pub fn unregister(&self, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.mailboxes.remove(id);
        for list in inner.event_subscribers.values_mut() {
            list.retain(|p| p != id);
        }
        for list in inner.broadcast_subscribers.values_mut() {
            list.retain(|p| p != id);
        }
    }

    pub fn subscribe_event(&self, ty: MessageType, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        let list = inner.event_subscribers.entry(ty).or_default();
        if !list.iter().any(|p| p == id) {
            list.push_back(id.to_string());
        }
    }

    pub fn subscribe_broadcast(&self, ty: MessageType, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        let list = inner.broadcast_subscribers.entry(ty).or_default();
        if !list.iter().any(|p| p == id) {
            list.push(id.to_string());
        }
    }

    /// Picks the head of `subscribers[type(e)]`, rotates it to the tail,
    /// enqueues `e` to that subscriber's mailbox and returns a fresh
    /// promise. Returns `None` if nobody is subscribed.
    pub fn send_event(&self, event: EventKind) -> Option<Promise<EventResult>> {
        let ty = event.message_type();
        let mut inner = self.inner.lock().unwrap();
        let list = inner.event_subscribers.get_mut(&ty)?;
        let target = list.pop_front()?;
        list.push_back(target.clone());
        let promise = Promise::new();
        match inner.mailboxes.get(&target) {
            Some(sender) => {
                let _ = sender.send(Message::Event(event, promise.clone()));
                Some(promise)
            }
            None => None,
        }
    }

    /// Enqueues `b` into every current subscriber's mailbox, in
    /// subscription order.
    pub fn send_broadcast(&self, broadcast: BroadcastKind) {
        let ty = broadcast.message_type();
        let inner = self.inner.lock().unwrap();
        if let Some(list) = inner.broadcast_subscribers.get(&ty) {
            for id in list {
                if let Some(sender) = inner.mailboxes.get(id) {
                    let _ = sender.send(Message::Broadcast(broadcast.clone()));
                }
            }
        }
    }

    #[cfg(test)]
    fn mailbox_count(&self) -> usize {
        self.inner.lock().unwrap().mailboxes.len()
    }
}

#[cfg(test)]
impl Mailbox {
    pub fn try_recv(&self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DetectedObject, StampedDetection};

    fn detect(time: u64) -> EventKind {
        EventKind::DetectObjects(StampedDetection {
            time,
            objects: vec![DetectedObject {
                id: "A".into(),
                description: "tree".into(),
            }],
        })
    }

    #[test]
    fn send_event_with_no_subscribers_returns_none() {
        let bus = MessageBus::new();
        assert!(bus.send_event(detect(1)).is_none());
    }

    #[test]
    fn round_robin_fairness_across_equivalent_subscribers() {
        let bus = MessageBus::new();
        let mailboxes: Vec<_> = ["w1", "w2"]
            .iter()
            .map(|id| {
                let mbox = bus.register(id);
                bus.subscribe_event(MessageType::DetectObjects, id);
                (id.to_string(), mbox)
            })
            .collect();

        for t in 0..4 {
            bus.send_event(detect(t));
        }

        for (_, mbox) in &mailboxes {
            let mut count = 0;
            while let Ok(msg) = mbox.receiver.try_recv() {
                if matches!(msg, Message::Event(..)) {
                    count += 1;
                }
            }
            assert_eq!(count, 2);
        }
    }

    #[test]
    fn broadcast_reaches_every_subscriber_in_fifo_order() {
        let bus = MessageBus::new();
        let a = bus.register("a");
        let b = bus.register("b");
        bus.subscribe_broadcast(MessageType::Tick, "a");
        bus.subscribe_broadcast(MessageType::Tick, "b");

        bus.send_broadcast(BroadcastKind::Tick(1));
        bus.send_broadcast(BroadcastKind::Tick(2));

        for mbox in [&a, &b] {
            let first = mbox.await_message().unwrap();
            let second = mbox.await_message().unwrap();
            assert!(matches!(first, Message::Broadcast(BroadcastKind::Tick(1))));
            assert!(matches!(second, Message::Broadcast(BroadcastKind::Tick(2))));
        }
    }

    #[test]
    fn unregister_removes_mailbox_and_subscriptions() {
        let bus = MessageBus::new();
        let _mbox = bus.register("a");
        bus.subscribe_broadcast(MessageType::Tick, "a");
        assert_eq!(bus.mailbox_count(), 1);

        bus.unregister("a");
        assert_eq!(bus.mailbox_count(), 0);

        // Broadcasting now reaches nobody; this must not panic.
        bus.send_broadcast(BroadcastKind::Tick(1));
    }

    #[test]
    fn event_promise_resolves_exactly_once() {
        let bus = MessageBus::new();
        let mbox = bus.register("solo");
        bus.subscribe_event(MessageType::DetectObjects, "solo");

        let promise = bus.send_event(detect(1)).expect("a subscriber exists");
        let msg = mbox.await_message().expect("message delivered");
        if let Message::Event(_, p) = msg {
            p.resolve(EventResult::Ok);
            p.resolve(EventResult::Ok); // no-op, must not panic or change value
        } else {
            panic!("expected an event message");
        }
        assert_eq!(promise.await_value(), EventResult::Ok);
    }
}
