//! Change feed for observing committed record mutations.
//!
//! The store emits a [`ChangeEvent`] after every commit. Two kinds of
//! subscriber are supported:
//!
//! - channel receivers obtained from [`ChangeFeed::subscribe`], for consumers
//!   that poll on their own thread;
//! - [`StoreObserver`] objects attached once when the store is built, for
//!   decoupled side effects such as mirroring records to disk.
//!
//! Subscriber failures never reach the code that mutated the store.

use crate::kind::EntityKind;
use crate::record::Record;
use parking_lot::RwLock;
use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// Type of change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// A record was created locally.
    Insert,
    /// A record was updated locally.
    Update,
    /// A record was soft-deleted.
    Delete,
    /// A record was inserted or overwritten from the remote store.
    Merge,
}

/// A single committed change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Sequence number of the commit within this store instance.
    pub sequence: u64,
    /// Kind of the changed record.
    pub kind: EntityKind,
    /// Id of the changed record.
    pub id: String,
    /// Type of change.
    pub change_type: ChangeType,
    /// The record as committed (tombstones included).
    pub record: Record,
}

/// Error type returned by observers.
pub type ObserverError = Box<dyn Error + Send + Sync>;

/// A decoupled subscriber notified after each commit.
pub trait StoreObserver: Send + Sync {
    /// Handles a committed change. Errors and panics are logged and dropped.
    fn on_change(&self, event: &ChangeEvent) -> Result<(), ObserverError>;
}

/// Distributes committed changes to subscribers.
#[derive(Default)]
pub struct ChangeFeed {
    subscribers: RwLock<Vec<Sender<ChangeEvent>>>,
    observers: Vec<Arc<dyn StoreObserver>>,
}

impl ChangeFeed {
    /// Creates a feed with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an observer. Only possible while the feed is being built.
    pub(crate) fn attach(&mut self, observer: Arc<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    /// Subscribes to all future change events.
    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits an event to all observers and channel subscribers.
    pub fn emit(&self, event: ChangeEvent) {
        for observer in &self.observers {
            match panic::catch_unwind(AssertUnwindSafe(|| observer.on_change(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    kind = %event.kind,
                    id = %event.id,
                    error = %e,
                    "change observer failed"
                ),
                Err(payload) => tracing::warn!(
                    kind = %event.kind,
                    id = %event.id,
                    panic = panic_message(payload.as_ref()),
                    "change observer panicked"
                ),
            }
        }

        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns the number of live channel subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn event(sequence: u64) -> ChangeEvent {
        ChangeEvent {
            sequence,
            kind: EntityKind::Customer,
            id: format!("id-{sequence}"),
            change_type: ChangeType::Insert,
            record: Record::new(),
        }
    }

    struct Recording(Mutex<Vec<u64>>);

    impl StoreObserver for Recording {
        fn on_change(&self, event: &ChangeEvent) -> Result<(), ObserverError> {
            self.0.lock().push(event.sequence);
            Ok(())
        }
    }

    struct Failing;

    impl StoreObserver for Failing {
        fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
            Err("disk full".into())
        }
    }

    struct Panicking;

    impl StoreObserver for Panicking {
        fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
            panic!("mirror directory vanished");
        }
    }

    #[test]
    fn emit_and_receive() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe();

        feed.emit(event(1));

        let received = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(received, event(1));
    }

    #[test]
    fn subscriber_cleanup() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        drop(rx);
        feed.emit(event(1));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn failing_observer_does_not_block_others() {
        let recording = Arc::new(Recording(Mutex::new(Vec::new())));
        let mut feed = ChangeFeed::new();
        feed.attach(Arc::new(Failing));
        feed.attach(recording.clone());
        assert_eq!(feed.observer_count(), 2);

        feed.emit(event(1));
        feed.emit(event(2));

        assert_eq!(*recording.0.lock(), vec![1, 2]);
    }

    #[test]
    fn panicking_observer_is_contained() {
        let recording = Arc::new(Recording(Mutex::new(Vec::new())));
        let mut feed = ChangeFeed::new();
        feed.attach(Arc::new(Panicking));
        feed.attach(recording.clone());
        let rx = feed.subscribe();

        feed.emit(event(7));

        assert_eq!(*recording.0.lock(), vec![7]);
        assert_eq!(rx.recv_timeout(Duration::from_millis(100)).unwrap(), event(7));
    }

    #[test]
    fn panic_payloads_are_readable() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "non-string panic payload");
    }
}
