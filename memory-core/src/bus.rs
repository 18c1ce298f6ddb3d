//! Learning bus: in-process pub/sub with error-isolated subscribers
//! (spec §4.9, C10).
//!
//! A process-wide singleton accessible via [`get_learning_bus`], with
//! [`reset_learning_bus`] for tests. Two processes cannot share this
//! bus — that is what the journal watcher (§4.10) is for.

use crate::types::Learning;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// A subscriber callback. Boxed so the bus can hold a heterogeneous
/// list of closures and trait-object sinks (e.g. a store's
/// `add_learning`, via [`subscribe_learning_store`]).
pub type Subscriber = Arc<dyn Fn(&Learning) + Send + Sync>;

/// In-process pub/sub channel for learnings.
pub struct LearningBus {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Default for LearningBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a subscriber. Returns a token that can later be passed
    /// to [`LearningBus::unsubscribe`].
    pub fn subscribe(&self, callback: Subscriber) -> usize {
        let mut subs = self.subscribers.lock();
        subs.push(callback);
        subs.len() - 1
    }

    /// Remove a subscriber previously registered with
    /// [`LearningBus::subscribe`]. Out-of-range tokens are ignored.
    pub fn unsubscribe(&self, token: usize) {
        let mut subs = self.subscribers.lock();
        if token < subs.len() {
            // Replace with a no-op rather than shifting indices, so
            // previously issued tokens stay valid.
            subs[token] = Arc::new(|_| {});
        }
    }

    /// Invoke every subscriber with `learning`, in registration order.
    /// A subscriber that panics is caught and counted as an error;
    /// other subscribers still run (spec §8, property 6). The
    /// subscriber list is cloned (cheap: `Arc` bumps) and the lock
    /// released before any callback runs, so a subscriber calling
    /// `subscribe`/`unsubscribe` from inside its own callback cannot
    /// deadlock (spec §5: the bus locks only around the subscriber
    /// list; callbacks run outside it).
    #[must_use]
    pub fn publish(&self, learning: &Learning) -> usize {
        let subs_snapshot: Vec<Subscriber> = self.subscribers.lock().clone();

        let mut errors = 0;
        for callback in subs_snapshot {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(learning);
            }));
            if result.is_err() {
                errors += 1;
                warn!("learning bus subscriber panicked; other subscribers still ran");
            }
        }
        errors
    }

    /// Number of registered subscriber slots (including unsubscribed
    /// no-op slots).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

static BUS: OnceLock<Arc<LearningBus>> = OnceLock::new();
static BUS_OVERRIDE: Mutex<Option<Arc<LearningBus>>> = Mutex::new(None);

/// The process-wide learning bus singleton.
#[must_use]
pub fn get_learning_bus() -> Arc<LearningBus> {
    if let Some(bus) = BUS_OVERRIDE.lock().clone() {
        return bus;
    }
    BUS.get_or_init(|| Arc::new(LearningBus::new())).clone()
}

/// Replace the singleton with a fresh bus. Intended for test isolation
/// so one test's subscribers cannot leak into another's.
pub fn reset_learning_bus() {
    *BUS_OVERRIDE.lock() = Some(Arc::new(LearningBus::new()));
}

/// Bridge bus events into a store's learning sink, so every in-process
/// worker sharing the bus converges on the same knowledge without
/// touching disk (spec §4.9).
pub fn subscribe_learning_store<S>(bus: &LearningBus, store: Arc<Mutex<S>>) -> usize
where
    S: LearningSink + Send + 'static,
{
    bus.subscribe(Arc::new(move |learning: &Learning| {
        store.lock().add_learning(learning.clone());
    }))
}

/// Anything that can absorb a learning pushed from the bus.
pub trait LearningSink {
    /// Record `learning` into this sink.
    fn add_learning(&mut self, learning: Learning);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn learning(fact: &str) -> Learning {
        Learning::new(fact, "project", 0.8, vec![]).unwrap()
    }

    #[test]
    fn publish_delivers_in_registration_order() {
        let bus = LearningBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let o1 = order.clone();
        bus.subscribe(Arc::new(move |_| o1.lock().push(1)));
        let o2 = order.clone();
        bus.subscribe(Arc::new(move |_| o2.lock().push(2)));

        bus.publish(&learning("fact"));
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[test]
    fn bad_subscriber_does_not_block_others() {
        let bus = LearningBus::new();
        let ok_calls = Arc::new(AtomicUsize::new(0));
        let ok_calls_clone = ok_calls.clone();
        bus.subscribe(Arc::new(move |_| {
            ok_calls_clone.fetch_add(1, Ordering::SeqCst);
        }));
        bus.subscribe(Arc::new(|_| panic!("bad subscriber")));

        let errors = bus.publish(&learning("fact"));
        assert_eq!(errors, 1);
        assert_eq!(ok_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_silences_a_subscriber() {
        let bus = LearningBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let token = bus.subscribe(Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));
        bus.unsubscribe(token);
        bus.publish(&learning("fact"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[serial_test::serial]
    fn reset_learning_bus_clears_subscribers() {
        reset_learning_bus();
        let bus = get_learning_bus();
        bus.subscribe(Arc::new(|_| {}));
        assert_eq!(bus.subscriber_count(), 1);

        reset_learning_bus();
        let bus2 = get_learning_bus();
        assert_eq!(bus2.subscriber_count(), 0);
    }
}
