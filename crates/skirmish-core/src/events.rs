use std::fmt;

/// Failure reported by an observer while handling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverError(pub String);

impl fmt::Display for ObserverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ObserverError {}

/// A presentation-side consumer of simulation events (renderer, audio, HUD).
pub trait EventObserver<E> {
    /// Short label used in diagnostics.
    fn name(&self) -> &str {
        "observer"
    }

    fn on_event(&mut self, event: &E) -> Result<(), ObserverError>;
}

/// Any `FnMut(&E)` closure can observe events and never fails.
impl<E, F> EventObserver<E> for F
where
    F: FnMut(&E),
{
    fn on_event(&mut self, event: &E) -> Result<(), ObserverError> {
        self(event);
        Ok(())
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// Typed fan-out of simulation events to any number of observers.
///
/// Events are delivered in the order they are published. An observer that
/// returns an error is logged and skipped for that event only; delivery to
/// the remaining observers is unaffected.
pub struct EventBus<E> {
    observers: Vec<(ObserverId, Box<dyn EventObserver<E>>)>,
    next_id: u32,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn EventObserver<E>>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Returns whether an observer was removed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver one event to every observer. Returns the number of failed deliveries.
    pub fn publish(&mut self, event: &E) -> usize {
        let mut failures = 0;
        for (_, observer) in &mut self.observers {
            if let Err(e) = observer.on_event(event) {
                failures += 1;
                tracing::warn!(
                    observer = observer.name(),
                    error = %e,
                    "Observer failed to handle event"
                );
            }
        }
        failures
    }

    /// Deliver a tick's worth of events in order.
    pub fn publish_all(&mut self, events: &[E]) -> usize {
        events.iter().map(|e| self.publish(e)).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    struct Recorder {
        seen: Rc<RefCell<Vec<u32>>>,
    }

    impl EventObserver<u32> for Recorder {
        fn on_event(&mut self, event: &u32) -> Result<(), ObserverError> {
            self.seen.borrow_mut().push(*event);
            Ok(())
        }
    }

    struct Grumpy;

    impl EventObserver<u32> for Grumpy {
        fn name(&self) -> &str {
            "grumpy"
        }

        fn on_event(&mut self, event: &u32) -> Result<(), ObserverError> {
            Err(ObserverError(format!("refused {event}")))
        }
    }

    #[test]
    fn delivers_in_publish_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(Box::new(Recorder {
            seen: Rc::clone(&seen),
        }));
        bus.publish_all(&[3, 1, 2]);
        assert_eq!(*seen.borrow(), vec![3, 1, 2]);
    }

    #[test]
    fn failing_observer_does_not_block_others() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(Box::new(Grumpy));
        bus.subscribe(Box::new(Recorder {
            seen: Rc::clone(&seen),
        }));
        let failures = bus.publish_all(&[10, 20]);
        assert_eq!(failures, 2);
        assert_eq!(*seen.borrow(), vec![10, 20]);
    }

    #[test]
    fn closures_observe() {
        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let mut bus = EventBus::new();
        bus.subscribe(Box::new(move |_: &u32| *counter.borrow_mut() += 1));
        bus.publish(&5);
        bus.publish(&6);
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let id = bus.subscribe(Box::new(Recorder {
            seen: Rc::clone(&seen),
        }));
        bus.publish(&1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&2);
        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(bus.observer_count(), 0);
    }
}
