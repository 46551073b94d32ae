//! Single-threaded event bus with scoped subscriptions.
//!
//! Components subscribe with a filter and get back a [`Subscription`] handle.
//! Published events are cloned into the queue of every matching subscriber;
//! each subscriber drains its own queue with [`Subscription::poll`]. Dropping
//! the handle unregisters the subscriber, so a skill that subscribes during
//! execution cannot leak its interest past its own lifetime.

use crate::world::WorldEvent;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Which events a subscriber wants queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    All,
    BlockChanges,
    AgentMovement,
    Inventory,
    ItemEntities,
    Death,
}

impl EventFilter {
    fn matches(&self, event: &WorldEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::BlockChanges => matches!(event, WorldEvent::BlockChanged { .. }),
            EventFilter::AgentMovement => matches!(event, WorldEvent::AgentMoved),
            EventFilter::Inventory => matches!(event, WorldEvent::InventoryChanged),
            EventFilter::ItemEntities => matches!(event, WorldEvent::ItemEntityGone { .. }),
            EventFilter::Death => matches!(event, WorldEvent::Death),
        }
    }
}

struct Subscriber {
    filter: EventFilter,
    queue: Vec<WorldEvent>,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
}

/// Shared handle to the bus. Cloning is cheap; all clones see the same
/// subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.insert(
            id,
            Subscriber {
                filter,
                queue: Vec::new(),
            },
        );
        Subscription {
            bus: Rc::clone(&self.inner),
            id,
        }
    }

    pub fn publish(&self, event: &WorldEvent) {
        let mut inner = self.inner.borrow_mut();
        for sub in inner.subscribers.values_mut() {
            if sub.filter.matches(event) {
                sub.queue.push(event.clone());
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

/// RAII subscription handle. Dropping it unregisters the subscriber.
pub struct Subscription {
    bus: Rc<RefCell<BusInner>>,
    id: u64,
}

impl Subscription {
    /// Take everything queued since the last poll.
    pub fn poll(&self) -> Vec<WorldEvent> {
        let mut inner = self.bus.borrow_mut();
        match inner.subscribers.get_mut(&self.id) {
            Some(sub) => std::mem::take(&mut sub.queue),
            None => Vec::new(),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.borrow_mut().subscribers.remove(&self.id);
    }
}
