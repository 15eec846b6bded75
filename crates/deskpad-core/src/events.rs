use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::store::StoreKey;

/// Everything a widget can announce to the rest of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    DataChanged { key: StoreKey },
    FocusSessionCompleted { total: u64 },
    WaterGoalReached { cups: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Rc<dyn Fn(&Event) -> anyhow::Result<()>>;

#[derive(Default)]
struct BusInner {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(SubscriptionId, Handler)>>,
}

/// Synchronous publish/subscribe channel. Clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.inner.handlers.borrow().len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner
            .handlers
            .borrow_mut()
            .push((id, Rc::new(handler)));
        debug!(subscription = id.0, "subscribed handler");
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.inner.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(sub, _)| *sub != id);
        before != handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }

    /// Calls every handler in subscription order. A failing handler is
    /// logged and the rest still run. Handlers may publish or subscribe
    /// re-entrantly; they see the subscriber list as it was at publish time.
    pub fn publish(&self, event: &Event) {
        let snapshot: Vec<(SubscriptionId, Handler)> = self.inner.handlers.borrow().clone();
        trace!(?event, handlers = snapshot.len(), "publishing event");

        for (id, handler) in snapshot {
            if let Err(err) = handler(event) {
                warn!(
                    subscription = id.0,
                    ?event,
                    error = %format!("{err:#}"),
                    "event handler failed"
                );
            }
        }
    }
}
