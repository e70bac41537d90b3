//! In-memory listener bus.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::bus::{EventBus, Listener, SubscriptionId};

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Listeners run on the publisher's thread, outside the registry lock
/// - A poisoned registry is logged and treated as empty
pub struct InMemoryEventBus<M> {
    listeners: Mutex<Vec<(SubscriptionId, Listener<M>)>>,
    next_id: AtomicU64,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<M> core::fmt::Debug for InMemoryEventBus<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryEventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Send + Sync + 'static,
{
    fn publish(&self, message: &M) -> usize {
        // Snapshot so listeners can (un)subscribe without deadlocking.
        let snapshot: Vec<Listener<M>> = match self.listeners.lock() {
            Ok(l) => l.iter().map(|(_, f)| f.clone()).collect(),
            Err(_) => {
                warn!("listener registry poisoned; dropping publish");
                return 0;
            }
        };

        for listener in &snapshot {
            listener(message);
        }
        snapshot.len()
    }

    fn subscribe(&self, listener: Listener<M>) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));

        // A poisoned registry still hands out an id; the listener just never fires.
        if let Ok(mut l) = self.listeners.lock() {
            l.push((id, listener));
        }
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Ok(mut l) = self.listeners.lock() else {
            return false;
        };
        let before = l.len();
        l.retain(|(sid, _)| *sid != id);
        l.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn publish_reaches_every_listener() {
        let bus = InMemoryEventBus::<u32>::new();
        let seen = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let seen = seen.clone();
            bus.subscribe(Arc::new(move |m: &u32| {
                seen.fetch_add(*m as usize, Ordering::SeqCst);
            }));
        }

        assert_eq!(bus.publish(&2), 3);
        assert_eq!(seen.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let bus = InMemoryEventBus::<()>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let id = bus.subscribe(Arc::new(move |_: &()| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(&());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn listener_may_unsubscribe_itself_during_publish() {
        let bus = Arc::new(InMemoryEventBus::<()>::new());
        let own_id = Arc::new(Mutex::new(None::<SubscriptionId>));

        let b = bus.clone();
        let slot = own_id.clone();
        let id = bus.subscribe(Arc::new(move |_: &()| {
            if let Some(id) = *slot.lock().unwrap() {
                b.unsubscribe(id);
            }
        }));
        *own_id.lock().unwrap() = Some(id);

        assert_eq!(bus.publish(&()), 1);
        assert_eq!(bus.listener_count(), 0);
    }
}
