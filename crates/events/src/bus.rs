//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is the **notification layer** between a state owner and whoever
//! wants to observe it:
//!
//! ```text
//! ExceptionEngine (mutates store) → EventBus (publish snapshot) → Listeners
//!                                                                  ├─ dashboard panel
//!                                                                  └─ tests
//! ```
//!
//! - **Synchronous fan-out**: `publish` returns after every listener ran.
//! - **No ordering contract** between listeners.
//! - **No persistence**: a listener registered after a publish never sees it.

use std::sync::Arc;

/// Callback invoked with every published message.
pub type Listener<M> = Arc<dyn Fn(&M) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Domain-agnostic listener bus.
///
/// Implementations must be safe to share across threads, and must tolerate a
/// listener calling `unsubscribe` (for itself or another listener) while a
/// publish is in progress.
pub trait EventBus<M>: Send + Sync {
    /// Deliver `message` to every registered listener.
    ///
    /// Returns the number of listeners that were invoked.
    fn publish(&self, message: &M) -> usize;

    fn subscribe(&self, listener: Listener<M>) -> SubscriptionId;

    /// Remove a listener. Returns `false` if it was already gone.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    fn publish(&self, message: &M) -> usize {
        (**self).publish(message)
    }

    fn subscribe(&self, listener: Listener<M>) -> SubscriptionId {
        (**self).subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        (**self).unsubscribe(id)
    }
}
