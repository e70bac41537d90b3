//! In-process publish/subscribe plumbing.
//!
//! Used by the exception engine to fan state snapshots out to listeners
//! (dashboard panels, tests). Delivery is synchronous on the publisher's
//! thread.

pub mod bus;
pub mod in_memory_bus;

pub use bus::{EventBus, Listener, SubscriptionId};
pub use in_memory_bus::InMemoryEventBus;
