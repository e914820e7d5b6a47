//! Change-notification mechanics.
//!
//! Transport-agnostic pub/sub used to push inventory snapshots from the
//! snapshot source to its consumers (the reconciliation worker, live views).

pub mod bus;
pub mod in_memory_bus;
pub mod notification;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use notification::Notification;
