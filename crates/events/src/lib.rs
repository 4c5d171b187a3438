//! `billquill-events` — hook event plumbing (mechanics only, no business rules).
//!
//! Lifecycle services publish a hook event after every successful state
//! change; activity logs, email senders and other side-effect consumers
//! subscribe. Delivery is fire-and-forget: a failed or missing consumer never
//! rolls back the document change that produced the event.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod tenant;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use tenant::TenantScoped;
