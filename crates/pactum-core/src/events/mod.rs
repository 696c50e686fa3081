//! Job lifecycle events.
//!
//! The orchestrator publishes every checkpoint and terminal transition on a
//! [`JobEventBus`] so that observers (logs, streaming endpoints, tests) can
//! follow a job without polling the store.

mod bus;
mod event;

pub use bus::{JobEventBus, JobEventSubscriber};
pub use event::{JobEvent, JobEventKind};
