//! Engine events and the hooks that listen to them.
//!
//! Register closures on [`EventHooks`], turn them into [`EventHandlers`], and hand the resulting [`EventProducers`] to
//! the APIs. Events are published after the transaction that caused them has committed.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers, HookFuture};
