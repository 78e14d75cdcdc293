//! # credo-bus
//!
//! The message-bus adapter: a typed envelope over four logical channels,
//! an in-process bus implementation, a dispatch table keyed by message kind,
//! and the typed `NetworkBridge` the protocols send through.
//!
//! The adapter is a typed transport, not a protocol — payload semantics
//! belong to the handlers behind the dispatch table.

pub mod bridge;
pub mod bus;
pub mod channel;
pub mod dispatch;
pub mod envelope;
pub mod messages;

pub use bridge::NetworkBridge;
pub use bus::{BusReceiver, InMemoryBus, MessageBus};
pub use channel::Channel;
pub use dispatch::DispatchTable;
pub use envelope::{Envelope, MessageKind};

/// Maximum messages buffered per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
