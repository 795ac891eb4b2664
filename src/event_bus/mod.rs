//! The event bridge: typed publish/subscribe decoupling the engine from
//! module UIs and cross-cutting consumers.
//!
//! Organised around a broadcast-based [`EventHub`] (the engine's feedback
//! loop) and a sink-oriented [`EventBus`] for mirroring signals to output
//! targets.

pub mod bus;
pub mod event;
pub mod hub;
pub mod sink;

pub use bus::EventBus;
pub use event::BridgeEvent;
pub use hub::{EventHub, EventStream};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
