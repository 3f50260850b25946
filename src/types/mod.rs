//! Domain types for the CAN database graph.
//!
//! Storage follows the arena pattern: a [`bus::CanBus`] owns SlotMaps of
//! [`node::CanNode`], [`message::CanMessage`] and [`signal::CanSignal`];
//! back-references are plain keys resolved through the owning bus.

pub mod bus;
pub mod errors;
pub mod events;
pub mod message;
pub mod node;
pub mod registry;
pub mod signal;
