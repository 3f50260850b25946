//! # can_db
//!
//! Rust utilities for modeling **automotive CAN** databases.
//!
//! ## Highlights
//! - **DBC parser**: load CAN databases from `.dbc` files into a SlotMap-backed
//!   [`CanBus`](crate::types::bus::CanBus) owned by a [`BusRegistry`](crate::types::registry::BusRegistry).
//! - **Stable keys**: nodes/messages/signals use SlotMap keys that remain valid across reordering.
//! - **Signal codec**: bit-exact payload decoding/encoding for Intel and Motorola layouts,
//!   including CAN FD frames up to 64 bytes.
//! - **Change events**: payload and signal mutations emit
//!   [`BusEvent`](crate::types::events::BusEvent)s to registered observers.

pub mod codec;
pub mod dbc;
pub mod types;

pub use crate::types::bus::CanBus;
pub use crate::types::events::{BusEvent, ObserverId};
pub use crate::types::registry::BusRegistry;
