use std::io;
use thiserror::Error;

use crate::types::bus::{MessageKey, SignalKey};

/// Errors produced while loading a `.dbc` file.
#[derive(Debug, Error)]
pub enum DbcLoadError {
    #[error("Not a valid .dbc file: {path}")]
    InvalidExtension { path: String },
    #[error("Failed to open '{path}'. \nError: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed while reading '{path}'. \nError: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Errors produced by the pure bit codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Signal bit length {length} is invalid (must be 1..=64)")]
    InvalidSignal { length: u16 },
    #[error(
        "Signal at start bit {start_bit} (length {length}) does not fit a {frame_bits}-bit frame"
    )]
    SignalOutOfRange {
        start_bit: u16,
        length: u16,
        frame_bits: usize,
    },
    #[error("'{token}' is not a hexadecimal byte")]
    InvalidHexByte { token: String },
}

/// Errors returned by graph-level operations on [`CanBus`](crate::types::bus::CanBus).
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("'{value}' is not a valid DLC or CAN frame byte length")]
    InvalidDlc { value: u16 },
    #[error("Signal '{name}' is not attached to a message")]
    NotAttached { name: String },
    #[error("Message id {id} is not defined on bus '{bus}'")]
    UnresolvedMessage { id: u32, bus: String },
    #[error("Message not found for key {message_key:?}")]
    MessageMissing { message_key: MessageKey },
    #[error("Signal not found for key {signal_key:?}")]
    SignalMissing { signal_key: SignalKey },
    #[error(transparent)]
    Codec(#[from] CodecError),
}
