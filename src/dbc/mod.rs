//! # dbc
//!
//! Parsing utilities for **DBC** CAN database files.
//! Use `dbc::parse::load_dbc(...)` to populate a bus inside a
//! [`BusRegistry`](crate::types::registry::BusRegistry).
//! Per-keyword line parsers live under `dbc::core`.

pub(crate) mod core;
pub mod parse;
