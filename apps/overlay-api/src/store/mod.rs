//! Storage-backed implementations of the item and overlay adapters.

pub mod memory;
pub mod postgres;
