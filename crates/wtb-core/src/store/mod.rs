//! Binding persistence port and the in-memory reference implementation.

pub mod memory;
pub mod port;
