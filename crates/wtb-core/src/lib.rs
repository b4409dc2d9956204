//! Core domain + application logic for the wallet-to-Telegram bridge.
//!
//! This crate is intentionally framework-agnostic. Telegram / SQLite / HTTP
//! live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod events;
pub mod formatting;
pub mod link;
pub mod logging;
pub mod messaging;
pub mod signature;
pub mod store;
pub mod telegram_auth;

pub use errors::{Error, Result};
