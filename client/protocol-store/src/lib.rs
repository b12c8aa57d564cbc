//! Siaduan Protocol State Store
//!
//! Owns the wallet session and the latest [`ProtocolSnapshot`] of on-chain
//! state, and keeps the snapshot fresh:
//!
//! - once right after a successful connect
//! - after every completed action (the executor calls [`ProtocolStore::refresh`])
//! - every 10 seconds while connected, from a background task
//!
//! A refresh is all-or-nothing. If any read fails the previous snapshot
//! stays in place and the failure is only logged.
//!
//! [`ProtocolSnapshot`]: siaduan_common::ProtocolSnapshot

pub mod store;

pub use store::{ProtocolStore, StoreConfig, WalletEvent};
