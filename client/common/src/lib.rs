//! Siaduan Common Library
//!
//! Shared types, constants, and utilities for every crate of the Siaduan
//! dashboard client.
//!
//! ## What lives here
//!
//! The dashboard is a thin client over three external EVM contracts
//! (a mock USDC token, the lending vault and the rate coordinator). All
//! share accounting and rebalancing happen on-chain; the client only reads
//! state and submits transactions. This crate holds the vocabulary the
//! other crates share:
//!
//! - **Constants**: token scales, rate bounds, polling cadence, deployed
//!   contract addresses and the expected network
//! - **Types**: addresses, transaction hashes, the protocol snapshot and the
//!   connection state
//! - **Math**: fixed-point parsing and formatting (`parseUnits` /
//!   `formatUnits` semantics)
//! - **Errors**: the error taxonomy with stable error codes
//! - **Events**: the action step log written by the executor

pub mod constants;
pub mod errors;
pub mod types;
pub mod math;
pub mod events;
pub mod config;

// Re-exports for convenience
pub use constants::*;
pub use errors::*;
pub use types::*;
pub use math::*;
pub use events::*;
pub use config::*;
