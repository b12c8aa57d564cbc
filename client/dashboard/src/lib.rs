//! Siaduan Dashboard
//!
//! Line-oriented front-end over the store and the executor: one command per
//! line in, plain-text panels out. The library half (configuration, command
//! parsing, rendering and dispatch) is transport-agnostic; the binary wires
//! it to an HTTP JSON-RPC endpoint.

pub mod command;
pub mod config;
pub mod dashboard;
pub mod render;

pub use command::Command;
pub use config::DashboardConfig;
pub use dashboard::{Dashboard, Reply};
