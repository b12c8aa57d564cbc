//! Siaduan Action Executor
//!
//! Runs the four user actions against the chain and reports each one's
//! progress through a per-slot state machine:
//!
//! ```text
//! mint / withdraw / report rates:  idle -> submitting -> confirming -> done | failed
//! deposit:  idle -> [approving] -> submitting -> confirming -> done | failed
//! ```
//!
//! Approval is only inserted when the current allowance is below the
//! deposit amount. Every `done` triggers exactly one snapshot refresh;
//! a `failed` action triggers none and leaves whatever already landed
//! on-chain in place.

pub mod action;
pub mod executor;

#[cfg(test)]
mod integration_tests;

pub use action::{ActionFailure, ActionOutcome, PendingAction};
pub use executor::ActionExecutor;
