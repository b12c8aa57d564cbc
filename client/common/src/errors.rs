//! Error Types for the Siaduan Dashboard
//!
//! Typed errors shared by the chain client, the state store and the
//! action executor. Each variant carries a stable code for logs.

use thiserror::Error;

use crate::types::{ActionSlot, ActionStatus, TxHash};

/// Result type alias for Siaduan operations
pub type SiaduanResult<T> = Result<T, SiaduanError>;

/// Main error enum for the dashboard client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SiaduanError {
    // ============ Connection Errors ============
    /// No read provider or session is bound
    #[error("not connected: {reason}")]
    Connection { reason: &'static str },

    /// Transport-level failure talking to the node (HTTP, malformed envelope)
    #[error("transport error: {reason}")]
    Transport { reason: String },

    // ============ Signing Errors ============
    /// No signing identity bound, or the wallet refused to provide one
    #[error("signing unavailable: {reason}")]
    Signing { reason: String },

    /// The user declined the transaction in the wallet
    #[error("rejected by user: {reason}")]
    Rejected { reason: String },

    // ============ Chain Errors ============
    /// A call reverted, or a reference read failed on the node
    #[error("{reason}")]
    Chain { reason: String },

    /// No receipt appeared within the confirmation timeout
    #[error("transaction {tx_hash} not confirmed after {waited_secs}s")]
    ConfirmationTimeout { tx_hash: TxHash, waited_secs: u64 },

    /// Return data could not be decoded
    #[error("could not decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    // ============ Input Validation Errors ============
    /// Amount is zero or cannot be represented
    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: &'static str },

    /// Invalid input parameter
    #[error("invalid {param}: {reason}")]
    InvalidInput { param: &'static str, reason: &'static str },

    // ============ Action Errors ============
    /// Another action on the same slot is still in flight
    #[error("{slot} action already in progress ({status})")]
    SlotBusy { slot: ActionSlot, status: ActionStatus },

    /// Illegal pending-action transition
    #[error("invalid action transition {from} -> {to}")]
    InvalidStateTransition { from: ActionStatus, to: ActionStatus },

    /// The caller stopped waiting before the action finished
    #[error("cancelled before completion")]
    Cancelled,
}

impl SiaduanError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "E001_NOT_CONNECTED",
            Self::Transport { .. } => "E002_TRANSPORT",
            Self::Signing { .. } => "E010_SIGNING_UNAVAILABLE",
            Self::Rejected { .. } => "E011_USER_REJECTED",
            Self::Chain { .. } => "E020_CHAIN",
            Self::ConfirmationTimeout { .. } => "E021_CONFIRMATION_TIMEOUT",
            Self::Decode { .. } => "E022_DECODE",
            Self::InvalidAmount { .. } => "E030_INVALID_AMOUNT",
            Self::InvalidInput { .. } => "E031_INVALID_INPUT",
            Self::SlotBusy { .. } => "E040_SLOT_BUSY",
            Self::InvalidStateTransition { .. } => "E041_INVALID_TRANSITION",
            Self::Cancelled => "E042_CANCELLED",
        }
    }

    /// Returns true if the user can simply try again
    ///
    /// Nothing is retried automatically; this only informs the message the
    /// front-end shows.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Rejected { .. } => true,            // Approve it this time
            Self::Transport { .. } => true,           // Node hiccup
            Self::ConfirmationTimeout { .. } => true, // Still pending, check the explorer
            Self::SlotBusy { .. } => true,            // Wait for the running action
            Self::InvalidAmount { .. } => true,       // Fix the input
            Self::InvalidInput { .. } => true,
            Self::Cancelled => true, // A submitted tx may still land
            _ => false,
        }
    }

    /// Shorthand for a chain error
    pub fn chain(reason: impl Into<String>) -> Self {
        Self::Chain { reason: reason.into() }
    }

    /// Shorthand for a transport error
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport { reason: reason.into() }
    }
}
