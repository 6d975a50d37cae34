//! Error types for the inventory domain.

use crate::types::{CategoryId, ItemId};
use serde::{Deserialize, Serialize};
use stockroom_runtime::StoreError;
use thiserror::Error;

/// Why a command was refused
///
/// A rejected command leaves the collections untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    /// Name is empty after trimming
    #[error("name cannot be empty")]
    EmptyName,

    /// Category does not exist
    #[error("category {0} not found")]
    UnknownCategory(CategoryId),

    /// Item does not exist
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// Initial stock below zero
    #[error("initial quantity cannot be negative (got {0})")]
    NegativeQuantity(i64),

    /// Threshold below one
    #[error("threshold must be at least 1 (got {0})")]
    InvalidThreshold(i64),

    /// Refill or withdrawal of zero or fewer units
    #[error("quantity must be positive (got {0})")]
    NonPositiveQuantity(i64),

    /// Quantity does not fit the stock counter
    #[error("quantity {0} is out of range")]
    QuantityOutOfRange(i64),

    /// Withdrawal would drive stock below zero
    #[error("cannot withdraw {requested} units, only {available} in stock")]
    InsufficientStock {
        /// Units asked for
        requested: i64,
        /// Units on hand
        available: u32,
    },

    /// Edit without any field to change
    #[error("no changes given")]
    NothingToEdit,
}

/// Failures talking to an inventory data source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Request could not be sent or completed
    #[error("request to {endpoint} failed: {message}")]
    Request {
        /// Path requested
        endpoint: String,
        /// Transport error
        message: String,
    },

    /// Backend answered with a non-success status
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Path requested
        endpoint: String,
        /// HTTP status code
        status: u16,
    },

    /// Response body did not match the expected records
    #[error("could not decode response from {endpoint}: {message}")]
    Decode {
        /// Path requested
        endpoint: String,
        /// Decoder error
        message: String,
    },

    /// Source refuses requests (e.g. a mock switched offline)
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Source could not be built from configuration
    #[error("invalid source configuration: {0}")]
    Config(String),
}

/// Errors returned by [`crate::Dashboard`] operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DashboardError {
    /// The command failed validation
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The batch load failed; call `reload` to retry
    #[error("could not load inventory: {0}")]
    Load(String),

    /// The command was accepted but the record it created could not be read back
    #[error("created record not found after command was applied")]
    MissingResult,

    /// An item-targeted action was requested with no active item
    #[error("no item selected")]
    NoActiveItem,

    /// The store refused or timed out
    #[error(transparent)]
    Store(#[from] StoreError),
}
