//! Error types for the clinic_core library.

use crate::Role;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for clinic_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed input at the boundary
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown address or patient id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation requires a role the target account lacks
    #[error("Role mismatch for {address}: expected {expected}, found {actual}")]
    RoleMismatch {
        address: String,
        expected: Role,
        actual: Role,
    },

    /// Slot index outside the fixed schedule
    #[error("Invalid slot index {0}: must be between 0 and 4")]
    InvalidSlot(usize),

    /// Slot is already booked by another patient
    #[error("Slot {slot} of doctor {doctor} is already booked")]
    SlotUnavailable { doctor: String, slot: usize },

    /// Fee paid does not match the required booking fee
    #[error("Insufficient payment: required {required}, paid {paid}")]
    InsufficientPayment { required: u64, paid: u64 },

    /// The record store could not be reached or read
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn store(err: impl std::fmt::Display) -> Self {
        Error::StoreUnavailable(err.to_string())
    }
}
