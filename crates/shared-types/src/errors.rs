//! Common error types used across all tally crates

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base error type for tally engine operations
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum TallyError {
    // Store errors
    #[error("Tick store failure: {message}")]
    Store { message: String },

    #[error("Counter not found: {id}")]
    CounterNotFound { id: i64 },

    #[error("Tick not found: {id}")]
    TickNotFound { id: i64 },

    #[error("Id already in use: {id}")]
    DuplicateId { id: i64 },

    #[error("Tick amount must be finite, got {amount}")]
    InvalidAmount { amount: f64 },

    // Allocation
    #[error("No free id found after {attempts} attempts")]
    AllocatorExhausted { attempts: u32 },

    // Graph inputs
    #[error("Invalid graph inputs: {errors:?}")]
    InvalidInputs { errors: Vec<String> },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TallyError {
    pub fn store(message: impl Into<String>) -> Self {
        TallyError::Store {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        TallyError::Internal {
            message: message.into(),
        }
    }
}

/// Result type alias for tally operations
pub type TallyResult<T> = Result<T, TallyError>;
