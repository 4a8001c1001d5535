use crate::types::Amount;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgingError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Customer '{customer_code}' reached allocation with no selected owner or salesperson")]
    AllocationContract { customer_code: String },

    #[error("Customer '{customer_code}': allocated {allocated} exceeds total debt {total}")]
    AllocationExceedsTotal {
        customer_code: String,
        allocated: Amount,
        total: Amount,
    },

    #[error("Customer '{customer_code}' carries an amount beyond the accepted range")]
    AmountOutOfRange { customer_code: String },

    #[error("Config error: {reason}")]
    Config { reason: String },
}

pub type AgingResult<T> = Result<T, AgingError>;
