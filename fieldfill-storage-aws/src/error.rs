//! Error types for the AWS storage backend

use thiserror::Error;

/// Errors from AWS storage operations
#[derive(Debug, Error)]
pub enum AwsStorageError {
    /// Record not found (conditional update found no row)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Throttled - rate limited or capacity exceeded
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Attribute value the engine cannot represent
    #[error("Unsupported attribute value: {0}")]
    UnsupportedValue(String),

    /// DynamoDB SDK error
    #[error("DynamoDB error: {0}")]
    DynamoDB(String),
}

impl AwsStorageError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn throttled(msg: impl Into<String>) -> Self {
        Self::Throttled(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn unsupported_value(msg: impl Into<String>) -> Self {
        Self::UnsupportedValue(msg.into())
    }

    pub fn dynamodb(msg: impl Into<String>) -> Self {
        Self::DynamoDB(msg.into())
    }
}

/// Result type for AWS storage operations
pub type Result<T> = std::result::Result<T, AwsStorageError>;

// Convert to engine errors
impl From<AwsStorageError> for fieldfill_core::StoreError {
    fn from(err: AwsStorageError) -> Self {
        match err {
            AwsStorageError::NotFound(msg) => fieldfill_core::StoreError::not_found(msg),
            AwsStorageError::Throttled(msg) => fieldfill_core::StoreError::throttled(msg),
            AwsStorageError::UnsupportedValue(msg) | AwsStorageError::InvalidConfig(msg) => {
                fieldfill_core::StoreError::invalid_request(msg)
            }
            AwsStorageError::DynamoDB(msg) => fieldfill_core::StoreError::storage(msg),
        }
    }
}
