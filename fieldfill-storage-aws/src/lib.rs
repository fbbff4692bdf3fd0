//! AWS storage backend for fieldfill
//!
//! - **DynamoDB table store** (`dynamodb` feature, default): scans a table with
//!   an `attribute_not_exists` filter and applies key-qualified `UpdateItem`
//!   calls that never create new items
//!
//! ## Usage
//!
//! ```ignore
//! use fieldfill_storage_aws::{DynamoDbConfig, DynamoDbTableStore};
//!
//! let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
//! let store = DynamoDbTableStore::new(
//!     &sdk_config,
//!     DynamoDbConfig {
//!         table_name: "my-table".to_string(),
//!         ..Default::default()
//!     },
//! )
//! .await?;
//! ```

pub mod error;

#[cfg(feature = "dynamodb")]
pub mod dynamodb;

pub use error::{AwsStorageError, Result};

#[cfg(feature = "dynamodb")]
pub use dynamodb::{DynamoDbConfig, DynamoDbTableStore, KeySchema};

// Re-export the engine trait for convenience
pub use fieldfill_core::TableStore;
