//! DynamoDB expression constants
//!
//! The backfill only ever issues two shapes of request against the table:
//!
//! ```text
//! Scan:
//!   FilterExpression      attribute_not_exists(#target)
//!   ExclusiveStartKey     <LastEvaluatedKey of previous page>
//!
//! UpdateItem:
//!   Key                   { <partition_key>, <sort_key> }
//!   UpdateExpression      SET #a0 = :v0, #a1 = :v1, ...
//!   ConditionExpression   attribute_exists(#pk)
//! ```
//!
//! Attribute names always go through ExpressionAttributeNames so that reserved
//! words (`timestamp`, `status`, ...) are safe to use as field names.

/// Placeholder for the backfilled attribute name
pub const NAME_TARGET: &str = "#target";

/// Placeholder for the partition key attribute name
pub const NAME_PARTITION_KEY: &str = "#pk";

/// Prefix for assigned attribute names (`#a0`, `#a1`, ...)
pub const NAME_ASSIGNMENT_PREFIX: &str = "#a";

/// Prefix for assigned values (`:v0`, `:v1`, ...)
pub const VALUE_ASSIGNMENT_PREFIX: &str = ":v";

/// Scan filter: candidate records lack the target attribute
pub const FILTER_TARGET_NOT_EXISTS: &str = "attribute_not_exists(#target)";

/// Update guard: the addressed record must already exist
pub const CONDITION_RECORD_EXISTS: &str = "attribute_exists(#pk)";

/// Default table name
pub const DEFAULT_TABLE_NAME: &str = "NCMWDashboardSessionlogs";

/// Region used when neither the caller nor the SDK environment names one
pub const DEFAULT_REGION: &str = "us-west-2";
