//! Per-record update decision
//!
//! `derive_update` is a pure function of the record and the field mapping:
//! the target value is the source value, copied verbatim. Repeating it, or
//! racing another writer running the same derivation, converges on the same
//! stored value.

use crate::record::{FieldMapping, Record, RecordKey};
use crate::result::FailureReason;
use crate::store::Assignment;

/// A fully-addressed update ready to send to the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub key: RecordKey,
    pub assignments: Vec<Assignment>,
}

/// Decide what to write for `record`, or why it must be skipped.
///
/// The partition key is checked before the sort key, and both before the
/// source field.
pub fn derive_update(
    record: &Record,
    mapping: &FieldMapping,
) -> Result<PlannedUpdate, FailureReason> {
    let partition = record
        .get(&mapping.partition_key)
        .filter(|v| v.is_usable_key())
        .ok_or(FailureReason::MissingPartitionKey)?;
    let sort = record
        .get(&mapping.sort_key)
        .filter(|v| v.is_usable_key())
        .ok_or(FailureReason::MissingSortKey)?;
    let source = record
        .get(&mapping.source_field)
        .ok_or(FailureReason::MissingSourceField)?;

    Ok(PlannedUpdate {
        key: RecordKey::new(
            mapping.partition_key.clone(),
            partition.clone(),
            mapping.sort_key.clone(),
            sort.clone(),
        ),
        assignments: vec![Assignment::new(
            mapping.target_field.clone(),
            source.clone(),
        )],
    })
}
