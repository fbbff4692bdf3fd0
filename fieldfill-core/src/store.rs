//! Storage collaborator contract
//!
//! The engine only ever needs two operations from the underlying table: a
//! filtered, paginated scan and a key-qualified update. Adapters (DynamoDB,
//! the in-memory store used by tests) implement [`TableStore`].

use crate::error::{Result, StoreError};
use crate::record::{AttrValue, Record, RecordKey};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug};

/// Predicate pushed down to the store's scan
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanFilter {
    /// Match records that do not carry the named attribute
    AttributeNotExists(String),
}

impl ScanFilter {
    pub fn attribute_not_exists(name: impl Into<String>) -> Self {
        ScanFilter::AttributeNotExists(name.into())
    }

    /// Evaluate the predicate locally (used by stores without pushdown)
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            ScanFilter::AttributeNotExists(name) => !record.contains(name),
        }
    }
}

impl fmt::Display for ScanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanFilter::AttributeNotExists(name) => write!(f, "attribute_not_exists({name})"),
        }
    }
}

/// Opaque cursor returned with a page when more results remain.
///
/// For DynamoDB this is the `LastEvaluatedKey`; other stores may encode any
/// position they like. The engine never looks inside.
#[derive(Clone, PartialEq, Eq)]
pub struct ContinuationToken(BTreeMap<String, AttrValue>);

impl ContinuationToken {
    pub fn new(position: BTreeMap<String, AttrValue>) -> Self {
        Self(position)
    }

    pub fn as_map(&self) -> &BTreeMap<String, AttrValue> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, AttrValue> {
        self.0
    }
}

impl Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContinuationToken")
            .field(&self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One batch of scan results
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub records: Vec<Record>,
    /// Present only if more pages remain
    pub next: Option<ContinuationToken>,
}

/// A single `field := value` assignment applied by an update
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub field: String,
    pub value: AttrValue,
}

impl Assignment {
    pub fn new(field: impl Into<String>, value: AttrValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

/// Reject assignment lists every store must refuse: empty, or naming a field
/// twice.
pub fn check_assignments(assignments: &[Assignment]) -> Result<()> {
    if assignments.is_empty() {
        return Err(StoreError::invalid_request(
            "update requires at least one assignment",
        ));
    }
    let mut seen = BTreeSet::new();
    for assignment in assignments {
        if !seen.insert(assignment.field.as_str()) {
            return Err(StoreError::invalid_request(format!(
                "field '{}' assigned more than once",
                assignment.field
            )));
        }
    }
    Ok(())
}

/// Paginated, key-addressed table access
#[async_trait]
pub trait TableStore: Debug + Send + Sync {
    /// Fetch the next page of records matching `filter`.
    ///
    /// `start` is the token from the previous page (None for the first page).
    /// `limit` is a hint for how many items to evaluate per page; stores that
    /// apply the limit before filtering may legitimately return an empty page
    /// that still carries a continuation token.
    async fn scan(
        &self,
        filter: &ScanFilter,
        start: Option<ContinuationToken>,
        limit: Option<u32>,
    ) -> Result<Page>;

    /// Apply `assignments` to exactly the record at `key`.
    ///
    /// Must not create a record; fails with [`StoreError::NotFound`] when the
    /// key does not exist. Assignment lists rejected by [`check_assignments`]
    /// fail with [`StoreError::InvalidRequest`] before anything is written.
    async fn update(&self, key: &RecordKey, assignments: &[Assignment]) -> Result<()>;
}
