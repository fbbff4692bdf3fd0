//! In-memory table store for testing
//!
//! Rows are kept in insertion order behind an `Arc<RwLock>`, so clones share
//! state and the store can be handed to the engine while a test keeps a handle
//! for assertions. Paging follows DynamoDB semantics: the limit bounds how many
//! rows are *evaluated* per page, the filter is applied afterwards, and a
//! continuation token is returned whenever unevaluated rows remain.
//!
//! Unlike a real table, rows may lack key attributes. That lets tests exercise
//! the engine's key precondition.

use crate::error::{Result, StoreError};
use crate::record::{AttrValue, Record, RecordKey};
use crate::store::{
    check_assignments, Assignment, ContinuationToken, Page, ScanFilter, TableStore,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

/// Token attribute holding the next row offset
const OFFSET_ATTR: &str = "__offset";

/// Page size used when the caller passes no limit
pub const DEFAULT_MEMORY_PAGE_SIZE: usize = 100;

#[derive(Default)]
struct Faults {
    /// Keys (rendered via `RecordKey`'s Display) whose update fails
    failing_updates: HashSet<String>,
    /// 1-based scan call number that fails
    failing_scan_call: Option<usize>,
}

#[derive(Default)]
struct Counters {
    scan_calls: usize,
    update_calls: usize,
}

/// In-memory [`TableStore`]
#[derive(Clone)]
pub struct MemoryTableStore {
    rows: Arc<RwLock<Vec<Record>>>,
    page_size: usize,
    faults: Arc<RwLock<Faults>>,
    counters: Arc<RwLock<Counters>>,
}

impl Default for MemoryTableStore {
    fn default() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
            page_size: DEFAULT_MEMORY_PAGE_SIZE,
            faults: Arc::new(RwLock::new(Faults::default())),
            counters: Arc::new(RwLock::new(Counters::default())),
        }
    }
}

impl Debug for MemoryTableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTableStore")
            .field("row_count", &self.rows.read().len())
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl MemoryTableStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `rows`
    pub fn with_rows(rows: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::default();
        store.rows.write().extend(rows);
        store
    }

    /// Override the default page size (rows evaluated per page)
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Snapshot of every row in insertion order
    pub fn rows(&self) -> Vec<Record> {
        self.rows.read().clone()
    }

    /// Look up the row addressed by `key`
    pub fn get(&self, key: &RecordKey) -> Option<Record> {
        self.rows.read().iter().find(|r| key.matches(r)).cloned()
    }

    /// Make every update of `key` fail with a storage error
    pub fn fail_update_for(&self, key: &RecordKey) {
        self.faults.write().failing_updates.insert(key.to_string());
    }

    /// Make the `call`-th scan request (1-based) fail with a storage error
    pub fn fail_scan_call(&self, call: usize) {
        self.faults.write().failing_scan_call = Some(call);
    }

    /// Number of scan requests served (including failed ones)
    pub fn scan_calls(&self) -> usize {
        self.counters.read().scan_calls
    }

    /// Number of update requests received (including failed ones)
    pub fn update_calls(&self) -> usize {
        self.counters.read().update_calls
    }

    fn decode_offset(start: Option<ContinuationToken>) -> Result<usize> {
        let Some(token) = start else {
            return Ok(0);
        };
        match token.as_map().get(OFFSET_ATTR) {
            Some(AttrValue::N(n)) => n
                .parse()
                .map_err(|_| StoreError::invalid_request(format!("bad continuation offset: {n}"))),
            _ => Err(StoreError::invalid_request(
                "continuation token was not issued by this store",
            )),
        }
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn scan(
        &self,
        filter: &ScanFilter,
        start: Option<ContinuationToken>,
        limit: Option<u32>,
    ) -> Result<Page> {
        let call = {
            let mut counters = self.counters.write();
            counters.scan_calls += 1;
            counters.scan_calls
        };
        if self.faults.read().failing_scan_call == Some(call) {
            return Err(StoreError::storage(format!(
                "injected scan failure on call {call}"
            )));
        }

        let offset = Self::decode_offset(start)?;
        let page_size = limit.map(|l| l.max(1) as usize).unwrap_or(self.page_size);

        let rows = self.rows.read();
        let end = offset.saturating_add(page_size).min(rows.len());
        let records = rows
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        let next = (end < rows.len()).then(|| {
            let mut position = BTreeMap::new();
            position.insert(OFFSET_ATTR.to_string(), AttrValue::n(end));
            ContinuationToken::new(position)
        });

        Ok(Page { records, next })
    }

    async fn update(&self, key: &RecordKey, assignments: &[Assignment]) -> Result<()> {
        self.counters.write().update_calls += 1;
        check_assignments(assignments)?;

        let rendered = key.to_string();
        if self.faults.read().failing_updates.contains(&rendered) {
            return Err(StoreError::storage(format!(
                "injected update failure for {rendered}"
            )));
        }

        let mut rows = self.rows.write();
        let row = rows
            .iter_mut()
            .find(|r| key.matches(r))
            .ok_or_else(|| StoreError::not_found(rendered))?;
        for assignment in assignments {
            row.set(assignment.field.clone(), assignment.value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pk: &str, ts: i64) -> Record {
        Record::new()
            .with("session_id", AttrValue::s(pk))
            .with("timestamp", AttrValue::n(ts))
    }

    #[tokio::test]
    async fn test_limit_applies_before_filter() {
        let store = MemoryTableStore::with_rows([
            row("a", 1).with("original_ts", AttrValue::n(1)),
            row("b", 2).with("original_ts", AttrValue::n(2)),
            row("c", 3),
        ])
        .page_size(2);
        let filter = ScanFilter::attribute_not_exists("original_ts");

        // First page evaluates two rows that both carry the field
        let first = store.scan(&filter, None, None).await.unwrap();
        assert!(first.records.is_empty());
        assert!(first.next.is_some());

        let second = store.scan(&filter, first.next, None).await.unwrap();
        assert_eq!(second.records, vec![row("c", 3)]);
        assert!(second.next.is_none());
        assert_eq!(store.scan_calls(), 2);
    }

    #[tokio::test]
    async fn test_update_never_creates() {
        let store = MemoryTableStore::with_rows([row("a", 1)]);
        let key = RecordKey::new("session_id", AttrValue::s("zzz"), "timestamp", AttrValue::n(1));
        let err = store
            .update(&key, &[Assignment::new("original_ts", AttrValue::n(1))])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.rows().len(), 1);
        assert_eq!(store.update_calls(), 1);
    }

    #[tokio::test]
    async fn test_foreign_token_rejected() {
        let store = MemoryTableStore::new();
        let mut position = BTreeMap::new();
        position.insert("session_id".to_string(), AttrValue::s("a"));
        let err = store
            .scan(
                &ScanFilter::attribute_not_exists("x"),
                Some(ContinuationToken::new(position)),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let store = MemoryTableStore::with_rows([row("a", 1)]);
        let key = RecordKey::new("session_id", AttrValue::s("a"), "timestamp", AttrValue::n(1));
        store.fail_update_for(&key);
        store.fail_scan_call(1);

        let filter = ScanFilter::attribute_not_exists("original_ts");
        assert!(store.scan(&filter, None, None).await.is_err());
        assert!(store.scan(&filter, None, None).await.is_ok());
        let err = store
            .update(&key, &[Assignment::new("original_ts", AttrValue::n(1))])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }

    #[tokio::test]
    async fn test_update_applies_every_assignment() {
        let store = MemoryTableStore::with_rows([row("a", 1)]);
        let key = RecordKey::new("session_id", AttrValue::s("a"), "timestamp", AttrValue::n(1));

        store
            .update(
                &key,
                &[
                    Assignment::new("original_ts", AttrValue::n(1)),
                    Assignment::new("migrated", AttrValue::Bool(true)),
                ],
            )
            .await
            .unwrap();
        let updated = store.get(&key).unwrap();
        assert_eq!(updated.get("original_ts"), Some(&AttrValue::n(1)));
        assert_eq!(updated.get("migrated"), Some(&AttrValue::Bool(true)));

        let err = store.update(&key, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRequest(_)));
        assert_eq!(store.get(&key), Some(updated));
    }
}
