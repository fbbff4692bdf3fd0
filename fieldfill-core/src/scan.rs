//! Predicate-driven full-table scan

use crate::error::Result;
use crate::record::Record;
use crate::store::{ContinuationToken, ScanFilter, TableStore};
use tracing::debug;

#[derive(Debug)]
enum Cursor {
    Start,
    Next(ContinuationToken),
    Done,
}

/// Walks every page of a filtered table scan.
///
/// The scanner holds no state beyond the current cursor; a new scanner always
/// starts from the beginning of the table.
#[derive(Debug)]
pub struct Scanner<'a, S: TableStore + ?Sized> {
    store: &'a S,
    filter: ScanFilter,
    page_size: Option<u32>,
    cursor: Cursor,
    pages_fetched: usize,
}

impl<'a, S: TableStore + ?Sized> Scanner<'a, S> {
    pub fn new(store: &'a S, filter: ScanFilter) -> Self {
        Self {
            store,
            filter,
            page_size: None,
            cursor: Cursor::Start,
            pages_fetched: 0,
        }
    }

    /// Per-page evaluation limit passed through to the store
    pub fn page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// Pages successfully fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.cursor, Cursor::Done)
    }

    /// Fetch the next page of matching records.
    ///
    /// Returns `Ok(None)` once a page without a continuation token has been
    /// consumed. Empty pages that still carry a token are returned as
    /// `Some(vec![])`; the caller keeps going. A store error leaves the cursor
    /// where it was.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>> {
        let start = match &self.cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token.clone()),
        };

        let page = self.store.scan(&self.filter, start, self.page_size).await?;
        self.pages_fetched += 1;

        debug!(
            page = self.pages_fetched,
            records = page.records.len(),
            more = page.next.is_some(),
            filter = %self.filter,
            "scanned page"
        );

        self.cursor = match page.next {
            Some(token) => Cursor::Next(token),
            None => Cursor::Done,
        };
        Ok(Some(page.records))
    }

    /// Run the scan to completion and return every matching record.
    ///
    /// Any page failure aborts the whole scan; partial results are dropped.
    pub async fn collect_all(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await? {
            records.extend(page);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTableStore;
    use crate::record::AttrValue;

    fn candidate(i: i64) -> Record {
        Record::new()
            .with("session_id", AttrValue::s(format!("s{i}")))
            .with("timestamp", AttrValue::n(i))
    }

    #[tokio::test]
    async fn test_scan_follows_tokens_to_completion() {
        let store = MemoryTableStore::with_rows((1..=5).map(candidate)).page_size(2);
        let mut scanner = Scanner::new(&store, ScanFilter::attribute_not_exists("original_ts"));

        let records = scanner.collect_all().await.unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(scanner.pages_fetched(), 3);
        assert!(scanner.is_exhausted());

        // Exhausted scanners do not hit the store again
        assert!(scanner.next_page().await.unwrap().is_none());
        assert_eq!(store.scan_calls(), 3);
    }

    #[tokio::test]
    async fn test_page_size_overrides_store_default() {
        let store = MemoryTableStore::with_rows((1..=5).map(candidate));
        let mut scanner = Scanner::new(&store, ScanFilter::attribute_not_exists("original_ts"))
            .page_size(Some(1));
        assert_eq!(scanner.collect_all().await.unwrap().len(), 5);
        assert_eq!(scanner.pages_fetched(), 5);
    }

    #[tokio::test]
    async fn test_scan_error_aborts() {
        let store = MemoryTableStore::with_rows((1..=5).map(candidate)).page_size(2);
        store.fail_scan_call(2);
        let mut scanner = Scanner::new(&store, ScanFilter::attribute_not_exists("original_ts"));
        assert!(scanner.collect_all().await.is_err());
        assert_eq!(scanner.pages_fetched(), 1);
    }
}
