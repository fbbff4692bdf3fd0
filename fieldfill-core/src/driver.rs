//! Backfill driver
//!
//! Turns every scan candidate into exactly one key-qualified update and keeps
//! the run's accounting. A per-record failure (missing key, rejected update)
//! is counted and reported but never stops the run; only a scan failure is
//! fatal.
//!
//! Two strategies are supported:
//!
//! - [`ScanStrategy::Stream`] (default): each page's candidates are updated
//!   before the next page is requested. Memory is bounded by page size.
//! - [`ScanStrategy::Collect`]: the scan runs to completion first, so the
//!   candidate total is known before the first update and a scan failure
//!   leaves the table untouched.

use crate::derive::{derive_update, PlannedUpdate};
use crate::error::BackfillError;
use crate::record::{FieldMapping, Record};
use crate::result::{BackfillResult, FailureReason, Progress};
use crate::scan::Scanner;
use crate::store::{ScanFilter, TableStore};
use futures::stream::{self, StreamExt};
use std::fmt::Debug;
use tracing::{debug, info, instrument, warn};

/// Successful updates between progress signals
pub const DEFAULT_PROGRESS_EVERY: usize = 10;

/// How scanning and updating are interleaved
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanStrategy {
    /// Update each page as it arrives
    #[default]
    Stream,
    /// Materialize every candidate, then update
    Collect,
}

/// Tuning knobs for a run
#[derive(Clone, Debug)]
pub struct BackfillOptions {
    pub strategy: ScanStrategy,
    /// Per-page evaluation limit passed to the store (store default if None)
    pub page_size: Option<u32>,
    /// Maximum in-flight updates; 1 means strictly sequential, in scan order
    pub concurrency: usize,
    /// Emit a [`Progress`] signal every N successful updates
    pub progress_every: usize,
    /// Scan and validate candidates without writing anything
    pub dry_run: bool,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            strategy: ScanStrategy::default(),
            page_size: None,
            concurrency: 1,
            progress_every: DEFAULT_PROGRESS_EVERY,
            dry_run: false,
        }
    }
}

impl BackfillOptions {
    fn validate(&self) -> Result<(), BackfillError> {
        if self.concurrency == 0 {
            return Err(BackfillError::InvalidOptions(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.progress_every == 0 {
            return Err(BackfillError::InvalidOptions(
                "progress interval must be at least 1".into(),
            ));
        }
        if self.page_size == Some(0) {
            return Err(BackfillError::InvalidOptions(
                "page size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

type ProgressCallback = Box<dyn Fn(Progress) + Send + Sync>;

/// Runs a single derived-field backfill against one table
pub struct BackfillDriver<S: TableStore> {
    store: S,
    mapping: FieldMapping,
    options: BackfillOptions,
    on_progress: Option<ProgressCallback>,
}

impl<S: TableStore> Debug for BackfillDriver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackfillDriver")
            .field("store", &self.store)
            .field("mapping", &self.mapping)
            .field("options", &self.options)
            .finish()
    }
}

impl<S: TableStore> BackfillDriver<S> {
    pub fn new(store: S, mapping: FieldMapping) -> Self {
        Self {
            store,
            mapping,
            options: BackfillOptions::default(),
            on_progress: None,
        }
    }

    pub fn options(mut self, options: BackfillOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a callback for periodic progress signals.
    ///
    /// Called inline on the driver's task; keep it cheap.
    pub fn on_progress(mut self, callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// The candidate predicate: records lacking the target field
    pub fn filter(&self) -> ScanFilter {
        ScanFilter::attribute_not_exists(self.mapping.target_field.clone())
    }

    /// Execute the backfill and return the run's accounting.
    #[instrument(
        skip(self),
        fields(target = %self.mapping.target_field, strategy = ?self.options.strategy)
    )]
    pub async fn run(&self) -> Result<BackfillResult, BackfillError> {
        self.mapping
            .validate()
            .map_err(BackfillError::InvalidOptions)?;
        self.options.validate()?;

        let result = match self.options.strategy {
            ScanStrategy::Collect => self.run_collect().await?,
            ScanStrategy::Stream => self.run_stream().await?,
        };

        if result.matched == 0 {
            info!(
                target_field = %self.mapping.target_field,
                "no candidates; every record already carries the target field"
            );
        } else {
            info!(
                matched = result.matched,
                updated = result.updated,
                failed = result.failed,
                dry_run = result.dry_run,
                "backfill finished"
            );
        }
        Ok(result)
    }

    async fn run_collect(&self) -> Result<BackfillResult, BackfillError> {
        let mut result = self.new_result();
        let mut scanner =
            Scanner::new(&self.store, self.filter()).page_size(self.options.page_size);

        let candidates = match scanner.collect_all().await {
            Ok(records) => records,
            Err(source) => {
                return Err(BackfillError::Scan {
                    page: scanner.pages_fetched() + 1,
                    source,
                    progress: Box::new(result),
                })
            }
        };

        result.matched = candidates.len();
        info!(
            matched = result.matched,
            pages = scanner.pages_fetched(),
            "scan complete"
        );
        if candidates.is_empty() {
            return Ok(result);
        }

        self.apply(candidates, &mut result, true).await;
        Ok(result)
    }

    async fn run_stream(&self) -> Result<BackfillResult, BackfillError> {
        let mut result = self.new_result();
        let mut scanner =
            Scanner::new(&self.store, self.filter()).page_size(self.options.page_size);

        loop {
            let page = match scanner.next_page().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(source) => {
                    return Err(BackfillError::Scan {
                        page: scanner.pages_fetched() + 1,
                        source,
                        progress: Box::new(result),
                    })
                }
            };
            if page.is_empty() {
                continue;
            }
            result.matched += page.len();
            self.apply(page, &mut result, scanner.is_exhausted()).await;
        }

        debug!(pages = scanner.pages_fetched(), "scan complete");
        Ok(result)
    }

    fn new_result(&self) -> BackfillResult {
        BackfillResult {
            dry_run: self.options.dry_run,
            ..BackfillResult::default()
        }
    }

    /// Attempt one update per candidate, folding outcomes into `result`.
    async fn apply(
        &self,
        candidates: Vec<Record>,
        result: &mut BackfillResult,
        scan_complete: bool,
    ) {
        let mut planned: Vec<PlannedUpdate> = Vec::with_capacity(candidates.len());
        for record in &candidates {
            match derive_update(record, &self.mapping) {
                Ok(update) => planned.push(update),
                Err(reason) => {
                    let key = record.describe_key(&self.mapping);
                    warn!(key = %key, %reason, "skipping candidate");
                    result.record_failure(key, reason);
                }
            }
        }

        if self.options.dry_run {
            debug!(would_update = planned.len(), "dry run; no writes issued");
            return;
        }

        let store = &self.store;
        let outcomes = stream::iter(planned)
            .map(|update| async move {
                let outcome = store.update(&update.key, &update.assignments).await;
                (update.key, outcome)
            })
            .buffer_unordered(self.options.concurrency);
        let mut outcomes = std::pin::pin!(outcomes);

        while let Some((key, outcome)) = outcomes.next().await {
            match outcome {
                Ok(()) => {
                    result.record_success();
                    if result.updated % self.options.progress_every == 0 {
                        self.emit_progress(Progress {
                            updated: result.updated,
                            total: result.matched,
                            scan_complete,
                        });
                    }
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "update failed");
                    result.record_failure(
                        key.to_string(),
                        FailureReason::UpdateFailed(e.to_string()),
                    );
                }
            }
        }
    }

    fn emit_progress(&self, progress: Progress) {
        info!(
            updated = progress.updated,
            total = progress.total,
            "{progress}"
        );
        if let Some(callback) = &self.on_progress {
            callback(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTableStore;
    use crate::record::AttrValue;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn candidate(i: usize) -> Record {
        Record::new()
            .with("session_id", AttrValue::s(format!("s{i}")))
            .with("timestamp", AttrValue::n(1_700_000_000 + i))
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_before_scanning() {
        let store = MemoryTableStore::with_rows((0..3).map(candidate));
        let driver = BackfillDriver::new(store.clone(), FieldMapping::default()).options(
            BackfillOptions {
                concurrency: 0,
                ..Default::default()
            },
        );
        assert!(matches!(
            driver.run().await,
            Err(BackfillError::InvalidOptions(_))
        ));
        assert_eq!(store.scan_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_mapping_rejected() {
        let store = MemoryTableStore::new();
        let mapping = FieldMapping {
            target_field: "timestamp".into(),
            ..FieldMapping::default()
        };
        let err = BackfillDriver::new(store, mapping).run().await.unwrap_err();
        assert!(err.to_string().contains("key attribute"));
    }

    #[tokio::test]
    async fn test_stream_skips_empty_pages() {
        // Every row on the first page already has the field
        let mut rows: Vec<Record> = (0..4)
            .map(|i| candidate(i).with("original_ts", AttrValue::n(1)))
            .collect();
        rows.push(candidate(10));
        let store = MemoryTableStore::with_rows(rows).page_size(4);

        let result = BackfillDriver::new(store.clone(), FieldMapping::default())
            .run()
            .await
            .unwrap();
        assert_eq!(result.matched, 1);
        assert_eq!(result.updated, 1);
        assert_eq!(store.scan_calls(), 2);
    }

    #[tokio::test]
    async fn test_progress_counts_only_successes() {
        let store = MemoryTableStore::with_rows((0..25).map(candidate)).page_size(7);
        let bad = derive_update(&candidate(3), &FieldMapping::default())
            .unwrap()
            .key;
        store.fail_update_for(&bad);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let result = BackfillDriver::new(store, FieldMapping::default())
            .on_progress(move |p| sink.lock().push(p.updated))
            .run()
            .await
            .unwrap();

        assert_eq!(result.updated, 24);
        assert_eq!(result.failed, 1);
        assert_eq!(*seen.lock(), vec![10, 20]);
    }
}
