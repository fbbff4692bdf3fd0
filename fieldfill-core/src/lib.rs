//! Backfill engine for derived attributes in a key-value table
//!
//! The engine finds every record lacking a target attribute and copies the
//! value of a source attribute into it, one key-qualified update per record.
//! Records that already carry the target are never returned by the scan and
//! never touched, so a second run is a no-op.
//!
//! - [`Scanner`]: paginated scan with the "target does not exist" predicate
//! - [`BackfillDriver`]: per-record update decision and failure accounting
//! - [`TableStore`]: the storage contract adapters implement
//! - [`MemoryTableStore`]: in-memory store for tests
//!
//! ## Usage
//!
//! ```ignore
//! use fieldfill_core::{BackfillDriver, BackfillOptions, FieldMapping};
//!
//! let result = BackfillDriver::new(store, FieldMapping::default())
//!     .options(BackfillOptions::default())
//!     .on_progress(|p| println!("{p}"))
//!     .run()
//!     .await?;
//! println!("{} updated, {} failed", result.updated, result.failed);
//! ```

pub mod derive;
pub mod driver;
mod error;
pub mod memory;
pub mod record;
pub mod result;
pub mod scan;
pub mod store;

pub use derive::{derive_update, PlannedUpdate};
pub use driver::{BackfillDriver, BackfillOptions, ScanStrategy, DEFAULT_PROGRESS_EVERY};
pub use error::{BackfillError, Result, StoreError};
pub use memory::MemoryTableStore;
pub use record::{AttrValue, FieldMapping, Record, RecordKey};
pub use result::{BackfillResult, Failure, FailureReason, Progress};
pub use scan::Scanner;
pub use store::{check_assignments, Assignment, ContinuationToken, Page, ScanFilter, TableStore};
