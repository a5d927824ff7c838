//! Scheduler module: the review queue and its supporting pieces.
//!
//! This module provides:
//! - **Eligibility**: whether an item is due as of a reference day.
//! - **Scheduler**: the ordered queue with refresh/next/add/remove.
//! - **Cadence**: elapsed time since the last refresh, against a threshold.
//! - **Signal**: completion of the first refresh, for callers that start early.
//! - **Clock**: the time source, replaceable in tests.
//!
//! # Lifecycle
//!
//! 1. Construct a `Scheduler` over a `DueItemSource`
//! 2. `refresh()` pulls every item due today and sorts by sample
//! 3. `next()` pops the best item still due; `add()` re-inserts a rescheduled one
//! 4. Refresh again when the cadence says the snapshot is old
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ibqueue::scheduler::Scheduler;
//! use ibqueue::storage::JsonlItemStore;
//!
//! let store = Arc::new(JsonlItemStore::open("items.jsonl")?);
//! let scheduler = Scheduler::new(store.clone()).with_refs(["reading"]);
//!
//! let report = scheduler.refresh().await?;
//! report.persist(store.as_ref())?;
//! if let Some(item) = scheduler.next() {
//!     println!("next: {}", item.id());
//! }
//! ```

mod cadence;
mod clock;
mod eligibility;
mod queue;
mod signal;

pub use cadence::{DEFAULT_REFRESH_THRESHOLD_MINUTES, RefreshCadence};
pub use clock::{Clock, FixedClock, SystemClock};
pub use eligibility::{is_due_on, is_due_today};
pub use queue::{AddOutcome, RefreshReport, Scheduler};
pub use signal::RefreshSignal;
