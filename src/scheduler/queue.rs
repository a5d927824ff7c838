//! The review queue.
//!
//! Holds the items due today ordered by descending priority sample. The
//! store is the source of truth: `refresh` replaces the contents wholesale,
//! everything else edits the in-memory ordering only.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;

use crate::domain::{SchedulableItem, SharedItem};
use crate::error::{IbqError, Result};
use crate::priority::SampleMode;
use crate::scheduler::cadence::{DEFAULT_REFRESH_THRESHOLD_MINUTES, RefreshCadence};
use crate::scheduler::clock::{Clock, SystemClock};
use crate::scheduler::eligibility::{is_due_on, is_due_today};
use crate::scheduler::signal::RefreshSignal;
use crate::storage::{DueItemSource, DueQuery, PriorityUpdate, PriorityWriter, StoredItemRecord};

/// Result of [`Scheduler::add`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AddOutcome {
    /// Inserted at `index` with a freshly drawn `sample`.
    Inserted { index: usize, sample: f64 },
    /// Not due today; queue unchanged.
    NotDue,
    /// No priority parameters; queue unchanged.
    Unconfigured,
}

impl AddOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, AddOutcome::Inserted { .. })
    }
}

/// What a refresh produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefreshReport {
    /// Number of items now queued.
    pub queued: usize,
    /// Items that had no valid cached sample and received a fresh one.
    pub resampled: Vec<(String, f64)>,
    /// Records skipped for lack of priority parameters and cached sample.
    pub skipped_unconfigured: usize,
    /// Records skipped because they were not due.
    pub skipped_not_due: usize,
}

impl RefreshReport {
    /// Write freshly drawn samples back through the given writer.
    pub fn persist(&self, writer: &dyn PriorityWriter) -> Result<()> {
        for (id, sample) in &self.resampled {
            writer.persist_priority(id, &PriorityUpdate::sample(*sample))?;
        }
        Ok(())
    }
}

struct QueueState {
    items: VecDeque<SharedItem>,
    refs: BTreeSet<String>,
    cadence: RefreshCadence,
    in_flight: usize,
}

/// Decrements the in-flight counter even if the refresh future is dropped.
struct InFlight<'a> {
    scheduler: &'a Scheduler,
}

impl<'a> InFlight<'a> {
    fn start(scheduler: &'a Scheduler) -> Self {
        scheduler.lock().in_flight += 1;
        Self { scheduler }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.scheduler.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

/// Review queue over a due-item source.
///
/// All operations take `&self`; share the scheduler behind an `Arc`. Only
/// `refresh` and `preview` suspend. While a refresh is in flight the other
/// operations act on the previous snapshot, which the refresh then replaces.
pub struct Scheduler {
    source: Arc<dyn DueItemSource>,
    clock: Arc<dyn Clock>,
    query_timeout: Option<Duration>,
    state: Mutex<QueueState>,
    refreshed: RefreshSignal,
}

impl Scheduler {
    /// Create a scheduler over the given source, using the system clock.
    pub fn new(source: Arc<dyn DueItemSource>) -> Self {
        Self {
            source,
            clock: Arc::new(SystemClock),
            query_timeout: None,
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                refs: BTreeSet::new(),
                cadence: RefreshCadence::new(DEFAULT_REFRESH_THRESHOLD_MINUTES),
                in_flight: 0,
            }),
            refreshed: RefreshSignal::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_refs<I, S>(self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_refs(refs);
        self
    }

    pub fn with_refresh_threshold(self, minutes: f64) -> Self {
        self.lock().cadence = RefreshCadence::new(minutes);
        self
    }

    /// Fail a refresh whose query takes longer than `timeout`.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    // Every critical section below leaves the state consistent, so a
    // poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Active reference-tag filter.
    pub fn refs(&self) -> BTreeSet<String> {
        self.lock().refs.clone()
    }

    /// Replace the reference-tag filter. Takes effect on the next refresh.
    pub fn set_refs<I, S>(&self, refs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().refs = refs.into_iter().map(Into::into).collect();
    }

    /// Completion signal of the first refresh.
    pub fn refreshed(&self) -> &RefreshSignal {
        &self.refreshed
    }

    /// Whether a refresh is currently awaiting its query.
    pub fn is_refreshing(&self) -> bool {
        self.lock().in_flight > 0
    }

    pub fn cadence(&self) -> RefreshCadence {
        self.lock().cadence
    }

    /// Minutes since the last successful refresh, `None` if never refreshed.
    pub fn minutes_since_last_refresh(&self) -> Option<f64> {
        let now = self.clock.now();
        self.lock().cadence.minutes_since_last_refresh(now)
    }

    /// Whether the queue has never been refreshed or the refresh threshold
    /// has passed since the last refresh.
    pub fn needs_refresh(&self) -> bool {
        let now = self.clock.now();
        let cadence = self.lock().cadence;
        cadence.last_refreshed_at().is_none() || cadence.threshold_exceeded(now)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Refresh as of today.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let today = self.clock.today();
        self.refresh_as_of(today).await
    }

    /// Replace the queue with every item due on or before `as_of`.
    ///
    /// On failure the previous contents are left untouched. Concurrent
    /// refreshes each overwrite the queue when they complete.
    pub async fn refresh_as_of(&self, as_of: NaiveDate) -> Result<RefreshReport> {
        let query = DueQuery::new(as_of).with_refs(self.refs()).include_outdated(true);

        let records = {
            let _in_flight = InFlight::start(self);
            self.query(&query).await?
        };

        let (items, mut report) = build_queue(records, |item| is_due_today(item, as_of));
        report.queued = items.len();

        {
            let mut state = self.lock();
            state.items = items;
            state.cadence.record_refresh(self.clock.now());
        }
        self.refreshed.complete();

        tracing::debug!(
            as_of = %as_of,
            queued = report.queued,
            resampled = report.resampled.len(),
            skipped_unconfigured = report.skipped_unconfigured,
            "Queue refreshed"
        );
        Ok(report)
    }

    /// Items due exactly on `date`, sorted, without touching the queue.
    pub async fn preview(&self, date: NaiveDate) -> Result<Vec<SharedItem>> {
        let query = DueQuery::new(date).with_refs(self.refs()).include_outdated(false);
        let records = self.query(&query).await?;
        let (items, _) = build_queue(records, |item| is_due_on(item, date));
        Ok(items.into())
    }

    async fn query(&self, query: &DueQuery) -> Result<Vec<StoredItemRecord>> {
        let fut = self.source.query_due_items(query);
        let result = match self.query_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => Err(IbqError::QuerySource(format!("query timed out after {:?}", timeout))),
            },
            None => fut.await,
        };

        result.map_err(|e| {
            tracing::warn!(error = %e, "Due-items query failed");
            if matches!(e, IbqError::QuerySource(_)) {
                e
            } else {
                IbqError::QuerySource(e.to_string())
            }
        })
    }

    /// Pop the highest-priority item that is still due today.
    ///
    /// Items whose due date moved past today since they were queued are
    /// dropped on the way.
    pub fn next(&self) -> Option<SharedItem> {
        let today = self.clock.today();
        let mut state = self.lock();
        while let Some(item) = state.items.pop_front() {
            if is_due_today(&item.snapshot(), today) {
                return Some(item);
            }
            tracing::debug!(id = %item.id(), due = ?item.due(), "Dropping item no longer due");
        }
        None
    }

    /// Insert an item due today, keeping descending sample order.
    ///
    /// Draws a day-stable sample, so re-adding the same item on the same day
    /// lands it in the same place. An entry with the same id is replaced.
    pub fn add(&self, item: impl Into<SharedItem>) -> AddOutcome {
        let item = item.into();
        let today = self.clock.today();
        let current = item.snapshot();

        if !is_due_today(&current, today) {
            return AddOutcome::NotDue;
        }
        let Some(beta) = current.beta else {
            return AddOutcome::Unconfigured;
        };

        let sample = beta.sample(SampleMode::DeterministicForDay(today));
        item.set_sample(Some(sample));

        let mut state = self.lock();
        state.items.retain(|queued| !queued.has_id(&current.id));
        let index = insertion_index(&state.items, sample);
        state.items.insert(index, item);

        tracing::debug!(id = %current.id, sample, index, "Item added to queue");
        AddOutcome::Inserted { index, sample }
    }

    /// Remove every entry with this id. Returns how many were removed.
    pub fn remove(&self, id: &str) -> usize {
        let mut state = self.lock();
        let before = state.items.len();
        state.items.retain(|queued| !queued.has_id(id));
        before - state.items.len()
    }

    /// Head of the queue without removing it.
    pub fn current(&self) -> Option<SharedItem> {
        self.lock().items.front().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Snapshot of the queued handles in order.
    pub fn items(&self) -> Vec<SharedItem> {
        self.lock().items.iter().cloned().collect()
    }
}

/// Position before the first entry with a strictly smaller sample, or the end.
fn insertion_index(items: &VecDeque<SharedItem>, sample: f64) -> usize {
    items
        .iter()
        .position(|queued| queued.sample().is_none_or(|s| s < sample))
        .unwrap_or(items.len())
}

/// Turn query results into a sorted queue.
///
/// Records failing `keep` are dropped. Items with a valid cached sample keep
/// it; configured items without one get a fresh stochastic draw; the rest are
/// skipped. Duplicate ids keep their first occurrence.
fn build_queue<F>(records: Vec<StoredItemRecord>, keep: F) -> (VecDeque<SharedItem>, RefreshReport)
where
    F: Fn(&SchedulableItem) -> bool,
{
    let mut report = RefreshReport::default();
    let mut seen = HashSet::new();
    let mut items: Vec<SchedulableItem> = Vec::with_capacity(records.len());

    for record in &records {
        if !seen.insert(record.id.as_str()) {
            continue;
        }
        let mut item = SchedulableItem::from_record(record);
        if !keep(&item) {
            report.skipped_not_due += 1;
            continue;
        }
        match (item.valid_sample(), item.beta) {
            (Some(_), _) => {}
            (None, Some(beta)) => {
                let sample = beta.sample(SampleMode::Stochastic);
                item.sample = Some(sample);
                report.resampled.push((item.id.clone(), sample));
            }
            (None, None) => {
                report.skipped_unconfigured += 1;
                continue;
            }
        }
        items.push(item);
    }

    items.sort_by(|a, b| {
        let sa = a.sample.unwrap_or(0.0);
        let sb = b.sample.unwrap_or(0.0);
        sb.total_cmp(&sa)
    });

    (items.into_iter().map(SharedItem::new).collect(), report)
}
