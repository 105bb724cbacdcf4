// src/pipeline/run.rs

//! One pass of the bot: sources → normalize → diff → dispatch.
//!
//! Events are processed strictly one after another so the dispatcher's rate
//! limiter sees a single serialized stream of calls. A failing event never
//! aborts the run; a run only fails when no source could be fetched.

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Event, RawFields};
use crate::notify::{DispatchOutcome, Dispatcher, NotificationSink};
use crate::pipeline::{ChangeKind, DiffEngine};
use crate::sources::SourceAdapter;
use crate::storage::EventStore;

/// Counters of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub sources_total: usize,
    pub sources_failed: usize,
    pub records_seen: usize,
    /// Records rejected by normalization
    pub invalid: usize,
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub announced: usize,
    pub edited: usize,
    pub already_current: usize,
    pub stored_silently: usize,
    /// Transport failures escalated to the operator
    pub delivery_failures: usize,
    /// Store or lookup errors
    pub event_errors: usize,
}

impl RunSummary {
    fn start() -> Self {
        let now = Utc::now();
        Self {
            start_time: now,
            end_time: now,
            sources_total: 0,
            sources_failed: 0,
            records_seen: 0,
            invalid: 0,
            new: 0,
            changed: 0,
            unchanged: 0,
            announced: 0,
            edited: 0,
            already_current: 0,
            stored_silently: 0,
            delivery_failures: 0,
            event_errors: 0,
        }
    }

    fn count_kind(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::New => self.new += 1,
            ChangeKind::Changed => self.changed += 1,
            ChangeKind::Unchanged => self.unchanged += 1,
        }
    }

    fn count_outcome(&mut self, outcome: &DispatchOutcome) {
        if outcome.is_failure() {
            self.delivery_failures += 1;
            return;
        }
        match outcome {
            DispatchOutcome::Announced { .. } => self.announced += 1,
            DispatchOutcome::Edited => self.edited += 1,
            DispatchOutcome::AlreadyCurrent => self.already_current += 1,
            DispatchOutcome::StoredSilently => self.stored_silently += 1,
            _ => {}
        }
    }

    /// Whether anything new or changed was seen.
    pub fn has_news(&self) -> bool {
        self.new + self.changed > 0
    }

    pub fn elapsed_secs(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }

    /// Write the summary to the log.
    pub fn log(&self) {
        if !self.has_news() {
            log::debug!("Didn't find any new events or changes");
        }
        log::info!(
            "Run finished in {}s: {} records from {}/{} sources ({} invalid)",
            self.elapsed_secs(),
            self.records_seen,
            self.sources_total - self.sources_failed,
            self.sources_total,
            self.invalid
        );
        log::info!(
            "  new: {}, changed: {}, unchanged: {}",
            self.new,
            self.changed,
            self.unchanged
        );
        log::info!(
            "  announced: {}, edited: {}, already current: {}, stored silently: {}",
            self.announced,
            self.edited,
            self.already_current,
            self.stored_silently
        );
        if self.delivery_failures + self.event_errors > 0 {
            log::warn!(
                "  delivery failures: {}, event errors: {}",
                self.delivery_failures,
                self.event_errors
            );
        }
    }
}

/// Run one pass over every source.
pub async fn run_once<S: NotificationSink>(
    sources: &[Box<dyn SourceAdapter>],
    store: &dyn EventStore,
    dispatcher: &mut Dispatcher<S>,
) -> Result<RunSummary> {
    let mut summary = RunSummary::start();
    let engine = DiffEngine::new(store);

    for source in sources {
        summary.sources_total += 1;
        log::info!("Scraping {}", source.name());

        let records = match source.fetch_raw().await {
            Ok(records) => records,
            Err(e) => {
                summary.sources_failed += 1;
                dispatcher
                    .escalate(&format!("Source {} failed", source.name()), &e)
                    .await;
                continue;
            }
        };
        log::info!("{}: {} records scraped", source.name(), records.len());

        for raw in &records {
            summary.records_seen += 1;
            match process_record(&engine, dispatcher, store, raw).await {
                Ok((kind, outcome)) => {
                    summary.count_kind(kind);
                    summary.count_outcome(&outcome);
                }
                Err(AppError::Validation(message)) => {
                    summary.invalid += 1;
                    log::warn!("Skipping record from {}: {}", source.name(), message);
                }
                Err(e) => {
                    summary.event_errors += 1;
                    log::error!("Failed to process record from {}: {}", source.name(), e);
                }
            }
        }
    }

    summary.end_time = Utc::now();
    summary.log();

    if summary.sources_total > 0 && summary.sources_failed == summary.sources_total {
        return Err(AppError::AllSourcesFailed(summary.sources_total));
    }
    Ok(summary)
}

async fn process_record<S: NotificationSink>(
    engine: &DiffEngine<'_>,
    dispatcher: &mut Dispatcher<S>,
    store: &dyn EventStore,
    raw: &RawFields,
) -> Result<(ChangeKind, DispatchOutcome)> {
    let event = Event::normalize(raw)?;
    let label = event.to_string();

    let classification = engine.classify(event).await?;
    let kind = classification.kind();
    match kind {
        ChangeKind::Unchanged => log::debug!("{kind} {label}"),
        ChangeKind::New => log::info!("New event: {label}"),
        ChangeKind::Changed => log::info!(
            "Event changed: {label} ({})",
            classification.changed_fields().join(", ")
        ),
    }

    let outcome = dispatcher.dispatch(classification, store).await?;
    if outcome != DispatchOutcome::Unchanged {
        log::info!("{label}: {outcome}");
    }
    Ok((kind, outcome))
}
