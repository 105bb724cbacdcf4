// src/pipeline/preview.rs

//! Dry run: classify scraped events and render what would be sent, without
//! touching the sink or writing to the store.

use crate::error::{AppError, Result};
use crate::models::{Event, FormattedMessage, render};
use crate::pipeline::{ChangeKind, DiffEngine};
use crate::sources::SourceAdapter;
use crate::storage::EventStore;

/// One event that a real run would act on.
#[derive(Debug, Clone)]
pub struct PreviewItem {
    pub source: String,
    pub kind: ChangeKind,
    pub event: Event,
    pub changed_fields: Vec<&'static str>,
    pub message: FormattedMessage,
}

/// Fetch and classify every source, returning the NEW and CHANGED events.
pub async fn run_preview(
    sources: &[Box<dyn SourceAdapter>],
    store: &dyn EventStore,
) -> Result<Vec<PreviewItem>> {
    let engine = DiffEngine::new(store);
    let mut items = Vec::new();
    let mut failed = 0;

    for source in sources {
        let records = match source.fetch_raw().await {
            Ok(records) => records,
            Err(e) => {
                failed += 1;
                log::error!("Source {} failed: {}", source.name(), e);
                continue;
            }
        };

        for raw in &records {
            let event = match Event::normalize(raw) {
                Ok(event) => event,
                Err(e) => {
                    log::warn!("Skipping record from {}: {}", source.name(), e);
                    continue;
                }
            };

            let classification = engine.classify(event).await?;
            if classification.kind() == ChangeKind::Unchanged {
                continue;
            }
            items.push(PreviewItem {
                source: source.name().to_string(),
                kind: classification.kind(),
                changed_fields: classification.changed_fields(),
                message: render(classification.event()),
                event: classification.event().clone(),
            });
        }
    }

    if !sources.is_empty() && failed == sources.len() {
        return Err(AppError::AllSourcesFailed(failed));
    }
    Ok(items)
}
