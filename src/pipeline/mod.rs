//! Pipeline entry points.
//!
//! - `run_once`: scrape every source, diff against the store, dispatch
//! - `run_preview`: same classification, no delivery and no writes

pub mod diff;
pub mod preview;
pub mod run;

pub use diff::{ChangeKind, Classification, DiffEngine};
pub use preview::{PreviewItem, run_preview};
pub use run::{RunSummary, run_once};
