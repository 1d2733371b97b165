//! Pipelines and triggers for whguide.
//!
//! This crate ties the ESI and market clients to an output sink:
//! dogma sheets, market category tables, and the "last updated" stamps.

pub mod dogma;
pub mod pipeline;
pub mod prices;
pub mod timestamp;

pub use pipeline::{ProgressReporter, RunReport, SilentProgress, update_dogma, update_prices};
pub use timestamp::{Clock, FixedClock, SystemClock, format_timestamp, record_timestamp};
