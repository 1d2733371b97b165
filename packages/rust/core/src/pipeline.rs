//! Triggers: refresh a set of ranges, then stamp the time.
//!
//! - [`update_dogma`] refreshes every dogma sheet
//! - [`update_prices`] refreshes every market category
//!
//! Both finish by writing the timestamp to the configured cells.

use std::time::{Duration, Instant};

use tracing::{info, instrument};

use whguide_esi::EsiClient;
use whguide_market::AggregatesClient;
use whguide_sheet::OutputSink;
use whguide_shared::{AppConfig, RegionId, Result};

use crate::dogma::{self, DogmaSheetReport};
use crate::prices::{self, CategoryReport};
use crate::timestamp::{self, Clock};

/// Summary of one trigger run.
#[derive(Debug)]
pub struct RunReport {
    pub dogma: Vec<DogmaSheetReport>,
    pub prices: Vec<CategoryReport>,
    /// The string written to the timestamp cells.
    pub stamped_at: String,
    pub elapsed: Duration,
}

impl RunReport {
    /// Items or identifiers that did not make it into the workbook.
    pub fn error_count(&self) -> usize {
        self.dogma.iter().map(|d| d.failed.len()).sum::<usize>()
            + self.prices.iter().map(|p| p.errors.len()).sum::<usize>()
    }
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when starting on a new range.
    fn phase(&self, name: &str);
    /// Called after each dogma item, whether it was written or skipped.
    fn item_done(&self, range: &str, current: usize, total: usize);
    /// Called after each aggregates batch request of a market category.
    fn batch_done(&self, category: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_done(&self, _range: &str, _current: usize, _total: usize) {}
    fn batch_done(&self, _category: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// Refresh every dogma sheet, then record the time.
#[instrument(skip_all, fields(sheets = config.dogma_sheets.len()))]
pub async fn update_dogma<S: OutputSink>(
    config: &AppConfig,
    sink: &S,
    clock: &dyn Clock,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();
    let esi = EsiClient::new(&config.esi)?;

    let mut sheets = Vec::with_capacity(config.dogma_sheets.len());
    for sheet in &config.dogma_sheets {
        progress.phase(&format!("Updating {}", sheet.range));
        sheets.push(dogma::update_dogma_sheet(&esi, sink, sheet, progress).await?);
    }

    progress.phase("Recording timestamp");
    let stamped_at = timestamp::record_timestamp(sink, &config.timestamps.ranges, clock.now()).await?;

    let report = RunReport {
        dogma: sheets,
        prices: Vec::new(),
        stamped_at,
        elapsed: start.elapsed(),
    };
    info!(
        errors = report.error_count(),
        elapsed_ms = report.elapsed.as_millis(),
        "dogma update complete"
    );
    progress.done(&report);
    Ok(report)
}

/// Refresh every market category, then record the time.
///
/// `region` overrides the configured region for this run only.
#[instrument(skip_all, fields(categories = config.categories.len()))]
pub async fn update_prices<S: OutputSink>(
    config: &AppConfig,
    sink: &S,
    region: Option<RegionId>,
    clock: &dyn Clock,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();
    let market = AggregatesClient::new(&config.market)?;

    let mut categories = Vec::with_capacity(config.categories.len());
    for category in &config.categories {
        progress.phase(&format!("Updating {} prices", category.name));
        categories.push(prices::update_category(&market, sink, category, region, progress).await?);
    }

    progress.phase("Recording timestamp");
    let stamped_at = timestamp::record_timestamp(sink, &config.timestamps.ranges, clock.now()).await?;

    let report = RunReport {
        dogma: Vec::new(),
        prices: categories,
        stamped_at,
        elapsed: start.elapsed(),
    };
    info!(
        errors = report.error_count(),
        elapsed_ms = report.elapsed.as_millis(),
        "price update complete"
    );
    progress.done(&report);
    Ok(report)
}
