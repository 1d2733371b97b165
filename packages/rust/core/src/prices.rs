//! Market category tables.

use tracing::{info, instrument, warn};

use whguide_market::AggregatesClient;
use whguide_sheet::OutputSink;
use whguide_shared::{BatchError, CategoryConfig, RegionId, Result};

use crate::pipeline::ProgressReporter;

/// Outcome of refreshing one category range.
#[derive(Debug)]
pub struct CategoryReport {
    pub name: String,
    pub range: String,
    /// Data rows written below the header.
    pub rows: usize,
    /// Batches or identifiers stepped over while loading.
    pub errors: Vec<BatchError>,
}

/// Load aggregates for `category`, clear its range and write the table.
///
/// The range is rewritten even when some batches failed: a partial table
/// replaces the old one, and the failures are returned in the report.
#[instrument(skip_all, fields(category = %category.name, range = %category.range))]
pub async fn update_category<S: OutputSink>(
    market: &AggregatesClient,
    sink: &S,
    category: &CategoryConfig,
    region: Option<RegionId>,
    progress: &dyn ProgressReporter,
) -> Result<CategoryReport> {
    let ids = (!category.ids.is_null()).then_some(&category.ids);
    let loaded = market
        .load_region_aggregates_with(ids, region, |current, total| {
            progress.batch_done(&category.name, current, total)
        })
        .await?;

    if !loaded.is_complete() {
        warn!(errors = loaded.errors.len(), "category loaded with gaps");
    }

    sink.clear_range(&category.range).await?;
    sink.write_block(&category.range, 0, 0, &loaded.value).await?;

    let rows = loaded.value.len().saturating_sub(1);
    info!(rows, "category table written");

    Ok(CategoryReport {
        name: category.name.clone(),
        range: category.range.clone(),
        rows,
        errors: loaded.errors,
    })
}
