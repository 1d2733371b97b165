//! Batched market aggregate loading from market.fuzzwork.co.uk.
//!
//! [`AggregatesClient::load_region_aggregates`] takes a raw identifier list,
//! normalises it, splits it into batches the endpoint accepts, fetches each
//! batch in turn with a pause in between, and returns a header row followed
//! by one row per identifier.
//!
//! Failures never escape past the loader once the identifier list has been
//! accepted: they are collected in the returned [`PartialResult`] so callers
//! can decide whether a partial table is good enough.

pub mod aggregate;

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use whguide_shared::{
    BatchError, GuideError, MarketAggregate, MarketSettings, OutputRow, PartialResult, RegionId,
    Result, TypeId, chunk_type_ids, clean_type_ids,
};

pub use aggregate::{HEADER, aggregate_row, header_row, parse_aggregates};

/// User-Agent string for market requests.
const USER_AGENT: &str = concat!("whguide/", env!("CARGO_PKG_VERSION"));

/// Client for the aggregates endpoint.
#[derive(Debug, Clone)]
pub struct AggregatesClient {
    client: Client,
    base_url: String,
    default_region: RegionId,
    batch_size: usize,
    throttle: Duration,
}

impl AggregatesClient {
    /// Build a client from the `[market]` config section.
    pub fn new(settings: &MarketSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| GuideError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            default_region: settings.region_id,
            batch_size: settings.batch_size,
            throttle: Duration::from_millis(settings.throttle_ms),
        })
    }

    fn aggregates_url(&self, region: RegionId, batch: &[TypeId]) -> String {
        let types = batch
            .iter()
            .map(TypeId::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}/aggregates/?region={region}&types={types}", self.base_url)
    }

    /// Fetch one batch of at most 100 identifiers.
    pub async fn fetch_batch(
        &self,
        region: RegionId,
        batch: &[TypeId],
    ) -> Result<HashMap<TypeId, MarketAggregate>> {
        let url = self.aggregates_url(region, batch);
        debug!(%url, size = batch.len(), "fetching aggregates");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GuideError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GuideError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GuideError::Network(format!("{url}: failed to read body: {e}")))?;

        parse_aggregates(&body)
    }

    /// Load aggregates for every identifier in `type_ids`.
    ///
    /// `None` fails with `InvalidArgument` before any request is made.
    /// Otherwise the result always carries the header row; a failed batch
    /// ends the run with the rows gathered so far, and an identifier missing
    /// from an otherwise good response is skipped. Both are reported in
    /// [`PartialResult::errors`].
    pub async fn load_region_aggregates(
        &self,
        type_ids: Option<&Value>,
        region: Option<RegionId>,
    ) -> Result<PartialResult<Vec<OutputRow>>> {
        self.load_region_aggregates_with(type_ids, region, |_, _| {})
            .await
    }

    /// Like [`load_region_aggregates`](Self::load_region_aggregates), calling
    /// `on_batch(current, total)` after every batch that was attempted.
    #[instrument(skip_all, fields(region))]
    pub async fn load_region_aggregates_with(
        &self,
        type_ids: Option<&Value>,
        region: Option<RegionId>,
        mut on_batch: impl FnMut(usize, usize),
    ) -> Result<PartialResult<Vec<OutputRow>>> {
        let type_ids =
            type_ids.ok_or_else(|| GuideError::invalid_argument("Need a list of typeIds"))?;
        let region = region.unwrap_or(self.default_region);
        tracing::Span::current().record("region", region.0);

        let ids = clean_type_ids(type_ids);
        let mut rows = vec![header_row()];
        let mut errors = Vec::new();

        let batches = chunk_type_ids(&ids, self.batch_size);
        let total = batches.len();

        for (index, batch) in batches.enumerate() {
            if !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }

            let aggregates = match self.fetch_batch(region, batch).await {
                Ok(map) => map,
                Err(error) => {
                    warn!(batch = index, size = batch.len(), %error, "aggregate batch failed");
                    errors.push(BatchError {
                        batch: index,
                        type_ids: batch.to_vec(),
                        error,
                    });
                    on_batch(index + 1, total);
                    break;
                }
            };

            for &type_id in batch {
                match aggregates.get(&type_id) {
                    Some(aggregate) => rows.push(aggregate_row(type_id, aggregate)),
                    None => {
                        warn!(batch = index, %type_id, "type missing from aggregates response");
                        errors.push(BatchError {
                            batch: index,
                            type_ids: vec![type_id],
                            error: GuideError::parse(format!(
                                "type {type_id} missing from aggregates response"
                            )),
                        });
                    }
                }
            }
            on_batch(index + 1, total);
        }

        info!(
            requested = ids.len(),
            rows = rows.len() - 1,
            errors = errors.len(),
            "aggregates loaded"
        );

        Ok(PartialResult {
            value: rows,
            errors,
        })
    }
}
