//! Wire format of the Fuzzwork aggregates endpoint and its row layout.
//!
//! The endpoint answers with an object keyed by type id (as a string); each
//! value has `buy` and `sell` objects whose statistics are usually encoded as
//! JSON strings. Both strings and plain numbers are accepted.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use whguide_shared::{CellValue, GuideError, MarketAggregate, OrderStats, OutputRow, Result, TypeId};

/// Column labels, in the exact order [`aggregate_row`] emits cells.
pub const HEADER: [&str; 15] = [
    "typeId",
    "Buy Volume",
    "Buy Weighted Average",
    "Max Buy",
    "Min Buy",
    "Buy Std Dev",
    "Median Buy",
    "Percentile Buy Price",
    "Sell Volume",
    "Sell Weighted Average",
    "Max sell",
    "Min Sell",
    "Sell Std Dev",
    "Median Sell",
    "Percentile Sell Price",
];

/// The header row as cells.
pub fn header_row() -> OutputRow {
    HEADER.iter().map(|label| CellValue::from(*label)).collect()
}

/// Flatten one item's aggregate into a data row matching [`HEADER`].
pub fn aggregate_row(type_id: TypeId, aggregate: &MarketAggregate) -> OutputRow {
    let mut row = Vec::with_capacity(HEADER.len());
    row.push(CellValue::from(type_id));
    row.extend(aggregate.buy.cells());
    row.extend(aggregate.sell.cells());
    row
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireAggregate {
    buy: WireStats,
    sell: WireStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStats {
    #[serde(deserialize_with = "flex_f64")]
    volume: f64,
    #[serde(deserialize_with = "flex_f64")]
    weighted_average: f64,
    #[serde(deserialize_with = "flex_f64")]
    max: f64,
    #[serde(deserialize_with = "flex_f64")]
    min: f64,
    #[serde(deserialize_with = "flex_f64")]
    stddev: f64,
    #[serde(deserialize_with = "flex_f64")]
    median: f64,
    #[serde(deserialize_with = "flex_f64")]
    percentile: f64,
}

impl From<WireStats> for OrderStats {
    fn from(w: WireStats) -> Self {
        OrderStats {
            // Volumes are whole units; drop any fractional part.
            volume: w.volume.trunc() as i64,
            weighted_average: w.weighted_average,
            max: w.max,
            min: w.min,
            stddev: w.stddev,
            median: w.median,
            percentile: w.percentile,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexNumber {
    Number(f64),
    Text(String),
}

fn flex_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match FlexNumber::deserialize(deserializer)? {
        FlexNumber::Number(n) => Ok(n),
        FlexNumber::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid number '{s}': {e}"))),
    }
}

/// Parse an aggregates response body into a map keyed by type id.
///
/// Keys that are not positive integers are ignored.
pub fn parse_aggregates(body: &str) -> Result<HashMap<TypeId, MarketAggregate>> {
    let raw: HashMap<String, WireAggregate> =
        serde_json::from_str(body).map_err(|e| GuideError::parse(format!("aggregates: {e}")))?;

    Ok(raw
        .into_iter()
        .filter_map(|(key, wire)| {
            let id = key.trim().parse::<i64>().ok().and_then(|k| TypeId::new(k).ok())?;
            Some((
                id,
                MarketAggregate {
                    buy: wire.buy.into(),
                    sell: wire.sell.into(),
                },
            ))
        })
        .collect())
}
