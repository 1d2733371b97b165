//! Core domain types shared by the pipelines and the workbook.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GuideError, Result};

/// Region used for market queries when none is given (The Forge).
pub const HOME_REGION: RegionId = RegionId(10000002);

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// An in-game item type identifier. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct TypeId(u32);

impl TypeId {
    /// Validate a raw integer as a type identifier.
    pub fn new(raw: i64) -> Result<Self> {
        match u32::try_from(raw) {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(GuideError::invalid_argument(format!(
                "type id must be a positive integer, got {raw}"
            ))),
        }
    }

    /// The raw identifier.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for TypeId {
    type Error = GuideError;

    fn try_from(raw: i64) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<TypeId> for i64 {
    fn from(id: TypeId) -> Self {
        i64::from(id.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A market region identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u32);

impl Default for RegionId {
    fn default() -> Self {
        HOME_REGION
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Reference and market data
// ---------------------------------------------------------------------------

/// One dogma attribute of an item type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeRecord {
    pub attribute_id: u32,
    pub value: f64,
}

/// Aggregate statistics for one side (buy or sell) of an item's orders.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrderStats {
    pub volume: i64,
    pub weighted_average: f64,
    pub max: f64,
    pub min: f64,
    pub stddev: f64,
    pub median: f64,
    pub percentile: f64,
}

impl OrderStats {
    /// The seven statistics in column order.
    pub fn cells(&self) -> [CellValue; 7] {
        [
            CellValue::Int(self.volume),
            CellValue::Float(self.weighted_average),
            CellValue::Float(self.max),
            CellValue::Float(self.min),
            CellValue::Float(self.stddev),
            CellValue::Float(self.median),
            CellValue::Float(self.percentile),
        ]
    }
}

/// Buy and sell statistics for one item in one region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarketAggregate {
    pub buy: OrderStats,
    pub sell: OrderStats,
}

// ---------------------------------------------------------------------------
// Output cells
// ---------------------------------------------------------------------------

/// A single cell written to the workbook.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for CellValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<TypeId> for CellValue {
    fn from(v: TypeId) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// One row of cells. Rows have no identity beyond their position.
pub type OutputRow = Vec<CellValue>;

// ---------------------------------------------------------------------------
// Partial results
// ---------------------------------------------------------------------------

/// A failure confined to one batch of a multi-request operation.
#[derive(Debug)]
pub struct BatchError {
    /// Zero-based batch index.
    pub batch: usize,
    /// Identifiers covered by the failed batch (or the single missing one).
    pub type_ids: Vec<TypeId>,
    pub error: GuideError,
}

/// A value built on a best-effort basis, together with the errors that were
/// stepped over while building it.
#[derive(Debug)]
pub struct PartialResult<T> {
    pub value: T,
    pub errors: Vec<BatchError>,
}

impl<T> PartialResult<T> {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}
