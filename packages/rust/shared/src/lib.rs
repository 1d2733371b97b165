//! Shared types, error model, and configuration for whguide.
//!
//! This crate is the foundation depended on by all other whguide crates.
//! It provides:
//! - [`GuideError`], the unified error type
//! - Domain types ([`TypeId`], [`MarketAggregate`], [`CellValue`], [`PartialResult`])
//! - Identifier normalisation and batching ([`clean_type_ids`], [`chunk_type_ids`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod ids;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CategoryConfig, DogmaSheetConfig, EsiSettings, MarketSettings, TimestampSettings,
    WorkbookSettings, config_dir, config_file_path, init_config, init_config_at, load_config,
    load_config_from, validate_config, workbook_path,
};
pub use error::{GuideError, Result};
pub use ids::{MAX_BATCH_SIZE, chunk_type_ids, clean_type_ids};
pub use types::{
    AttributeRecord, BatchError, CellValue, HOME_REGION, MarketAggregate, OrderStats, OutputRow,
    PartialResult, RegionId, TypeId,
};
