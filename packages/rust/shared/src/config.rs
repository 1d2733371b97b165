//! Application configuration for whguide.
//!
//! User config lives at `~/.whguide/whguide.toml`.
//! CLI flags override config file values, which override defaults. The
//! defaults carry the identifier lists and ranges of the wormhole guide
//! workbook, so a fresh install refreshes the same sheets with no config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use url::Url;

use crate::error::{GuideError, Result};
use crate::ids::MAX_BATCH_SIZE;
use crate::types::{HOME_REGION, RegionId};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "whguide.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".whguide";

/// Default workbook database file name inside the config directory.
const WORKBOOK_FILE_NAME: &str = "workbook.db";

// ---------------------------------------------------------------------------
// Config structs (matching whguide.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reference-data (ESI) endpoint settings.
    #[serde(default)]
    pub esi: EsiSettings,

    /// Market aggregates endpoint settings.
    #[serde(default)]
    pub market: MarketSettings,

    /// Where the workbook lives.
    #[serde(default)]
    pub workbook: WorkbookSettings,

    /// Cells stamped after every run.
    #[serde(default)]
    pub timestamps: TimestampSettings,

    /// Sheets filled with dogma attribute blocks.
    #[serde(default = "default_dogma_sheets")]
    pub dogma_sheets: Vec<DogmaSheetConfig>,

    /// Market categories, one output range each.
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            esi: EsiSettings::default(),
            market: MarketSettings::default(),
            workbook: WorkbookSettings::default(),
            timestamps: TimestampSettings::default(),
            dogma_sheets: default_dogma_sheets(),
            categories: default_categories(),
        }
    }
}

/// `[esi]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsiSettings {
    #[serde(default = "default_esi_base_url")]
    pub base_url: String,

    #[serde(default = "default_datasource")]
    pub datasource: String,

    #[serde(default = "default_language")]
    pub language: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EsiSettings {
    fn default() -> Self {
        Self {
            base_url: default_esi_base_url(),
            datasource: default_datasource(),
            language: default_language(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_esi_base_url() -> String {
    "https://esi.evetech.net/latest".into()
}
fn default_datasource() -> String {
    "tranquility".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[market]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSettings {
    #[serde(default = "default_market_base_url")]
    pub base_url: String,

    /// Region used when a run does not name one.
    #[serde(default)]
    pub region_id: RegionId,

    /// Identifiers per request, at most 100.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause before each batch request.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            base_url: default_market_base_url(),
            region_id: HOME_REGION,
            batch_size: default_batch_size(),
            throttle_ms: default_throttle_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_market_base_url() -> String {
    "https://market.fuzzwork.co.uk".into()
}
fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}
fn default_throttle_ms() -> u64 {
    100
}

/// `[workbook]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkbookSettings {
    /// Path to the workbook database. Defaults to `~/.whguide/workbook.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// `[timestamps]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampSettings {
    #[serde(default = "default_timestamp_ranges")]
    pub ranges: Vec<String>,
}

impl Default for TimestampSettings {
    fn default() -> Self {
        Self {
            ranges: default_timestamp_ranges(),
        }
    }
}

fn default_timestamp_ranges() -> Vec<String> {
    [
        "C1Date", "C2Date", "C3Date", "C4Date", "C5Date", "C6Date", "gasDate", "oreDate",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[[dogma_sheets]]` entry: a sheet of side-by-side attribute blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DogmaSheetConfig {
    /// Output range the blocks are written into.
    pub range: String,
    /// Item types, one block each, in column order.
    pub ids: Vec<i64>,
}

fn default_dogma_sheets() -> Vec<DogmaSheetConfig> {
    vec![
        DogmaSheetConfig {
            range: "rawSleeperData".into(),
            ids: vec![
                30188, 30189, 30190, 30191, 30192, 30193, 30194, 30195, 30196, 30197, 30198,
                30199, 30200, 30201, 30202, 30203, 30204, 30205, 30206, 30207, 30208, 30209,
                30210, 30211, 30212, 30213, 30214, 30215, 30216, 30217, 30460, 30461, 30462,
                37472, 37473,
            ],
        },
        DogmaSheetConfig {
            range: "rawMissileData".into(),
            ids: vec![30426, 30428, 30430],
        },
    ]
}

/// `[[categories]]` entry: a market category and its output range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Human-readable name (e.g. "gas").
    pub name: String,
    /// Output range overwritten with the category's rows.
    pub range: String,
    /// Identifier list as written by the user; may be nested or contain
    /// non-numeric entries, which are dropped before fetching. A category
    /// without `ids` fails its run with `InvalidArgument`.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub ids: Value,
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig {
            name: "gas".into(),
            range: "gasTab".into(),
            ids: json!([30370, 30371, 30372, 30373, 30374, 30375, 30376, 30377, 30378]),
        },
        CategoryConfig {
            name: "ore".into(),
            range: "oreTab".into(),
            ids: json!([
                18, 19, 20, 21, 22, 1223, 1224, 1225, 1226, 1227, 1228, 1229, 1230, 1231, 1232,
                11396, 17425, 17426, 17428, 17429, 17432, 17433, 17436, 17437, 17440, 17441,
                17444, 17445, 17448, 17449, 17452, 17453, 17455, 17456, 17459, 17460, 17463,
                17464, 17466, 17467, 17470, 17471, 17865, 17866, 17867, 17868, 17869, 17870
            ]),
        },
        CategoryConfig {
            name: "salvage".into(),
            range: "salTab".into(),
            ids: json!([
                30018, 30019, 30021, 30022, 30024, 30248, 30251, 30252, 30254, 30258, 30259,
                30268, 30269, 30270, 30271
            ]),
        },
    ]
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.whguide/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| GuideError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.whguide/whguide.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| GuideError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| GuideError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_dir()?.join(CONFIG_FILE_NAME);
    init_config_at(&path)?;
    Ok(path)
}

/// Write the default config to `path`, replacing whatever is there.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| GuideError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| GuideError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| GuideError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

/// Resolve the workbook database path, expanding a leading `~/`.
pub fn workbook_path(config: &AppConfig) -> Result<PathBuf> {
    match config.workbook.path.as_deref() {
        Some(p) => match p.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir()
                    .ok_or_else(|| GuideError::config("could not determine home directory"))?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(p)),
        },
        None => Ok(config_dir()?.join(WORKBOOK_FILE_NAME)),
    }
}

/// Check the values serde cannot: URLs, batch bounds, range names.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    for (section, base) in [("esi", &config.esi.base_url), ("market", &config.market.base_url)] {
        Url::parse(base)
            .map_err(|e| GuideError::config(format!("[{section}] base_url '{base}': {e}")))?;
    }

    if config.market.batch_size == 0 || config.market.batch_size > MAX_BATCH_SIZE {
        return Err(GuideError::config(format!(
            "[market] batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
            config.market.batch_size
        )));
    }

    let ranges = config
        .dogma_sheets
        .iter()
        .map(|s| &s.range)
        .chain(config.categories.iter().map(|c| &c.range))
        .chain(config.timestamps.ranges.iter());
    for range in ranges {
        if range.trim().is_empty() {
            return Err(GuideError::config("range names must not be empty"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::clean_type_ids;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("market.fuzzwork.co.uk"));
        assert!(toml_str.contains("rawSleeperData"));
        assert!(toml_str.contains("gasDate"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.market.region_id, HOME_REGION);
        assert_eq!(parsed.categories.len(), 3);
        assert_eq!(clean_type_ids(&parsed.categories[1].ids).len(), 48);
        assert_eq!(parsed.dogma_sheets[0].ids.len(), 35);
        validate_config(&parsed).expect("defaults are valid");
    }

    #[test]
    fn defaults_match_workbook_layout() {
        let config = AppConfig::default();
        let ranges: Vec<&str> = config.categories.iter().map(|c| c.range.as_str()).collect();
        assert_eq!(ranges, vec!["gasTab", "oreTab", "salTab"]);
        assert_eq!(config.timestamps.ranges.len(), 8);
        assert_eq!(config.market.batch_size, 100);
    }

    #[test]
    fn nested_category_ids_parse() {
        let toml_str = r#"
[[categories]]
name = "mixed"
range = "mixedTab"
ids = [[30370, 30371], "note", [30372]]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.categories.len(), 1);
        let ids: Vec<u32> = clean_type_ids(&config.categories[0].ids)
            .iter()
            .map(|id| id.get())
            .collect();
        assert_eq!(ids, vec![30370, 30371, 30372]);
        // Sections not present fall back to defaults.
        assert_eq!(config.dogma_sheets.len(), 2);
    }

    #[test]
    fn rejects_oversized_batches() {
        let mut config = AppConfig::default();
        config.market.batch_size = 101;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn rejects_bad_base_url() {
        let mut config = AppConfig::default();
        config.esi.base_url = "not a url".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn explicit_workbook_path_is_used() {
        let mut config = AppConfig::default();
        config.workbook.path = Some("/tmp/guide.db".into());
        assert_eq!(workbook_path(&config).unwrap(), PathBuf::from("/tmp/guide.db"));
    }
}
