//! ESI reference-data client.
//!
//! Fetches item type records (`/universe/types/{id}/`) and turns their dogma
//! attributes into the `[itemId, name]` / `[attributeId, value]` blocks the
//! dogma sheets are built from.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use whguide_shared::{AttributeRecord, CellValue, EsiSettings, GuideError, OutputRow, Result, TypeId};

/// User-Agent string for ESI requests.
const USER_AGENT: &str = concat!("whguide/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// The subset of an ESI type record the guide uses.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    #[serde(default, alias = "dogma_attributes", rename = "dogmaattributes")]
    pub dogma_attributes: Vec<DogmaAttribute>,
}

/// One `{attributeid, value}` entry of a type record.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DogmaAttribute {
    #[serde(alias = "attribute_id", rename = "attributeid")]
    pub attribute_id: u32,
    pub value: f64,
}

impl From<DogmaAttribute> for AttributeRecord {
    fn from(a: DogmaAttribute) -> Self {
        AttributeRecord {
            attribute_id: a.attribute_id,
            value: a.value,
        }
    }
}

impl TypeInfo {
    pub fn attributes(&self) -> impl Iterator<Item = AttributeRecord> + '_ {
        self.dogma_attributes.iter().copied().map(AttributeRecord::from)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for the ESI universe/types endpoint.
#[derive(Debug, Clone)]
pub struct EsiClient {
    client: Client,
    base_url: String,
    datasource: String,
    language: String,
}

impl EsiClient {
    /// Build a client from the `[esi]` config section.
    pub fn new(settings: &EsiSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| GuideError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            datasource: settings.datasource.clone(),
            language: settings.language.clone(),
        })
    }

    fn type_url(&self, type_id: TypeId) -> String {
        format!(
            "{}/universe/types/{type_id}/?datasource={}&language={}",
            self.base_url, self.datasource, self.language
        )
    }

    /// Fetch the type record for a raw identifier.
    ///
    /// A missing or non-positive identifier fails with `InvalidArgument`
    /// before any request is made.
    pub async fn lookup_type(&self, type_id: Option<i64>) -> Result<TypeInfo> {
        self.fetch_type(require_type_id(type_id)?).await
    }

    /// Fetch a type and build its dogma block: `[itemId, name]` followed by
    /// one `[attributeId, value]` row per attribute.
    pub async fn lookup_dogma(&self, type_id: Option<i64>) -> Result<Vec<OutputRow>> {
        let type_id = require_type_id(type_id)?;
        let info = self.fetch_type(type_id).await?;
        Ok(dogma_block(type_id, &info))
    }

    #[instrument(skip_all, fields(%type_id))]
    async fn fetch_type(&self, type_id: TypeId) -> Result<TypeInfo> {
        let url = self.type_url(type_id);
        debug!(%url, "fetching type");

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

        serde_json::from_str(&body)
            .map_err(|e| GuideError::parse(format!("type {type_id}: {e}")))
    }
}

fn require_type_id(type_id: Option<i64>) -> Result<TypeId> {
    type_id
        .ok_or_else(|| GuideError::invalid_argument("Type Id is required"))
        .and_then(TypeId::new)
}

/// Lay out a type record as a two-column block.
pub fn dogma_block(type_id: TypeId, info: &TypeInfo) -> Vec<OutputRow> {
    let mut rows = Vec::with_capacity(info.dogma_attributes.len() + 1);
    rows.push(vec![
        CellValue::from(type_id),
        CellValue::Text(info.name.clone()),
    ]);
    rows.extend(info.attributes().map(|a| {
        vec![
            CellValue::from(a.attribute_id),
            CellValue::Float(a.value),
        ]
    }));
    rows
}
