use crate::domain::models::{BlockStatus, BlockTag, BlockTagType, BlockType, ItineraryBlock, PlaceSnapshot};
use crate::domain::mutation::BlockPatch;
use crate::infrastructure::block_store::ItineraryStore;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const BLOCKS_TABLE: &str = "itinerary_blocks";
const BLOCK_SELECT: &str = "*,places(id,name,place_type,address,image_url_cached),itinerary_block_tags(id,label,tag_type)";
// Creation order; `id` breaks ties between rows inserted in the same instant.
const DAY_ORDER: &str = "created_at.asc,id.asc";

/// Reads and patches blocks through a PostgREST endpoint (`<base>/rest/v1/...`).
#[derive(Debug, Clone)]
pub struct PostgrestItineraryStore {
    client: Client,
    base_url: Url,
    api_key: String,
    access_token: Option<String>,
}

impl PostgrestItineraryStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, InfraError> {
        Self::ensure_non_empty(api_key, "api key")?;
        let base_url = Url::parse(base_url.trim())
            .map_err(|error| InfraError::InvalidConfig(format!("invalid postgrest base url: {error}")))?;
        if base_url.cannot_be_a_base() {
            return Err(InfraError::InvalidConfig(
                "postgrest base url cannot be a base".to_string(),
            ));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key: api_key.trim().to_string(),
            access_token: None,
        })
    }

    /// Uses a signed-in user's token for row-level security instead of the anon key.
    pub fn with_access_token(mut self, access_token: &str) -> Self {
        let token = access_token.trim();
        self.access_token = (!token.is_empty()).then(|| token.to_string());
        self
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::InvalidConfig(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("postgrest error: http {}", status.as_u16())
        } else {
            format!("postgrest error: http {}; body={body}", status.as_u16())
        };
        InfraError::Http(message)
    }

    fn table_endpoint(&self) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| InfraError::InvalidConfig("postgrest base url cannot be a base".to_string()))?;
            segments.pop_if_empty();
            segments.push("rest");
            segments.push("v1");
            segments.push(BLOCKS_TABLE);
        }
        Ok(url)
    }

    fn filtered_endpoint(
        &self,
        column: &str,
        value: &str,
        select: Option<&str>,
        order: Option<&str>,
    ) -> Result<Url, InfraError> {
        let mut url = self.table_endpoint()?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(select) = select {
                query.append_pair("select", select);
            }
            query.append_pair(column, &format!("eq.{}", value.trim()));
            if let Some(order) = order {
                query.append_pair("order", order);
            }
        }
        Ok(url)
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    async fn fetch_rows(&self, url: Url) -> Result<Vec<ItineraryBlock>, InfraError> {
        let response = self
            .client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("network error while fetching blocks: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Http(format!("failed reading blocks response: {error}")))?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }

        let rows: Vec<BlockRow> = serde_json::from_str(&body)
            .map_err(|error| InfraError::Http(format!("invalid blocks payload: {error}; body={body}")))?;
        rows.into_iter().map(BlockRow::into_block).collect()
    }
}

#[derive(Debug, Deserialize)]
struct BlockRow {
    id: String,
    trip_day_id: String,
    block_type: String,
    title_override: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    duration_min: Option<i64>,
    cost_estimate: Option<f64>,
    status: Option<String>,
    order_index: Option<i64>,
    #[serde(default)]
    meta: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    places: Option<PlaceRow>,
    #[serde(default)]
    itinerary_block_tags: Option<Vec<TagRow>>,
}

#[derive(Debug, Deserialize)]
struct PlaceRow {
    #[serde(default)]
    id: Option<String>,
    name: String,
    place_type: Option<String>,
    address: Option<String>,
    image_url_cached: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagRow {
    id: String,
    label: String,
    tag_type: Option<String>,
}

impl BlockRow {
    fn into_block(self) -> Result<ItineraryBlock, InfraError> {
        let status = match self.status.as_deref() {
            None => BlockStatus::default(),
            Some(raw) => BlockStatus::parse(raw).ok_or_else(|| {
                InfraError::Http(format!("unknown status '{raw}' for block {}", self.id))
            })?,
        };
        let tags = self
            .itinerary_block_tags
            .unwrap_or_default()
            .into_iter()
            .map(|tag| BlockTag {
                id: tag.id,
                label: tag.label,
                tag_type: tag.tag_type.as_deref().and_then(parse_tag_type),
            })
            .collect();
        Ok(ItineraryBlock {
            block_type: BlockType::parse(&self.block_type),
            place: self.places.map(|place| PlaceSnapshot {
                id: place.id.unwrap_or_default(),
                name: place.name,
                place_type: place.place_type,
                address: place.address,
                image_url_cached: place.image_url_cached,
            }),
            status,
            order_index: self.order_index.unwrap_or_default(),
            tags,
            meta: self.meta.unwrap_or_default(),
            id: self.id,
            trip_day_id: self.trip_day_id,
            title_override: self.title_override,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_min: self.duration_min,
            cost_estimate: self.cost_estimate,
        })
    }
}

fn parse_tag_type(value: &str) -> Option<BlockTagType> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_string())).ok()
}

#[async_trait]
impl ItineraryStore for PostgrestItineraryStore {
    async fn fetch_blocks_for_day(&self, day_id: &str) -> Result<Vec<ItineraryBlock>, InfraError> {
        Self::ensure_non_empty(day_id, "day id")?;
        let url = self.filtered_endpoint("trip_day_id", day_id, Some(BLOCK_SELECT), Some(DAY_ORDER))?;
        self.fetch_rows(url).await
    }

    async fn fetch_block(&self, block_id: &str) -> Result<Option<ItineraryBlock>, InfraError> {
        Self::ensure_non_empty(block_id, "block id")?;
        let url = self.filtered_endpoint("id", block_id, Some(BLOCK_SELECT), None)?;
        Ok(self.fetch_rows(url).await?.into_iter().next())
    }

    async fn update_block(&self, block_id: &str, patch: &BlockPatch) -> Result<(), InfraError> {
        Self::ensure_non_empty(block_id, "block id")?;
        if patch.is_empty() {
            return Ok(());
        }

        let url = self.filtered_endpoint("id", block_id, None, None)?;
        let response = self
            .client
            .patch(url)
            .header("apikey", &self.api_key)
            .header("Prefer", "return=representation")
            .bearer_auth(self.bearer())
            .json(patch)
            .send()
            .await
            .map_err(|error| InfraError::Http(format!("network error while updating block: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Http(format!("failed reading block update response: {error}")))?;

        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }

        let updated: Vec<serde_json::Value> = serde_json::from_str(&body).map_err(|error| {
            InfraError::Http(format!("invalid block update payload: {error}; body={body}"))
        })?;
        if updated.is_empty() {
            return Err(InfraError::NotFound(format!("block {}", block_id.trim())));
        }
        Ok(())
    }
}
