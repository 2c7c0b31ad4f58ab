use crate::domain::time_codec::parse_time;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Draft,
    Planned,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub destination: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: TripStatus,
}

impl Trip {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "trip.id")?;
        validate_non_empty(&self.destination, "trip.destination")?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err("trip.end_date must be >= trip.start_date".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TripDay {
    pub id: String,
    pub trip_id: String,
    pub day_index: u32,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TripDay {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "trip_day.id")?;
        validate_non_empty(&self.trip_id, "trip_day.trip_id")?;
        if self.day_index == 0 {
            return Err("trip_day.day_index must be >= 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Place,
    Accommodation,
    Activity,
    Transport,
    Meal,
    FreeTime,
    Note,
    SafetyCheck,
    /// Any block type this build does not know about.
    #[serde(other)]
    Unknown,
}

impl BlockType {
    pub const ALL: [BlockType; 8] = [
        BlockType::Place,
        BlockType::Accommodation,
        BlockType::Activity,
        BlockType::Transport,
        BlockType::Meal,
        BlockType::FreeTime,
        BlockType::Note,
        BlockType::SafetyCheck,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Place => "place",
            Self::Accommodation => "accommodation",
            Self::Activity => "activity",
            Self::Transport => "transport",
            Self::Meal => "meal",
            Self::FreeTime => "free_time",
            Self::Note => "note",
            Self::SafetyCheck => "safety_check",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == value.trim())
            .unwrap_or(Self::Unknown)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    #[default]
    Planned,
    Booked,
    Done,
    Skipped,
}

impl BlockStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Booked => "booked",
            Self::Done => "done",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "planned" => Some(Self::Planned),
            "booked" => Some(Self::Booked),
            "done" => Some(Self::Done),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockTagType {
    Vibe,
    Accessibility,
    WomenNote,
    Logistics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockTag {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<BlockTagType>,
}

/// Read-only snapshot of the place a block points at. The block never owns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSnapshot {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub place_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub image_url_cached: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryBlock {
    pub id: String,
    #[serde(default)]
    pub trip_day_id: String,
    pub block_type: BlockType,
    #[serde(default)]
    pub title_override: Option<String>,
    #[serde(default)]
    pub place: Option<PlaceSnapshot>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub duration_min: Option<i64>,
    #[serde(default)]
    pub cost_estimate: Option<f64>,
    #[serde(default)]
    pub status: BlockStatus,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub tags: Vec<BlockTag>,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl ItineraryBlock {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "block.id")?;
        let start = match self.start_time.as_deref() {
            Some(value) => Some(parse_time(value).map_err(|error| format!("block.start_time: {error}"))?),
            None => None,
        };
        if let Some(end_value) = self.end_time.as_deref() {
            let end = parse_time(end_value).map_err(|error| format!("block.end_time: {error}"))?;
            let Some(start) = start else {
                return Err("block.end_time requires block.start_time".to_string());
            };
            if end < start {
                return Err("block.end_time must be >= block.start_time".to_string());
            }
        }
        if let Some(duration) = self.duration_min {
            if duration <= 0 {
                return Err("block.duration_min must be > 0".to_string());
            }
        }
        if let Some(cost) = self.cost_estimate {
            if !cost.is_finite() || cost < 0.0 {
                return Err("block.cost_estimate must be >= 0".to_string());
            }
        }
        Ok(())
    }

    pub fn has_time_anchor(&self) -> bool {
        self.start_time.is_some()
    }

    /// A URL attached to the block: `meta.url`, else the first link in `meta.notes`.
    pub fn linked_url(&self) -> Option<String> {
        if let Some(url) = self
            .meta
            .get("url")
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            return Some(url.to_string());
        }
        let notes = self.meta.get("notes").and_then(serde_json::Value::as_str)?;
        notes
            .split_whitespace()
            .find(|token| {
                let lower = token.to_ascii_lowercase();
                (lower.starts_with("http://") && lower.len() > "http://".len())
                    || (lower.starts_with("https://") && lower.len() > "https://".len())
            })
            .map(ToOwned::to_owned)
    }
}

/// Time-ordered view of a day: scheduled blocks by start time, unscheduled
/// ones after them, ties broken by `order_index` and then by input position.
pub fn sort_blocks(blocks: &mut [ItineraryBlock]) {
    blocks.sort_by(|left, right| {
        let left_start = left.start_time.as_deref().map(sortable_time);
        let right_start = right.start_time.as_deref().map(sortable_time);
        match (left_start, right_start) {
            (Some(left_start), Some(right_start)) => left_start
                .cmp(&right_start)
                .then(left.order_index.cmp(&right.order_index)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => left.order_index.cmp(&right.order_index),
        }
    });
}

// Malformed times sort after every valid time but stay ahead of unscheduled blocks.
fn sortable_time(value: &str) -> u32 {
    parse_time(value).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripDayWithBlocks {
    #[serde(flatten)]
    pub day: TripDay,
    pub blocks: Vec<ItineraryBlock>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripItinerary {
    pub days: Vec<TripDayWithBlocks>,
    pub total_places: usize,
    pub total_cost: f64,
}

impl TripItinerary {
    /// Groups blocks under their days. Blocks whose day is not listed are dropped.
    pub fn assemble(mut days: Vec<TripDay>, blocks: Vec<ItineraryBlock>) -> Self {
        days.sort_by_key(|day| day.day_index);

        let mut blocks_by_day: HashMap<String, Vec<ItineraryBlock>> = HashMap::new();
        for block in blocks {
            blocks_by_day
                .entry(block.trip_day_id.clone())
                .or_default()
                .push(block);
        }

        let days = days
            .into_iter()
            .map(|day| {
                let mut blocks = blocks_by_day.remove(&day.id).unwrap_or_default();
                sort_blocks(&mut blocks);
                TripDayWithBlocks { day, blocks }
            })
            .collect::<Vec<_>>();

        let all_blocks = days.iter().flat_map(|day| day.blocks.iter());
        let (total_places, total_cost) = all_blocks.fold((0usize, 0.0f64), |(places, cost), block| {
            (
                places + usize::from(block.place.is_some()),
                cost + block.cost_estimate.unwrap_or(0.0),
            )
        });

        Self {
            days,
            total_places,
            total_cost,
        }
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
