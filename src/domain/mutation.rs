use crate::domain::error::ItineraryError;
use crate::domain::models::{BlockStatus, ItineraryBlock};
use crate::domain::time_codec::{naive_time_to_minutes, naive_time_to_wire, parse_time};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A user-entered time edit for one block. `None` clears that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEdit {
    pub block_id: String,
    pub new_start: Option<NaiveTime>,
    pub new_end: Option<NaiveTime>,
}

/// Normalized time patch, always carrying both fields (`HH:MM:00` or null).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePatch {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl TimePatch {
    pub fn clears_schedule(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none()
    }
}

impl TimeEdit {
    /// Re-validates the edit independently of whatever the picker enforced.
    ///
    /// Comparison is at minute granularity because seconds are dropped on write.
    pub fn validate(&self) -> Result<TimePatch, ItineraryError> {
        if self.block_id.trim().is_empty() {
            return Err(ItineraryError::InvalidBlock("block_id must not be empty".to_string()));
        }
        match (self.new_start, self.new_end) {
            (Some(start), Some(end)) if naive_time_to_minutes(end) < naive_time_to_minutes(start) => {
                Err(ItineraryError::InvalidRange(format!(
                    "end {} precedes start {}",
                    naive_time_to_wire(end),
                    naive_time_to_wire(start)
                )))
            }
            (None, Some(end)) => Err(ItineraryError::InvalidRange(format!(
                "end {} requires a start time",
                naive_time_to_wire(end)
            ))),
            (start, end) => Ok(TimePatch {
                start_time: start.map(naive_time_to_wire),
                end_time: end.map(naive_time_to_wire),
            }),
        }
    }
}

/// Partial update of a stored block, serialized with the store's column names.
///
/// Outer `None` leaves a field untouched; `Some(None)` writes null.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlockPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_override: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BlockStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Map<String, serde_json::Value>>,
}

impl From<TimePatch> for BlockPatch {
    fn from(patch: TimePatch) -> Self {
        Self {
            start_time: Some(patch.start_time),
            end_time: Some(patch.end_time),
            ..Self::default()
        }
    }
}

impl BlockPatch {
    pub fn status(status: BlockStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn order_index(order_index: i64) -> Self {
        Self {
            order_index: Some(order_index),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Field-level checks that do not need the stored block.
    pub fn validate(&self) -> Result<(), ItineraryError> {
        for value in [&self.start_time, &self.end_time]
            .into_iter()
            .filter_map(|field| field.as_ref().and_then(|value| value.as_deref()))
        {
            parse_time(value)?;
        }
        if let Some(Some(duration)) = self.duration_min {
            if duration <= 0 {
                return Err(ItineraryError::InvalidBlock(
                    "duration_min must be > 0".to_string(),
                ));
            }
        }
        if let Some(Some(cost)) = self.cost_estimate {
            if !cost.is_finite() || cost < 0.0 {
                return Err(ItineraryError::InvalidBlock(
                    "cost_estimate must be >= 0".to_string(),
                ));
            }
        }
        if let Some(order_index) = self.order_index {
            if order_index < 0 {
                return Err(ItineraryError::InvalidBlock(
                    "order_index must be >= 0".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, block: &mut ItineraryBlock) {
        if let Some(title_override) = &self.title_override {
            block.title_override = title_override.clone();
        }
        if let Some(start_time) = &self.start_time {
            block.start_time = start_time.clone();
        }
        if let Some(end_time) = &self.end_time {
            block.end_time = end_time.clone();
        }
        if let Some(duration_min) = self.duration_min {
            block.duration_min = duration_min;
        }
        if let Some(order_index) = self.order_index {
            block.order_index = order_index;
        }
        if let Some(status) = self.status {
            block.status = status;
        }
        if let Some(cost_estimate) = self.cost_estimate {
            block.cost_estimate = cost_estimate;
        }
        if let Some(meta) = &self.meta {
            block.meta = meta.clone();
        }
    }

    /// Validates the patch and the block it would produce, returning that block.
    pub fn merged_with(&self, block: &ItineraryBlock) -> Result<ItineraryBlock, ItineraryError> {
        self.validate()?;
        let mut merged = block.clone();
        self.apply_to(&mut merged);

        let start = merged.start_time.as_deref().map(parse_time).transpose()?;
        let end = merged.end_time.as_deref().map(parse_time).transpose()?;
        match (start, end) {
            (None, Some(_)) => {
                return Err(ItineraryError::InvalidRange(format!(
                    "block {} would have an end time without a start time",
                    merged.id
                )));
            }
            (Some(start), Some(end)) if end < start => {
                return Err(ItineraryError::InvalidRange(format!(
                    "block {} would end before it starts",
                    merged.id
                )));
            }
            _ => {}
        }
        merged.validate().map_err(ItineraryError::InvalidBlock)?;
        Ok(merged)
    }
}
