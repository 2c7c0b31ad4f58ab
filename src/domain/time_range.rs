use crate::domain::error::ItineraryError;
use crate::domain::models::ItineraryBlock;
use crate::domain::time_codec::{END_OF_DAY_MINUTES, parse_time};
use serde::Serialize;

pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Effective `[start, end)` of a scheduled block in minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start: u32,
    pub end: u32,
}

impl TimeRange {
    pub fn duration(&self) -> u32 {
        self.end - self.start
    }

    /// True when the end was clamped at midnight; overnight spans are not representable.
    pub fn extends_past_midnight(&self) -> bool {
        self.end == END_OF_DAY_MINUTES
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRangeResolver {
    default_duration_minutes: u32,
}

impl Default for TimeRangeResolver {
    fn default() -> Self {
        Self {
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }
}

impl TimeRangeResolver {
    pub fn new(default_duration_minutes: u32) -> Self {
        Self {
            default_duration_minutes,
        }
    }

    /// Explicit end wins over explicit duration, which wins over the default
    /// duration. `Ok(None)` means the block has no start and is unscheduled.
    pub fn resolve(&self, block: &ItineraryBlock) -> Result<Option<TimeRange>, ItineraryError> {
        let Some(start_value) = block.start_time.as_deref() else {
            return Ok(None);
        };
        let start = parse_time(start_value)?;

        let end = if let Some(end_value) = block.end_time.as_deref() {
            let end = parse_time(end_value)?;
            if end < start {
                return Err(ItineraryError::InvalidRange(format!(
                    "block {} ends at {end_value} before it starts at {start_value}",
                    block.id
                )));
            }
            end
        } else if let Some(duration) = block.duration_min {
            if duration <= 0 {
                return Err(ItineraryError::InvalidBlock(format!(
                    "block {} has non-positive duration {duration}",
                    block.id
                )));
            }
            start.saturating_add(u32::try_from(duration).unwrap_or(u32::MAX))
        } else {
            start.saturating_add(self.default_duration_minutes)
        };

        Ok(Some(TimeRange {
            start,
            end: end.min(END_OF_DAY_MINUTES),
        }))
    }
}

/// Where a block sits relative to the current wall-clock minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockProgress {
    Upcoming,
    Current,
    Completed,
}

pub fn progress_at(
    resolver: &TimeRangeResolver,
    block: &ItineraryBlock,
    now_minutes: u32,
) -> Result<Option<BlockProgress>, ItineraryError> {
    let Some(range) = resolver.resolve(block)? else {
        return Ok(None);
    };
    let progress = if now_minutes >= range.end {
        BlockProgress::Completed
    } else if now_minutes >= range.start {
        BlockProgress::Current
    } else {
        BlockProgress::Upcoming
    };
    Ok(Some(progress))
}
