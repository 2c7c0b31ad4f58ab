//! Vertical timeline layout for one trip day.
//!
//! Scheduled blocks are positioned against the fitted hour window. Blocks
//! without a start time are passed through in creation order for agenda
//! rendering, and blocks with malformed times are reported per block so one
//! corrupt record never blanks the whole day.
//!
//! Concurrent blocks are laid out at full width and overlap visually; no
//! column assignment happens here. [`DayLayout::overlapping_pairs`] reports
//! them so callers can flag double-booking.

use crate::domain::block_type::{BlockTypeResolver, BlockTypeTables};
use crate::domain::error::ItineraryError;
use crate::domain::hour_window::{DayHourRangeFitter, HourWindow};
use crate::domain::layout_config::TimelineConfig;
use crate::domain::models::ItineraryBlock;
use crate::domain::status::StatusTreatment;
use crate::domain::time_codec::format_time_display;
use crate::domain::time_range::{TimeRange, TimeRangeResolver};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledLayout {
    pub block_id: String,
    pub top: f64,
    pub height: f64,
    pub label: String,
    pub title: String,
    pub color: String,
    pub time_range_text: String,
    pub range: TimeRange,
    pub status: StatusTreatment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnscheduledItem {
    pub block_id: String,
    pub label: String,
    pub title: String,
    pub status: StatusTreatment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedBlock {
    pub block_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayLayout {
    #[serde(flatten)]
    pub window: HourWindow,
    pub scheduled: Vec<ScheduledLayout>,
    pub unscheduled: Vec<UnscheduledItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedBlock>,
}

impl DayLayout {
    /// Total grid height in pixels for the fitted window.
    pub fn grid_height(&self, config: &TimelineConfig) -> f64 {
        f64::from(self.window.span_hours()) * config.hour_height
    }

    /// Pairs of scheduled block ids whose time ranges intersect.
    pub fn overlapping_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (index, left) in self.scheduled.iter().enumerate() {
            for right in &self.scheduled[index + 1..] {
                if right.range.start >= left.range.end {
                    break;
                }
                if left.range.overlaps(&right.range) {
                    pairs.push((left.block_id.clone(), right.block_id.clone()));
                }
            }
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineLayoutEngine {
    config: TimelineConfig,
    types: BlockTypeResolver,
    ranges: TimeRangeResolver,
    fitter: DayHourRangeFitter,
}

impl Default for TimelineLayoutEngine {
    fn default() -> Self {
        Self::new(TimelineConfig::default(), BlockTypeTables::default())
    }
}

impl TimelineLayoutEngine {
    pub fn new(config: TimelineConfig, tables: BlockTypeTables) -> Self {
        Self {
            ranges: TimeRangeResolver::new(config.default_duration_min),
            fitter: DayHourRangeFitter::new(config.clone()),
            types: BlockTypeResolver::new(tables),
            config,
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn block_types(&self) -> &BlockTypeResolver {
        &self.types
    }

    pub fn time_ranges(&self) -> &TimeRangeResolver {
        &self.ranges
    }

    pub fn resolve_range(&self, block: &ItineraryBlock) -> Result<Option<TimeRange>, ItineraryError> {
        self.ranges.resolve(block)
    }

    /// Hour window only, for callers that draw the grid without blocks.
    pub fn fit_window(&self, blocks: &[ItineraryBlock]) -> HourWindow {
        let ranges = blocks
            .iter()
            .filter_map(|block| self.ranges.resolve(block).ok().flatten())
            .collect::<Vec<_>>();
        self.fitter.fit(&ranges)
    }

    /// Lays out one day. Pure: the same blocks always produce the same layout.
    pub fn layout_day(&self, blocks: &[ItineraryBlock]) -> DayLayout {
        let mut resolved: Vec<(&ItineraryBlock, TimeRange)> = Vec::new();
        let mut unscheduled = Vec::new();
        let mut skipped = Vec::new();

        for block in blocks {
            match self.ranges.resolve(block) {
                Ok(Some(range)) => resolved.push((block, range)),
                Ok(None) => unscheduled.push(UnscheduledItem {
                    block_id: block.id.clone(),
                    label: self.types.resolve_label(block),
                    title: self.types.resolve_title(block),
                    status: block.status.treatment(),
                }),
                Err(error) => {
                    log::warn!("skipping block {} in timeline layout: {error}", block.id);
                    skipped.push(SkippedBlock {
                        block_id: block.id.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        let window = self
            .fitter
            .fit(resolved.iter().map(|(_, range)| range));

        // Stable sort keeps creation order among blocks that start together.
        resolved.sort_by_key(|(_, range)| range.start);

        let pixels_per_minute = self.config.pixels_per_minute();
        let window_start = f64::from(window.start_minutes());
        let scheduled = resolved
            .into_iter()
            .map(|(block, range)| {
                let top = (f64::from(range.start) - window_start) * pixels_per_minute;
                let height = (f64::from(range.duration()) * pixels_per_minute)
                    .max(self.config.min_block_height);
                ScheduledLayout {
                    block_id: block.id.clone(),
                    top,
                    height,
                    label: self.types.resolve_label(block),
                    title: self.types.resolve_title(block),
                    color: self.types.resolve_color(block),
                    time_range_text: time_range_text(block, range),
                    range,
                    status: block.status.treatment(),
                }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "laid out {} scheduled, {} unscheduled, {} skipped blocks in window {}..={}",
            scheduled.len(),
            unscheduled.len(),
            skipped.len(),
            window.start_hour,
            window.end_hour
        );

        DayLayout {
            window,
            scheduled,
            unscheduled,
            skipped,
        }
    }
}

// Only an explicit end time is shown; derived ends stay implicit.
fn time_range_text(block: &ItineraryBlock, range: TimeRange) -> String {
    let start = format_time_display(range.start);
    if block.end_time.is_some() {
        format!("{start} - {}", format_time_display(range.end))
    } else {
        start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::fixtures::{block, place};
    use crate::domain::models::{BlockStatus, BlockType};
    use proptest::prelude::*;

    fn engine() -> TimelineLayoutEngine {
        TimelineLayoutEngine::default()
    }

    #[test]
    fn empty_day_renders_default_grid() {
        let layout = engine().layout_day(&[]);
        assert_eq!(layout.window.start_hour, 7);
        assert_eq!(layout.window.end_hour, 21);
        assert!(layout.scheduled.is_empty());
        assert!(layout.unscheduled.is_empty());
        assert_eq!(layout.grid_height(engine().config()), 14.0 * 60.0);
    }

    #[test]
    fn scheduled_block_positions_relative_to_window() {
        let mut breakfast = block("blk-1", Some("09:00:00"), Some("09:30:00"), None);
        breakfast.block_type = BlockType::Meal;
        let walk = block("blk-2", Some("10:15:00"), None, Some(120));

        let layout = engine().layout_day(&[walk, breakfast]);
        assert_eq!(layout.window.start_hour, 7);

        let first = &layout.scheduled[0];
        assert_eq!(first.block_id, "blk-1");
        assert_eq!(first.top, 120.0);
        assert_eq!(first.height, 44.0);
        assert_eq!(first.label, "Meal");
        assert_eq!(first.color, "#D4940A");
        assert_eq!(first.time_range_text, "9:00 AM - 9:30 AM");

        let second = &layout.scheduled[1];
        assert_eq!(second.block_id, "blk-2");
        assert_eq!(second.top, 195.0);
        assert_eq!(second.height, 120.0);
        assert_eq!(second.time_range_text, "10:15 AM");
    }

    #[test]
    fn unscheduled_blocks_bypass_the_grid_in_creation_order() {
        let mut note = block("note-1", None, None, Some(90));
        note.block_type = BlockType::Note;
        let mut stop = block("stop-1", None, None, None);
        stop.block_type = BlockType::Place;
        stop.place = Some(place("Miradouro", Some("landmark")));
        let timed = block("blk-1", Some("12:00"), None, None);

        let layout = engine().layout_day(&[note, timed, stop]);
        assert_eq!(layout.scheduled.len(), 1);
        let ids = layout
            .unscheduled
            .iter()
            .map(|item| item.block_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["note-1", "stop-1"]);
        assert_eq!(layout.unscheduled[1].label, "Landmark");
        assert_eq!(layout.unscheduled[1].title, "Miradouro");
    }

    #[test]
    fn malformed_block_is_skipped_without_aborting_the_day() {
        let corrupt = block("bad-1", Some("9am"), None, None);
        let reversed = block("bad-2", Some("10:00"), Some("09:00"), None);
        let good = block("blk-1", Some("06:30"), Some("07:00"), None);

        let layout = engine().layout_day(&[corrupt, good, reversed]);
        assert_eq!(layout.scheduled.len(), 1);
        assert_eq!(layout.window.start_hour, 5);
        let skipped = layout
            .skipped
            .iter()
            .map(|item| item.block_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(skipped, vec!["bad-1", "bad-2"]);
        assert!(layout.skipped[0].reason.contains("invalid time format"));
        assert!(layout.skipped[1].reason.contains("invalid time range"));
    }

    #[test]
    fn overlapping_blocks_share_full_width_and_are_reported() {
        let tour = block("tour", Some("10:00"), Some("12:00"), None);
        let lunch = block("lunch", Some("11:30"), Some("12:30"), None);
        let museum = block("museum", Some("12:30"), Some("14:00"), None);

        let layout = engine().layout_day(&[tour, lunch, museum]);
        assert_eq!(layout.scheduled.len(), 3);
        assert_eq!(
            layout.overlapping_pairs(),
            vec![("tour".to_string(), "lunch".to_string())]
        );
    }

    #[test]
    fn simultaneous_starts_keep_creation_order() {
        let first = block("first", Some("10:00"), None, None);
        let second = block("second", Some("10:00"), None, Some(15));
        let layout = engine().layout_day(&[first, second]);
        assert_eq!(layout.scheduled[0].block_id, "first");
        assert_eq!(layout.scheduled[1].block_id, "second");
        assert_eq!(layout.scheduled[1].height, 44.0);
    }

    #[test]
    fn status_treatment_travels_with_layout() {
        let mut done = block("blk-1", Some("10:00"), None, None);
        done.status = BlockStatus::Done;
        let layout = engine().layout_day(&[done]);
        assert_eq!(layout.scheduled[0].status.badge, Some("Done"));
        assert!(layout.scheduled[0].status.opacity < 1.0);
    }

    #[test]
    fn custom_hour_height_scales_positions() {
        let config = TimelineConfig {
            hour_height: 120.0,
            ..TimelineConfig::default()
        };
        let engine = TimelineLayoutEngine::new(config, BlockTypeTables::default());
        let layout = engine.layout_day(&[block("blk-1", Some("08:00"), Some("09:00"), None)]);
        assert_eq!(layout.scheduled[0].top, 120.0);
        assert_eq!(layout.scheduled[0].height, 120.0);
    }

    #[test]
    fn oversized_config_lays_out_without_panicking() {
        let config = TimelineConfig {
            padding_hours: u32::MAX,
            min_visible_hours: u32::MAX,
            default_duration_min: u32::MAX,
            ..TimelineConfig::default()
        };
        let engine = TimelineLayoutEngine::new(config, BlockTypeTables::default());
        assert_eq!(engine.layout_day(&[]).window.end_hour, 24);

        let layout = engine.layout_day(&[block("blk-1", Some("23:00"), None, None)]);
        assert_eq!(layout.scheduled[0].range.end, 1440);
    }

    #[test]
    fn layout_serializes_in_camel_case() {
        let layout = engine().layout_day(&[block("blk-1", Some("10:00"), None, None)]);
        let value = serde_json::to_value(&layout).expect("serialize layout");
        assert_eq!(value["startHour"], 7);
        assert_eq!(value["endHour"], 21);
        assert_eq!(value["scheduled"][0]["blockId"], "blk-1");
        assert_eq!(value["scheduled"][0]["timeRangeText"], "10:00 AM");
        assert!(value.get("skipped").is_none());
    }

    proptest! {
        #[test]
        fn layout_is_deterministic(
            specs in proptest::collection::vec(
                (proptest::option::of(0u32..1440u32), proptest::option::of(1i64..240i64)),
                0..10,
            )
        ) {
            let blocks = specs
                .into_iter()
                .enumerate()
                .map(|(index, (start, duration))| {
                    let start = start.map(crate::domain::time_codec::format_time);
                    block(&format!("blk-{index}"), start.as_deref(), None, duration)
                })
                .collect::<Vec<_>>();
            let engine = engine();
            let first = serde_json::to_string(&engine.layout_day(&blocks)).expect("serialize");
            let second = serde_json::to_string(&engine.layout_day(&blocks)).expect("serialize");
            prop_assert_eq!(first, second);
        }

        #[test]
        fn blocks_without_start_never_reach_the_grid(duration in proptest::option::of(1i64..600i64)) {
            let layout = engine().layout_day(&[block("loose", None, None, duration)]);
            prop_assert!(layout.scheduled.is_empty());
            prop_assert_eq!(layout.unscheduled.len(), 1);
        }
    }
}
