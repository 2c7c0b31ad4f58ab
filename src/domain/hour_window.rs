use crate::domain::layout_config::TimelineConfig;
use crate::domain::time_codec::{MINUTES_PER_HOUR, format_hour_label};
use crate::domain::time_range::TimeRange;
use serde::Serialize;

const MAX_WINDOW_HOURS: u32 = 24;

/// Visible `[start_hour, end_hour]` window of a day's timeline.
///
/// `end_hour` can exceed 24 when the minimum span is enforced for a late
/// window; the value is reported as computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    pub hours: Vec<u32>,
}

impl HourWindow {
    pub fn start_minutes(&self) -> u32 {
        self.start_hour * MINUTES_PER_HOUR
    }

    pub fn span_hours(&self) -> u32 {
        self.end_hour - self.start_hour
    }

    pub fn hour_labels(&self) -> Vec<String> {
        self.hours.iter().copied().map(format_hour_label).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayHourRangeFitter {
    config: TimelineConfig,
}

impl DayHourRangeFitter {
    pub fn new(config: TimelineConfig) -> Self {
        Self { config }
    }

    /// Fits the window around already-resolved ranges. The default window
    /// seeds the extremes, so an empty day still yields a usable grid.
    pub fn fit<'a, I>(&self, ranges: I) -> HourWindow
    where
        I: IntoIterator<Item = &'a TimeRange>,
    {
        let mut min_minutes = self.config.default_start_hour * MINUTES_PER_HOUR;
        let mut max_minutes = self.config.default_end_hour * MINUTES_PER_HOUR;
        for range in ranges {
            min_minutes = min_minutes.min(range.start);
            max_minutes = max_minutes.max(range.end);
        }

        // Knobs past a full day are meaningless and would blow up the hour list.
        let padding = self.config.padding_hours.min(MAX_WINDOW_HOURS);
        let min_span = self.config.min_visible_hours.min(MAX_WINDOW_HOURS);

        let start_hour = (min_minutes / MINUTES_PER_HOUR).saturating_sub(padding);
        let end_hour = max_minutes
            .div_ceil(MINUTES_PER_HOUR)
            .saturating_add(padding)
            .min(MAX_WINDOW_HOURS);
        let end_hour = end_hour.max(start_hour + min_span);

        HourWindow {
            start_hour,
            end_hour,
            hours: (start_hour..=end_hour).collect(),
        }
    }
}
