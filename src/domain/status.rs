use crate::domain::models::BlockStatus;
use serde::Serialize;

/// Presentational treatment for a block status. Any status may follow any
/// other; nothing here enforces transitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTreatment {
    pub status: BlockStatus,
    pub badge: Option<&'static str>,
    pub opacity: f64,
    pub is_distinct: bool,
}

impl BlockStatus {
    pub fn treatment(self) -> StatusTreatment {
        let (badge, opacity) = match self {
            BlockStatus::Planned => (None, 1.0),
            BlockStatus::Booked => (Some("Booked"), 1.0),
            BlockStatus::Done => (Some("Done"), 0.6),
            BlockStatus::Skipped => (Some("Skipped"), 1.0),
        };
        StatusTreatment {
            status: self,
            badge,
            opacity,
            is_distinct: self != BlockStatus::Planned,
        }
    }
}
