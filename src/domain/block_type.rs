use crate::domain::models::{BlockType, ItineraryBlock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_COLOR: &str = "#9A9A9A";
const UNTYPED_PLACE_LABEL: &str = "Stop";
const UNKNOWN_BLOCK_LABEL: &str = "Item";

const BLOCK_TYPE_LABELS: [(BlockType, &str); 8] = [
    (BlockType::Place, "Place"),
    (BlockType::Accommodation, "Stay"),
    (BlockType::Activity, "Activity"),
    (BlockType::Transport, "Getting there"),
    (BlockType::Meal, "Meal"),
    (BlockType::FreeTime, "Free time"),
    (BlockType::Note, "Note"),
    (BlockType::SafetyCheck, "Check-in"),
];

const BLOCK_TYPE_COLORS: [(BlockType, &str); 8] = [
    (BlockType::Place, "#3B82F6"),
    (BlockType::Accommodation, "#E5653A"),
    (BlockType::Activity, "#2D8A4E"),
    (BlockType::Transport, "#6B6B6B"),
    (BlockType::Meal, "#D4940A"),
    (BlockType::FreeTime, "#8B5CF6"),
    (BlockType::Note, "#9A9A9A"),
    (BlockType::SafetyCheck, "#D32F2F"),
];

const PLACE_TYPE_LABELS: [(&str, &str); 18] = [
    ("hotel", "Hotel"),
    ("hostel", "Hostel"),
    ("homestay", "Homestay"),
    ("restaurant", "Restaurant"),
    ("cafe", "Cafe"),
    ("bakery", "Bakery"),
    ("bar", "Bar"),
    ("club", "Nightlife"),
    ("rooftop", "Rooftop bar"),
    ("activity", "Activity"),
    ("tour", "Guided tour"),
    ("landmark", "Landmark"),
    ("coworking", "Coworking"),
    ("wellness", "Wellness"),
    ("spa", "Spa"),
    ("salon", "Salon"),
    ("gym", "Fitness"),
    ("shop", "Shopping"),
];

const PLACE_TYPE_COLORS: [(&str, &str); 18] = [
    ("hotel", "#E5653A"),
    ("hostel", "#E5653A"),
    ("homestay", "#E5653A"),
    ("restaurant", "#D4940A"),
    ("cafe", "#D4940A"),
    ("bakery", "#D4940A"),
    ("bar", "#8B5CF6"),
    ("club", "#8B5CF6"),
    ("rooftop", "#8B5CF6"),
    ("activity", "#2D8A4E"),
    ("tour", "#2D8A4E"),
    ("landmark", "#3B82F6"),
    ("coworking", "#6B6B6B"),
    ("wellness", "#0E9F8E"),
    ("spa", "#0E9F8E"),
    ("salon", "#0E9F8E"),
    ("gym", "#0E9F8E"),
    ("shop", "#C2417A"),
];

/// Label and color lookup tables. Built-in values come from [`Default`];
/// `config/block_types.json` can override individual entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTypeTables {
    pub block_labels: HashMap<BlockType, String>,
    pub block_colors: HashMap<BlockType, String>,
    pub place_labels: HashMap<String, String>,
    pub place_colors: HashMap<String, String>,
    pub default_color: String,
}

impl Default for BlockTypeTables {
    fn default() -> Self {
        Self {
            block_labels: BLOCK_TYPE_LABELS
                .iter()
                .map(|(block_type, label)| (*block_type, label.to_string()))
                .collect(),
            block_colors: BLOCK_TYPE_COLORS
                .iter()
                .map(|(block_type, color)| (*block_type, color.to_string()))
                .collect(),
            place_labels: PLACE_TYPE_LABELS
                .iter()
                .map(|(place_type, label)| (place_type.to_string(), label.to_string()))
                .collect(),
            place_colors: PLACE_TYPE_COLORS
                .iter()
                .map(|(place_type, color)| (place_type.to_string(), color.to_string()))
                .collect(),
            default_color: DEFAULT_COLOR.to_string(),
        }
    }
}

/// Partial table set as read from config; present entries replace defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockTypeOverrides {
    pub block_labels: HashMap<BlockType, String>,
    pub block_colors: HashMap<BlockType, String>,
    pub place_labels: HashMap<String, String>,
    pub place_colors: HashMap<String, String>,
    pub default_color: Option<String>,
}

impl BlockTypeTables {
    pub fn with_overrides(mut self, overrides: BlockTypeOverrides) -> Self {
        self.block_labels.extend(overrides.block_labels);
        self.block_colors.extend(overrides.block_colors);
        self.place_labels.extend(
            overrides
                .place_labels
                .into_iter()
                .map(|(place_type, label)| (normalize_place_type(&place_type), label)),
        );
        self.place_colors.extend(
            overrides
                .place_colors
                .into_iter()
                .map(|(place_type, color)| (normalize_place_type(&place_type), color)),
        );
        if let Some(default_color) = overrides
            .default_color
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            self.default_color = default_color;
        }
        self
    }
}

/// Maps a block to its display label and accent color. Total: unknown
/// types and missing entries fall through to fixed fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTypeResolver {
    tables: BlockTypeTables,
}

impl BlockTypeResolver {
    pub fn new(tables: BlockTypeTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &BlockTypeTables {
        &self.tables
    }

    pub fn block_type_label(&self, block_type: BlockType) -> String {
        self.tables
            .block_labels
            .get(&block_type)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_BLOCK_LABEL.to_string())
    }

    /// Friendly label for a place type; unmapped types are shown as stored.
    pub fn place_type_label(&self, place_type: &str) -> String {
        let normalized = normalize_place_type(place_type);
        if let Some(label) = self.tables.place_labels.get(&normalized) {
            return label.clone();
        }
        place_type.trim().to_string()
    }

    /// Place blocks without a typed place read as a generic stop.
    pub fn resolve_label(&self, block: &ItineraryBlock) -> String {
        if block.block_type != BlockType::Place {
            return self.block_type_label(block.block_type);
        }
        match block
            .place
            .as_ref()
            .and_then(|place| place.place_type.as_deref())
            .filter(|value| !value.trim().is_empty())
        {
            Some(place_type) => self.place_type_label(place_type),
            None => UNTYPED_PLACE_LABEL.to_string(),
        }
    }

    pub fn resolve_color(&self, block: &ItineraryBlock) -> String {
        let place_color = block
            .place
            .as_ref()
            .and_then(|place| place.place_type.as_deref())
            .and_then(|place_type| self.tables.place_colors.get(&normalize_place_type(place_type)));
        if let Some(color) = place_color {
            return color.clone();
        }
        self.tables
            .block_colors
            .get(&block.block_type)
            .cloned()
            .unwrap_or_else(|| self.tables.default_color.clone())
    }

    /// Title override, else the linked place's name, else the block type label.
    pub fn resolve_title(&self, block: &ItineraryBlock) -> String {
        if let Some(title) = block
            .title_override
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            return title.to_string();
        }
        if let Some(name) = block
            .place
            .as_ref()
            .map(|place| place.name.trim())
            .filter(|value| !value.is_empty())
        {
            return name.to_string();
        }
        self.block_type_label(block.block_type)
    }
}

fn normalize_place_type(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}
