use crate::domain::block_type::{BlockTypeOverrides, BlockTypeTables};
use crate::domain::layout_config::TimelineConfig;
use crate::infrastructure::error::InfraError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const TIMELINE_JSON: &str = "timeline.json";
const BLOCK_TYPES_JSON: &str = "block_types.json";
const SUPPORTED_SCHEMA: u64 = 1;

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            TIMELINE_JSON,
            serde_json::json!({
                "schema": 1,
                "hourHeight": 60.0,
                "minBlockHeight": 44.0,
                "defaultDurationMin": 60,
                "defaultStartHour": 8,
                "defaultEndHour": 20,
                "paddingHours": 1,
                "minVisibleHours": 4
            }),
        ),
        (
            BLOCK_TYPES_JSON,
            serde_json::json!({
                "schema": 1,
                "blockLabels": {},
                "blockColors": {},
                "placeLabels": {},
                "placeColors": {}
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    fs::create_dir_all(config_dir)?;
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_timeline_config(config_dir: &Path) -> Result<TimelineConfig, InfraError> {
    let path = config_dir.join(TIMELINE_JSON);
    let config: TimelineConfig = serde_json::from_value(read_config(&path)?)?;
    config
        .validate()
        .map_err(|message| InfraError::InvalidConfig(format!("{message} in {}", path.display())))?;
    Ok(config)
}

pub fn load_block_type_tables(config_dir: &Path) -> Result<BlockTypeTables, InfraError> {
    let path = config_dir.join(BLOCK_TYPES_JSON);
    let overrides: BlockTypeOverrides = serde_json::from_value(read_config(&path)?)?;
    Ok(BlockTypeTables::default().with_overrides(overrides))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::BlockType;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ID: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "trip-itinerary-config-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp directory");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn default_configs_load_as_builtin_values() {
        let temp = TempConfigDir::new();
        ensure_default_configs(&temp.path).expect("write defaults");

        assert_eq!(
            load_timeline_config(&temp.path).expect("load timeline"),
            TimelineConfig::default()
        );
        assert_eq!(
            load_block_type_tables(&temp.path).expect("load tables"),
            BlockTypeTables::default()
        );
    }

    #[test]
    fn ensure_default_configs_keeps_existing_files() {
        let temp = TempConfigDir::new();
        fs::write(
            temp.path.join(TIMELINE_JSON),
            "{\"schema\": 1, \"hourHeight\": 90.0}\n",
        )
        .expect("write custom config");
        ensure_default_configs(&temp.path).expect("write defaults");

        let config = load_timeline_config(&temp.path).expect("load timeline");
        assert_eq!(config.hour_height, 90.0);
        assert_eq!(config.min_block_height, 44.0);
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let temp = TempConfigDir::new();
        fs::write(temp.path.join(TIMELINE_JSON), "{\"schema\": 2}\n").expect("write config");
        match load_timeline_config(&temp.path) {
            Err(InfraError::InvalidConfig(message)) => assert!(message.contains("unsupported schema 2")),
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = TempConfigDir::new();
        fs::write(
            temp.path.join(TIMELINE_JSON),
            "{\"schema\": 1, \"hourHeight\": 0}\n",
        )
        .expect("write config");
        assert!(matches!(
            load_timeline_config(&temp.path),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn block_type_overrides_apply_over_defaults() {
        let temp = TempConfigDir::new();
        ensure_default_configs(&temp.path).expect("write defaults");
        fs::write(
            temp.path.join(BLOCK_TYPES_JSON),
            "{\"schema\": 1, \"blockLabels\": {\"transport\": \"Transport\"}, \"defaultColor\": \"#222222\"}\n",
        )
        .expect("write overrides");

        let tables = load_block_type_tables(&temp.path).expect("load tables");
        assert_eq!(tables.block_labels[&BlockType::Transport], "Transport");
        assert_eq!(tables.block_labels[&BlockType::Note], "Note");
        assert_eq!(tables.default_color, "#222222");
    }
}
