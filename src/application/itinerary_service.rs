use crate::application::bootstrap::bootstrap_workspace;
use crate::domain::block_type::BlockTypeTables;
use crate::domain::error::ItineraryError;
use crate::domain::layout_config::TimelineConfig;
use crate::domain::models::{BlockStatus, ItineraryBlock, sort_blocks};
use crate::domain::mutation::{BlockPatch, TimeEdit, TimePatch};
use crate::domain::time_range::{BlockProgress, progress_at};
use crate::domain::timeline::{DayLayout, TimelineLayoutEngine};
use crate::infrastructure::block_store::{ItineraryStore, SqliteItineraryStore};
use crate::infrastructure::error::InfraError;
use chrono::Utc;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;

/// Commands over one itinerary store.
///
/// Every command appends a line to `logs/commands.log` when a log directory
/// is set, and hands errors back unchanged so the caller can keep the edit.
pub struct ItineraryService<S> {
    store: Arc<S>,
    engine: Arc<TimelineLayoutEngine>,
    logs_dir: Option<PathBuf>,
    log_guard: Mutex<()>,
}

impl ItineraryService<SqliteItineraryStore> {
    pub fn open(workspace_root: impl AsRef<Path>) -> Result<Self, ItineraryError> {
        let bootstrap = bootstrap_workspace(workspace_root.as_ref())?;
        let store = SqliteItineraryStore::new(&bootstrap.database_path);
        Ok(
            Self::with_store(store, bootstrap.timeline_config, bootstrap.block_type_tables)
                .with_log_dir(bootstrap.logs_dir),
        )
    }
}

impl<S: ItineraryStore + 'static> ItineraryService<S> {
    pub fn with_store(store: S, config: TimelineConfig, tables: BlockTypeTables) -> Self {
        Self {
            store: Arc::new(store),
            engine: Arc::new(TimelineLayoutEngine::new(config, tables)),
            logs_dir: None,
            log_guard: Mutex::new(()),
        }
    }

    pub fn with_log_dir(mut self, logs_dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = Some(logs_dir.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &TimelineLayoutEngine {
        &self.engine
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Some(logs_dir) = &self.logs_dir else {
            return;
        };
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }

    fn finish<T>(
        &self,
        command: &str,
        result: Result<T, ItineraryError>,
        describe: impl FnOnce(&T) -> String,
    ) -> Result<T, ItineraryError> {
        match &result {
            Ok(value) => self.log_info(command, &describe(value)),
            Err(error) => self.log_error(command, &error.to_string()),
        }
        result
    }

    pub async fn day_layout(&self, day_id: &str) -> Result<DayLayout, ItineraryError> {
        let result = layout_for_day(self.store.as_ref(), &self.engine, day_id).await;
        self.finish("day_layout", result, |layout| {
            format!(
                "day={} scheduled={} unscheduled={} skipped={}",
                day_id.trim(),
                layout.scheduled.len(),
                layout.unscheduled.len(),
                layout.skipped.len()
            )
        })
    }

    /// Lays out independent days concurrently; results follow `day_ids` order.
    pub async fn day_layouts(&self, day_ids: &[String]) -> Result<Vec<DayLayout>, ItineraryError> {
        let result = self.collect_day_layouts(day_ids).await;
        self.finish("day_layouts", result, |layouts| format!("days={}", layouts.len()))
    }

    async fn collect_day_layouts(&self, day_ids: &[String]) -> Result<Vec<DayLayout>, ItineraryError> {
        let mut tasks: JoinSet<Result<(usize, DayLayout), ItineraryError>> = JoinSet::new();
        for (index, day_id) in day_ids.iter().enumerate() {
            let store = Arc::clone(&self.store);
            let engine = Arc::clone(&self.engine);
            let day_id = day_id.clone();
            tasks.spawn(async move {
                let layout = layout_for_day(store.as_ref(), &engine, &day_id).await?;
                Ok((index, layout))
            });
        }

        let mut layouts: Vec<Option<DayLayout>> = vec![None; day_ids.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, layout) = joined.map_err(|error| {
                InfraError::Task(format!("failed to join day layout task: {error}"))
            })??;
            if let Some(slot) = layouts.get_mut(index) {
                *slot = Some(layout);
            }
        }
        Ok(layouts.into_iter().flatten().collect())
    }

    /// Blocks of a day in agenda order: by start time, unscheduled last.
    pub async fn day_agenda(&self, day_id: &str) -> Result<Vec<ItineraryBlock>, ItineraryError> {
        let result: Result<Vec<ItineraryBlock>, ItineraryError> = async {
            let mut blocks = self.store.fetch_blocks_for_day(day_id).await?;
            sort_blocks(&mut blocks);
            Ok(blocks)
        }
        .await;
        self.finish("day_agenda", result, |blocks| {
            format!("day={} blocks={}", day_id.trim(), blocks.len())
        })
    }

    /// Progress of each block of a day at `now_minutes`, in agenda order.
    /// Blocks with malformed times are left out.
    pub async fn day_progress(
        &self,
        day_id: &str,
        now_minutes: u32,
    ) -> Result<Vec<(String, Option<BlockProgress>)>, ItineraryError> {
        let result: Result<Vec<_>, ItineraryError> = async {
            let mut blocks = self.store.fetch_blocks_for_day(day_id).await?;
            sort_blocks(&mut blocks);
            Ok(blocks
                .iter()
                .filter_map(|block| {
                    progress_at(self.engine.time_ranges(), block, now_minutes)
                        .ok()
                        .map(|progress| (block.id.clone(), progress))
                })
                .collect::<Vec<_>>())
        }
        .await;
        self.finish("day_progress", result, |entries| {
            format!("day={} now={} blocks={}", day_id.trim(), now_minutes, entries.len())
        })
    }

    pub async fn edit_block_time(&self, edit: TimeEdit) -> Result<TimePatch, ItineraryError> {
        let result: Result<TimePatch, ItineraryError> = async {
            let patch = edit.validate()?;
            self.store
                .update_block(edit.block_id.trim(), &BlockPatch::from(patch.clone()))
                .await
                .map_err(store_error)?;
            Ok(patch)
        }
        .await;
        self.finish("edit_block_time", result, |patch| {
            format!(
                "block={} start={} end={}",
                edit.block_id.trim(),
                patch.start_time.as_deref().unwrap_or("null"),
                patch.end_time.as_deref().unwrap_or("null")
            )
        })
    }

    /// Validates `patch` against the stored block and persists it.
    /// Returns the block as it reads after the update.
    pub async fn update_block_details(
        &self,
        block_id: &str,
        patch: BlockPatch,
    ) -> Result<ItineraryBlock, ItineraryError> {
        let result: Result<ItineraryBlock, ItineraryError> = async {
            let stored = self.require_block(block_id).await?;
            let merged = patch.merged_with(&stored)?;
            if !patch.is_empty() {
                self.store
                    .update_block(&stored.id, &patch)
                    .await
                    .map_err(store_error)?;
            }
            Ok(merged)
        }
        .await;
        self.finish("update_block_details", result, |block| format!("block={}", block.id))
    }

    pub async fn set_block_status(&self, block_id: &str, status: BlockStatus) -> Result<(), ItineraryError> {
        let result: Result<(), ItineraryError> = async {
            let stored = self.require_block(block_id).await?;
            self.store
                .update_block(&stored.id, &BlockPatch::status(status))
                .await
                .map_err(store_error)
        }
        .await;
        self.finish("set_block_status", result, |_| {
            format!("block={} status={}", block_id.trim(), status.as_str())
        })
    }

    /// Writes `order_index = position` for every id. Every id must belong to
    /// the day; nothing is written otherwise.
    pub async fn reorder_blocks(&self, day_id: &str, ordered_ids: &[String]) -> Result<(), ItineraryError> {
        let result: Result<(), ItineraryError> = async {
            let day_blocks = self.store.fetch_blocks_for_day(day_id).await?;
            let known = day_blocks.iter().map(|block| block.id.as_str()).collect::<HashSet<_>>();
            let mut seen = HashSet::new();
            for block_id in ordered_ids {
                let block_id = block_id.trim();
                if !known.contains(block_id) {
                    return Err(ItineraryError::NotFound(format!(
                        "block {block_id} in day {}",
                        day_id.trim()
                    )));
                }
                if !seen.insert(block_id) {
                    return Err(ItineraryError::InvalidBlock(format!(
                        "block {block_id} listed more than once"
                    )));
                }
            }

            for (position, block_id) in ordered_ids.iter().enumerate() {
                let order_index = i64::try_from(position).map_err(|_| {
                    ItineraryError::InvalidBlock(format!("order_index {position} out of range"))
                })?;
                self.store
                    .update_block(block_id.trim(), &BlockPatch::order_index(order_index))
                    .await
                    .map_err(store_error)?;
            }
            Ok(())
        }
        .await;
        self.finish("reorder_blocks", result, |_| {
            format!("day={} blocks={}", day_id.trim(), ordered_ids.len())
        })
    }

    async fn require_block(&self, block_id: &str) -> Result<ItineraryBlock, ItineraryError> {
        let block_id = block_id.trim();
        if block_id.is_empty() {
            return Err(ItineraryError::InvalidBlock("block_id must not be empty".to_string()));
        }
        self.store
            .fetch_block(block_id)
            .await?
            .ok_or_else(|| ItineraryError::NotFound(format!("block {block_id}")))
    }
}

async fn layout_for_day<S: ItineraryStore + ?Sized>(
    store: &S,
    engine: &TimelineLayoutEngine,
    day_id: &str,
) -> Result<DayLayout, ItineraryError> {
    let blocks = store.fetch_blocks_for_day(day_id).await?;
    Ok(engine.layout_day(&blocks))
}

// A missing row is reported as such; anything else stays an opaque persistence failure.
fn store_error(error: InfraError) -> ItineraryError {
    match error {
        InfraError::NotFound(message) => ItineraryError::NotFound(message),
        other => ItineraryError::Persistence(other),
    }
}
