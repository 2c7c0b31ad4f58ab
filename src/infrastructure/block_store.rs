use crate::domain::models::{BlockStatus, BlockType, ItineraryBlock, TripDay};
use crate::domain::mutation::BlockPatch;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_schema;
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Storage collaborator for itinerary blocks. The engine never persists on
/// its own; it hands validated patches to an implementation of this trait.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    async fn fetch_blocks_for_day(&self, day_id: &str) -> Result<Vec<ItineraryBlock>, InfraError>;

    async fn fetch_block(&self, block_id: &str) -> Result<Option<ItineraryBlock>, InfraError>;

    async fn update_block(&self, block_id: &str, patch: &BlockPatch) -> Result<(), InfraError>;
}

fn normalized_id(value: &str) -> Option<String> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return None;
    }
    Some(normalized.to_string())
}

/// Blocks kept per day in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryItineraryStore {
    blocks: Mutex<HashMap<String, Vec<ItineraryBlock>>>,
}

impl InMemoryItineraryStore {
    pub fn with_blocks(blocks: impl IntoIterator<Item = ItineraryBlock>) -> Self {
        let mut by_day: HashMap<String, Vec<ItineraryBlock>> = HashMap::new();
        for block in blocks {
            by_day.entry(block.trip_day_id.clone()).or_default().push(block);
        }
        Self {
            blocks: Mutex::new(by_day),
        }
    }

    pub fn insert(&self, block: ItineraryBlock) -> Result<(), InfraError> {
        let mut blocks = self.lock()?;
        blocks.entry(block.trip_day_id.clone()).or_default().push(block);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<ItineraryBlock>>>, InfraError> {
        self.blocks
            .lock()
            .map_err(|error| InfraError::LockPoisoned(format!("itinerary store: {error}")))
    }
}

#[async_trait]
impl ItineraryStore for InMemoryItineraryStore {
    async fn fetch_blocks_for_day(&self, day_id: &str) -> Result<Vec<ItineraryBlock>, InfraError> {
        let Some(day_id) = normalized_id(day_id) else {
            return Ok(Vec::new());
        };
        let blocks = self.lock()?;
        Ok(blocks.get(&day_id).cloned().unwrap_or_default())
    }

    async fn fetch_block(&self, block_id: &str) -> Result<Option<ItineraryBlock>, InfraError> {
        let Some(block_id) = normalized_id(block_id) else {
            return Ok(None);
        };
        let blocks = self.lock()?;
        Ok(blocks
            .values()
            .flat_map(|day| day.iter())
            .find(|block| block.id == block_id)
            .cloned())
    }

    async fn update_block(&self, block_id: &str, patch: &BlockPatch) -> Result<(), InfraError> {
        let block_id = normalized_id(block_id)
            .ok_or_else(|| InfraError::InvalidConfig("block_id must not be empty".to_string()))?;
        let mut blocks = self.lock()?;
        let block = blocks
            .values_mut()
            .flat_map(|day| day.iter_mut())
            .find(|block| block.id == block_id)
            .ok_or_else(|| InfraError::NotFound(format!("block {block_id}")))?;
        patch.apply_to(block);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SqliteItineraryStore {
    db_path: PathBuf,
}

const BLOCK_COLUMNS: &str = "id, trip_day_id, block_type, title_override, place_json, start_time, end_time, \
     duration_min, cost_estimate, status, order_index, tags_json, meta_json";

impl SqliteItineraryStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }

    pub fn initialize(&self) -> Result<(), InfraError> {
        initialize_schema(&self.connect()?)
    }

    pub fn upsert_day(&self, day: &TripDay) -> Result<(), InfraError> {
        day.validate().map_err(InfraError::InvalidConfig)?;
        self.connect()?.execute(
            "INSERT INTO trip_days (id, trip_id, day_index, date, title, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               trip_id = excluded.trip_id,
               day_index = excluded.day_index,
               date = excluded.date,
               title = excluded.title,
               notes = excluded.notes",
            params![
                day.id,
                day.trip_id,
                day.day_index,
                day.date.map(|date| date.format("%Y-%m-%d").to_string()),
                day.title,
                day.notes
            ],
        )?;
        Ok(())
    }

    pub fn list_days(&self, trip_id: &str) -> Result<Vec<TripDay>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(
            "SELECT id, trip_id, day_index, date, title, notes FROM trip_days
             WHERE trip_id = ?1 ORDER BY day_index ASC",
        )?;
        let rows = statement.query_map(params![trip_id.trim()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut days = Vec::new();
        for row in rows {
            let (id, trip_id, day_index, date, title, notes) = row?;
            let date = date
                .map(|raw| {
                    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|error| {
                        InfraError::InvalidConfig(format!("invalid trip_days.date '{raw}': {error}"))
                    })
                })
                .transpose()?;
            days.push(TripDay {
                id,
                trip_id,
                day_index,
                date,
                title,
                notes,
            });
        }
        Ok(days)
    }

    pub fn insert_block(&self, block: &ItineraryBlock) -> Result<(), InfraError> {
        block.validate().map_err(InfraError::InvalidConfig)?;
        self.write_block(&self.connect()?, block, true)
    }

    fn write_block(&self, connection: &Connection, block: &ItineraryBlock, insert: bool) -> Result<(), InfraError> {
        let place_json = block.place.as_ref().map(serde_json::to_string).transpose()?;
        let tags_json = serde_json::to_string(&block.tags)?;
        let meta_json = serde_json::to_string(&block.meta)?;
        let sql = if insert {
            "INSERT INTO itinerary_blocks (id, trip_day_id, block_type, title_override, place_json,
               start_time, end_time, duration_min, cost_estimate, status, order_index, tags_json, meta_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        } else {
            "UPDATE itinerary_blocks SET trip_day_id = ?2, block_type = ?3, title_override = ?4,
               place_json = ?5, start_time = ?6, end_time = ?7, duration_min = ?8, cost_estimate = ?9,
               status = ?10, order_index = ?11, tags_json = ?12, meta_json = ?13
             WHERE id = ?1"
        };
        connection.execute(
            sql,
            params![
                block.id,
                block.trip_day_id,
                block.block_type.as_str(),
                block.title_override,
                place_json,
                block.start_time,
                block.end_time,
                block.duration_min,
                block.cost_estimate,
                block.status.as_str(),
                block.order_index,
                tags_json,
                meta_json
            ],
        )?;
        Ok(())
    }

    fn read_block(row: &Row<'_>) -> rusqlite::Result<RawBlockRow> {
        Ok(RawBlockRow {
            id: row.get(0)?,
            trip_day_id: row.get(1)?,
            block_type: row.get(2)?,
            title_override: row.get(3)?,
            place_json: row.get(4)?,
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            duration_min: row.get(7)?,
            cost_estimate: row.get(8)?,
            status: row.get(9)?,
            order_index: row.get(10)?,
            tags_json: row.get(11)?,
            meta_json: row.get(12)?,
        })
    }

    fn load_block(connection: &Connection, block_id: &str) -> Result<Option<ItineraryBlock>, InfraError> {
        let raw = connection
            .query_row(
                &format!("SELECT {BLOCK_COLUMNS} FROM itinerary_blocks WHERE id = ?1"),
                params![block_id],
                Self::read_block,
            )
            .optional()?;
        raw.map(RawBlockRow::into_block).transpose()
    }
}

struct RawBlockRow {
    id: String,
    trip_day_id: String,
    block_type: String,
    title_override: Option<String>,
    place_json: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    duration_min: Option<i64>,
    cost_estimate: Option<f64>,
    status: String,
    order_index: i64,
    tags_json: String,
    meta_json: String,
}

impl RawBlockRow {
    fn into_block(self) -> Result<ItineraryBlock, InfraError> {
        let status = BlockStatus::parse(&self.status).ok_or_else(|| {
            InfraError::InvalidConfig(format!(
                "invalid itinerary_blocks.status '{}' for block {}",
                self.status, self.id
            ))
        })?;
        Ok(ItineraryBlock {
            block_type: BlockType::parse(&self.block_type),
            place: self
                .place_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            tags: serde_json::from_str(&self.tags_json)?,
            meta: serde_json::from_str(&self.meta_json)?,
            id: self.id,
            trip_day_id: self.trip_day_id,
            title_override: self.title_override,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_min: self.duration_min,
            cost_estimate: self.cost_estimate,
            status,
            order_index: self.order_index,
        })
    }
}

#[async_trait]
impl ItineraryStore for SqliteItineraryStore {
    async fn fetch_blocks_for_day(&self, day_id: &str) -> Result<Vec<ItineraryBlock>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {BLOCK_COLUMNS} FROM itinerary_blocks WHERE trip_day_id = ?1 ORDER BY rowid ASC"
        ))?;
        let rows = statement.query_map(params![day_id.trim()], Self::read_block)?;
        let mut blocks = Vec::new();
        for row in rows {
            blocks.push(row?.into_block()?);
        }
        Ok(blocks)
    }

    async fn fetch_block(&self, block_id: &str) -> Result<Option<ItineraryBlock>, InfraError> {
        let Some(block_id) = normalized_id(block_id) else {
            return Ok(None);
        };
        Self::load_block(&self.connect()?, &block_id)
    }

    async fn update_block(&self, block_id: &str, patch: &BlockPatch) -> Result<(), InfraError> {
        let block_id = normalized_id(block_id)
            .ok_or_else(|| InfraError::InvalidConfig("block_id must not be empty".to_string()))?;
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        let mut block = Self::load_block(&transaction, &block_id)?
            .ok_or_else(|| InfraError::NotFound(format!("block {block_id}")))?;
        patch.apply_to(&mut block);
        self.write_block(&transaction, &block, false)?;
        transaction.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::fixtures::{block, place};
    use crate::domain::models::{BlockTag, BlockTagType};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DB: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        dir: PathBuf,
        store: SqliteItineraryStore,
    }

    impl TempDatabase {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DB.fetch_add(1, Ordering::Relaxed);
            let dir = std::env::temp_dir().join(format!(
                "trip-itinerary-store-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&dir).expect("create temp dir");
            let store = SqliteItineraryStore::new(dir.join("itinerary.sqlite"));
            store.initialize().expect("initialize schema");
            Self { dir, store }
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    fn rich_block() -> ItineraryBlock {
        let mut candidate = block("blk-1", Some("10:00:00"), None, Some(45));
        candidate.block_type = BlockType::Place;
        candidate.place = Some(place("Belem Tower", Some("landmark")));
        candidate.cost_estimate = Some(12.0);
        candidate.tags = vec![BlockTag {
            id: "tag-1".to_string(),
            label: "step-free".to_string(),
            tag_type: Some(BlockTagType::Accessibility),
        }];
        candidate.meta.insert(
            "notes".to_string(),
            serde_json::Value::String("arrive early".to_string()),
        );
        candidate
    }

    #[tokio::test]
    async fn in_memory_store_fetches_and_patches() {
        let store = InMemoryItineraryStore::with_blocks(vec![
            block("blk-1", Some("09:00"), None, None),
            block("blk-2", None, None, None),
        ]);
        let day = store.fetch_blocks_for_day("day-1").await.expect("fetch day");
        assert_eq!(day.len(), 2);
        assert!(store.fetch_blocks_for_day("day-2").await.expect("fetch").is_empty());

        store
            .update_block("blk-2", &BlockPatch::status(BlockStatus::Skipped))
            .await
            .expect("update");
        let updated = store.fetch_block("blk-2").await.expect("fetch").expect("exists");
        assert_eq!(updated.status, BlockStatus::Skipped);

        assert!(matches!(
            store.update_block("missing", &BlockPatch::default()).await,
            Err(InfraError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn poisoned_in_memory_store_reports_lock_error() {
        let store = InMemoryItineraryStore::with_blocks(vec![block("blk-1", None, None, None)]);
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.blocks.lock().expect("first lock");
            panic!("poison the store");
        }));
        assert!(poisoned.is_err());

        assert!(matches!(
            store.fetch_blocks_for_day("day-1").await,
            Err(InfraError::LockPoisoned(_))
        ));
        assert!(matches!(
            store.update_block("blk-1", &BlockPatch::status(BlockStatus::Done)).await,
            Err(InfraError::LockPoisoned(_))
        ));
    }

    #[tokio::test]
    async fn sqlite_store_round_trips_blocks_in_insertion_order() {
        let temp = TempDatabase::new();
        let later = block("blk-0", Some("18:00:00"), None, None);
        temp.store.insert_block(&rich_block()).expect("insert rich block");
        temp.store.insert_block(&later).expect("insert later block");

        let blocks = temp.store.fetch_blocks_for_day("day-1").await.expect("fetch day");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], rich_block());
        assert_eq!(blocks[1].id, "blk-0");
    }

    #[tokio::test]
    async fn sqlite_update_applies_patch_fields_only() {
        let temp = TempDatabase::new();
        temp.store.insert_block(&rich_block()).expect("insert");

        let patch = BlockPatch {
            start_time: Some(Some("11:00:00".to_string())),
            end_time: Some(Some("12:15:00".to_string())),
            duration_min: Some(None),
            ..BlockPatch::default()
        };
        temp.store.update_block("blk-1", &patch).await.expect("update");

        let stored = temp.store.fetch_block("blk-1").await.expect("fetch").expect("exists");
        assert_eq!(stored.start_time.as_deref(), Some("11:00:00"));
        assert_eq!(stored.end_time.as_deref(), Some("12:15:00"));
        assert_eq!(stored.duration_min, None);
        assert_eq!(stored.cost_estimate, Some(12.0));
        assert_eq!(stored.place, rich_block().place);

        assert!(matches!(
            temp.store.update_block("nope", &patch).await,
            Err(InfraError::NotFound(_))
        ));
    }

    #[test]
    fn sqlite_insert_rejects_invalid_block() {
        let temp = TempDatabase::new();
        let invalid = block("blk-1", Some("10:00"), Some("09:00"), None);
        assert!(matches!(
            temp.store.insert_block(&invalid),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn sqlite_days_are_listed_by_index() {
        let temp = TempDatabase::new();
        for (id, index) in [("day-2", 2), ("day-1", 1)] {
            temp.store
                .upsert_day(&TripDay {
                    id: id.to_string(),
                    trip_id: "trip-1".to_string(),
                    day_index: index,
                    date: if index == 1 { NaiveDate::from_ymd_opt(2026, 3, 1) } else { None },
                    title: None,
                    notes: None,
                })
                .expect("upsert day");
        }
        let days = temp.store.list_days("trip-1").expect("list days");
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].id, "day-1");
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2026, 3, 1));
        assert_eq!(days[1].date, None);
    }
}
