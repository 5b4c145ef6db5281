//! SQLite storage implementation for C4.

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::UtteranceUpdate;
use crate::model::{
    CognitiveRecord, ConfidenceBand, OceanNormalized, OceanRaw, Phase, TaskRecord,
};

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("report not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("initialization error: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// The cognitive record store. Uses separate reader/writer connections
/// behind `Mutex`es for interior mutability, so `Store` is `Send + Sync`
/// and can be shared as `Arc<Store>` without an outer lock.
pub struct Store {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl Store {
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Open (creating if absent) the store at `path`, applying any pending
    /// migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer_conn = Connection::open(path)?;
        Self::configure_connection(&writer_conn)?;
        for migration in super::migrations::MIGRATIONS {
            writer_conn.execute_batch(migration)?;
        }

        let reader_conn = Connection::open(path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
        })
    }

    /// Open a private in-memory store — used by tests and by callers that
    /// don't need durability.
    pub fn open_in_memory() -> Result<Self> {
        let writer_conn = Connection::open_in_memory()?;
        Self::configure_connection(&writer_conn)?;
        for migration in super::migrations::MIGRATIONS {
            writer_conn.execute_batch(migration)?;
        }
        // A second in-memory connection would be a *different* empty
        // database, so the in-memory variant reads and writes through the
        // same connection under one mutex.
        Ok(Self {
            reader: Mutex::new(Connection::open_in_memory()?),
            writer: Mutex::new(writer_conn),
        })
    }

    fn with_writer<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.writer.lock().map_err(|_| {
            StorageError::Init("writer connection mutex poisoned".to_string())
        })?;
        f(&conn)
    }

    fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        // The in-memory variant keeps both tables on the writer connection;
        // reads always go through the writer there too.
        let conn = self.writer.lock().map_err(|_| {
            StorageError::Init("writer connection mutex poisoned".to_string())
        })?;
        let _ = &self.reader;
        f(&conn)
    }

    /// Insert a new cognitive record, returning its internal id.
    pub fn put(&self, record: &CognitiveRecord) -> Result<String> {
        self.with_writer(|conn| {
            conn.execute(
                "INSERT INTO ocean_scores (
                    id, report_id, created_at, ocean_raw, ocean_normalized, p_factor,
                    last_utterance, last_utterance_retention, last_utterance_confidence_score,
                    last_utterance_confidence_band, last_utterance_phase, last_utterance_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    record.id,
                    record.report_id,
                    record.created_at.to_rfc3339(),
                    serde_json::to_string(&record.ocean_raw).unwrap_or_default(),
                    serde_json::to_string(&record.ocean_normalized).unwrap_or_default(),
                    record.p_factor,
                    record.last_utterance,
                    record.last_utterance_retention,
                    record.last_utterance_confidence_score,
                    record.last_utterance_confidence_band.map(|b| band_to_str(b).to_string()),
                    record.last_utterance_phase.map(|p| phase_to_str(p).to_string()),
                    record.last_utterance_at.map(|t| t.to_rfc3339()),
                ],
            )?;
            Ok(record.id.clone())
        })
    }

    pub fn get_by_report(&self, report_id: &str) -> Result<CognitiveRecord> {
        self.with_reader(|conn| {
            conn.query_row(
                "SELECT * FROM ocean_scores WHERE report_id = ?1 ORDER BY created_at DESC LIMIT 1",
                params![report_id],
                row_to_record,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(report_id.to_string()))
        })
    }

    pub fn list_all(&self) -> Result<Vec<CognitiveRecord>> {
        self.with_reader(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM ocean_scores ORDER BY created_at DESC")?;
            let rows = stmt.query_map([], row_to_record)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }

    pub fn delete_by_report(&self, report_id: &str) -> Result<()> {
        self.with_writer(|conn| {
            let affected =
                conn.execute("DELETE FROM ocean_scores WHERE report_id = ?1", params![report_id])?;
            if affected == 0 {
                Err(StorageError::NotFound(report_id.to_string()))
            } else {
                Ok(())
            }
        })
    }

    pub fn latest(&self) -> Result<CognitiveRecord> {
        self.with_reader(|conn| {
            conn.query_row(
                "SELECT * FROM ocean_scores ORDER BY created_at DESC LIMIT 1",
                [],
                row_to_record,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound("no cognitive records exist".to_string()))
        })
    }

    /// Atomic group-write of the four last-utterance fields plus timestamp.
    pub fn update_utterance_fields(&self, id: &str, update: &UtteranceUpdate) -> Result<()> {
        self.with_writer(|conn| {
            let affected = conn.execute(
                "UPDATE ocean_scores SET
                    last_utterance = ?1,
                    last_utterance_retention = ?2,
                    last_utterance_confidence_score = ?3,
                    last_utterance_confidence_band = ?4,
                    last_utterance_phase = ?5,
                    last_utterance_at = ?6
                 WHERE id = ?7",
                params![
                    update.last_utterance,
                    update.last_utterance_retention,
                    update.last_utterance_confidence_score,
                    band_to_str(update.last_utterance_confidence_band),
                    phase_to_str(update.last_utterance_phase),
                    update.last_utterance_at.to_rfc3339(),
                    id,
                ],
            )?;
            if affected == 0 {
                Err(StorageError::NotFound(id.to_string()))
            } else {
                Ok(())
            }
        })
    }

    pub fn put_task(&self, task: &TaskRecord) -> Result<String> {
        self.with_writer(|conn| {
            conn.execute(
                "INSERT INTO tasks (
                    task_id, report_id, task_name, importance, required_time, available_time, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    task.task_id,
                    task.report_id,
                    task.task_name,
                    task.importance,
                    task.required_time,
                    task.available_time,
                    task.created_at.to_rfc3339(),
                ],
            )?;
            Ok(task.task_id.clone())
        })
    }

    pub fn list_tasks(&self, report_id: &str) -> Result<Vec<TaskRecord>> {
        self.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT task_id, report_id, task_name, importance, required_time, available_time, created_at
                 FROM tasks WHERE report_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map(params![report_id], row_to_task)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }
}

fn phase_to_str(phase: Phase) -> &'static str {
    match phase {
        Phase::Fast => "fast",
        Phase::Slow => "slow",
    }
}

fn band_to_str(band: ConfidenceBand) -> &'static str {
    match band {
        ConfidenceBand::High => "high",
        ConfidenceBand::Medium => "medium",
        ConfidenceBand::Low => "low",
        ConfidenceBand::VeryLow => "very_low",
        ConfidenceBand::Confused => "confused",
    }
}

fn parse_phase(s: &str) -> Option<Phase> {
    match s {
        "fast" => Some(Phase::Fast),
        "slow" => Some(Phase::Slow),
        _ => None,
    }
}

fn parse_band(s: &str) -> Option<ConfidenceBand> {
    match s {
        "high" => Some(ConfidenceBand::High),
        "medium" => Some(ConfidenceBand::Medium),
        "low" => Some(ConfidenceBand::Low),
        "very_low" => Some(ConfidenceBand::VeryLow),
        "confused" => Some(ConfidenceBand::Confused),
        _ => None,
    }
}

fn parse_rfc3339(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<CognitiveRecord> {
    let created_at_str: String = row.get("created_at")?;
    let ocean_raw_str: String = row.get("ocean_raw")?;
    let ocean_normalized_str: String = row.get("ocean_normalized")?;
    let last_utterance_at_str: Option<String> = row.get("last_utterance_at")?;
    let phase_str: Option<String> = row.get("last_utterance_phase")?;
    let band_str: Option<String> = row.get("last_utterance_confidence_band")?;

    Ok(CognitiveRecord {
        id: row.get("id")?,
        report_id: row.get("report_id")?,
        created_at: parse_rfc3339(&created_at_str)?,
        ocean_raw: serde_json::from_str::<OceanRaw>(&ocean_raw_str).unwrap_or_default(),
        ocean_normalized: serde_json::from_str::<OceanNormalized>(&ocean_normalized_str)
            .unwrap_or_default(),
        p_factor: row.get("p_factor")?,
        last_utterance: row.get("last_utterance")?,
        last_utterance_retention: row.get("last_utterance_retention")?,
        last_utterance_confidence_score: row.get("last_utterance_confidence_score")?,
        last_utterance_confidence_band: band_str.and_then(|s| parse_band(&s)),
        last_utterance_phase: phase_str.and_then(|s| parse_phase(&s)),
        last_utterance_at: last_utterance_at_str
            .map(|s| parse_rfc3339(&s))
            .transpose()?,
    })
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    let created_at_str: String = row.get("created_at")?;
    Ok(TaskRecord {
        task_id: row.get("task_id")?,
        report_id: row.get("report_id")?,
        task_name: row.get("task_name")?,
        importance: row.get("importance")?,
        required_time: row.get("required_time")?,
        available_time: row.get("available_time")?,
        created_at: parse_rfc3339(&created_at_str)?,
    })
}

impl FromStr for Phase {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_phase(s).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_record(report_id: &str) -> CognitiveRecord {
        CognitiveRecord::new(
            report_id,
            Utc::now(),
            OceanRaw::default(),
            OceanNormalized::default(),
            1.0,
        )
    }

    #[test]
    fn put_then_get_by_report_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let record = sample_record("r1");
        store.put(&record).unwrap();

        let fetched = store.get_by_report("r1").unwrap();
        assert_eq!(fetched.report_id, record.report_id);
        assert_eq!(fetched.p_factor, record.p_factor);
        assert_eq!(fetched.created_at.timestamp(), record.created_at.timestamp());
    }

    #[test]
    fn get_by_report_missing_returns_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.get_by_report("missing").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn list_all_sorts_newest_first() {
        let store = Store::open_in_memory().unwrap();
        let mut older = sample_record("a");
        older.created_at = Utc::now() - chrono::Duration::seconds(60);
        let newer = sample_record("b");
        store.put(&older).unwrap();
        store.put(&newer).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].report_id, "b");
    }

    #[test]
    fn delete_by_report_removes_record() {
        let store = Store::open_in_memory().unwrap();
        store.put(&sample_record("r1")).unwrap();
        store.delete_by_report("r1").unwrap();
        assert!(store.get_by_report("r1").is_err());
    }

    #[test]
    fn delete_missing_report_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.delete_by_report("missing").unwrap_err(),
            StorageError::NotFound(_)
        ));
    }

    #[test]
    fn latest_returns_most_recently_created() {
        let store = Store::open_in_memory().unwrap();
        let mut older = sample_record("a");
        older.created_at = Utc::now() - chrono::Duration::seconds(60);
        let newer = sample_record("b");
        store.put(&older).unwrap();
        store.put(&newer).unwrap();

        assert_eq!(store.latest().unwrap().report_id, "b");
    }

    #[test]
    fn update_utterance_fields_writes_all_four_atomically() {
        let store = Store::open_in_memory().unwrap();
        let record = sample_record("r1");
        let id = store.put(&record).unwrap();

        let update = UtteranceUpdate {
            last_utterance: "hello".to_string(),
            last_utterance_retention: 0.75,
            last_utterance_confidence_score: 0.6,
            last_utterance_confidence_band: ConfidenceBand::Medium,
            last_utterance_phase: Phase::Fast,
            last_utterance_at: Utc::now(),
        };
        store.update_utterance_fields(&id, &update).unwrap();

        let fetched = store.get_by_report("r1").unwrap();
        assert_eq!(fetched.last_utterance.as_deref(), Some("hello"));
        assert_eq!(fetched.last_utterance_retention, Some(0.75));
        assert_eq!(fetched.last_utterance_confidence_band, Some(ConfidenceBand::Medium));
        assert_eq!(fetched.last_utterance_phase, Some(Phase::Fast));
        // created_at and p_factor are untouched by the group-write.
        assert_eq!(fetched.created_at.timestamp(), record.created_at.timestamp());
        assert_eq!(fetched.p_factor, record.p_factor);
    }

    #[test]
    fn tasks_are_append_only_and_sorted_newest_first() {
        let store = Store::open_in_memory().unwrap();
        let mut older = TaskRecord::new("r1", "first", 0.5, 1.0, 2.0, Utc::now());
        older.created_at = Utc::now() - chrono::Duration::seconds(60);
        let newer = TaskRecord::new("r1", "second", 0.8, 2.0, 3.0, Utc::now());
        store.put_task(&older).unwrap();
        store.put_task(&newer).unwrap();

        let tasks = store.list_tasks("r1").unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].task_name, "second");
    }

    #[test]
    fn orphaned_task_is_still_accepted() {
        let store = Store::open_in_memory().unwrap();
        let task = TaskRecord::new("no-such-report", "orphan", 0.5, 1.0, 1.0, Utc::now());
        store.put_task(&task).unwrap();
        assert_eq!(store.list_tasks("no-such-report").unwrap().len(), 1);
    }
}
