//! SQLite-backed card store and vocabulary pool
//!
//! Handles database initialization, vocabulary storage, SM-2 card state
//! persistence and the simulated day offset used by the CLI.

use crate::clock::Clock;
use crate::error::{Result, ReviewError};
use crate::models::{ScheduleState, VocabularyItem, VocabularyList};
use crate::store::{CardStore, VocabularySource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const CARD_COLUMNS: &str = "card_id, vocabulary_id, repetition, easiness_factor, interval_days, \
     due_at, last_reviewed_at, created_at, review_count, correct_count";

/// Opens (or creates) the database file and makes sure the schema exists
pub fn open_connection<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_database(&conn)?;
    Ok(conn)
}

/// Creates tables for vocabulary, SM-2 card state and app state.
pub fn init_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS vocabulary (
            id TEXT PRIMARY KEY,
            term TEXT NOT NULL UNIQUE,
            definition TEXT NOT NULL
        )",
        (),
    )?;

    // One card per vocabulary item; timestamps are unix millis
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cards (
            card_id TEXT PRIMARY KEY,
            vocabulary_id TEXT NOT NULL UNIQUE,
            repetition INTEGER NOT NULL DEFAULT 0,
            easiness_factor REAL NOT NULL DEFAULT 2.5,
            interval_days INTEGER NOT NULL DEFAULT 0,
            due_at INTEGER NOT NULL,
            last_reviewed_at INTEGER,
            created_at INTEGER NOT NULL,
            review_count INTEGER NOT NULL DEFAULT 0,
            correct_count INTEGER NOT NULL DEFAULT 0
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cards_due ON cards (due_at, created_at)",
        (),
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('day_offset', '0')",
        (),
    )?;

    Ok(())
}

/// Number of simulated days added to the wall clock
pub fn get_day_offset(conn: &Connection) -> Result<i64> {
    let value: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'day_offset'",
        [],
        |row| row.get(0),
    )?;
    Ok(value.parse::<i64>().unwrap_or(0))
}

/// Advances the simulated date (for testing spaced repetition by hand)
pub fn advance_day(conn: &Connection, days: i64) -> Result<i64> {
    let next = get_day_offset(conn)? + days;
    conn.execute(
        "UPDATE app_state SET value = ?1 WHERE key = 'day_offset'",
        params![next.to_string()],
    )?;
    Ok(next)
}

fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

fn from_millis(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn row_to_state(row: &Row<'_>) -> rusqlite::Result<ScheduleState> {
    let last_reviewed = match row.get::<_, Option<i64>>(6)? {
        Some(millis) => Some(from_millis(6, millis)?),
        None => None,
    };

    Ok(ScheduleState {
        card_id: row.get(0)?,
        vocabulary_id: row.get(1)?,
        repetition: row.get(2)?,
        easiness_factor: row.get(3)?,
        interval: row.get(4)?,
        due_date: from_millis(5, row.get(5)?)?,
        last_reviewed,
        created_at: from_millis(7, row.get(7)?)?,
        review_count: row.get(8)?,
        correct_count: row.get(9)?,
    })
}

fn select_card(conn: &Connection, card_id: &str) -> Result<Option<ScheduleState>> {
    let sql = format!("SELECT {} FROM cards WHERE card_id = ?1", CARD_COLUMNS);
    Ok(conn
        .query_row(&sql, params![card_id], row_to_state)
        .optional()?)
}

/// Card store and vocabulary pool sharing one SQLite connection.
///
/// Statements run on tokio's blocking pool so callers can await them
/// without stalling the runtime.
#[derive(Clone)]
pub struct SqliteCardStore {
    conn: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
}

impl SqliteCardStore {
    pub fn open<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> Result<Self> {
        info!("Opening card database at {}", path.as_ref().display());
        Ok(Self::from_connection(open_connection(path)?, clock))
    }

    pub fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_database(&conn)?;
        Ok(Self::from_connection(conn, clock))
    }

    /// Wraps a connection whose schema is already initialized
    pub fn from_connection(conn: Connection, clock: Arc<dyn Clock>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            clock,
        }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut guard)
        })
        .await?
    }

    /// Adds a word and returns its id. A term that already exists keeps its
    /// original id and definition.
    pub async fn add_vocabulary(&self, term: &str, definition: &str) -> Result<String> {
        let term = term.to_string();
        let definition = definition.to_string();
        self.with_conn(move |conn| insert_vocabulary(conn, &Uuid::new_v4().to_string(), &term, &definition))
            .await
    }

    /// Imports a whole word list in one transaction, returning how many words were new
    pub async fn import_list(&self, list: &VocabularyList) -> Result<usize> {
        let items = list.items.clone();
        let name = list.name.clone();
        let inserted = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0;
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR IGNORE INTO vocabulary (id, term, definition) VALUES (?1, ?2, ?3)",
                    )?;
                    for item in &items {
                        let id = if item.id.is_empty() {
                            Uuid::new_v4().to_string()
                        } else {
                            item.id.clone()
                        };
                        inserted += stmt.execute(params![id, item.term, item.definition])?;
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;
        info!("Imported {} new words from '{}'", inserted, name);
        Ok(inserted)
    }

    pub async fn get_vocabulary(&self, id: &str) -> Result<Option<VocabularyItem>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, term, definition FROM vocabulary WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(VocabularyItem {
                            id: row.get(0)?,
                            term: row.get(1)?,
                            definition: row.get(2)?,
                        })
                    },
                )
                .optional()?)
        })
        .await
    }

    pub async fn day_offset(&self) -> Result<i64> {
        self.with_conn(|conn| get_day_offset(conn)).await
    }

    /// Moves the stored simulated date forward; takes effect on the next open.
    pub async fn advance_days(&self, days: i64) -> Result<i64> {
        self.with_conn(move |conn| advance_day(conn, days)).await
    }
}

fn insert_vocabulary(conn: &Connection, id: &str, term: &str, definition: &str) -> Result<String> {
    conn.execute(
        "INSERT OR IGNORE INTO vocabulary (id, term, definition) VALUES (?1, ?2, ?3)",
        params![id, term, definition],
    )?;

    let id: String = conn.query_row(
        "SELECT id FROM vocabulary WHERE term = ?1",
        params![term],
        |row| row.get(0),
    )?;
    Ok(id)
}

#[async_trait]
impl CardStore for SqliteCardStore {
    async fn find_due(&self, limit: usize) -> Result<Vec<ScheduleState>> {
        let now = to_millis(self.clock.now());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT {} FROM cards WHERE due_at <= ?1
                 ORDER BY due_at ASC, created_at ASC, rowid ASC LIMIT ?2",
                CARD_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let cards = stmt
                .query_map(params![now, limit], row_to_state)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(cards)
        })
        .await
    }

    async fn create_from_pool(&self, vocabulary_ids: &[String]) -> Result<usize> {
        let now = to_millis(self.clock.now());
        let ids = vocabulary_ids.to_vec();
        let created = self
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let mut created = 0;
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR IGNORE INTO cards
                         (card_id, vocabulary_id, repetition, easiness_factor, interval_days,
                          due_at, last_reviewed_at, created_at, review_count, correct_count)
                         VALUES (?1, ?2, 0, 2.5, 0, ?3, NULL, ?3, 0, 0)",
                    )?;
                    for id in &ids {
                        created += stmt.execute(params![Uuid::new_v4().to_string(), id, now])?;
                    }
                }
                // dropping an uncommitted transaction rolls it back
                tx.commit()?;
                Ok(created)
            })
            .await?;
        debug!("Created {} cards ({} requested)", created, vocabulary_ids.len());
        Ok(created)
    }

    async fn update(&self, card_id: &str, new_state: ScheduleState) -> Result<ScheduleState> {
        let card_id = card_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE cards
                 SET repetition = ?1, easiness_factor = ?2, interval_days = ?3, due_at = ?4,
                     last_reviewed_at = ?5, review_count = ?6, correct_count = ?7
                 WHERE card_id = ?8",
                params![
                    new_state.repetition,
                    new_state.easiness_factor,
                    new_state.interval,
                    to_millis(new_state.due_date),
                    new_state.last_reviewed.map(to_millis),
                    new_state.review_count,
                    new_state.correct_count,
                    card_id
                ],
            )?;
            if changed == 0 {
                return Err(ReviewError::NotFound(card_id));
            }
            select_card(conn, &card_id)?.ok_or(ReviewError::NotFound(card_id))
        })
        .await
    }

    async fn pool_size(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn snapshot(&self) -> Result<Vec<ScheduleState>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM cards ORDER BY rowid ASC", CARD_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let cards = stmt
                .query_map([], row_to_state)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(cards)
        })
        .await
    }
}

#[async_trait]
impl VocabularySource for SqliteCardStore {
    async fn list_all_ids(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM vocabulary ORDER BY rowid ASC")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(ids)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::sm2;
    use crate::session::{SessionController, SessionStatus};
    use crate::store::StaticVocabulary;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 7, 30, 0).unwrap()
    }

    fn memory_store() -> (SqliteCardStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let store = SqliteCardStore::open_in_memory(clock.clone()).unwrap();
        (store, clock)
    }

    #[tokio::test]
    async fn test_add_vocabulary_is_idempotent_per_term() {
        let (store, _) = memory_store();
        let first = store.add_vocabulary("你好", "xin chào").await.unwrap();
        let again = store.add_vocabulary("你好", "chào").await.unwrap();
        assert_eq!(first, again);

        let item = store.get_vocabulary(&first).await.unwrap().unwrap();
        assert_eq!(item.definition, "xin chào");
        assert_eq!(store.list_all_ids().await.unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn test_create_from_pool_defaults_and_skips_existing() {
        let (store, _) = memory_store();
        let ids = vec!["w1".to_string(), "w2".to_string(), "w1".to_string()];
        assert_eq!(store.create_from_pool(&ids).await.unwrap(), 2);
        assert_eq!(store.create_from_pool(&ids).await.unwrap(), 0);
        assert_eq!(store.pool_size().await.unwrap(), 2);

        let cards = store.snapshot().await.unwrap();
        assert_eq!(cards[0].vocabulary_id, "w1");
        assert_eq!(cards[0].easiness_factor, 2.5);
        assert_eq!(cards[0].interval, 0);
        assert_eq!(cards[0].due_date, start());
        assert_eq!(cards[0].created_at, start());
    }

    /// Makes any insert of the `bad` vocabulary id fail inside the transaction
    fn reject_bad_inserts(store: &SqliteCardStore) {
        store
            .conn
            .lock()
            .unwrap()
            .execute(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON cards
                 WHEN NEW.vocabulary_id = 'bad'
                 BEGIN SELECT RAISE(ABORT, 'boom'); END",
                (),
            )
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_from_pool_rolls_back_on_failure() {
        let (store, _) = memory_store();
        reject_bad_inserts(&store);

        let ids = vec!["a".to_string(), "b".to_string(), "bad".to_string()];
        let result = store.create_from_pool(&ids).await;

        assert!(matches!(result, Err(ReviewError::PersistenceError(_))));
        assert_eq!(store.pool_size().await.unwrap(), 0);
        assert!(store.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_bootstrap_leaves_session_idle() {
        let (store, clock) = memory_store();
        reject_bad_inserts(&store);
        let store = Arc::new(store);
        let controller = SessionController::new(store.clone(), clock);
        let vocabulary = StaticVocabulary::new(["a", "b", "bad"]);

        let result = controller.start(10, &vocabulary).await;

        assert!(matches!(result, Err(ReviewError::PersistenceError(_))));
        assert_eq!(controller.status(), SessionStatus::Idle);
        assert_eq!(*controller.subscribe().borrow(), SessionStatus::Idle);
        assert_eq!(store.pool_size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_round_trips_and_leaves_card_not_due() {
        let (store, clock) = memory_store();
        store.create_from_pool(&["w1".to_string()]).await.unwrap();
        let card = store.find_due(10).await.unwrap().remove(0);

        let next = sm2::review(&card, 5, clock.now()).unwrap();
        let committed = store.update(&card.card_id, next.clone()).await.unwrap();
        assert_eq!(committed, next);
        assert!(store.find_due(10).await.unwrap().is_empty());

        clock.advance_days(1);
        assert_eq!(store.find_due(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_card_is_not_found() {
        let (store, _) = memory_store();
        let ghost = ScheduleState::new("ghost", "w0", start());
        let result = store.update("ghost", ghost).await;
        assert!(matches!(result, Err(ReviewError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_due_orders_and_limits() {
        let (store, clock) = memory_store();
        store
            .create_from_pool(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        clock.advance_days(1);
        store.create_from_pool(&["c".to_string()]).await.unwrap();

        // push "a" two days ahead, it must drop out of the due list
        let a = store.find_due(1).await.unwrap().remove(0);
        assert_eq!(a.vocabulary_id, "a");
        let pushed = ScheduleState {
            due_date: clock.now() + Duration::days(2),
            ..a
        };
        store.update(&pushed.card_id.clone(), pushed).await.unwrap();

        let due: Vec<String> = store
            .find_due(10)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.vocabulary_id)
            .collect();
        assert_eq!(due, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(store.find_due(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import_list_and_reopen_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.sqlite3");
        let clock = Arc::new(ManualClock::new(start()));

        let list = VocabularyList {
            name: "HSK 1".to_string(),
            items: vec![
                VocabularyItem {
                    id: String::new(),
                    term: "谢谢".to_string(),
                    definition: "cảm ơn".to_string(),
                },
                VocabularyItem {
                    id: "fixed-id".to_string(),
                    term: "再见".to_string(),
                    definition: "tạm biệt".to_string(),
                },
            ],
        };

        {
            let store = SqliteCardStore::open(&path, clock.clone()).unwrap();
            assert_eq!(store.import_list(&list).await.unwrap(), 2);
            assert_eq!(store.import_list(&list).await.unwrap(), 0);
        }

        let reopened = SqliteCardStore::open(&path, clock).unwrap();
        let ids = reopened.list_all_ids().await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"fixed-id".to_string()));
    }

    #[test]
    fn test_day_offset_advances() {
        let conn = Connection::open_in_memory().unwrap();
        init_database(&conn).unwrap();
        assert_eq!(get_day_offset(&conn).unwrap(), 0);
        assert_eq!(advance_day(&conn, 1).unwrap(), 1);
        assert_eq!(advance_day(&conn, 3).unwrap(), 4);
        assert_eq!(get_day_offset(&conn).unwrap(), 4);
    }

    #[tokio::test]
    async fn test_store_advances_day_offset() {
        let (store, _) = memory_store();
        assert_eq!(store.day_offset().await.unwrap(), 0);
        assert_eq!(store.advance_days(2).await.unwrap(), 2);
        assert_eq!(store.day_offset().await.unwrap(), 2);
    }
}
