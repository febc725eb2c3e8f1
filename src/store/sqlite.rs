use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{NewsloomError, Result};
use crate::domain::Provenance;
use crate::store::{ItemStore, StoredItem, UpsertCounts, UpsertOutcome};

const INSERT_ITEM: &str = "INSERT OR IGNORE INTO items
    (item_uid, source_id, source_name, title, url, summary, published_at, collected_at, source_via, raw_json)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

// published_at only moves forward, and never to an empty value.
const REFRESH_ITEM: &str = "UPDATE items SET
        published_at = CASE
            WHEN ?1 IS NOT NULL AND (published_at IS NULL OR published_at = '' OR published_at < ?1) THEN ?1
            ELSE published_at
        END,
        collected_at = ?2,
        source_via = ?3,
        summary = ?4,
        raw_json = ?5
    WHERE item_uid = ?6";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| NewsloomError::Other(format!("migration failed: {}", e)))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            NewsloomError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn format_datetime(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    fn upsert_with(conn: &Connection, item: &StoredItem) -> Result<UpsertOutcome> {
        let published = item.published_at.as_ref().map(Self::format_datetime);
        let collected = Self::format_datetime(&item.collected_at);

        let inserted = conn.execute(
            INSERT_ITEM,
            params![
                item.item_uid,
                item.source_id,
                item.source_name,
                item.title,
                item.url,
                item.summary,
                published,
                collected,
                item.source_via.as_str(),
                item.raw_json,
            ],
        )?;
        if inserted > 0 {
            return Ok(UpsertOutcome::Inserted);
        }

        conn.execute(
            REFRESH_ITEM,
            params![
                published,
                collected,
                item.source_via.as_str(),
                item.summary,
                item.raw_json,
                item.item_uid,
            ],
        )?;
        Ok(UpsertOutcome::Updated)
    }

    fn row_to_item(row: &Row<'_>) -> rusqlite::Result<StoredItem> {
        let via: String = row.get(8)?;
        Ok(StoredItem {
            item_uid: row.get(0)?,
            source_id: row.get(1)?,
            source_name: row.get(2)?,
            title: row.get(3)?,
            url: row.get(4)?,
            summary: row.get(5)?,
            published_at: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| Self::parse_datetime(&s)),
            collected_at: row
                .get::<_, String>(7)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
            source_via: Provenance::parse(&via).unwrap_or(Provenance::Html),
            raw_json: row.get(9)?,
        })
    }
}

impl ItemStore for SqliteStore {
    fn upsert(&self, item: &StoredItem) -> Result<UpsertOutcome> {
        let conn = self.lock()?;
        Self::upsert_with(&conn, item)
    }

    fn upsert_all(&self, items: &[StoredItem]) -> Result<UpsertCounts> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut counts = UpsertCounts::default();

        for item in items {
            match Self::upsert_with(&tx, item)? {
                UpsertOutcome::Inserted => counts.inserted += 1,
                UpsertOutcome::Updated => counts.updated += 1,
            }
        }

        tx.commit()?;
        Ok(counts)
    }

    fn get(&self, item_uid: &str) -> Result<Option<StoredItem>> {
        let conn = self.lock()?;
        let item = conn
            .query_row(
                "SELECT item_uid, source_id, source_name, title, url, summary, published_at, collected_at, source_via, raw_json
                 FROM items WHERE item_uid = ?1",
                params![item_uid],
                Self::row_to_item,
            )
            .optional()?;
        Ok(item)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}
