//! SQLite-backed queue store.
//!
//! A single `Mutex<Connection>`, idempotent `ALTER TABLE` migrations run at
//! startup, and synchronous methods since rusqlite has no async story of
//! its own.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::state_machine::{is_valid_transition, stamps_completed_at, stamps_started_at};
use super::store::{QueueStore, QueueStoreError, Result};
use super::types::{EnqueueRequest, ItemKind, QueueFilter, QueueItem, QueueItemUpdate, Status};

pub struct SqliteQueueStore {
    conn: Mutex<Connection>,
}

impl SqliteQueueStore {
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| QueueStoreError::Backend(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| QueueStoreError::Backend(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn initialize_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS queue_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                catalog_id TEXT NOT NULL,
                status TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 5,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                pre_selected_source TEXT,
                source_url TEXT,
                source_info_hash TEXT,
                client_name TEXT,
                client_id TEXT,
                temp_path TEXT,
                voucher_path TEXT,
                converted_path TEXT,
                final_path TEXT,
                format TEXT,
                progress REAL,
                eta_seconds INTEGER,
                retry_count INTEGER NOT NULL DEFAULT 0,
                next_retry_at TEXT,
                last_error TEXT,
                queued_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                updated_at TEXT NOT NULL,
                seeding_ratio REAL,
                seeding_time_seconds INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_queue_items_catalog_id ON queue_items(catalog_id);
            CREATE INDEX IF NOT EXISTS idx_queue_items_status ON queue_items(status);
            CREATE INDEX IF NOT EXISTS idx_queue_items_priority ON queue_items(priority DESC, queued_at ASC);
            "#,
        )
        .map_err(|e| QueueStoreError::Backend(e.to_string()))?;

        // Migration: seeding columns were added after the initial schema.
        let _ = conn.execute("ALTER TABLE queue_items ADD COLUMN seeding_ratio REAL", []);
        let _ = conn.execute(
            "ALTER TABLE queue_items ADD COLUMN seeding_time_seconds INTEGER",
            [],
        );

        Ok(())
    }

    const COLUMNS: &'static str = "id, catalog_id, status, priority, kind, title, author, \
        pre_selected_source, source_url, source_info_hash, client_name, client_id, temp_path, \
        voucher_path, converted_path, final_path, format, progress, eta_seconds, retry_count, \
        next_retry_at, last_error, queued_at, started_at, completed_at, updated_at, \
        seeding_ratio, seeding_time_seconds";

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<QueueItem> {
        let parse_dt = |s: Option<String>| -> Option<DateTime<Utc>> {
            s.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };

        let status_str: String = row.get(2)?;
        let kind_str: String = row.get(4)?;
        let pre_selected_source_json: Option<String> = row.get(7)?;

        Ok(QueueItem {
            id: row.get(0)?,
            catalog_id: row.get(1)?,
            status: Status::parse(&status_str).unwrap_or(Status::Queued),
            priority: row.get(3)?,
            kind: match kind_str.as_str() {
                "torrent" => ItemKind::Torrent,
                "magnet" => ItemKind::Magnet,
                _ => ItemKind::Catalog,
            },
            title: row.get(5)?,
            author: row.get(6)?,
            pre_selected_source: pre_selected_source_json
                .and_then(|j| serde_json::from_str(&j).ok()),
            source_url: row.get(8)?,
            source_info_hash: row.get(9)?,
            client_name: row.get(10)?,
            client_id: row.get(11)?,
            temp_path: row.get(12)?,
            voucher_path: row.get(13)?,
            converted_path: row.get(14)?,
            final_path: row.get(15)?,
            format: row.get(16)?,
            progress: row.get(17)?,
            eta_seconds: row.get(18)?,
            retry_count: row.get(19)?,
            next_retry_at: parse_dt(row.get(20)?),
            last_error: row.get(21)?,
            queued_at: parse_dt(row.get(22)?).unwrap_or_else(Utc::now),
            started_at: parse_dt(row.get(23)?),
            completed_at: parse_dt(row.get(24)?),
            updated_at: parse_dt(row.get(25)?).unwrap_or_else(Utc::now),
            seeding_ratio: row.get(26)?,
            seeding_time_seconds: row.get(27)?,
        })
    }

    fn fetch(conn: &Connection, id: i64) -> Result<QueueItem> {
        conn.query_row(
            &format!("SELECT {} FROM queue_items WHERE id = ?", Self::COLUMNS),
            params![id],
            Self::row_to_item,
        )
        .optional()
        .map_err(|e| QueueStoreError::Backend(e.to_string()))?
        .ok_or(QueueStoreError::NotFound(id))
    }
}

impl QueueStore for SqliteQueueStore {
    fn enqueue(&self, request: EnqueueRequest) -> Result<QueueItem> {
        let conn = self.conn.lock().unwrap();

        let existing: Option<String> = conn
            .query_row(
                "SELECT status FROM queue_items WHERE catalog_id = ?",
                params![request.catalog_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| QueueStoreError::Backend(e.to_string()))?;

        if let Some(status_str) = existing {
            if Status::parse(&status_str).map(Status::is_active).unwrap_or(false) {
                return Err(QueueStoreError::DuplicateActiveCatalogId(request.catalog_id));
            }
        }

        let now = Utc::now();
        let priority = QueueItem::clamp_priority(request.priority);
        let kind_str = match request.kind {
            ItemKind::Torrent => "torrent",
            ItemKind::Magnet => "magnet",
            ItemKind::Catalog => "catalog",
        };
        let pre_selected_json = request
            .pre_selected_source
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            "INSERT INTO queue_items (catalog_id, status, priority, kind, title, author, \
             pre_selected_source, queued_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                request.catalog_id,
                Status::Queued.as_str(),
                priority,
                kind_str,
                request.title,
                request.author,
                pre_selected_json,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| QueueStoreError::Backend(e.to_string()))?;

        let id = conn.last_insert_rowid();
        Self::fetch(&conn, id)
    }

    fn get(&self, id: i64) -> Result<QueueItem> {
        let conn = self.conn.lock().unwrap();
        Self::fetch(&conn, id)
    }

    fn get_by_catalog_id(&self, catalog_id: &str) -> Result<Option<QueueItem>> {
        let conn = self.conn.lock().unwrap();
        let id: Option<i64> = conn
            .query_row(
                "SELECT id FROM queue_items WHERE catalog_id = ? ORDER BY queued_at DESC LIMIT 1",
                params![catalog_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| QueueStoreError::Backend(e.to_string()))?;
        id.map(|id| Self::fetch(&conn, id)).transpose()
    }

    fn list(&self, filter: QueueFilter) -> Result<Vec<QueueItem>> {
        let conn = self.conn.lock().unwrap();

        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(statuses) = &filter.statuses {
            let placeholders = statuses.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            conditions.push(format!("status IN ({})", placeholders));
            for s in statuses {
                params.push(Box::new(s.as_str().to_string()));
            }
        }
        if let Some(kind) = filter.kind {
            conditions.push("kind = ?".to_string());
            params.push(Box::new(
                match kind {
                    ItemKind::Torrent => "torrent",
                    ItemKind::Magnet => "magnet",
                    ItemKind::Catalog => "catalog",
                }
                .to_string(),
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = filter.limit.unwrap_or(1000);
        let sql = format!(
            "SELECT {} FROM queue_items {} ORDER BY priority DESC, queued_at ASC LIMIT ? OFFSET ?",
            Self::COLUMNS,
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| QueueStoreError::Backend(e.to_string()))?;

        params.push(Box::new(limit));
        params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_item)
            .map_err(|e| QueueStoreError::Backend(e.to_string()))?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row.map_err(|e| QueueStoreError::Backend(e.to_string()))?);
        }
        Ok(items)
    }

    fn update(&self, id: i64, update: QueueItemUpdate) -> Result<QueueItem> {
        let conn = self.conn.lock().unwrap();
        let current = Self::fetch(&conn, id)?;

        let mut next = current.clone();
        let now = Utc::now();

        if let Some(new_status) = update.status {
            if !is_valid_transition(current.status, new_status) {
                return Err(QueueStoreError::InvalidTransition {
                    id,
                    from: current.status,
                    to: new_status,
                });
            }
            if stamps_started_at(current.status, new_status) {
                next.started_at = Some(now);
            }
            if stamps_completed_at(new_status) {
                next.completed_at = Some(now);
            }
            next.status = new_status;
        }

        macro_rules! apply_opt {
            ($field:ident) => {
                if let Some(v) = update.$field {
                    next.$field = v;
                }
            };
        }
        macro_rules! apply_plain {
            ($field:ident) => {
                if let Some(v) = update.$field {
                    next.$field = v;
                }
            };
        }

        apply_opt!(source_url);
        apply_opt!(source_info_hash);
        apply_opt!(client_name);
        apply_opt!(client_id);
        apply_opt!(temp_path);
        apply_opt!(voucher_path);
        apply_opt!(converted_path);
        apply_opt!(final_path);
        apply_opt!(format);
        apply_opt!(progress);
        apply_opt!(eta_seconds);
        apply_plain!(retry_count);
        apply_opt!(next_retry_at);
        apply_opt!(last_error);
        apply_opt!(started_at);
        apply_opt!(completed_at);
        apply_opt!(seeding_ratio);
        apply_opt!(seeding_time_seconds);

        next.updated_at = now;

        conn.execute(
            "UPDATE queue_items SET status = ?, source_url = ?, source_info_hash = ?, \
             client_name = ?, client_id = ?, temp_path = ?, voucher_path = ?, converted_path = ?, \
             final_path = ?, format = ?, progress = ?, eta_seconds = ?, retry_count = ?, \
             next_retry_at = ?, last_error = ?, started_at = ?, completed_at = ?, updated_at = ?, \
             seeding_ratio = ?, seeding_time_seconds = ? WHERE id = ?",
            params![
                next.status.as_str(),
                next.source_url,
                next.source_info_hash,
                next.client_name,
                next.client_id,
                next.temp_path,
                next.voucher_path,
                next.converted_path,
                next.final_path,
                next.format,
                next.progress,
                next.eta_seconds,
                next.retry_count,
                next.next_retry_at.map(|dt| dt.to_rfc3339()),
                next.last_error,
                next.started_at.map(|dt| dt.to_rfc3339()),
                next.completed_at.map(|dt| dt.to_rfc3339()),
                next.updated_at.to_rfc3339(),
                next.seeding_ratio,
                next.seeding_time_seconds,
                id,
            ],
        )
        .map_err(|e| QueueStoreError::Backend(e.to_string()))?;

        Ok(next)
    }

    fn delete(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute("DELETE FROM queue_items WHERE id = ?", params![id])
            .map_err(|e| QueueStoreError::Backend(e.to_string()))?;
        if changed == 0 {
            return Err(QueueStoreError::NotFound(id));
        }
        Ok(())
    }

    fn due_for_retry(&self) -> Result<Vec<QueueItem>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "SELECT {} FROM queue_items WHERE next_retry_at IS NOT NULL AND next_retry_at <= ? \
             ORDER BY priority DESC, queued_at ASC",
            Self::COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| QueueStoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map(params![now], Self::row_to_item)
            .map_err(|e| QueueStoreError::Backend(e.to_string()))?;
        let mut items = Vec::new();
        for row in rows {
            items.push(row.map_err(|e| QueueStoreError::Backend(e.to_string()))?);
        }
        Ok(items)
    }

    fn statistics(&self) -> Result<Vec<(Status, i64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM queue_items GROUP BY status")
            .map_err(|e| QueueStoreError::Backend(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                let status_str: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((status_str, count))
            })
            .map_err(|e| QueueStoreError::Backend(e.to_string()))?;

        let mut out = Vec::new();
        for row in rows {
            let (status_str, count) = row.map_err(|e| QueueStoreError::Backend(e.to_string()))?;
            if let Some(status) = Status::parse(&status_str) {
                out.push((status, count));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(catalog_id: &str) -> EnqueueRequest {
        EnqueueRequest {
            catalog_id: catalog_id.to_string(),
            priority: 5,
            kind: ItemKind::Torrent,
            title: "Some Book".to_string(),
            author: "Some Author".to_string(),
            pre_selected_source: None,
        }
    }

    #[test]
    fn enqueue_and_get_round_trip() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let item = store.enqueue(request("book-1")).unwrap();
        assert_eq!(item.status, Status::Queued);
        let fetched = store.get(item.id).unwrap();
        assert_eq!(fetched.catalog_id, "book-1");
    }

    #[test]
    fn duplicate_active_catalog_id_rejected() {
        let store = SqliteQueueStore::in_memory().unwrap();
        store.enqueue(request("book-1")).unwrap();
        let result = store.enqueue(request("book-1"));
        assert!(matches!(result, Err(QueueStoreError::DuplicateActiveCatalogId(_))));
    }

    #[test]
    fn reenqueue_allowed_after_terminal_state() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let item = store.enqueue(request("book-1")).unwrap();
        store
            .update(item.id, QueueItemUpdate::new().with_status(Status::Searching))
            .unwrap();
        store
            .update(item.id, QueueItemUpdate::new().with_status(Status::SearchFailed))
            .unwrap();
        // SearchFailed is terminal (and not "active"), so a fresh enqueue is fine.
        let second = store.enqueue(request("book-1"));
        assert!(second.is_ok());
    }

    #[test]
    fn invalid_transition_rejected() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let item = store.enqueue(request("book-1")).unwrap();
        let result = store.update(item.id, QueueItemUpdate::new().with_status(Status::Imported));
        assert!(matches!(result, Err(QueueStoreError::InvalidTransition { .. })));
    }

    #[test]
    fn update_stamps_started_and_completed_at() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let item = store.enqueue(request("book-1")).unwrap();
        let found = store
            .update(item.id, QueueItemUpdate::new().with_status(Status::Searching))
            .unwrap();
        let found = store
            .update(found.id, QueueItemUpdate::new().with_status(Status::Found))
            .unwrap();
        let downloading = store
            .update(found.id, QueueItemUpdate::new().with_status(Status::Downloading))
            .unwrap();
        assert!(downloading.started_at.is_some());
        let complete = store
            .update(downloading.id, QueueItemUpdate::new().with_status(Status::Complete))
            .unwrap();
        assert!(complete.completed_at.is_some());
    }

    #[test]
    fn list_orders_by_priority_then_queued_at() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let mut low = request("book-low");
        low.priority = 1;
        let mut high = request("book-high");
        high.priority = 10;
        store.enqueue(low).unwrap();
        store.enqueue(high).unwrap();

        let items = store.list(QueueFilter::new()).unwrap();
        assert_eq!(items[0].catalog_id, "book-high");
        assert_eq!(items[1].catalog_id, "book-low");
    }

    #[test]
    fn delete_removes_item() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let item = store.enqueue(request("book-1")).unwrap();
        store.delete(item.id).unwrap();
        assert!(matches!(store.get(item.id), Err(QueueStoreError::NotFound(_))));
    }

    #[test]
    fn due_for_retry_filters_on_timestamp() {
        let store = SqliteQueueStore::in_memory().unwrap();
        let item = store.enqueue(request("book-1")).unwrap();
        store
            .update(
                item.id,
                QueueItemUpdate::new().with_status(Status::Searching),
            )
            .unwrap();
        store
            .update(
                item.id,
                QueueItemUpdate {
                    status: Some(Status::SearchFailed),
                    next_retry_at: Some(Some(Utc::now() - chrono::Duration::seconds(5))),
                    ..Default::default()
                },
            )
            .unwrap();
        let due = store.due_for_retry().unwrap();
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn statistics_groups_by_status() {
        let store = SqliteQueueStore::in_memory().unwrap();
        store.enqueue(request("book-1")).unwrap();
        store.enqueue(request("book-2")).unwrap();
        let stats = store.statistics().unwrap();
        let queued = stats.iter().find(|(s, _)| *s == Status::Queued).unwrap();
        assert_eq!(queued.1, 2);
    }

    #[test]
    fn file_based_store_persists_to_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("queue.db");
        let store = SqliteQueueStore::new(&db_path).unwrap();
        store.enqueue(request("book-1")).unwrap();
        assert!(db_path.exists());
    }
}
