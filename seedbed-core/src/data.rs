use crate::error::{Result, SeedError};
use crate::record::{CrawlStatus, FrontierRecord, ProtocolStatus};
use crate::store::{Field, FrontierStore};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Frontier store backed by a single SQLite table.
///
/// Writes go into an open transaction that [`flush`](FrontierStore::flush)
/// commits, so a run of puts costs one commit.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn file_exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn remove(path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    /// Open (creating if needed) the frontier database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            SeedError::Setup(format!("could not open {}: {}", path.display(), e))
        })?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SeedError::Setup(format!("could not open in-memory store: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            PRAGMA temp_store = MEMORY;
            ",
        )
        .map_err(|e| SeedError::Setup(format!("could not configure store: {}", e)))?;

        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        store
            .init_schema()
            .map_err(|e| SeedError::Setup(format!("could not create schema: {}", e)))?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.lock().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS frontier (
    key TEXT PRIMARY KEY,
    status TEXT NOT NULL CHECK(status IN (
        'unfetched', 'fetched', 'gone', 'redir_temp', 'redir_perm', 'retry', 'notmodified'
    )),
    score REAL NOT NULL DEFAULT 0,
    fetch_interval INTEGER NOT NULL DEFAULT 0,
    fetch_time INTEGER NOT NULL DEFAULT 0,
    metadata TEXT NOT NULL DEFAULT '{}',   -- JSON object of byte arrays
    markers TEXT NOT NULL DEFAULT '{}',    -- JSON object
    outlinks TEXT NOT NULL DEFAULT '{}',   -- JSON object, url -> anchor
    repr_url TEXT,
    protocol_status TEXT,                  -- JSON object
    content BLOB,
    content_type TEXT,
    base_url TEXT
);

CREATE INDEX IF NOT EXISTS idx_frontier_status ON frontier(status);
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(
        &self,
        verb: &str,
        on_conflict: &str,
        key: &str,
        record: &FrontierRecord,
    ) -> Result<usize> {
        let metadata = serde_json::to_string(&record.metadata)?;
        let markers = serde_json::to_string(&record.markers)?;
        let outlinks = serde_json::to_string(&record.outlinks)?;
        let protocol_status = record
            .protocol_status
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.lock();
        if conn.is_autocommit() {
            conn.execute_batch("BEGIN")?;
        }
        let changed = conn.execute(
            &format!(
                "{} INTO frontier (
                    key, status, score, fetch_interval, fetch_time, metadata, markers,
                    outlinks, repr_url, protocol_status, content, content_type, base_url
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13){}",
                verb, on_conflict
            ),
            params![
                key,
                record.status.as_str(),
                record.score as f64,
                record.fetch_interval_secs,
                record.fetch_time_millis,
                metadata,
                markers,
                outlinks,
                &record.repr_url,
                protocol_status,
                &record.content,
                &record.content_type,
                &record.base_url,
            ],
        )?;
        Ok(changed)
    }
}

fn decode_json<T: DeserializeOwned>(key: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| SeedError::CorruptRecord {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn apply_column(record: &mut FrontierRecord, key: &str, field: Field, value: Value) -> Result<()> {
    let mismatch = |value: &Value| SeedError::CorruptRecord {
        key: key.to_string(),
        reason: format!("unexpected {:?} in column {}", value.data_type(), field.column()),
    };

    match (field, value) {
        (_, Value::Null) => {}
        (Field::Status, Value::Text(name)) => {
            record.status =
                CrawlStatus::from_name(&name).ok_or_else(|| SeedError::CorruptRecord {
                    key: key.to_string(),
                    reason: format!("unknown status '{}'", name),
                })?;
        }
        (Field::Score, Value::Real(score)) => record.score = score as f32,
        (Field::Score, Value::Integer(score)) => record.score = score as f32,
        (Field::FetchInterval, Value::Integer(secs)) => {
            record.fetch_interval_secs =
                i32::try_from(secs).map_err(|_| mismatch(&Value::Integer(secs)))?;
        }
        (Field::FetchTime, Value::Integer(millis)) => record.fetch_time_millis = millis,
        (Field::Metadata, Value::Text(json)) => record.metadata = decode_json(key, &json)?,
        (Field::Markers, Value::Text(json)) => record.markers = decode_json(key, &json)?,
        (Field::Outlinks, Value::Text(json)) => record.outlinks = decode_json(key, &json)?,
        (Field::ReprUrl, Value::Text(url)) => record.repr_url = Some(url),
        (Field::ProtocolStatus, Value::Text(json)) => {
            record.protocol_status = Some(decode_json::<ProtocolStatus>(key, &json)?);
        }
        (Field::Content, Value::Blob(bytes)) => record.content = Some(bytes),
        (Field::ContentType, Value::Text(ct)) => record.content_type = Some(ct),
        (Field::BaseUrl, Value::Text(url)) => record.base_url = Some(url),
        (_, other) => return Err(mismatch(&other)),
    }
    Ok(())
}

impl FrontierStore for SqliteStore {
    fn exists(&self, key: &str) -> Result<bool> {
        let conn = self.lock();
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM frontier WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn get(&self, key: &str, fields: &[Field]) -> Result<Option<FrontierRecord>> {
        let fields: &[Field] = if fields.is_empty() { &Field::ALL } else { fields };
        let columns = fields
            .iter()
            .map(|f| f.column())
            .collect::<Vec<_>>()
            .join(", ");

        let values: Option<Vec<Value>> = {
            let conn = self.lock();
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM frontier WHERE key = ?1", columns))?;
            let row = stmt
                .query_row(params![key], |row| {
                    (0..fields.len())
                        .map(|i| row.get::<_, Value>(i))
                        .collect::<rusqlite::Result<Vec<_>>>()
                })
                .optional()?;
            row
        };

        let Some(values) = values else {
            return Ok(None);
        };
        let mut record = FrontierRecord::default();
        for (field, value) in fields.iter().zip(values) {
            apply_column(&mut record, key, *field, value)?;
        }
        Ok(Some(record))
    }

    fn put(&self, key: &str, record: &FrontierRecord) -> Result<()> {
        self.write("INSERT OR REPLACE", "", key, record)?;
        Ok(())
    }

    fn put_if_absent(&self, key: &str, record: &FrontierRecord) -> Result<bool> {
        // only a key conflict is ignored, other constraint failures are errors
        let changed = self.write("INSERT", " ON CONFLICT(key) DO NOTHING", key, record)?;
        if changed == 0 {
            debug!("Key {} already stored, insert ignored", key);
        }
        Ok(changed == 1)
    }

    fn flush(&self) -> Result<()> {
        let conn = self.lock();
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT key FROM frontier ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }

    fn len(&self) -> Result<usize> {
        let conn = self.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM frontier", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
