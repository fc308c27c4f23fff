//! Local persistent store.
//!
//! A single SQLite file holds JSON documents for bucket configs, upload
//! history and the settings singletons. All access goes through one
//! connection guarded by a mutex.

pub mod models;
pub mod schema;

pub use models::{
    AppSettings, BucketConfig, BucketKind, BucketSummary, CustomProxy, ProxySettings, ProxyType,
    Record, UploadHistoryRecord, SINGLETON_KEY,
};

use crate::error::{Result, UploaderError};
use crate::logging::{log_info, log_warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("conn", &"<sqlite connection>")
            .field("path", &self.path)
            .finish()
    }
}

impl Store {
    /// Open (or create) the database file and apply pending migrations
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        let store = Self::from_connection(conn, Some(db_path.to_path_buf()))?;
        log_info(
            "database",
            &format!("✓ Database connection established at {:?}", db_path),
        )
        .unwrap_or_default();
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(mut conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> Result<u32> {
        self.with_connection(|conn| schema::current_version(conn))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| UploaderError::LockPoisoned("database connection".to_string()))
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    /// Run store work on the blocking pool so async callers never stall
    pub async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store)).await?
    }

    pub fn get<R: Record>(&self, key: i64) -> Result<Option<R>> {
        self.with_connection(|conn| get_record(conn, key))
    }

    /// Insert or fully overwrite a record, returning its key
    pub fn put<R: Record>(&self, record: &R) -> Result<i64> {
        self.with_connection(|conn| put_record(conn, record))
    }

    pub fn delete<R: Record>(&self, key: i64) -> Result<bool> {
        self.with_connection(|conn| delete_record::<R>(conn, key))
    }

    pub fn list_all<R: Record>(&self) -> Result<Vec<R>> {
        self.with_connection(|conn| list_records(conn))
    }

    pub fn list_buckets(&self) -> Result<Vec<BucketConfig>> {
        self.list_all()
    }

    pub fn get_bucket(&self, id: i64) -> Result<Option<BucketConfig>> {
        self.get(id)
    }

    pub fn put_bucket(&self, bucket: &BucketConfig) -> Result<i64> {
        let id = self.put(bucket)?;
        log_info(
            "database",
            &format!("✓ Saved bucket {} ({})", id, bucket.bucket_name),
        )
        .unwrap_or_default();
        Ok(id)
    }

    /// Delete a bucket and clear `defaultBucketId` if it pointed at it.
    /// Both writes commit together.
    pub fn delete_bucket(&self, id: i64) -> Result<bool> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let deleted = delete_record::<BucketConfig>(&tx, id)?;

            let mut cleared = false;
            if let Ok(Some(mut settings)) = get_record::<AppSettings>(&tx, SINGLETON_KEY) {
                if settings.default_bucket_id == Some(id) {
                    settings.default_bucket_id = None;
                    put_record(&tx, &settings)?;
                    cleared = true;
                }
            }
            tx.commit()?;

            if deleted {
                log_info(
                    "database",
                    &format!(
                        "✓ Deleted bucket {}{}",
                        id,
                        if cleared { " (cleared default bucket)" } else { "" }
                    ),
                )
                .unwrap_or_default();
            }
            Ok(deleted)
        })
    }

    /// Append one history record. History rows are never rewritten.
    pub fn append_history(&self, record: &UploadHistoryRecord) -> Result<i64> {
        let mut record = record.clone();
        record.id = None;
        self.put(&record)
    }

    /// Most recent uploads first
    pub fn recent_history(&self, limit: usize) -> Result<Vec<UploadHistoryRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, data FROM \"{}\" \
                 ORDER BY json_extract(data, '$.timestamp') DESC, id DESC LIMIT ?",
                UploadHistoryRecord::TABLE
            ))?;
            let rows = stmt
                .query_map(params![limit as i64], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(id, data)| decode_record(id, &data))
                .collect()
        })
    }

    /// Read the settings row. `None` on first run; undecodable rows degrade
    /// to defaults instead of failing.
    pub fn load_app_settings(&self) -> Result<Option<AppSettings>> {
        self.load_singleton("app settings")
    }

    pub fn save_app_settings(&self, settings: &AppSettings) -> Result<()> {
        self.put(settings).map(|_| ())
    }

    pub fn load_proxy_settings(&self) -> Result<Option<ProxySettings>> {
        self.load_singleton("proxy settings")
    }

    pub fn save_proxy_settings(&self, settings: &ProxySettings) -> Result<()> {
        self.put(settings).map(|_| ())
    }

    fn load_singleton<R: Record + Default>(&self, label: &str) -> Result<Option<R>> {
        match self.get::<R>(SINGLETON_KEY) {
            Ok(found) => Ok(found),
            Err(UploaderError::Json(e)) => {
                log_warn(
                    "database",
                    &format!("⚠ Unreadable {} row, using defaults: {}", label, e),
                )
                .unwrap_or_default();
                Ok(Some(R::default()))
            }
            Err(e) => Err(e),
        }
    }
}

fn decode_record<R: Record>(id: i64, data: &str) -> Result<R> {
    let mut record: R = serde_json::from_str(data)?;
    record.set_key(id);
    Ok(record)
}

fn get_record<R: Record>(conn: &Connection, key: i64) -> Result<Option<R>> {
    let data: Option<String> = conn
        .query_row(
            &format!("SELECT data FROM \"{}\" WHERE id = ?", R::TABLE),
            params![key],
            |row| row.get(0),
        )
        .optional()?;

    data.map(|data| decode_record(key, &data)).transpose()
}

fn put_record<R: Record>(conn: &Connection, record: &R) -> Result<i64> {
    let data = serde_json::to_string(record)?;

    match record.key() {
        Some(key) => {
            conn.execute(
                &format!(
                    "INSERT INTO \"{}\" (id, data) VALUES (?, ?)
                     ON CONFLICT(id) DO UPDATE SET data = excluded.data",
                    R::TABLE
                ),
                params![key, data],
            )?;
            Ok(key)
        }
        None => {
            conn.execute(
                &format!("INSERT INTO \"{}\" (data) VALUES (?)", R::TABLE),
                params![data],
            )?;
            Ok(conn.last_insert_rowid())
        }
    }
}

fn delete_record<R: Record>(conn: &Connection, key: i64) -> Result<bool> {
    let affected = conn.execute(
        &format!("DELETE FROM \"{}\" WHERE id = ?", R::TABLE),
        params![key],
    )?;
    Ok(affected > 0)
}

fn list_records<R: Record>(conn: &Connection) -> Result<Vec<R>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, data FROM \"{}\" ORDER BY id ASC",
        R::TABLE
    ))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(id, data)| decode_record(id, &data))
        .collect()
}
