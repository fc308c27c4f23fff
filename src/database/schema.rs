//! Versioned schema and migrations.
//!
//! Each version redeclares the complete set of tables and indexed fields.
//! Opening a database applies every version above the stored
//! `PRAGMA user_version`, one transaction per version, in order.

use super::models::{
    APP_SETTINGS_TABLE, BUCKETS_TABLE, HISTORY_TABLE, LEGACY_TARGETS_TABLE, PROXY_SETTINGS_TABLE,
};
use crate::error::{Result, UploaderError};
use crate::logging::log_info;
use rusqlite::{Connection, OptionalExtension};

#[derive(Debug)]
pub struct TableSpec {
    pub name: &'static str,
    /// JSON fields with an expression index
    pub indexes: &'static [&'static str],
    /// Singleton tables only ever hold row id 1
    pub singleton: bool,
}

pub type UpgradeFn = fn(&Connection) -> Result<()>;

#[derive(Debug)]
pub struct SchemaVersion {
    pub version: u32,
    pub tables: &'static [TableSpec],
    pub upgrade: Option<UpgradeFn>,
}

const TARGETS: TableSpec = TableSpec {
    name: LEGACY_TARGETS_TABLE,
    indexes: &["bucketName"],
    singleton: false,
};

const BUCKETS: TableSpec = TableSpec {
    name: BUCKETS_TABLE,
    indexes: &["bucketName"],
    singleton: false,
};

const HISTORY: TableSpec = TableSpec {
    name: HISTORY_TABLE,
    indexes: &["fileName", "remoteFileName", "target", "timestamp"],
    singleton: false,
};

const APP_SETTINGS: TableSpec = TableSpec {
    name: APP_SETTINGS_TABLE,
    indexes: &[],
    singleton: true,
};

const PROXY_SETTINGS: TableSpec = TableSpec {
    name: PROXY_SETTINGS_TABLE,
    indexes: &[],
    singleton: true,
};

pub const SCHEMA_VERSIONS: &[SchemaVersion] = &[
    SchemaVersion {
        version: 1,
        tables: &[TARGETS],
        upgrade: None,
    },
    SchemaVersion {
        version: 2,
        tables: &[TARGETS, HISTORY],
        upgrade: None,
    },
    SchemaVersion {
        version: 3,
        tables: &[BUCKETS, HISTORY],
        upgrade: Some(fold_upload_targets),
    },
    SchemaVersion {
        version: 4,
        tables: &[BUCKETS, HISTORY, APP_SETTINGS],
        upgrade: None,
    },
    // v5: appSettings gains defaultBucketId (not indexed, no table change)
    SchemaVersion {
        version: 5,
        tables: &[BUCKETS, HISTORY, APP_SETTINGS],
        upgrade: None,
    },
    SchemaVersion {
        version: 6,
        tables: &[BUCKETS, HISTORY, APP_SETTINGS, PROXY_SETTINGS],
        upgrade: None,
    },
];

pub fn latest_version() -> u32 {
    SCHEMA_VERSIONS.last().map(|v| v.version).unwrap_or(0)
}

pub fn current_version(conn: &Connection) -> Result<u32> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version as u32)
}

/// Bring the database up to the newest schema version
pub fn migrate(conn: &mut Connection) -> Result<u32> {
    migrate_to(conn, latest_version())
}

/// Apply pending versions up to and including `target`
pub fn migrate_to(conn: &mut Connection, target: u32) -> Result<u32> {
    let current = current_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(UploaderError::Schema(format!(
            "database schema v{} is newer than supported v{}",
            current, latest
        )));
    }

    let mut applied = current;
    for schema in SCHEMA_VERSIONS
        .iter()
        .filter(|s| s.version > current && s.version <= target)
    {
        debug_assert!(schema.version > applied, "schema versions must increase");

        let tx = conn.transaction()?;
        declare_tables(&tx, schema.tables)?;
        if let Some(upgrade) = schema.upgrade {
            upgrade(&tx)?;
        }
        tx.pragma_update(None, "user_version", schema.version)?;
        tx.commit()?;

        applied = schema.version;
        log_info("database", &format!("✓ Applied schema v{}", schema.version))
            .unwrap_or_default();
    }

    Ok(applied)
}

fn declare_tables(conn: &Connection, tables: &[TableSpec]) -> Result<()> {
    for table in tables {
        let id_column = if table.singleton {
            "id INTEGER PRIMARY KEY CHECK (id = 1)"
        } else {
            "id INTEGER PRIMARY KEY AUTOINCREMENT"
        };

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({}, data TEXT NOT NULL);",
            table.name, id_column
        ))?;

        for field in table.indexes {
            conn.execute_batch(&format!(
                "CREATE INDEX IF NOT EXISTS \"idx_{table}_{field}\" \
                 ON \"{table}\" (json_extract(data, '$.{field}'));",
                table = table.name,
                field = field
            ))?;
        }
    }

    Ok(())
}

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// v3: the `uploadTargets` lineage becomes `buckets`, ids preserved
fn fold_upload_targets(conn: &Connection) -> Result<()> {
    if !table_exists(conn, LEGACY_TARGETS_TABLE)? {
        return Ok(());
    }

    let moved = conn.execute(
        &format!(
            "INSERT OR IGNORE INTO \"{}\" (id, data) SELECT id, data FROM \"{}\" ORDER BY id",
            BUCKETS_TABLE, LEGACY_TARGETS_TABLE
        ),
        [],
    )?;
    conn.execute_batch(&format!("DROP TABLE \"{}\";", LEGACY_TARGETS_TABLE))?;

    if moved > 0 {
        log_info(
            "database",
            &format!("✓ Moved {} upload target(s) into buckets", moved),
        )
        .unwrap_or_default();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_strictly_increase() {
        let versions: Vec<u32> = SCHEMA_VERSIONS.iter().map(|v| v.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(latest_version(), 6);
    }

    #[test]
    fn test_fresh_database_reaches_latest() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(migrate(&mut conn).unwrap(), 6);
        assert_eq!(current_version(&conn).unwrap(), 6);

        for table in [BUCKETS_TABLE, HISTORY_TABLE, APP_SETTINGS_TABLE, PROXY_SETTINGS_TABLE] {
            assert!(table_exists(&conn, table).unwrap(), "missing {}", table);
        }
        assert!(!table_exists(&conn, LEGACY_TARGETS_TABLE).unwrap());
    }

    #[test]
    fn test_migration_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(migrate(&mut conn).unwrap(), 6);
    }

    #[test]
    fn test_v2_rows_survive_upgrade() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(migrate_to(&mut conn, 2).unwrap(), 2);

        conn.execute(
            "INSERT INTO \"uploadTargets\" (data) VALUES (?)",
            [concat!(
                r#"{"type":"r2","bucketName":"legacy","accountId":"acc","#,
                r#""accessKey":"k","secretKey":"s","customDomain":""}"#,
            )],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO \"uploadHistory\" (data) VALUES (?)",
            [concat!(
                r#"{"fileName":"a.txt","remoteFileName":"a.txt","target":"legacy","#,
                r#""timestamp":"2024-05-01T10:00:00Z"}"#,
            )],
        )
        .unwrap();

        migrate(&mut conn).unwrap();

        let bucket_data: String = conn
            .query_row("SELECT data FROM buckets WHERE id = 1", [], |row| row.get(0))
            .unwrap();
        assert!(bucket_data.contains("legacy"));

        let history_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM \"uploadHistory\"", [], |row| row.get(0))
            .unwrap();
        assert_eq!(history_count, 1);
        assert!(!table_exists(&conn, LEGACY_TARGETS_TABLE).unwrap());
    }

    #[test]
    fn test_newer_database_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();

        let err = migrate(&mut conn).unwrap_err();
        assert!(matches!(err, UploaderError::Schema(_)));
    }

    #[test]
    fn test_singleton_tables_reject_other_ids() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let result = conn.execute("INSERT INTO \"appSettings\" (id, data) VALUES (2, '{}')", []);
        assert!(result.is_err());
    }
}
