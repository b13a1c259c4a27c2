//! Persistent catalog storage.

use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::{
    error::RepositoryError,
    models::{Author, ModRecord, VersionEntry},
};

/// Default page size of [`SqliteRepository::page`].
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Sink for fully built records. Storing a record with a known `id` replaces
/// the stored one.
pub trait Repository: Send + Sync {
    fn upsert(&self, record: &ModRecord) -> Result<(), RepositoryError>;
}

/// One page of the stored catalog, most downloaded first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogPage {
    pub total_rows: u64,
    pub pages: u64,
    pub mods: Vec<ModRecord>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS mods (
        id                 INTEGER PRIMARY KEY,
        title              TEXT,
        tag                TEXT,
        description        TEXT,
        icon_url           TEXT,
        avatar_url         TEXT,
        mod_link           TEXT NOT NULL,
        download_link      TEXT,
        author_name        TEXT,
        author_url         TEXT,
        rating             REAL,
        rating_count       INTEGER,
        download_count     INTEGER,
        subscription_count INTEGER,
        last_updated       TEXT,
        current_version    TEXT,
        content_type       TEXT,
        scraped_at         TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_mods_downloads ON mods(download_count);

    CREATE TABLE IF NOT EXISTS mod_versions (
        mod_id         INTEGER NOT NULL REFERENCES mods(id) ON DELETE CASCADE,
        position       INTEGER NOT NULL,
        version        TEXT,
        state          TEXT,
        release_date   TEXT,
        download_count INTEGER,
        download_url   TEXT,
        PRIMARY KEY (mod_id, position)
    );
";

const UPSERT_MOD: &str = "
    INSERT INTO mods (
        id, title, tag, description, icon_url, avatar_url, mod_link, download_link,
        author_name, author_url, rating, rating_count, download_count, subscription_count,
        last_updated, current_version, content_type
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
    ON CONFLICT(id) DO UPDATE SET
        title = excluded.title,
        tag = excluded.tag,
        description = excluded.description,
        icon_url = excluded.icon_url,
        avatar_url = excluded.avatar_url,
        mod_link = excluded.mod_link,
        download_link = excluded.download_link,
        author_name = excluded.author_name,
        author_url = excluded.author_url,
        rating = excluded.rating,
        rating_count = excluded.rating_count,
        download_count = excluded.download_count,
        subscription_count = excluded.subscription_count,
        last_updated = excluded.last_updated,
        current_version = excluded.current_version,
        content_type = excluded.content_type,
        scraped_at = datetime('now')
";

const SELECT_MOD: &str = "
    SELECT id, title, tag, description, icon_url, avatar_url, mod_link, download_link,
           author_name, author_url, rating, rating_count, download_count, subscription_count,
           last_updated, current_version, content_type
    FROM mods
";

/// [`Repository`] backed by a single SQLite connection.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Opens (creating if needed) the database at `path`. Parent directories
    /// must exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn close(self) -> Result<(), RepositoryError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| RepositoryError::Poisoned)?;
        conn.close().map_err(|(_, err)| RepositoryError::Sqlite(err))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.conn.lock().map_err(|_| RepositoryError::Poisoned)
    }

    pub fn count(&self) -> Result<u64, RepositoryError> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM mods", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn get(&self, id: u64) -> Result<Option<ModRecord>, RepositoryError> {
        let conn = self.lock()?;
        let record = conn
            .query_row(&format!("{SELECT_MOD} WHERE id = ?1"), [id], read_mod)
            .optional()?;
        match record {
            Some(mut record) => {
                record.versions = read_versions(&conn, record.id)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// 1-based page of the catalog ordered by downloads, unknown counts last.
    pub fn page(&self, page: u32, limit: u32) -> Result<CatalogPage, RepositoryError> {
        let limit = limit.max(1);
        let offset = u64::from(page.max(1) - 1) * u64::from(limit);

        let conn = self.lock()?;
        let total_rows: u64 = conn.query_row("SELECT COUNT(*) FROM mods", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            "{SELECT_MOD} ORDER BY download_count IS NULL, download_count DESC, id LIMIT ?1 OFFSET ?2"
        ))?;
        let mut mods = stmt
            .query_map(params![limit, offset], read_mod)?
            .collect::<Result<Vec<_>, _>>()?;
        for record in &mut mods {
            record.versions = read_versions(&conn, record.id)?;
        }

        Ok(CatalogPage {
            total_rows,
            pages: total_rows.div_ceil(u64::from(limit)),
            mods,
        })
    }
}

impl Repository for SqliteRepository {
    fn upsert(&self, record: &ModRecord) -> Result<(), RepositoryError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            UPSERT_MOD,
            params![
                record.id,
                record.title,
                record.tag,
                record.description,
                record.icon_url,
                record.avatar_url,
                record.mod_link,
                record.download_link,
                record.author.name,
                record.author.profile_url,
                record.rating,
                record.rating_count,
                record.download_count,
                record.subscription_count,
                record.last_updated,
                record.current_version,
                record.content_type,
            ],
        )?;

        tx.execute("DELETE FROM mod_versions WHERE mod_id = ?1", [record.id])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO mod_versions
                    (mod_id, position, version, state, release_date, download_count, download_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, entry) in record.versions.iter().enumerate() {
                insert.execute(params![
                    record.id,
                    position,
                    entry.version,
                    entry.state,
                    entry.release_date,
                    entry.download_count,
                    entry.download_url,
                ])?;
            }
        }

        tx.commit()?;
        log::debug!("saved mod {} ({})", record.id, record.display_title());
        Ok(())
    }
}

fn read_mod(row: &Row<'_>) -> rusqlite::Result<ModRecord> {
    Ok(ModRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        tag: row.get(2)?,
        description: row.get(3)?,
        icon_url: row.get(4)?,
        avatar_url: row.get(5)?,
        mod_link: row.get(6)?,
        download_link: row.get(7)?,
        author: Author {
            name: row.get(8)?,
            profile_url: row.get(9)?,
        },
        rating: row.get(10)?,
        rating_count: row.get(11)?,
        download_count: row.get(12)?,
        subscription_count: row.get(13)?,
        last_updated: row.get(14)?,
        current_version: row.get(15)?,
        content_type: row.get(16)?,
        versions: Vec::new(),
    })
}

fn read_versions(conn: &Connection, mod_id: u64) -> rusqlite::Result<Vec<VersionEntry>> {
    let mut stmt = conn.prepare_cached(
        "SELECT version, state, release_date, download_count, download_url
         FROM mod_versions WHERE mod_id = ?1 ORDER BY position",
    )?;
    let versions = stmt
        .query_map([mod_id], |row| {
            Ok(VersionEntry {
                version: row.get(0)?,
                state: row.get(1)?,
                release_date: row.get(2)?,
                download_count: row.get(3)?,
                download_url: row.get(4)?,
            })
        })?
        .collect();
    versions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, title: &str, downloads: Option<u64>) -> ModRecord {
        ModRecord {
            id,
            title: Some(title.to_string()),
            tag: Some("Cars".to_string()),
            description: None,
            icon_url: None,
            avatar_url: None,
            mod_link: format!("https://www.beamng.com/resources/mod.{id}/"),
            download_link: None,
            author: Author {
                name: Some("speedy".to_string()),
                profile_url: None,
            },
            rating: Some(4.5),
            rating_count: Some(10),
            download_count: downloads,
            subscription_count: None,
            last_updated: None,
            current_version: None,
            content_type: None,
            versions: vec![
                VersionEntry {
                    version: Some("1.1".to_string()),
                    download_count: Some(3),
                    ..Default::default()
                },
                VersionEntry::default(),
            ],
        }
    }

    #[test]
    fn open_in_memory() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        assert_eq!(repo.count().unwrap(), 0);
        repo.close().unwrap();
    }

    #[test]
    fn upsert_twice_keeps_one_row_with_latest_values() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.upsert(&record(1, "Old title", Some(5))).unwrap();

        let mut updated = record(1, "New title", Some(6));
        updated.versions.truncate(1);
        repo.upsert(&updated).unwrap();

        assert_eq!(repo.count().unwrap(), 1);
        let stored = repo.get(1).unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("New title"));
        assert_eq!(stored.download_count, Some(6));
        assert_eq!(stored.versions.len(), 1);
    }

    #[test]
    fn records_round_trip_with_absent_fields() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let original = record(7, "Sparse", None);
        repo.upsert(&original).unwrap();
        assert_eq!(repo.get(7).unwrap(), Some(original));
        assert_eq!(repo.get(8).unwrap(), None);
    }

    #[test]
    fn page_orders_by_downloads_with_unknown_last() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.upsert(&record(1, "a", Some(10))).unwrap();
        repo.upsert(&record(2, "b", None)).unwrap();
        repo.upsert(&record(3, "c", Some(500))).unwrap();

        let first = repo.page(1, 2).unwrap();
        assert_eq!(first.total_rows, 3);
        assert_eq!(first.pages, 2);
        let ids: Vec<u64> = first.mods.iter().map(|m| m.id).collect();
        assert_eq!(ids, [3, 1]);
        assert_eq!(first.mods[0].versions.len(), 2);

        let second = repo.page(2, 2).unwrap();
        assert_eq!(second.mods.len(), 1);
        assert_eq!(second.mods[0].id, 2);
    }

    #[test]
    fn opens_a_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mods.sqlite");

        let repo = SqliteRepository::open(&path).unwrap();
        repo.upsert(&record(1, "a", Some(1))).unwrap();
        repo.close().unwrap();

        let reopened = SqliteRepository::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        reopened.close().unwrap();
    }
}
