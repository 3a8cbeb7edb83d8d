use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

use super::data::{
    Account, Event, EventId, NewPhoto, Photo, PhotoId, Photographer, PhotographerCard,
    PhotographerId, TagId,
};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id              TEXT PRIMARY KEY,
    display_name    TEXT NOT NULL,
    avatar_ref      TEXT
);

CREATE TABLE IF NOT EXISTS photographers (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id      TEXT NOT NULL UNIQUE REFERENCES accounts(id),
    bio             TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS events (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    location        TEXT NOT NULL DEFAULT '',
    date            INTEGER NOT NULL,
    organizer_id    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS photos (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    photographer_id INTEGER NOT NULL REFERENCES photographers(id) ON DELETE RESTRICT,
    event_id        INTEGER REFERENCES events(id) ON DELETE SET NULL,
    storage_ref     TEXT NOT NULL,
    like_count      INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
    date            INTEGER NOT NULL,
    created_at      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS photo_tags (
    photo_id        INTEGER NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
    tag_id          INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (photo_id, tag_id)
);

CREATE TABLE IF NOT EXISTS likes (
    viewer_id       TEXT NOT NULL,
    photo_id        INTEGER NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
    PRIMARY KEY (viewer_id, photo_id)
);

CREATE INDEX IF NOT EXISTS idx_photos_date ON photos(date DESC);
CREATE INDEX IF NOT EXISTS idx_photos_like_count ON photos(like_count DESC);
CREATE INDEX IF NOT EXISTS idx_photos_photographer ON photos(photographer_id);
CREATE INDEX IF NOT EXISTS idx_photos_event ON photos(event_id);
CREATE INDEX IF NOT EXISTS idx_photo_tags_tag ON photo_tags(tag_id);
CREATE INDEX IF NOT EXISTS idx_likes_photo ON likes(photo_id);
"#;

/// Query counters, used to verify short-circuiting and batch lookups
#[derive(Debug, Default)]
pub struct StoreStats {
    photo_queries: AtomicU64,
    lookup_queries: AtomicU64,
}

/// Point-in-time copy of [`StoreStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Queries that scanned the main photo relation
    pub photo_queries: u64,
    /// Facet resolution and enrichment lookups against related relations
    pub lookup_queries: u64,
}

impl StoreStats {
    fn photo_query(&self) {
        self.photo_queries.fetch_add(1, Ordering::Relaxed);
    }

    fn lookup_query(&self) {
        self.lookup_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            photo_queries: self.photo_queries.load(Ordering::Relaxed),
            lookup_queries: self.lookup_queries.load(Ordering::Relaxed),
        }
    }
}

/// The Library manages the SQLite catalog database.
/// It owns the connection and hands out transaction-scoped access to the
/// photo, photographer, event, tag and like relations.
pub struct Library {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    stats: StoreStats,
}

impl Library {
    /// Open (or create) the catalog described by `config` and initialize the schema.
    pub fn open(config: &CatalogConfig) -> Result<Self> {
        let conn = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = config.db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let conn = Connection::open(&config.db_path)?;
            conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
            // WAL: snapshot readers and the ledger writer do not block each other
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!("Journal mode: {}", mode);
            conn
        };

        conn.pragma_update(None, "foreign_keys", true)?;
        register_functions(&conn)?;

        info!("Catalog database opened at {}", config.db_path.display());

        let library = Library {
            conn: Mutex::new(conn),
            db_path: config.db_path.clone(),
            stats: StoreStats::default(),
        };
        library.init_schema()?;

        Ok(library)
    }

    /// Private in-memory catalog, handy for tests and demos
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&CatalogConfig::in_memory())
    }

    /// Initialize the database schema.
    /// Creates all necessary tables and indexes if they don't exist.
    fn init_schema(&self) -> Result<()> {
        self.lock()?.execute_batch(SCHEMA)?;
        debug!("Catalog schema initialized");
        Ok(())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Unavailable("catalog connection lock poisoned".into()))
    }

    /// Run `f` inside a deferred transaction.
    ///
    /// Everything `f` reads comes from one consistent snapshot of the store.
    pub fn read<T>(&self, f: impl FnOnce(&CatalogTx<'_>) -> Result<T>) -> Result<T> {
        self.run(TransactionBehavior::Deferred, f)
    }

    /// Run `f` inside an immediate (write-locking) transaction.
    ///
    /// The write lock is taken before `f` runs, so the existence checks
    /// inside `f` cannot race with another writer. If `f` fails, the
    /// transaction is rolled back and nothing it wrote survives.
    pub fn write<T>(&self, f: impl FnOnce(&CatalogTx<'_>) -> Result<T>) -> Result<T> {
        self.run(TransactionBehavior::Immediate, f)
    }

    fn run<T>(
        &self,
        behavior: TransactionBehavior,
        f: impl FnOnce(&CatalogTx<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = CatalogTx {
            tx: conn.transaction_with_behavior(behavior)?,
            stats: &self.stats,
        };
        let out = f(&tx)?;
        tx.tx.commit()?;
        Ok(out)
    }

    // ========== Seeding / admin writes ==========

    /// Insert or update the display info of an account
    pub fn upsert_account(&self, account: &Account) -> Result<()> {
        self.write(|tx| {
            tx.conn().execute(
                "INSERT INTO accounts (id, display_name, avatar_ref) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name,
                                               avatar_ref = excluded.avatar_ref",
                params![account.id, account.display_name, account.avatar_ref],
            )?;
            Ok(())
        })
    }

    /// Register a photographer profile for an existing account
    pub fn create_photographer(&self, account_id: &str, bio: &str) -> Result<PhotographerId> {
        self.write(|tx| {
            let known: Option<String> = tx
                .conn()
                .query_row("SELECT id FROM accounts WHERE id = ?1", [account_id], |row| row.get(0))
                .optional()?;
            if known.is_none() {
                return Err(CatalogError::NotFound(format!("account {account_id}")));
            }

            tx.conn().execute(
                "INSERT INTO photographers (account_id, bio) VALUES (?1, ?2)",
                params![account_id, bio],
            )?;
            Ok(tx.conn().last_insert_rowid())
        })
    }

    pub fn create_event(
        &self,
        name: &str,
        location: &str,
        date: DateTime<Utc>,
        organizer_id: &str,
    ) -> Result<EventId> {
        self.write(|tx| {
            tx.conn().execute(
                "INSERT INTO events (name, location, date, organizer_id) VALUES (?1, ?2, ?3, ?4)",
                params![name, location, date.timestamp(), organizer_id],
            )?;
            Ok(tx.conn().last_insert_rowid())
        })
    }

    /// Look up a tag by name, creating it if it does not exist yet
    pub fn ensure_tag(&self, name: &str) -> Result<TagId> {
        self.write(|tx| tx.ensure_tag(name))
    }

    /// Import a new photo into the catalog.
    /// Returns the new photo ID; the like count starts at zero.
    pub fn create_photo(&self, photo: &NewPhoto) -> Result<PhotoId> {
        self.write(|tx| {
            let photographer: Option<i64> = tx
                .conn()
                .query_row(
                    "SELECT id FROM photographers WHERE id = ?1",
                    [photo.photographer_id],
                    |row| row.get(0),
                )
                .optional()?;
            if photographer.is_none() {
                return Err(CatalogError::NotFound(format!(
                    "photographer {}",
                    photo.photographer_id
                )));
            }

            if let Some(event_id) = photo.event_id {
                let event: Option<i64> = tx
                    .conn()
                    .query_row("SELECT id FROM events WHERE id = ?1", [event_id], |row| row.get(0))
                    .optional()?;
                if event.is_none() {
                    return Err(CatalogError::NotFound(format!("event {event_id}")));
                }
            }

            tx.conn().execute(
                "INSERT INTO photos (photographer_id, event_id, storage_ref, like_count, date, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?5)",
                params![
                    photo.photographer_id,
                    photo.event_id,
                    photo.storage_ref,
                    photo.date.timestamp(),
                    Utc::now().timestamp(),
                ],
            )?;
            let photo_id = tx.conn().last_insert_rowid();

            for name in &photo.tags {
                let tag_id = tx.ensure_tag(name)?;
                tx.conn().execute(
                    "INSERT OR IGNORE INTO photo_tags (photo_id, tag_id) VALUES (?1, ?2)",
                    params![photo_id, tag_id],
                )?;
            }

            Ok(photo_id)
        })
    }

    /// Delete an event. Photos taken at it stay in the catalog with no event.
    pub fn delete_event(&self, event_id: EventId) -> Result<bool> {
        self.write(|tx| {
            let removed = tx.conn().execute("DELETE FROM events WHERE id = ?1", [event_id])?;
            Ok(removed == 1)
        })
    }

    /// Delete a photographer profile.
    /// Refused while any photo still references it.
    pub fn delete_photographer(&self, photographer_id: PhotographerId) -> Result<bool> {
        self.write(|tx| {
            let photos: i64 = tx.conn().query_row(
                "SELECT COUNT(*) FROM photos WHERE photographer_id = ?1",
                [photographer_id],
                |row| row.get(0),
            )?;
            if photos > 0 {
                return Err(CatalogError::validation(format!(
                    "photographer {photographer_id} still has {photos} photos"
                )));
            }

            let removed = tx
                .conn()
                .execute("DELETE FROM photographers WHERE id = ?1", [photographer_id])?;
            Ok(removed == 1)
        })
    }

    // ========== Convenience reads ==========

    pub fn photo(&self, photo_id: PhotoId) -> Result<Option<Photo>> {
        self.read(|tx| tx.photo(photo_id))
    }

    pub fn photographer(&self, photographer_id: PhotographerId) -> Result<Option<Photographer>> {
        self.read(|tx| tx.photographer(photographer_id))
    }

    pub fn event(&self, event_id: EventId) -> Result<Option<Event>> {
        self.read(|tx| tx.event(event_id))
    }

    /// Stored (denormalized) like count of a photo
    pub fn like_count(&self, photo_id: PhotoId) -> Result<Option<u32>> {
        self.read(|tx| Ok(tx.photo(photo_id)?.map(|photo| photo.like_count)))
    }

    /// Authoritative like count: the number of like rows for a photo
    pub fn count_likes(&self, photo_id: PhotoId) -> Result<u32> {
        self.read(|tx| {
            let count = tx.conn().query_row(
                "SELECT COUNT(*) FROM likes WHERE photo_id = ?1",
                [photo_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn is_liked(&self, photo_id: PhotoId, viewer_id: &str) -> Result<bool> {
        self.read(|tx| tx.has_like(photo_id, viewer_id))
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

/// Typed access to the catalog relations within one transaction
pub struct CatalogTx<'a> {
    tx: Transaction<'a>,
    stats: &'a StoreStats,
}

impl CatalogTx<'_> {
    fn conn(&self) -> &Connection {
        &self.tx
    }

    fn ensure_tag(&self, name: &str) -> Result<TagId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::validation("tag name must not be empty"));
        }

        self.conn().execute(
            "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            [name],
        )?;
        let id = self
            .conn()
            .query_row("SELECT id FROM tags WHERE name = ?1", [name], |row| row.get(0))?;
        Ok(id)
    }

    pub fn photo(&self, photo_id: PhotoId) -> Result<Option<Photo>> {
        let photo = self
            .conn()
            .query_row(
                "SELECT p.id, p.photographer_id, p.event_id, p.storage_ref, p.like_count, p.date
                 FROM photos p WHERE p.id = ?1",
                [photo_id],
                photo_from_row,
            )
            .optional()?;
        Ok(photo)
    }

    pub fn photographer(&self, photographer_id: PhotographerId) -> Result<Option<Photographer>> {
        let photographer = self
            .conn()
            .query_row(
                "SELECT id, account_id, bio FROM photographers WHERE id = ?1",
                [photographer_id],
                |row| {
                    Ok(Photographer {
                        id: row.get(0)?,
                        account_id: row.get(1)?,
                        bio: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(photographer)
    }

    pub fn event(&self, event_id: EventId) -> Result<Option<Event>> {
        let event = self
            .conn()
            .query_row(
                "SELECT id, name, location, date, organizer_id FROM events WHERE id = ?1",
                [event_id],
                |row| {
                    Ok(Event {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        location: row.get(2)?,
                        date: datetime_from_column(row, 3)?,
                        organizer_id: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(event)
    }

    // ========== Facet resolution ==========

    /// Photographers whose display name contains `needle`, case-insensitively
    pub fn photographer_ids_by_name(&self, needle: &str) -> Result<Vec<PhotographerId>> {
        self.stats.lookup_query();
        let mut stmt = self.conn().prepare(
            "SELECT p.id FROM photographers p
             JOIN accounts a ON a.id = p.account_id
             WHERE unicode_lower(a.display_name) LIKE ?1 ESCAPE '\\'
             ORDER BY p.id",
        )?;
        let ids = stmt
            .query_map([contains_pattern(needle)], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Events whose name contains `needle`, case-insensitively
    pub fn event_ids_by_name(&self, needle: &str) -> Result<Vec<EventId>> {
        self.stats.lookup_query();
        let mut stmt = self.conn().prepare(
            "SELECT id FROM events WHERE unicode_lower(name) LIKE ?1 ESCAPE '\\' ORDER BY id",
        )?;
        let ids = stmt
            .query_map([contains_pattern(needle)], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    /// Exact-name lookup of tags; names with no tag are absent from the map
    pub fn tag_ids_by_names(&self, names: &[String]) -> Result<HashMap<String, TagId>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        self.stats.lookup_query();
        let sql = format!(
            "SELECT name, id FROM tags WHERE name IN ({})",
            placeholders(names.len())
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let found = stmt
            .query_map(params_from_iter(names.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, TagId>(1)?))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(found)
    }

    // ========== Main photo relation ==========

    /// Count photos matching a `WHERE` fragment over alias `p`
    pub fn count_photos(&self, where_sql: &str, args: &[Value]) -> Result<u64> {
        self.stats.photo_query();
        let sql = format!("SELECT COUNT(*) FROM photos p {where_sql}");
        let count: i64 = self
            .conn()
            .query_row(&sql, params_from_iter(args.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Fetch one page of photos matching a `WHERE` fragment over alias `p`
    pub fn fetch_photo_page(
        &self,
        where_sql: &str,
        args: &[Value],
        order_by: &str,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Photo>> {
        self.stats.photo_query();
        let sql = format!(
            "SELECT p.id, p.photographer_id, p.event_id, p.storage_ref, p.like_count, p.date
             FROM photos p {where_sql} ORDER BY {order_by} LIMIT ? OFFSET ?"
        );

        let mut bound: Vec<Value> = args.to_vec();
        bound.push(Value::Integer(i64::from(limit)));
        bound.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

        let mut stmt = self.conn().prepare(&sql)?;
        let photos = stmt
            .query_map(params_from_iter(bound.iter()), photo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    // ========== Batch enrichment ==========

    pub fn photographer_cards(
        &self,
        ids: &[PhotographerId],
    ) -> Result<HashMap<PhotographerId, PhotographerCard>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.stats.lookup_query();
        let sql = format!(
            "SELECT p.id, a.display_name, a.avatar_ref FROM photographers p
             JOIN accounts a ON a.id = p.account_id
             WHERE p.id IN ({})",
            placeholders(ids.len())
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let cards = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                Ok((
                    row.get::<_, PhotographerId>(0)?,
                    PhotographerCard {
                        display_name: row.get(1)?,
                        avatar_ref: row.get(2)?,
                    },
                ))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(cards)
    }

    pub fn event_names(&self, ids: &[EventId]) -> Result<HashMap<EventId, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.stats.lookup_query();
        let sql = format!(
            "SELECT id, name FROM events WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let names = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                Ok((row.get::<_, EventId>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(names)
    }

    /// Full tag list per photo, sorted by name
    pub fn tag_names_for(&self, photo_ids: &[PhotoId]) -> Result<HashMap<PhotoId, Vec<String>>> {
        if photo_ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.stats.lookup_query();
        let sql = format!(
            "SELECT DISTINCT pt.photo_id, t.name FROM photo_tags pt
             JOIN tags t ON t.id = pt.tag_id
             WHERE pt.photo_id IN ({})
             ORDER BY pt.photo_id, t.name",
            placeholders(photo_ids.len())
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(photo_ids.iter()), |row| {
            Ok((row.get::<_, PhotoId>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut tags: HashMap<PhotoId, Vec<String>> = HashMap::new();
        for row in rows {
            let (photo_id, name) = row?;
            tags.entry(photo_id).or_default().push(name);
        }
        Ok(tags)
    }

    /// Which of `photo_ids` the viewer currently likes
    pub fn liked_photo_ids(&self, viewer_id: &str, photo_ids: &[PhotoId]) -> Result<HashSet<PhotoId>> {
        if photo_ids.is_empty() {
            return Ok(HashSet::new());
        }

        self.stats.lookup_query();
        let sql = format!(
            "SELECT photo_id FROM likes WHERE viewer_id = ? AND photo_id IN ({})",
            placeholders(photo_ids.len())
        );
        let mut bound: Vec<Value> = Vec::with_capacity(photo_ids.len() + 1);
        bound.push(Value::Text(viewer_id.to_string()));
        bound.extend(photo_ids.iter().map(|id| Value::Integer(*id)));

        let mut stmt = self.conn().prepare(&sql)?;
        let liked = stmt
            .query_map(params_from_iter(bound.iter()), |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(liked)
    }

    // ========== Like relation ==========
    //
    // Only the engagement ledger calls the mutating half of this section,
    // always inside a `Library::write` transaction.

    pub fn has_like(&self, photo_id: PhotoId, viewer_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn()
            .query_row(
                "SELECT 1 FROM likes WHERE viewer_id = ?1 AND photo_id = ?2",
                params![viewer_id, photo_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Returns false if the like row already existed
    pub(crate) fn insert_like(&self, photo_id: PhotoId, viewer_id: &str) -> Result<bool> {
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO likes (viewer_id, photo_id) VALUES (?1, ?2)",
            params![viewer_id, photo_id],
        )?;
        Ok(inserted == 1)
    }

    /// Returns false if there was no like row
    pub(crate) fn delete_like(&self, photo_id: PhotoId, viewer_id: &str) -> Result<bool> {
        let removed = self.conn().execute(
            "DELETE FROM likes WHERE viewer_id = ?1 AND photo_id = ?2",
            params![viewer_id, photo_id],
        )?;
        Ok(removed == 1)
    }

    pub(crate) fn increment_like_count(&self, photo_id: PhotoId) -> Result<()> {
        self.conn().execute(
            "UPDATE photos SET like_count = like_count + 1 WHERE id = ?1",
            [photo_id],
        )?;
        Ok(())
    }

    /// Decrement floored at zero. Returns false if the floor was hit.
    pub(crate) fn decrement_like_count(&self, photo_id: PhotoId) -> Result<bool> {
        let changed = self.conn().execute(
            "UPDATE photos SET like_count = like_count - 1 WHERE id = ?1 AND like_count > 0",
            [photo_id],
        )?;
        Ok(changed == 1)
    }

    /// Overwrite the stored count with the number of like rows
    pub(crate) fn recount_likes(&self, photo_id: PhotoId) -> Result<u32> {
        self.conn().execute(
            "UPDATE photos SET like_count = (SELECT COUNT(*) FROM likes WHERE photo_id = ?1)
             WHERE id = ?1",
            [photo_id],
        )?;
        let count = self.conn().query_row(
            "SELECT like_count FROM photos WHERE id = ?1",
            [photo_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        photographer_id: row.get(1)?,
        event_id: row.get(2)?,
        storage_ref: row.get(3)?,
        like_count: row.get(4)?,
        date: datetime_from_column(row, 5)?,
    })
}

/// Dates are stored as Unix seconds
fn datetime_from_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let secs: i64 = row.get(idx)?;
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

/// `?, ?, ?` for an IN list of `n` values (n > 0)
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// SQL functions every catalog connection needs.
///
/// SQLite's `lower()` folds ASCII only, so name matching goes through
/// `unicode_lower`, which folds the same way as [`contains_pattern`].
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|text| text.to_lowercase()))
        },
    )
}

/// Case-insensitive substring pattern for `unicode_lower(col) LIKE ... ESCAPE '\'`
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
