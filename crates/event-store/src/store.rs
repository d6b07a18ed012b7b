//! SQLite-backed change event store
//!
//! A file-backed store keeps two connections: one serialized writer used by
//! the watch pipeline and one reader for queries and stats. With WAL enabled
//! a long aggregate read never blocks an insert. In-memory stores (tests)
//! share a single connection because a second in-memory connection would see
//! a different database.

use crate::cache::StatsCache;
use crate::error::{Result, StoreError};
use crate::models::{Action, AppChangeCount, ChangeEvent, Filter, Stats};
use crate::schema;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Row cap for the "top" and "recent" stats lists
const STATS_LIST_LIMIT: i64 = 10;

const SELECT_COLUMNS: &str = "id, timestamp, namespace, kind, name, action, diff, metadata, image_before, image_after";

/// Append-only change event store.
pub struct EventStore {
    writer: Mutex<Connection>,
    reader: Option<Mutex<Connection>>,
    stats_cache: StatsCache,
}

impl EventStore {
    /// Opens (creating if needed) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let writer = Connection::open(path)?;
        configure(&writer)?;
        schema::apply(&writer)?;

        let reader = Connection::open(path)?;
        configure(&reader)?;

        info!(path = %path.display(), "Opened event store");

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Some(Mutex::new(reader)),
            stats_cache: StatsCache::default(),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::apply(&conn)?;

        Ok(Self {
            writer: Mutex::new(conn),
            reader: None,
            stats_cache: StatsCache::default(),
        })
    }

    /// Replaces the stats cache with one using `ttl`.
    pub fn with_stats_ttl(mut self, ttl: Duration) -> Self {
        self.stats_cache = StatsCache::new(ttl);
        self
    }

    /// Persists one event and returns it with its assigned id.
    ///
    /// Any id already set on `event` is ignored.
    pub fn save(&self, mut event: ChangeEvent) -> Result<ChangeEvent> {
        let conn = self.writer()?;
        conn.execute(
            "INSERT INTO change_events
                (timestamp, namespace, kind, name, action, diff, metadata, image_before, image_after)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event.timestamp.timestamp_micros(),
                event.namespace,
                event.kind,
                event.name,
                event.action.as_str(),
                event.diff,
                event.metadata,
                event.image_before,
                event.image_after,
            ],
        )?;
        event.id = Some(conn.last_insert_rowid());

        debug!(
            id = event.id,
            kind = %event.kind,
            namespace = %event.namespace,
            name = %event.name,
            action = %event.action,
            "Saved change event"
        );

        Ok(event)
    }

    /// Returns matching events, newest first, paginated by the filter.
    pub fn query(&self, filter: &Filter) -> Result<Vec<ChangeEvent>> {
        let (clause, mut values) = where_clause(filter);
        let mut sql = format!(
            "SELECT {} FROM change_events{} ORDER BY timestamp DESC, id DESC",
            SELECT_COLUMNS, clause
        );

        match (filter.limit, filter.offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                values.push(Value::Integer(i64::from(limit)));
                values.push(Value::Integer(i64::from(offset.unwrap_or(0))));
            }
            (None, Some(offset)) => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                values.push(Value::Integer(i64::from(offset)));
            }
            (None, None) => {}
        }

        let conn = self.reader()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_event)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Counts matching events, ignoring pagination.
    pub fn count(&self, filter: &Filter) -> Result<i64> {
        let (clause, values) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM change_events{}", clause);

        let conn = self.reader()?;
        let total = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(total)
    }

    /// One page of matching events plus the total match count.
    pub fn query_with_total(&self, filter: &Filter) -> Result<(Vec<ChangeEvent>, i64)> {
        let events = self.query(filter)?;
        let total = self.count(filter)?;
        Ok((events, total))
    }

    /// Full history of one resource, newest first.
    pub fn timeline(&self, namespace: &str, kind: &str, name: &str) -> Result<Vec<ChangeEvent>> {
        let conn = self.reader()?;
        let sql = format!(
            "SELECT {} FROM change_events
             WHERE namespace = ?1 AND kind = ?2 AND name = ?3
             ORDER BY timestamp DESC, id DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![namespace, kind, name], row_to_event)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    /// Deletes events older than `retention_days` days; returns rows removed.
    pub fn cleanup(&self, retention_days: u32) -> Result<u64> {
        let cutoff = Utc::now() - ChronoDuration::days(i64::from(retention_days));
        self.cleanup_before(cutoff)
    }

    /// Deletes events with `timestamp < cutoff`; returns rows removed.
    pub fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let removed = {
            let conn = self.writer()?;
            conn.execute(
                "DELETE FROM change_events WHERE timestamp < ?1",
                params![cutoff.timestamp_micros()],
            )?
        };

        if removed > 0 {
            self.stats_cache.invalidate();
        }
        info!(removed, cutoff = %cutoff, "Cleaned up old change events");

        Ok(removed as u64)
    }

    /// Aggregate stats, served from the cache while fresh.
    pub fn stats(&self) -> Result<Stats> {
        self.stats_cache.get_or_refresh(|| self.compute_stats())
    }

    /// Aggregate stats computed directly, bypassing the cache.
    pub fn compute_stats(&self) -> Result<Stats> {
        let since = (Utc::now() - ChronoDuration::hours(24)).timestamp_micros();
        let conn = self.reader()?;

        let total_changes: i64 =
            conn.query_row("SELECT COUNT(*) FROM change_events", [], |row| row.get(0))?;

        let changes_last_24h: i64 = conn.query_row(
            "SELECT COUNT(*) FROM change_events WHERE timestamp >= ?1",
            params![since],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT name, COUNT(*) AS changes FROM change_events
             WHERE timestamp >= ?1
             GROUP BY name
             ORDER BY changes DESC, name ASC
             LIMIT ?2",
        )?;
        let top_modified_apps = stmt
            .query_map(params![since, STATS_LIST_LIMIT], |row| {
                Ok(AppChangeCount {
                    name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT image_after FROM change_events
             WHERE image_after IS NOT NULL AND image_after != ''
             GROUP BY image_after
             ORDER BY MAX(timestamp) DESC, MAX(id) DESC
             LIMIT ?1",
        )?;
        let recent_images = stmt
            .query_map(params![STATS_LIST_LIMIT], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let changes_by_kind = grouped_counts(&conn, "kind")?;
        let changes_by_action = grouped_counts(&conn, "action")?;

        Ok(Stats {
            total_changes,
            changes_last_24h,
            changes_per_hour: changes_last_24h as f64 / 24.0,
            top_modified_apps,
            recent_images,
            changes_by_kind,
            changes_by_action,
        })
    }

    fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn reader(&self) -> Result<MutexGuard<'_, Connection>> {
        match &self.reader {
            Some(reader) => reader
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string())),
            None => self.writer(),
        }
    }
}

/// Applies per-connection pragmas for a file-backed database.
fn configure(conn: &Connection) -> Result<()> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(journal_mode = %mode, "Configured SQLite journal mode");
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

/// Builds the WHERE clause and bound values for a filter.
fn where_clause(filter: &Filter) -> (String, Vec<Value>) {
    let mut conditions: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(namespace) = non_empty(&filter.namespace) {
        conditions.push("namespace = ?");
        values.push(Value::Text(namespace.to_string()));
    }
    if let Some(kind) = non_empty(&filter.kind) {
        conditions.push("kind = ?");
        values.push(Value::Text(kind.to_string()));
    }
    if let Some(name) = non_empty(&filter.name) {
        conditions.push("name LIKE ? ESCAPE '\\'");
        values.push(Value::Text(format!("%{}%", escape_like(name))));
    }
    if let Some(action) = filter.action {
        conditions.push("action = ?");
        values.push(Value::Text(action.as_str().to_string()));
    }
    if let Some(start) = filter.start_time {
        conditions.push("timestamp >= ?");
        values.push(Value::Integer(start.timestamp_micros()));
    }
    if let Some(end) = filter.end_time {
        conditions.push("timestamp <= ?");
        values.push(Value::Integer(end.timestamp_micros()));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Escapes LIKE wildcards so a name filter matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn grouped_counts(conn: &Connection, column: &str) -> Result<BTreeMap<String, i64>> {
    let sql = format!(
        "SELECT {column}, COUNT(*) FROM change_events GROUP BY {column}",
        column = column
    );
    let mut stmt = conn.prepare(&sql)?;
    let counts = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
    Ok(counts)
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<ChangeEvent> {
    let micros: i64 = row.get(1)?;
    let timestamp = DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Integer,
            Box::new(StoreError::InvalidData(format!(
                "timestamp out of range: {}",
                micros
            ))),
        )
    })?;

    let action: String = row.get(5)?;
    let action = action
        .parse::<Action>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(ChangeEvent {
        id: Some(row.get(0)?),
        timestamp,
        namespace: row.get(2)?,
        kind: row.get(3)?,
        name: row.get(4)?,
        action,
        diff: row.get(6)?,
        metadata: row.get(7)?,
        image_before: row.get(8)?,
        image_after: row.get(9)?,
    })
}
