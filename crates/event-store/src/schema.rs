//! Table and index definitions.

use crate::error::Result;
use rusqlite::Connection;

/// Timestamps are unix microseconds so that range scans and ordering stay
/// on an integer index.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS change_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    namespace TEXT NOT NULL,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    action TEXT NOT NULL,
    diff TEXT NOT NULL DEFAULT '',
    metadata TEXT NOT NULL DEFAULT '',
    image_before TEXT,
    image_after TEXT
);

CREATE INDEX IF NOT EXISTS idx_change_events_timestamp ON change_events(timestamp);
CREATE INDEX IF NOT EXISTS idx_change_events_namespace ON change_events(namespace);
CREATE INDEX IF NOT EXISTS idx_change_events_kind ON change_events(kind);
CREATE INDEX IF NOT EXISTS idx_change_events_name ON change_events(name);
CREATE INDEX IF NOT EXISTS idx_change_events_action ON change_events(action);
CREATE INDEX IF NOT EXISTS idx_change_events_resource ON change_events(namespace, kind, name);
CREATE INDEX IF NOT EXISTS idx_change_events_kind_timestamp ON change_events(kind, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_change_events_namespace_timestamp ON change_events(namespace, timestamp DESC);
"#;

/// Creates the table and indexes if they do not exist.
pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
