use anyhow::{anyhow, bail, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::types::{NewCapsule, TimeCapsule};
use crate::db;
use crate::era::Era;

/// Hard cap on stored capsules. Older entries are evicted first.
pub const MAX_CAPSULES: usize = 50;

const SELECT_COLUMNS: &str = "SELECT id, location, era, content, created_at FROM capsules";

/// Capped, newest-first collection of saved narratives.
///
/// Every call is a short blocking SQLite operation; async callers should go
/// through `tokio::task::spawn_blocking`.
pub struct CapsuleStore {
    conn: Mutex<Connection>,
}

impl CapsuleStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_connection(db::open_database(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(db::open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Save a narrative. Assigns id and timestamp, then evicts anything
    /// beyond the newest [`MAX_CAPSULES`].
    pub fn add(&self, capsule: NewCapsule) -> Result<TimeCapsule> {
        if capsule.content.trim().is_empty() {
            bail!("cannot save an empty narrative");
        }

        let saved = TimeCapsule {
            id: uuid::Uuid::now_v7().to_string(),
            location: capsule.location,
            era: capsule.era,
            content: capsule.content,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO capsules (id, location, era, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                saved.id,
                saved.location,
                saved.era.as_str(),
                saved.content,
                saved.created_at,
            ],
        )?;
        let evicted = tx.execute(
            "DELETE FROM capsules WHERE seq NOT IN (SELECT seq FROM capsules ORDER BY seq DESC LIMIT ?1)",
            params![MAX_CAPSULES as i64],
        )?;
        tx.commit()?;

        if evicted > 0 {
            tracing::debug!(evicted, "evicted oldest capsules");
        }
        tracing::info!(id = %saved.id, location = %saved.location, era = %saved.era, "capsule saved");
        Ok(saved)
    }

    /// Delete a capsule by id. Returns `false` when nothing matched.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM capsules WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// All capsules, most recent first.
    pub fn list(&self) -> Result<Vec<TimeCapsule>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY seq DESC"))?;
        let capsules = stmt
            .query_map([], row_to_capsule)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(capsules)
    }

    pub fn get(&self, id: &str) -> Result<Option<TimeCapsule>> {
        let conn = self.lock()?;
        let capsule = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                row_to_capsule,
            )
            .optional()?;
        Ok(capsule)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM capsules", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("capsule database lock poisoned: {e}"))
    }
}

fn row_to_capsule(row: &Row<'_>) -> rusqlite::Result<TimeCapsule> {
    let era: String = row.get(2)?;
    let era: Era = era
        .parse()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;
    Ok(TimeCapsule {
        id: row.get(0)?,
        location: row.get(1)?,
        era,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}
