//! Memory Store Implementation
//!
//! SQLite-based storage for conversation memory entries. Every mutating
//! call runs inside a single transaction, so readers never observe a
//! half-committed entry and callers may retry a failed call wholesale.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{RecallError, RecallResult};
use super::types::*;

/// Memory store for persisting conversation entries to SQLite
pub struct MemoryStore {
    db: Arc<RwLock<Connection>>,
}

impl MemoryStore {
    /// Create a new memory store over a shared connection
    pub fn new(db: Arc<RwLock<Connection>>) -> Self {
        Self { db }
    }

    /// Append a new entry.
    ///
    /// Assigns an id and timestamp when absent, routes oversized content
    /// to the overflow table, and upserts the session's `last_active_at`.
    pub async fn append(&self, input: NewEntry) -> RecallResult<MemoryEntry> {
        if input.session_id.trim().is_empty() {
            return Err(RecallError::validation("session_id must not be blank"));
        }

        let id = Uuid::new_v4().to_string();
        let timestamp = input.timestamp.unwrap_or_else(Utc::now);
        let content_hash = Self::hash_content(&input.content);
        let metadata_json = serde_json::to_string(&input.metadata)?;

        let overflow = input.content.len() > OVERFLOW_THRESHOLD_BYTES;
        let stored_content = if overflow {
            let mut preview: String = input.content.chars().take(OVERFLOW_PREVIEW_CHARS).collect();
            preview.push_str("...");
            preview
        } else {
            input.content.clone()
        };

        let mut db = self.db.write().await;
        let tx = db.transaction()?;

        tx.execute(
            "INSERT INTO entries (id, session_id, timestamp, entry_type, content, metadata_json, importance, content_hash, overflow)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &id,
                &input.session_id,
                timestamp.timestamp_millis(),
                input.entry_type.as_str(),
                &stored_content,
                &metadata_json,
                input.importance.as_str(),
                &content_hash,
                overflow,
            ],
        )?;

        if overflow {
            tx.execute(
                "INSERT INTO overflow (entry_id, content) VALUES (?1, ?2)",
                params![&id, &input.content],
            )?;
        }

        tx.execute(
            "INSERT INTO sessions (session_id, started_at, last_active_at)
             VALUES (?1, ?2, ?2)
             ON CONFLICT(session_id) DO UPDATE SET last_active_at = excluded.last_active_at",
            params![&input.session_id, timestamp.timestamp_millis()],
        )?;

        tx.commit()?;

        tracing::debug!(entry_id = %id, session_id = %input.session_id, overflow, "appended entry");

        Ok(MemoryEntry {
            id,
            session_id: input.session_id,
            timestamp,
            entry_type: input.entry_type,
            content: stored_content,
            metadata: input.metadata,
            importance: input.importance,
            content_hash,
            overflow,
        })
    }

    /// Get a single entry by id. With `full_content`, overflowed entries
    /// are hydrated from the overflow table.
    pub async fn get(&self, entry_id: &str, full_content: bool) -> RecallResult<Option<MemoryEntry>> {
        let db = self.db.read().await;

        let result = db.query_row(
            "SELECT id, session_id, timestamp, entry_type, content, metadata_json, importance, content_hash, overflow
             FROM entries WHERE id = ?1",
            params![entry_id],
            Self::row_to_entry,
        );

        let mut entry = match result {
            Ok(entry) => entry,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if full_content && entry.overflow {
            let payload = db.query_row(
                "SELECT content FROM overflow WHERE entry_id = ?1",
                params![entry_id],
                |row| row.get::<_, String>(0),
            );
            match payload {
                Ok(content) => entry.content = content,
                Err(rusqlite::Error::QueryReturnedNoRows) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Some(entry))
    }

    /// Query a session's entries with filters, ordered by timestamp
    /// (ascending by default). Bumps the session's `last_active_at`.
    pub async fn query(&self, session_id: &str, filter: &EntryFilter) -> RecallResult<Vec<MemoryEntry>> {
        let entries = {
            let db = self.db.read().await;

            let mut sql = String::from(
                "SELECT id, session_id, timestamp, entry_type, content, metadata_json, importance, content_hash, overflow
                 FROM entries WHERE session_id = ?",
            );
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> =
                vec![Box::new(session_id.to_string())];

            if let Some(ref entry_types) = filter.entry_types {
                if !entry_types.is_empty() {
                    let placeholders: Vec<&str> = entry_types.iter().map(|_| "?").collect();
                    sql.push_str(&format!(" AND entry_type IN ({})", placeholders.join(",")));
                    for entry_type in entry_types {
                        params_vec.push(Box::new(entry_type.as_str().to_string()));
                    }
                }
            }

            if let Some(floor) = filter.min_importance {
                let levels: Vec<&str> = [
                    Importance::Low,
                    Importance::Medium,
                    Importance::High,
                    Importance::Critical,
                ]
                .iter()
                .filter(|level| **level >= floor)
                .map(|level| level.as_str())
                .collect();
                let placeholders: Vec<&str> = levels.iter().map(|_| "?").collect();
                sql.push_str(&format!(" AND importance IN ({})", placeholders.join(",")));
                for level in levels {
                    params_vec.push(Box::new(level.to_string()));
                }
            }

            if let Some(since) = filter.since {
                sql.push_str(" AND timestamp >= ?");
                params_vec.push(Box::new(since.timestamp_millis()));
            }

            if let Some(until) = filter.until {
                sql.push_str(" AND timestamp <= ?");
                params_vec.push(Box::new(until.timestamp_millis()));
            }

            if let Some(ref needle) = filter.contains {
                sql.push_str(" AND content LIKE ?");
                params_vec.push(Box::new(format!("%{}%", needle)));
            }

            match filter.order {
                SortOrder::Ascending => sql.push_str(" ORDER BY timestamp ASC, id ASC"),
                SortOrder::Descending => sql.push_str(" ORDER BY timestamp DESC, id DESC"),
            }

            if let Some(limit) = filter.limit {
                sql.push_str(&format!(" LIMIT {}", limit));
            }

            let param_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|p| p.as_ref()).collect();
            let mut stmt = db.prepare(&sql)?;
            let rows = stmt.query_map(param_refs.as_slice(), Self::row_to_entry)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        self.touch_session(session_id).await?;

        Ok(entries)
    }

    /// Get session information
    pub async fn session(&self, session_id: &str) -> RecallResult<Option<SessionInfo>> {
        let db = self.db.read().await;

        let result = db.query_row(
            "SELECT session_id, started_at, last_active_at FROM sessions WHERE session_id = ?1",
            params![session_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        );

        let (session_id, started_at, last_active_at) = match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry_count: u64 = db.query_row(
            "SELECT COUNT(*) FROM entries WHERE session_id = ?1",
            params![&session_id],
            |row| row.get(0),
        )?;

        Ok(Some(SessionInfo {
            session_id,
            started_at: DateTime::from_timestamp_millis(started_at).unwrap_or_default(),
            last_active_at: DateTime::from_timestamp_millis(last_active_at).unwrap_or_default(),
            entry_count,
        }))
    }

    /// Get statistics for one session. `NotFound` when the store has
    /// never seen the session id.
    pub async fn session_stats(&self, session_id: &str) -> RecallResult<SessionStats> {
        let db = self.db.read().await;

        let known: u64 = db.query_row(
            "SELECT COUNT(*) FROM sessions WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        if known == 0 {
            return Err(RecallError::not_found("Session", session_id));
        }

        let mut stats = SessionStats::default();

        stats.entry_count = db.query_row(
            "SELECT COUNT(*) FROM entries WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;

        let mut stmt = db.prepare(
            "SELECT entry_type, COUNT(*) FROM entries WHERE session_id = ?1 GROUP BY entry_type",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;
        for row in rows {
            let (entry_type, count) = row?;
            stats.by_type.insert(entry_type, count);
        }

        let inline_bytes: u64 = db.query_row(
            "SELECT COALESCE(SUM(LENGTH(content)), 0) FROM entries WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        let overflow_bytes: u64 = db.query_row(
            "SELECT COALESCE(SUM(LENGTH(o.content)), 0) FROM overflow o
             JOIN entries e ON e.id = o.entry_id WHERE e.session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        stats.storage_bytes = inline_bytes + overflow_bytes;

        let range = db.query_row(
            "SELECT MIN(timestamp), MAX(timestamp) FROM entries WHERE session_id = ?1",
            params![session_id],
            |row| {
                Ok((
                    row.get::<_, Option<i64>>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                ))
            },
        )?;
        if let (Some(oldest), Some(newest)) = range {
            stats.time_range = Some((
                DateTime::from_timestamp_millis(oldest).unwrap_or_default(),
                DateTime::from_timestamp_millis(newest).unwrap_or_default(),
            ));
        }

        Ok(stats)
    }

    /// Generate a human-readable digest of a session: duration, per-type
    /// counts, and the most important entries.
    pub async fn session_summary(&self, session_id: &str) -> RecallResult<String> {
        let Some(session) = self.session(session_id).await? else {
            return Err(RecallError::not_found("Session", session_id));
        };

        let entries = self
            .query(
                session_id,
                &EntryFilter {
                    limit: Some(1000),
                    ..Default::default()
                },
            )
            .await?;

        let mut type_counts: HashMap<&str, u64> = HashMap::new();
        for entry in &entries {
            *type_counts.entry(entry.entry_type.as_str()).or_default() += 1;
        }

        let important: Vec<&MemoryEntry> = entries
            .iter()
            .filter(|e| e.importance >= Importance::High)
            .collect();

        let duration = session.last_active_at - session.started_at;
        let hours = duration.num_seconds() as f64 / 3600.0;

        let mut parts = vec![
            format!("Session: {}", session_id),
            format!(
                "Duration: {:.1} hours ({} - {})",
                hours,
                session.started_at.format("%Y-%m-%d %H:%M"),
                session.last_active_at.format("%H:%M"),
            ),
            format!("Total entries: {}", session.entry_count),
            String::new(),
            "Entry breakdown:".to_string(),
        ];

        let mut sorted_types: Vec<_> = type_counts.into_iter().collect();
        sorted_types.sort_by_key(|(name, _)| *name);
        for (entry_type, count) in sorted_types {
            parts.push(format!("  - {}: {}", entry_type, count));
        }

        if !important.is_empty() {
            parts.push(String::new());
            parts.push(format!("Important entries ({}):", important.len()));
            for entry in important.iter().take(5) {
                let preview: String = entry.content.chars().take(100).collect();
                parts.push(format!(
                    "  [{}] {}...",
                    entry.importance,
                    preview.replace('\n', " ")
                ));
            }
        }

        Ok(parts.join("\n"))
    }

    /// Clear a session: all its entries, overflow payloads, and the
    /// session row, in one transaction. Requires `confirm = true` and is
    /// idempotent (an absent session clears 0 entries).
    pub async fn clear_session(&self, session_id: &str, confirm: bool) -> RecallResult<usize> {
        if !confirm {
            return Err(RecallError::ConfirmationRequired {
                session_id: session_id.to_string(),
            });
        }

        let mut db = self.db.write().await;
        let tx = db.transaction()?;

        tx.execute(
            "DELETE FROM overflow WHERE entry_id IN (SELECT id FROM entries WHERE session_id = ?1)",
            params![session_id],
        )?;
        let deleted = tx.execute("DELETE FROM entries WHERE session_id = ?1", params![session_id])?;
        tx.execute("DELETE FROM sessions WHERE session_id = ?1", params![session_id])?;

        tx.commit()?;

        tracing::info!(session_id, deleted, "cleared session");

        Ok(deleted)
    }

    /// Bump a session's `last_active_at`. No-op for unknown sessions.
    pub(crate) async fn touch_session(&self, session_id: &str) -> RecallResult<()> {
        let db = self.db.write().await;
        db.execute(
            "UPDATE sessions SET last_active_at = ?1 WHERE session_id = ?2",
            params![Utc::now().timestamp_millis(), session_id],
        )?;
        Ok(())
    }

    fn hash_content(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn row_to_entry(row: &Row) -> rusqlite::Result<MemoryEntry> {
        let metadata_json: String = row.get(5)?;
        Ok(MemoryEntry {
            id: row.get(0)?,
            session_id: row.get(1)?,
            timestamp: DateTime::from_timestamp_millis(row.get::<_, i64>(2)?).unwrap_or_default(),
            entry_type: EntryType::from_str(&row.get::<_, String>(3)?)
                .unwrap_or(EntryType::UserMessage),
            content: row.get(4)?,
            metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
            importance: Importance::from_str(&row.get::<_, String>(6)?)
                .unwrap_or(Importance::Medium),
            content_hash: row.get(7)?,
            overflow: row.get(8)?,
        })
    }
}
