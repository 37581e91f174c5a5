//! SQLite-backed stats snapshot store
//!
//! Append-only; one row lands per completed sync run and no update path
//! exists.

use std::sync::Arc;

use async_trait::async_trait;
use repopulse_core::StatsSnapshotStore;
use repopulse_domain::{NewStatsSnapshot, RepoPulseError, Result, StatsSnapshot};
use rusqlite::{params, Row};
use tokio::task;

use super::manager::DbManager;
use super::{from_ts, to_ts};
use crate::errors::{map_join_error, InfraError};

const INSERT_SQL: &str = "INSERT INTO stats_snapshots \
     (repository_id, recorded_at, active_prs, active_issues) VALUES (?1, ?2, ?3, ?4)";

const SELECT_SQL: &str = "SELECT id, repository_id, recorded_at, active_prs, active_issues \
     FROM stats_snapshots WHERE repository_id = ?1 ORDER BY recorded_at";

/// SQLite implementation of the stats snapshot store port.
pub struct SqliteSnapshotStore {
    db: Arc<DbManager>,
}

impl SqliteSnapshotStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

struct SnapshotRow {
    id: i64,
    repository_id: i64,
    recorded_at: i64,
    active_prs: i64,
    active_issues: i64,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<SnapshotRow> {
    Ok(SnapshotRow {
        id: row.get(0)?,
        repository_id: row.get(1)?,
        recorded_at: row.get(2)?,
        active_prs: row.get(3)?,
        active_issues: row.get(4)?,
    })
}

impl SnapshotRow {
    fn into_domain(self) -> Result<StatsSnapshot> {
        Ok(StatsSnapshot {
            id: self.id,
            repository_id: self.repository_id,
            recorded_at: from_ts(self.recorded_at)?,
            active_prs: self.active_prs,
            active_issues: self.active_issues,
        })
    }
}

#[async_trait]
impl StatsSnapshotStore for SqliteSnapshotStore {
    async fn append(&self, new: &NewStatsSnapshot) -> Result<StatsSnapshot> {
        let db = Arc::clone(&self.db);
        let new = new.clone();
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                INSERT_SQL,
                params![
                    new.repository_id,
                    to_ts(new.recorded_at),
                    new.active_prs,
                    new.active_issues
                ],
            )
            .map_err(InfraError::from)?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                "SELECT id, repository_id, recorded_at, active_prs, active_issues \
                 FROM stats_snapshots WHERE id = ?1",
                params![id],
                read_row,
            )
            .map_err(|err| RepoPulseError::from(InfraError::from(err)))?
            .into_domain()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_for_repository(&self, repository_id: i64) -> Result<Vec<StatsSnapshot>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(SELECT_SQL).map_err(InfraError::from)?;
            let rows = stmt
                .query_map(params![repository_id], read_row)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            rows.into_iter().map(SnapshotRow::into_domain).collect()
        })
        .await
        .map_err(map_join_error)?
    }
}
