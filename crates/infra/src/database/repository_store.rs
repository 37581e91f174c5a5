//! SQLite-backed repository store
//!
//! Owns the sync run header: trusted open counts, status, and progress
//! counters. Status transitions are validated against the forward-only
//! rule before any write.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repopulse_core::RepositoryStore;
use repopulse_domain::{
    NewRepository, RepoPulseError, Repository, Result, SyncBegin, SyncStatus,
};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;

use super::manager::{DbConnection, DbManager};
use super::{opt_from_ts, to_ts};
use crate::errors::{map_join_error, InfraError};

const SELECT_COLUMNS: &str = "SELECT id, external_id, name, full_name, owner, url, description, \
     open_prs_count, open_issues_count, sync_status, sync_item_count, sync_total_items, \
     last_synced_at FROM repositories";

const INSERT_SQL: &str = "INSERT INTO repositories \
     (external_id, name, full_name, owner, url, description) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const BEGIN_SYNC_SQL: &str = "UPDATE repositories SET \
     name = ?2, full_name = ?3, owner = ?4, url = ?5, description = ?6, \
     open_prs_count = ?7, open_issues_count = ?8, sync_status = 'syncing', \
     sync_item_count = 0, sync_total_items = ?9 WHERE id = ?1";

const UPDATE_PROGRESS_SQL: &str =
    "UPDATE repositories SET sync_item_count = ?2 WHERE id = ?1";

const UPDATE_STATUS_SQL: &str = "UPDATE repositories SET sync_status = ?2 WHERE id = ?1";

const COMPLETE_SQL: &str = "UPDATE repositories SET sync_status = 'completed', \
     sync_item_count = sync_total_items, last_synced_at = ?2 WHERE id = ?1";

/// SQLite implementation of the repository store port.
pub struct SqliteRepositoryStore {
    db: Arc<DbManager>,
}

impl SqliteRepositoryStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

struct RepositoryRow {
    id: i64,
    external_id: i64,
    name: String,
    full_name: String,
    owner: String,
    url: String,
    description: Option<String>,
    open_prs_count: i64,
    open_issues_count: i64,
    sync_status: String,
    sync_item_count: i64,
    sync_total_items: i64,
    last_synced_at: Option<i64>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RepositoryRow> {
    Ok(RepositoryRow {
        id: row.get(0)?,
        external_id: row.get(1)?,
        name: row.get(2)?,
        full_name: row.get(3)?,
        owner: row.get(4)?,
        url: row.get(5)?,
        description: row.get(6)?,
        open_prs_count: row.get(7)?,
        open_issues_count: row.get(8)?,
        sync_status: row.get(9)?,
        sync_item_count: row.get(10)?,
        sync_total_items: row.get(11)?,
        last_synced_at: row.get(12)?,
    })
}

impl RepositoryRow {
    fn into_domain(self) -> Result<Repository> {
        Ok(Repository {
            id: self.id,
            external_id: self.external_id,
            name: self.name,
            full_name: self.full_name,
            owner: self.owner,
            url: self.url,
            description: self.description,
            open_prs_count: self.open_prs_count,
            open_issues_count: self.open_issues_count,
            sync_status: SyncStatus::parse(&self.sync_status)?,
            sync_item_count: self.sync_item_count,
            sync_total_items: self.sync_total_items,
            last_synced_at: opt_from_ts(self.last_synced_at)?,
        })
    }
}

fn find_by_id(conn: &DbConnection, id: i64) -> Result<Option<Repository>> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
    conn.query_row(&sql, params![id], read_row)
        .optional()
        .map_err(InfraError::from)?
        .map(RepositoryRow::into_domain)
        .transpose()
}

fn require_row(conn: &DbConnection, id: i64) -> Result<Repository> {
    find_by_id(conn, id)?.ok_or_else(|| RepoPulseError::NotFound(format!("repository {id}")))
}

fn check_transition(current: SyncStatus, next: SyncStatus) -> Result<()> {
    if !current.can_transition_to(next) {
        return Err(RepoPulseError::InvalidInput(format!(
            "illegal sync status transition: {} -> {}",
            current.as_str(),
            next.as_str()
        )));
    }
    Ok(())
}

#[async_trait]
impl RepositoryStore for SqliteRepositoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Repository>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            find_by_id(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_external_id(&self, external_id: i64) -> Result<Option<Repository>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let sql = format!("{SELECT_COLUMNS} WHERE external_id = ?1");
            conn.query_row(&sql, params![external_id], read_row)
                .optional()
                .map_err(InfraError::from)?
                .map(RepositoryRow::into_domain)
                .transpose()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_by_owner_and_name(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Repository>> {
        let db = Arc::clone(&self.db);
        let owner = owner.to_string();
        let name = name.to_string();
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let sql = format!("{SELECT_COLUMNS} WHERE owner = ?1 AND name = ?2");
            conn.query_row(&sql, params![owner, name], read_row)
                .optional()
                .map_err(InfraError::from)?
                .map(RepositoryRow::into_domain)
                .transpose()
        })
        .await
        .map_err(map_join_error)?
    }

    async fn create(&self, new: &NewRepository) -> Result<Repository> {
        let db = Arc::clone(&self.db);
        let new = new.clone();
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            conn.execute(
                INSERT_SQL,
                params![
                    new.external_id,
                    new.name,
                    new.full_name,
                    new.owner,
                    new.url,
                    new.description
                ],
            )
            .map_err(InfraError::from)?;
            require_row(&conn, conn.last_insert_rowid())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn begin_sync(&self, id: i64, begin: &SyncBegin) -> Result<Repository> {
        let db = Arc::clone(&self.db);
        let begin = begin.clone();
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let current = require_row(&conn, id)?;
            check_transition(current.sync_status, SyncStatus::Syncing)?;
            conn.execute(
                BEGIN_SYNC_SQL,
                params![
                    id,
                    begin.name,
                    begin.full_name,
                    begin.owner,
                    begin.url,
                    begin.description,
                    begin.open_prs_count,
                    begin.open_issues_count,
                    begin.total_items()
                ],
            )
            .map_err(InfraError::from)?;
            require_row(&conn, id)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_progress(&self, id: i64, item_count: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let current = require_row(&conn, id)?;
            if item_count < current.sync_item_count {
                return Err(RepoPulseError::InvalidInput(format!(
                    "progress counter {item_count} below committed {}",
                    current.sync_item_count
                )));
            }
            // The counter is monotonic within a run and bounded by the
            // total. The listing endpoints can return one more item than
            // the counts captured at init, so overshoot clamps instead of
            // failing the run.
            let committed = item_count.min(current.sync_total_items);
            conn.execute(UPDATE_PROGRESS_SQL, params![id, committed])
                .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update_status(&self, id: i64, status: SyncStatus) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let current = require_row(&conn, id)?;
            check_transition(current.sync_status, status)?;
            conn.execute(UPDATE_STATUS_SQL, params![id, status.as_str()])
                .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn mark_sync_complete(&self, id: i64, completed_at: DateTime<Utc>) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let current = require_row(&conn, id)?;
            check_transition(current.sync_status, SyncStatus::Completed)?;
            conn.execute(COMPLETE_SQL, params![id, to_ts(completed_at)])
                .map_err(InfraError::from)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::super::from_ts;
    use super::*;

    fn store() -> (TempDir, SqliteRepositoryStore) {
        let temp_dir = TempDir::new().expect("temp dir");
        let manager =
            Arc::new(DbManager::new(temp_dir.path().join("test.db"), 2).expect("manager"));
        manager.run_migrations().expect("migrations");
        (temp_dir, SqliteRepositoryStore::new(manager))
    }

    fn new_repository() -> NewRepository {
        NewRepository {
            external_id: 99,
            name: "signal".into(),
            full_name: "acme/signal".into(),
            owner: "acme".into(),
            url: "https://github.test/acme/signal".into(),
            description: Some("dashboard".into()),
        }
    }

    fn begin() -> SyncBegin {
        SyncBegin {
            name: "signal".into(),
            full_name: "acme/signal".into(),
            owner: "acme".into(),
            url: "https://github.test/acme/signal".into(),
            description: Some("dashboard".into()),
            open_prs_count: 3,
            open_issues_count: 4,
        }
    }

    #[tokio::test]
    async fn created_rows_start_queued_and_are_findable_three_ways() {
        let (_dir, store) = store();

        let created = store.create(&new_repository()).await.expect("create");
        assert_eq!(created.sync_status, SyncStatus::Queued);
        assert_eq!(created.sync_item_count, 0);

        let by_id = store.find_by_id(created.id).await.expect("find").expect("row");
        assert_eq!(by_id.full_name, "acme/signal");

        let by_external = store.find_by_external_id(99).await.expect("find").expect("row");
        assert_eq!(by_external.id, created.id);

        let by_name =
            store.find_by_owner_and_name("acme", "signal").await.expect("find").expect("row");
        assert_eq!(by_name.id, created.id);

        assert!(store.find_by_id(999).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn begin_sync_commits_the_run_header() {
        let (_dir, store) = store();
        let created = store.create(&new_repository()).await.expect("create");

        let updated = store.begin_sync(created.id, &begin()).await.expect("begin");

        assert_eq!(updated.sync_status, SyncStatus::Syncing);
        assert_eq!(updated.open_prs_count, 3);
        assert_eq!(updated.open_issues_count, 4);
        assert_eq!(updated.sync_total_items, 7);
        assert_eq!(updated.sync_item_count, 0);
    }

    #[tokio::test]
    async fn progress_counter_is_monotonic_and_bounded() {
        let (_dir, store) = store();
        let created = store.create(&new_repository()).await.expect("create");
        store.begin_sync(created.id, &begin()).await.expect("begin");

        store.update_progress(created.id, 3).await.expect("progress");
        // Decreasing is rejected.
        assert!(store.update_progress(created.id, 2).await.is_err());

        let row = store.find_by_id(created.id).await.expect("find").expect("row");
        assert_eq!(row.sync_item_count, 3);
    }

    #[tokio::test]
    async fn progress_overshoot_clamps_to_the_total() {
        let (_dir, store) = store();
        let created = store.create(&new_repository()).await.expect("create");
        store.begin_sync(created.id, &begin()).await.expect("begin");

        // The listings returned one more item than the counts at init.
        store.update_progress(created.id, 8).await.expect("progress");

        let row = store.find_by_id(created.id).await.expect("find").expect("row");
        assert_eq!(row.sync_item_count, 7);
    }

    #[tokio::test]
    async fn completion_forces_the_counter_to_the_total() {
        let (_dir, store) = store();
        let created = store.create(&new_repository()).await.expect("create");
        store.begin_sync(created.id, &begin()).await.expect("begin");
        store.update_progress(created.id, 3).await.expect("progress");

        store.mark_sync_complete(created.id, Utc::now()).await.expect("complete");

        let row = store.find_by_id(created.id).await.expect("find").expect("row");
        assert_eq!(row.sync_status, SyncStatus::Completed);
        assert_eq!(row.sync_item_count, 7);
        assert!(row.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn illegal_transitions_are_rejected() {
        let (_dir, store) = store();
        let created = store.create(&new_repository()).await.expect("create");

        // Queued cannot jump straight to completed.
        assert!(store.mark_sync_complete(created.id, Utc::now()).await.is_err());

        store.begin_sync(created.id, &begin()).await.expect("begin");
        store.update_status(created.id, SyncStatus::Failed).await.expect("fail");

        // Failed -> completed is not a legal move; failed -> syncing is.
        assert!(store.update_status(created.id, SyncStatus::Completed).await.is_err());
        store.begin_sync(created.id, &begin()).await.expect("restart");
    }

    #[tokio::test]
    async fn timestamps_round_trip_through_storage() {
        let (_dir, store) = store();
        let created = store.create(&new_repository()).await.expect("create");
        store.begin_sync(created.id, &begin()).await.expect("begin");

        let completed_at = from_ts(to_ts(Utc::now())).expect("ts");
        store.mark_sync_complete(created.id, completed_at).await.expect("complete");

        let row = store.find_by_id(created.id).await.expect("find").expect("row");
        assert_eq!(row.last_synced_at, Some(completed_at));
    }
}
