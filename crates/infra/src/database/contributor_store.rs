//! SQLite-backed contributor store

use std::sync::Arc;

use async_trait::async_trait;
use repopulse_core::ContributorStore;
use repopulse_domain::{Contributor, NewContributor, RepoPulseError, Result};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;

use super::manager::DbManager;
use crate::errors::{map_join_error, InfraError};

const SELECT_COLUMNS: &str =
    "SELECT id, external_id, login, avatar_url, html_url FROM contributors";

const INSERT_SQL: &str = "INSERT INTO contributors (external_id, login, avatar_url, html_url) \
     VALUES (?1, ?2, ?3, ?4) \
     ON CONFLICT(external_id) DO UPDATE SET \
     login = excluded.login, avatar_url = excluded.avatar_url, html_url = excluded.html_url";

const LIST_FOR_REPOSITORY_SQL: &str =
    "SELECT id, external_id, login, avatar_url, html_url FROM contributors WHERE id IN ( \
     SELECT author_id FROM pull_requests WHERE repository_id = ?1 \
     UNION SELECT author_id FROM issues WHERE repository_id = ?1) \
     ORDER BY login";

/// SQLite implementation of the contributor store port.
pub struct SqliteContributorStore {
    db: Arc<DbManager>,
}

impl SqliteContributorStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<Contributor> {
    Ok(Contributor {
        id: row.get(0)?,
        external_id: row.get(1)?,
        login: row.get(2)?,
        avatar_url: row.get(3)?,
        html_url: row.get(4)?,
    })
}

#[async_trait]
impl ContributorStore for SqliteContributorStore {
    async fn find_by_external_id(&self, external_id: i64) -> Result<Option<Contributor>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let sql = format!("{SELECT_COLUMNS} WHERE external_id = ?1");
            conn.query_row(&sql, params![external_id], read_row)
                .optional()
                .map_err(|err| RepoPulseError::from(InfraError::from(err)))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get_or_create(&self, new: &NewContributor) -> Result<Contributor> {
        let db = Arc::clone(&self.db);
        let new = new.clone();
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            // Upsert keeps login and avatar fresh for returning authors.
            conn.execute(
                INSERT_SQL,
                params![new.external_id, new.login, new.avatar_url, new.html_url],
            )
            .map_err(InfraError::from)?;
            let sql = format!("{SELECT_COLUMNS} WHERE external_id = ?1");
            conn.query_row(&sql, params![new.external_id], read_row)
                .map_err(|err| RepoPulseError::from(InfraError::from(err)))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn list_for_repository(&self, repository_id: i64) -> Result<Vec<Contributor>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(LIST_FOR_REPOSITORY_SQL).map_err(InfraError::from)?;
            let rows = stmt
                .query_map(params![repository_id], read_row)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }
}
