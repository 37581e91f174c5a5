//! Per-run contributor identity cache
//!
//! The same author typically appears on many items in one run. Resolving
//! each occurrence against the durable store would both hammer the
//! database and, under concurrent item processing, risk duplicate rows.
//! The cache is an explicit object constructed once per sync invocation
//! and threaded through the upsert calls - never ambient state.

use std::collections::HashMap;
use std::sync::Arc;

use repopulse_domain::{NewContributor, Result};
use tokio::sync::Mutex;

use super::ports::{ContributorStore, RemoteAccount};

/// Two-tier author resolution: run-local map first, durable store second,
/// row created if absent.
pub struct ContributorCache {
    store: Arc<dyn ContributorStore>,
    /// Remote account id -> local contributor row id. The async mutex is
    /// held across the store lookup so concurrent item tasks cannot race
    /// the same author into two rows.
    by_external_id: Mutex<HashMap<i64, i64>>,
}

impl ContributorCache {
    /// Create an empty cache for one sync run.
    pub fn new(store: Arc<dyn ContributorStore>) -> Self {
        Self { store, by_external_id: Mutex::new(HashMap::new()) }
    }

    /// Resolve a remote account to its local contributor row id.
    pub async fn resolve(&self, account: &RemoteAccount) -> Result<i64> {
        let mut map = self.by_external_id.lock().await;

        if let Some(id) = map.get(&account.id) {
            return Ok(*id);
        }

        let contributor = self
            .store
            .get_or_create(&NewContributor {
                external_id: account.id,
                login: account.login.clone(),
                avatar_url: account.avatar_url.clone(),
                html_url: account.html_url.clone(),
            })
            .await?;

        map.insert(account.id, contributor.id);
        Ok(contributor.id)
    }

    /// Number of distinct authors resolved so far in this run.
    pub async fn len(&self) -> usize {
        self.by_external_id.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.by_external_id.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use async_trait::async_trait;
    use repopulse_domain::Contributor;

    use super::*;

    struct CountingStore {
        lookups: AtomicI64,
        creations: AtomicI64,
    }

    impl CountingStore {
        fn new() -> Self {
            Self { lookups: AtomicI64::new(0), creations: AtomicI64::new(0) }
        }
    }

    #[async_trait]
    impl ContributorStore for CountingStore {
        async fn find_by_external_id(&self, _external_id: i64) -> Result<Option<Contributor>> {
            Ok(None)
        }

        async fn get_or_create(&self, new: &NewContributor) -> Result<Contributor> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.creations.fetch_add(1, Ordering::SeqCst);
            Ok(Contributor {
                id: new.external_id + 1_000,
                external_id: new.external_id,
                login: new.login.clone(),
                avatar_url: new.avatar_url.clone(),
                html_url: new.html_url.clone(),
            })
        }

        async fn list_for_repository(&self, _repository_id: i64) -> Result<Vec<Contributor>> {
            Ok(Vec::new())
        }
    }

    fn account(id: i64, login: &str) -> RemoteAccount {
        RemoteAccount {
            id,
            login: login.to_string(),
            avatar_url: format!("https://avatars.test/{login}"),
            html_url: format!("https://github.test/{login}"),
        }
    }

    #[tokio::test]
    async fn repeated_resolutions_hit_the_store_once() {
        let store = Arc::new(CountingStore::new());
        let cache = ContributorCache::new(store.clone());

        let alice = account(7, "alice");
        let first = cache.resolve(&alice).await.expect("first resolve");
        let second = cache.resolve(&alice).await.expect("second resolve");

        assert_eq!(first, second);
        assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn distinct_accounts_resolve_to_distinct_ids() {
        let store = Arc::new(CountingStore::new());
        let cache = ContributorCache::new(store);

        let a = cache.resolve(&account(1, "alice")).await.expect("alice");
        let b = cache.resolve(&account(2, "bob")).await.expect("bob");

        assert_ne!(a, b);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn concurrent_resolutions_of_one_author_create_one_row() {
        let store = Arc::new(CountingStore::new());
        let cache = Arc::new(ContributorCache::new(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.resolve(&account(42, "carol")).await }));
        }
        for handle in handles {
            handle.await.expect("join").expect("resolve");
        }

        assert_eq!(store.creations.load(Ordering::SeqCst), 1);
    }
}
