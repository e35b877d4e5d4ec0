//! Transactional persistence over the four §3 entities.
//!
//! Query style follows the pack's non-macro `sqlx::query(...).bind(...)` +
//! `Row::get` pattern rather than the `sqlx::query!` compile-time macro,
//! which needs an online database at build time.

mod index_entry;
mod lemma;
mod page;
mod retry;
mod site;

pub use retry::retry_locked;

use crate::config::StoreConfig;
use sqlx::SqlitePool;

/// Handle to the persisted index. Cheap to clone (wraps a pooled connection
/// handle and a tuning config).
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    config: StoreConfig,
}

impl Store {
    pub fn new(pool: SqlitePool, config: StoreConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::SiteStatus;

    async fn test_store() -> Store {
        let pool = crate::test_utils::setup_test_db().await;
        Store::new(pool, StoreConfig::default())
    }

    #[tokio::test]
    async fn find_or_create_site_is_idempotent() {
        let store = test_store().await;
        let a = store
            .find_or_create_site("https://example.com", "Example")
            .await
            .unwrap();
        let b = store
            .find_or_create_site("https://example.com", "Example")
            .await
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.status, SiteStatus::Indexing);
    }

    #[tokio::test]
    async fn purge_page_decrements_lemma_frequency() {
        let store = test_store().await;
        let site = store
            .find_or_create_site("https://example.com", "Example")
            .await
            .unwrap();
        let page = store
            .upsert_page(site.id, "/", 200, "<html></html>")
            .await
            .unwrap();
        store
            .write_index_batch(page.id, site.id, &[("cat".into(), 2.0), ("dog".into(), 1.0)])
            .await
            .unwrap();

        let lemmas = store
            .lemmas_by_site_and_texts(site.id, &["cat".to_string(), "dog".to_string()])
            .await
            .unwrap();
        assert!(lemmas.iter().all(|l| l.frequency == 1));

        store.purge_page(page.id).await.unwrap();

        let lemmas = store
            .lemmas_by_site_and_texts(site.id, &["cat".to_string(), "dog".to_string()])
            .await
            .unwrap();
        assert!(lemmas.iter().all(|l| l.frequency == 0));
    }

    #[tokio::test]
    async fn reindex_same_page_is_idempotent() {
        let store = test_store().await;
        let site = store
            .find_or_create_site("https://example.com", "Example")
            .await
            .unwrap();
        store
            .upsert_page(site.id, "/", 200, "<html>a</html>")
            .await
            .unwrap();
        store
            .upsert_page(site.id, "/", 200, "<html>b</html>")
            .await
            .unwrap();

        assert_eq!(store.count_pages_of_site(site.id).await.unwrap(), 1);
    }
}
